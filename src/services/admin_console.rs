//! 管理后台操作 - 业务能力层
//!
//! 在后台页面上完成评审开启的四个阶段。所有元素操作都经过
//! `ElementAccess`，阶段本身不重试。

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::config::{AmbiguityPolicy, Config};
use crate::error::{AutomationError, AutomationResult};
use crate::infrastructure::UiDriver;
use crate::models::search_prefix;
use crate::services::admin_layout::AdminLayout;
use crate::services::element_access::{ElementAccess, RetryPolicy};
use crate::services::review_backend::{ReviewBackend, RowPick, ToggleChange, UnitToggle};

/// 管理后台
///
/// 职责：
/// - 把每个阶段翻译成页面操作
/// - 借用驱动，不持有
/// - 不关心条目顺序、结果汇总
pub struct AdminConsole<'a, D: UiDriver> {
    driver: &'a D,
    access: ElementAccess<'a, D>,
    layout: AdminLayout,
    review_config_add_url: String,
    assessment_list_url: String,
    unit_list_url: String,
    exam_list_url: String,
    prefix_len: usize,
    trigger_mode: String,
    ambiguity: AmbiguityPolicy,
}

impl<'a, D: UiDriver> AdminConsole<'a, D> {
    pub fn new(driver: &'a D, config: &Config, layout: AdminLayout) -> Self {
        Self {
            driver,
            access: ElementAccess::new(driver, RetryPolicy::from_config(config)),
            layout,
            review_config_add_url: config.url(&config.review_config_add_path),
            assessment_list_url: config.url(&config.assessment_list_path),
            unit_list_url: config.url(&config.unit_list_path),
            exam_list_url: config.url(&config.exam_list_path),
            prefix_len: config.search_prefix_len,
            trigger_mode: config.review_trigger_mode.clone(),
            ambiguity: config.ambiguity_policy,
        }
    }

    /// 打开列表页并按前缀搜索，返回所有行的主键文本
    async fn search_list(
        &self,
        list_url: &str,
        id: &str,
    ) -> AutomationResult<(String, Vec<String>)> {
        let prefix = search_prefix(id, self.prefix_len).to_string();
        let url = search_url(list_url, &prefix)?;
        self.driver.navigate(&url).await?;

        let rows: Vec<String> = self
            .access
            .read_all_texts(
                &self.layout.common.changelist,
                &self.layout.common.result_links,
            )
            .await?
            .into_iter()
            .filter(|row| !row.is_empty())
            .collect();
        debug!("搜索 {} → {} 行", prefix, rows.len());
        Ok((prefix, rows))
    }

    /// 按歧义策略从搜索结果中选一行
    fn pick_row(&self, view: &str, prefix: &str, rows: Vec<String>) -> AutomationResult<RowPick> {
        let candidates = rows.len();
        let first = rows
            .into_iter()
            .next()
            .ok_or_else(|| AutomationError::NoMatchingRecord {
                view: view.to_string(),
                prefix: prefix.to_string(),
            })?;

        if candidates > 1 {
            if self.ambiguity == AmbiguityPolicy::Fail {
                return Err(AutomationError::AmbiguousMatch {
                    view: view.to_string(),
                    prefix: prefix.to_string(),
                    count: candidates,
                });
            }
            warn!(
                "⚠️ {} 中有 {} 行匹配 {}，取第一行: {}",
                view, candidates, prefix, first
            );
        }

        Ok(RowPick {
            value: first,
            candidates,
        })
    }

    /// 点击保存并等待成功提示
    async fn save_and_confirm(&self, what: &str) -> AutomationResult<()> {
        self.access.click(&self.layout.common.save_button).await?;
        match self
            .access
            .read_text(&self.layout.common.success_banner)
            .await
        {
            Ok(banner) => {
                debug!("保存成功: {}", banner.trim());
                Ok(())
            }
            Err(AutomationError::ElementTimeout { .. }) => {
                Err(AutomationError::SuccessBannerMissing(what.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<'a, D: UiDriver> ReviewBackend for AdminConsole<'a, D> {
    async fn create_review_config(
        &self,
        assessment_id: &str,
        delay_secs: u64,
    ) -> AutomationResult<()> {
        let layout = &self.layout.review_config;
        let prefix = search_prefix(assessment_id, self.prefix_len);
        info!("📝 创建评审配置: {} (延迟 {} 秒)", assessment_id, delay_secs);

        self.driver.navigate(&self.review_config_add_url).await?;

        // select2 下拉框：打开 → 输入前缀 → 按完整ID选择
        self.access.click(&layout.picker_open).await?;
        self.access.type_into(&layout.picker_search, prefix).await?;
        self.access
            .click_matching_text(&layout.picker_options, assessment_id)
            .await?;

        self.access
            .type_into(&layout.trigger_mode, &self.trigger_mode)
            .await?;
        self.access
            .type_into(&layout.delay_seconds, &delay_secs.to_string())
            .await?;

        self.save_and_confirm(&format!("review config for {}", assessment_id))
            .await
    }

    async fn resolve_assessment_id(&self, assessment_id: &str) -> AutomationResult<RowPick> {
        let (prefix, rows) = self
            .search_list(&self.assessment_list_url, assessment_id)
            .await?;
        let pick = self.pick_row("assessments", &prefix, rows)?;
        info!("🔎 评估ID: {} → {}", assessment_id, pick.value);
        Ok(pick)
    }

    async fn resolve_unit_ids(&self, resolved_id: &str) -> AutomationResult<Vec<String>> {
        let (_, units) = self.search_list(&self.unit_list_url, resolved_id).await?;
        info!("🔎 {} 下找到 {} 个单元", resolved_id, units.len());
        Ok(units)
    }

    async fn enable_unit_review(&self, unit_id: &str) -> AutomationResult<UnitToggle> {
        let (prefix, rows) = self.search_list(&self.exam_list_url, unit_id).await?;
        let pick = self.pick_row("exams", &prefix, rows)?;

        // 打开第一行（渲染顺序）
        self.access.click(&self.layout.common.result_links).await?;

        let toggle = &self.layout.exam_record.review_toggle;
        let change = if self.access.is_selected(toggle).await? {
            debug!("单元 {} 的评审开关已开启，不点击", unit_id);
            ToggleChange::AlreadyEnabled
        } else {
            self.access.click(toggle).await?;
            ToggleChange::Enabled
        };

        self.save_and_confirm(&format!("exam record for unit {}", unit_id))
            .await?;
        info!("✓ 单元 {} 评审已开启", unit_id);
        Ok(UnitToggle {
            change,
            candidates: pick.candidates,
        })
    }
}

/// 列表页搜索 URL（Django admin 的 `?q=` 参数）
fn search_url(list_url: &str, prefix: &str) -> AutomationResult<String> {
    Url::parse_with_params(list_url, &[("q", prefix)])
        .map(String::from)
        .map_err(|e| AutomationError::Navigation {
            url: list_url.to_string(),
            reason: e.to_string(),
        })
}
