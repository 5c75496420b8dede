//! 评审开启流程 - 流程层
//!
//! 核心职责：定义"一个评估"的完整处理流程
//!
//! 流程顺序（每一步依赖上一步的结果，阶段本身不重试）：
//! 1. 创建评审配置
//! 2. 解析后台认可的评估ID
//! 3. 解析依赖的单元ID（为空则结束）
//! 4. 逐个单元开启评审（中途失败不回滚已处理的单元）

use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::error::AutomationError;
use crate::models::{ItemResult, WorkItem};
use crate::services::{ReviewBackend, ToggleChange};
use crate::workflow::item_ctx::ItemCtx;

/// 流程阶段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    CreateReviewConfig,
    ResolveAssessmentId,
    ResolveUnitIds,
    EnableUnitReview { unit_id: String },
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::CreateReviewConfig => write!(f, "create review config"),
            Stage::ResolveAssessmentId => write!(f, "resolve assessment id"),
            Stage::ResolveUnitIds => write!(f, "resolve unit ids"),
            Stage::EnableUnitReview { unit_id } => write!(f, "enable review for unit {}", unit_id),
        }
    }
}

/// 某个阶段失败
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub source: AutomationError,
}

/// 流程正常结束时的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// 所有单元都已开启评审
    Completed { units: Vec<String> },
    /// 没有找到任何单元
    NoUnits { resolved_id: String },
}

/// 评审开启流程
///
/// - 编排四个阶段的顺序
/// - 把每一步的结果写入条目明细
/// - 不持有任何资源（driver）
/// - 只依赖 `ReviewBackend` 能力
pub struct ReviewFlow {
    clock: fn() -> NaiveDateTime,
}

impl ReviewFlow {
    pub fn new() -> Self {
        Self {
            clock: || chrono::Local::now().naive_local(),
        }
    }

    /// 使用固定时钟（用于计算评审延迟）
    pub fn with_clock(clock: fn() -> NaiveDateTime) -> Self {
        Self { clock }
    }

    pub async fn run<B: ReviewBackend>(
        &self,
        backend: &B,
        item: &WorkItem,
        ctx: &ItemCtx,
        result: &mut ItemResult,
    ) -> Result<FlowOutcome, StageFailure> {
        let id = &item.assessment_id;
        info!("{} Processing {}... (date {})", ctx, id, item.completed_at);

        if !item.is_uuid_shaped() {
            warn!("{} ⚠️ ID 不是 UUID 格式: {}", ctx, id);
            result.log("Note: id is not UUID-shaped");
        }

        // ========== 阶段 1: 创建评审配置 ==========
        let delay = item.review_delay_secs((self.clock)());
        backend
            .create_review_config(id, delay)
            .await
            .map_err(|e| fail(ctx, Stage::CreateReviewConfig, e))?;
        result.log(format!("Review config created (delay {}s)", delay));

        // ========== 阶段 2: 解析评估ID ==========
        let pick = backend
            .resolve_assessment_id(id)
            .await
            .map_err(|e| fail(ctx, Stage::ResolveAssessmentId, e))?;
        result.log(format!(
            "Resolved assessment id: {}{}",
            pick.value,
            ambiguity_note(pick.candidates)
        ));
        let resolved_id = pick.value;

        // ========== 阶段 3: 解析单元ID ==========
        let units = backend
            .resolve_unit_ids(&resolved_id)
            .await
            .map_err(|e| fail(ctx, Stage::ResolveUnitIds, e))?;

        if units.is_empty() {
            warn!("{} ⚠️ {} 下没有找到单元", ctx, resolved_id);
            result.fail(format!("No units found for {}", resolved_id));
            return Ok(FlowOutcome::NoUnits { resolved_id });
        }
        info!("{} 单元: {}", ctx, units.join(", "));

        // ========== 阶段 4: 逐个单元开启评审 ==========
        for unit_id in &units {
            let toggle = backend.enable_unit_review(unit_id).await.map_err(|e| {
                fail(
                    ctx,
                    Stage::EnableUnitReview {
                        unit_id: unit_id.clone(),
                    },
                    e,
                )
            })?;
            let state = match toggle.change {
                ToggleChange::Enabled => "review enabled",
                ToggleChange::AlreadyEnabled => "review already enabled",
            };
            result.log(format!(
                "{}: {}{}",
                unit_id,
                state,
                ambiguity_note(toggle.candidates)
            ));
        }

        result.succeed();
        info!("{} ✅ 处理完成，共 {} 个单元", ctx, units.len());
        Ok(FlowOutcome::Completed { units })
    }
}

/// 多条匹配时附在明细后的说明
fn ambiguity_note(candidates: usize) -> String {
    if candidates > 1 {
        format!(" (first of {} matches)", candidates)
    } else {
        String::new()
    }
}

impl Default for ReviewFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn fail(ctx: &ItemCtx, stage: Stage, source: AutomationError) -> StageFailure {
    error!("{} ❌ {} 失败: {}", ctx, stage, source);
    StageFailure { stage, source }
}
