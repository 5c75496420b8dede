//! chromiumoxide 驱动实现
//!
//! 把 CDP 的错误映射为 `Lookup`：
//! - 定位阶段：选择器没有匹配（CDP 以 nodeId 0 报 "Could not find node with given id"）
//!   → `Lookup::NotFound`；页面跳转中上下文被销毁 → `Lookup::Stale`
//! - 元素操作阶段：已持有的节点被移除 / 上下文销毁 → `Lookup::Stale`
//! - 其他错误 → `AutomationError::Driver`

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, Element, Page};
use regex::Regex;
use serde_json::Value as JsonValue;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{AutomationError, AutomationResult};
use crate::infrastructure::{poll_until, Locator, Lookup, Readiness, UiDriver};

/// 轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(200);

const CLICKABLE_JS: &str = r#"function() {
    const style = window.getComputedStyle(this);
    const rect = this.getBoundingClientRect();
    return !this.disabled
        && style.visibility !== 'hidden'
        && style.display !== 'none'
        && (rect.width > 0 || rect.height > 0);
}"#;

const CLICK_JS: &str = "function() { this.click(); }";

const SELECTED_JS: &str = "function() { return !!(this.checked || this.selected); }";

/// chromiumoxide 驱动
///
/// 职责：
/// - 持有唯一的 Page
/// - 实现 `UiDriver` 的全部原语
/// - 不认识评估 / 单元 / 考试记录
pub struct ChromeDriver {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    /// 浏览器是否由本驱动启动（连接模式下只关闭自己的页面）
    owns_browser: bool,
    patterns: ErrorPatterns,
}

impl ChromeDriver {
    pub fn new(
        browser: Browser,
        page: Page,
        handler_task: JoinHandle<()>,
        owns_browser: bool,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            browser,
            page,
            handler_task,
            owns_browser,
            patterns: ErrorPatterns::new()?,
        })
    }

    /// 定位阶段的 CDP 错误：没有匹配 → NotFound，上下文销毁 → Stale
    fn on_lookup_error<T>(&self, err: CdpError) -> AutomationResult<Lookup<T>> {
        if matches!(err, CdpError::NotFound) {
            return Ok(Lookup::NotFound);
        }
        let message = err.to_string();
        match self.patterns.classify(&message) {
            CdpFailure::MissingNode => Ok(Lookup::NotFound),
            CdpFailure::Detached => {
                debug!("定位时页面上下文已失效: {}", message);
                Ok(Lookup::Stale)
            }
            CdpFailure::Other => Err(AutomationError::Driver(message)),
        }
    }

    /// 元素操作阶段的 CDP 错误：节点已不在文档中 → Stale
    fn on_element_error<T>(&self, err: CdpError) -> AutomationResult<Lookup<T>> {
        if matches!(err, CdpError::NotFound) {
            return Ok(Lookup::Stale);
        }
        let message = err.to_string();
        match self.patterns.classify(&message) {
            CdpFailure::MissingNode | CdpFailure::Detached => {
                debug!("元素已失效: {}", message);
                Ok(Lookup::Stale)
            }
            CdpFailure::Other => Err(AutomationError::Driver(message)),
        }
    }

    /// 单次检查元素是否满足就绪条件
    async fn check_ready(
        &self,
        locator: &Locator,
        readiness: Readiness,
    ) -> AutomationResult<Lookup<Element>> {
        let element = match self.find(locator).await? {
            Lookup::Found(element) => element,
            Lookup::NotFound => return Ok(Lookup::NotFound),
            Lookup::Stale => return Ok(Lookup::Stale),
        };
        match readiness {
            Readiness::Present => Ok(Lookup::Found(element)),
            Readiness::Clickable => match self.is_clickable(&element).await? {
                Lookup::Found(true) => Ok(Lookup::Found(element)),
                Lookup::Found(false) | Lookup::NotFound => Ok(Lookup::NotFound),
                Lookup::Stale => Ok(Lookup::Stale),
            },
        }
    }

    /// 在元素上执行 JS 函数并返回结果值
    async fn call_fn(&self, element: &Element, function: &str) -> Result<Option<JsonValue>, CdpError> {
        let returns = element.call_js_fn(function, false).await?;
        Ok(returns.result.value)
    }

    async fn is_clickable(&self, element: &Element) -> AutomationResult<Lookup<bool>> {
        match self.call_fn(element, CLICKABLE_JS).await {
            Ok(value) => Ok(Lookup::Found(
                value.and_then(|v| v.as_bool()).unwrap_or(false),
            )),
            Err(e) => self.on_element_error(e),
        }
    }
}

#[async_trait]
impl UiDriver for ChromeDriver {
    type Element = Element;

    async fn navigate(&self, url: &str) -> AutomationResult<()> {
        debug!("导航到: {}", url);
        let to_nav_err = |e: CdpError| AutomationError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        };
        self.page.goto(url).await.map_err(to_nav_err)?;
        self.page.wait_for_navigation().await.map_err(to_nav_err)?;
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> AutomationResult<Lookup<Element>> {
        // find_elements 在没有匹配时返回空列表，不会对 nodeId 0 调用 DescribeNode
        Ok(match self.find_all(locator).await? {
            Lookup::Found(elements) => elements
                .into_iter()
                .next()
                .map_or(Lookup::NotFound, Lookup::Found),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Stale => Lookup::Stale,
        })
    }

    async fn find_all(&self, locator: &Locator) -> AutomationResult<Lookup<Vec<Element>>> {
        let result = match locator {
            Locator::Css(selector) => self.page.find_elements(selector.as_str()).await,
            Locator::XPath(expr) => self.page.find_xpaths(expr.as_str()).await,
        };
        match result {
            Ok(elements) => Ok(Lookup::Found(elements)),
            Err(e) => match self.on_lookup_error::<Vec<Element>>(e)? {
                Lookup::Stale => Ok(Lookup::Stale),
                // 列表页没有结果行
                _ => Ok(Lookup::Found(Vec::new())),
            },
        }
    }

    async fn wait_until(
        &self,
        locator: &Locator,
        readiness: Readiness,
        timeout: Duration,
    ) -> AutomationResult<Lookup<Element>> {
        let lookup = poll_until(timeout, POLL_INTERVAL, || self.check_ready(locator, readiness)).await?;
        if !lookup.is_found() {
            debug!("等待 {} 超时 ({:?})", locator, timeout);
        }
        Ok(lookup)
    }

    async fn text(&self, element: &Element) -> AutomationResult<Lookup<String>> {
        match element.inner_text().await {
            Ok(text) => Ok(Lookup::Found(text.unwrap_or_default())),
            Err(e) => self.on_element_error(e),
        }
    }

    async fn click(&self, element: &Element) -> AutomationResult<Lookup<()>> {
        match self.call_fn(element, CLICK_JS).await {
            Ok(_) => Ok(Lookup::Found(())),
            Err(e) => self.on_element_error(e),
        }
    }

    async fn send_keys(&self, element: &Element, text: &str) -> AutomationResult<Lookup<()>> {
        // <select> 按选项文本或值选中，其他元素逐字输入
        let select_js = format!(
            r#"function() {{
                if (this.tagName !== 'SELECT') return false;
                const wanted = {};
                for (const opt of this.options) {{
                    if (opt.value === wanted || opt.text.trim() === wanted) {{
                        this.value = opt.value;
                        this.dispatchEvent(new Event('change', {{ bubbles: true }}));
                        return true;
                    }}
                }}
                return false;
            }}"#,
            serde_json::to_string(text).map_err(|e| AutomationError::Driver(e.to_string()))?
        );

        match self.call_fn(element, &select_js).await {
            Ok(Some(JsonValue::Bool(true))) => return Ok(Lookup::Found(())),
            Ok(_) => {}
            Err(e) => return self.on_element_error(e),
        }

        if let Err(e) = element.focus().await {
            return self.on_element_error(e);
        }
        match element.type_str(text).await {
            Ok(_) => Ok(Lookup::Found(())),
            Err(e) => self.on_element_error(e),
        }
    }

    async fn is_selected(&self, element: &Element) -> AutomationResult<Lookup<bool>> {
        match self.call_fn(element, SELECTED_JS).await {
            Ok(value) => Ok(Lookup::Found(
                value.and_then(|v| v.as_bool()).unwrap_or(false),
            )),
            Err(e) => self.on_element_error(e),
        }
    }

    async fn quit(&mut self) -> AutomationResult<()> {
        if self.owns_browser {
            self.browser
                .close()
                .await
                .map_err(|e| AutomationError::Driver(e.to_string()))?;
            if let Err(e) = self.browser.wait().await {
                warn!("等待浏览器进程退出失败: {}", e);
            }
        } else {
            self.page
                .clone()
                .close()
                .await
                .map_err(|e| AutomationError::Driver(e.to_string()))?;
        }
        self.handler_task.abort();
        debug!("浏览器已关闭");
        Ok(())
    }
}

/// CDP 错误信息的分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CdpFailure {
    /// 节点 ID 无效（定位时表示没有匹配，操作时表示节点已被移除）
    MissingNode,
    /// 节点脱离文档或执行上下文被销毁（页面重新渲染 / 跳转）
    Detached,
    Other,
}

struct ErrorPatterns {
    missing_node: Regex,
    detached: Regex,
}

impl ErrorPatterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            missing_node: Regex::new(
                r"(?i)(no node with given id|could not find node with given id)",
            )?,
            detached: Regex::new(
                r"(?i)(node is detached|cannot find context with specified id|does not belong to the document|execution context was destroyed)",
            )?,
        })
    }

    fn classify(&self, message: &str) -> CdpFailure {
        if self.missing_node.is_match(message) {
            CdpFailure::MissingNode
        } else if self.detached.is_match(message) {
            CdpFailure::Detached
        } else {
            CdpFailure::Other
        }
    }
}
