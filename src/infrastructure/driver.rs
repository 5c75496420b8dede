//! UI 自动化驱动契约 - 基础设施层
//!
//! 核心流程只依赖这里定义的原语：导航、定位、等待、读文本、点击、输入。
//! 不假设具体的自动化引擎（chromiumoxide 的实现见 `browser::chrome`）。

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};

use crate::error::AutomationResult;

/// 元素定位方式
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// CSS 选择器
    Css(String),
    /// XPath 表达式
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn id(id: &str) -> Self {
        Locator::Css(format!("#{}", id))
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={}", s),
            Locator::XPath(s) => write!(f, "xpath={}", s),
        }
    }
}

/// 等待元素达到的就绪条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// 元素存在于 DOM 中
    Present,
    /// 元素可见且未禁用
    Clickable,
}

/// 一次定位或元素操作的结果
///
/// 把"找不到"和"句柄失效"显式化，重试逻辑在这几个变体上做有界循环，
/// 不依赖异常传播。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// 成功
    Found(T),
    /// 元素不存在（或等待超时）
    NotFound,
    /// 句柄在定位之后失效（页面重新渲染）
    Stale,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(v) => Lookup::Found(f(v)),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Stale => Lookup::Stale,
        }
    }
}

/// UI 自动化驱动
///
/// 职责：
/// - 只暴露页面操作原语
/// - 不认识评估、单元、考试记录
/// - 不做任何重试（重试由 `services::element_access` 负责）
///
/// 所有操作都是可失败的：`Err` 表示驱动本身出了问题（连接断开等），
/// `Lookup::NotFound` / `Lookup::Stale` 表示页面状态问题。
#[async_trait]
pub trait UiDriver: Send + Sync {
    /// 元素句柄
    type Element: Send + Sync;

    /// 导航到指定 URL，等待页面加载
    async fn navigate(&self, url: &str) -> AutomationResult<()>;

    /// 立即定位第一个匹配的元素，不等待
    async fn find(&self, locator: &Locator) -> AutomationResult<Lookup<Self::Element>>;

    /// 立即定位所有匹配的元素，不等待；没有匹配时返回空列表
    async fn find_all(&self, locator: &Locator)
        -> AutomationResult<Lookup<Vec<Self::Element>>>;

    /// 在 `timeout` 内轮询，直到元素满足 `readiness`；超时返回 `NotFound`
    ///
    /// 轮询期间的 `NotFound` / `Stale` 都不会提前返回（实现应基于 `poll_until`）。
    async fn wait_until(
        &self,
        locator: &Locator,
        readiness: Readiness,
        timeout: Duration,
    ) -> AutomationResult<Lookup<Self::Element>>;

    /// 读取元素的可见文本
    async fn text(&self, element: &Self::Element) -> AutomationResult<Lookup<String>>;

    /// 以脚本方式点击元素（绕过遮挡和视口限制）
    async fn click(&self, element: &Self::Element) -> AutomationResult<Lookup<()>>;

    /// 向元素输入文本
    async fn send_keys(&self, element: &Self::Element, text: &str)
        -> AutomationResult<Lookup<()>>;

    /// 勾选框 / 开关是否处于选中状态
    async fn is_selected(&self, element: &Self::Element) -> AutomationResult<Lookup<bool>>;

    /// 关闭驱动并释放浏览器
    async fn quit(&mut self) -> AutomationResult<()>;
}

/// 在 `timeout` 内每隔 `interval` 调用一次 `check`，直到返回 `Found`
///
/// `NotFound` 和 `Stale` 都继续轮询（页面可能仍在渲染或跳转）；
/// 到期仍未找到时返回 `NotFound`。`check` 的 `Err` 立即上抛。
pub async fn poll_until<T, F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> AutomationResult<Lookup<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AutomationResult<Lookup<T>>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Lookup::Found(value) = check().await? {
            return Ok(Lookup::Found(value));
        }
        if Instant::now() >= deadline {
            return Ok(Lookup::NotFound);
        }
        sleep(interval).await;
    }
}

/// 驱动启动器
///
/// 浏览器的启动配置（无头模式、可执行文件路径等）不属于核心流程，
/// 由启动器封装；核心只关心"拿到一个可用的驱动"。
#[async_trait]
pub trait DriverLauncher: Send + Sync {
    type Driver: UiDriver;

    async fn launch(&self) -> anyhow::Result<Self::Driver>;
}
