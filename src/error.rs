use thiserror::Error;

use crate::infrastructure::Locator;

/// 错误等级
///
/// 决定错误在哪一层被吸收。元素 stale 不是错误，
/// 由 `Lookup::Stale` 表示并在访问器内部重试。
/// - `ItemAborting`：终止当前条目，批次继续
/// - `Fatal`：终止整个运行（先释放会话）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    ItemAborting,
}

/// 自动化错误类型
#[derive(Debug, Error)]
pub enum AutomationError {
    /// 浏览器启动或连接失败
    #[error("浏览器启动失败: {0}")]
    BrowserStartup(String),

    /// 登录失败（凭据错误或登录标记未出现）
    #[error("登录失败: {0}")]
    Login(String),

    /// 导航失败
    #[error("导航到 {url} 失败: {reason}")]
    Navigation { url: String, reason: String },

    /// 元素在超时时间内没有出现
    #[error("等待元素超时: {locator}")]
    ElementTimeout { locator: Locator },

    /// 元素一直处于 stale 状态，重试次数耗尽
    #[error("元素 {locator} 在 {attempts} 次尝试后仍不可用")]
    AttemptsExhausted { locator: Locator, attempts: usize },

    /// 下拉建议中没有找到完全匹配的选项
    #[error("下拉框中没有找到 {expected}")]
    SuggestionNotFound { expected: String },

    /// 提交后没有出现成功提示
    #[error("提交后未出现成功提示: {0}")]
    SuccessBannerMissing(String),

    /// 列表页没有任何匹配行
    #[error("列表 {view} 中没有匹配 {prefix} 的记录")]
    NoMatchingRecord { view: String, prefix: String },

    /// 列表页有多条匹配行且策略要求唯一
    #[error("列表 {view} 中有 {count} 条记录匹配 {prefix}")]
    AmbiguousMatch {
        view: String,
        prefix: String,
        count: usize,
    },

    /// 驱动底层错误
    #[error("驱动错误: {0}")]
    Driver(String),
}

impl AutomationError {
    /// 错误等级
    pub fn severity(&self) -> Severity {
        match self {
            AutomationError::BrowserStartup(_) | AutomationError::Login(_) => Severity::Fatal,
            _ => Severity::ItemAborting,
        }
    }

    /// 是否终止整个运行
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// 输入行错误（在任何网络交互之前发现）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    /// 字段数量不是 2
    #[error("Malformed line")]
    Malformed,

    /// 时间戳两种格式都无法解析
    #[error("Invalid timestamp '{0}': expected YYYY-MM-DD HH:MM:SS or YYYY-MM-DD HH:MM")]
    InvalidTimestamp(String),
}

/// 自动化结果类型
pub type AutomationResult<T> = Result<T, AutomationError>;
