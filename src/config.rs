use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::Deserialize;

/// 多条匹配记录时的处理策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AmbiguityPolicy {
    /// 取页面渲染顺序的第一行
    #[default]
    FirstRow,
    /// 直接判定为失败
    Fail,
}

impl std::str::FromStr for AmbiguityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first-row" | "first" => Ok(AmbiguityPolicy::FirstRow),
            "fail" => Ok(AmbiguityPolicy::Fail),
            other => Err(format!("未知的歧义策略: {}", other)),
        }
    }
}

/// 浏览器启动选项
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    /// 浏览器调试端口（设置后连接已打开的浏览器，不再启动新浏览器）
    pub debug_port: Option<u16>,
    /// 是否无头模式
    pub headless: bool,
    /// 浏览器可执行文件路径（为空时自动查找）
    pub chrome_executable: Option<String>,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            debug_port: None,
            headless: true,
            chrome_executable: None,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 管理后台根地址
    pub admin_base_url: String,
    // --- 管理后台页面路径 ---
    pub login_path: String,
    pub review_config_add_path: String,
    pub assessment_list_path: String,
    pub unit_list_path: String,
    pub exam_list_path: String,
    /// 浏览器选项
    pub browser: BrowserOptions,
    /// 单个元素的等待时间（秒）
    pub element_timeout_secs: u64,
    /// 登录标记的等待时间（秒）
    pub login_timeout_secs: u64,
    /// 元素 stale 时的最大尝试次数
    pub max_attempts: usize,
    /// 两次尝试之间的等待时间（毫秒）
    pub retry_backoff_ms: u64,
    /// 搜索时使用的 ID 前缀长度
    pub search_prefix_len: usize,
    /// 评审配置的触发方式
    pub review_trigger_mode: String,
    /// 列表出现多条匹配时的处理策略
    pub ambiguity_policy: AmbiguityPolicy,
    /// 结果报告文件
    pub report_file: String,
    /// 输入文件（每行: 评估ID, 完成时间）
    pub input_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            admin_base_url: "https://nxtwave-assessments-backend-topin-prod-apis.ccbp.in"
                .to_string(),
            login_path: "/admin/".to_string(),
            review_config_add_path: "/admin/nw_assessments_core/orgassessreviewconfig/add/"
                .to_string(),
            assessment_list_path: "/admin/nw_assessments_core/orgassessment/".to_string(),
            unit_list_path: "/admin/nw_assessments_core/orgassessmentunit/".to_string(),
            exam_list_path: "/admin/nw_assessments_core/orgassessmentunitexam/".to_string(),
            browser: BrowserOptions::default(),
            element_timeout_secs: 10,
            login_timeout_secs: 20,
            max_attempts: 5,
            retry_backoff_ms: 1000,
            search_prefix_len: 8,
            review_trigger_mode: "AFTER_DURATION".to_string(),
            ambiguity_policy: AmbiguityPolicy::FirstRow,
            report_file: "review_report.json".to_string(),
            input_file: "assessments.txt".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从环境变量加载配置，缺省时使用默认值
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载配置（文件中缺省的字段使用默认值），再应用环境变量覆盖
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", path.display()))?;
        let config = config.with_env_overrides();
        config
            .validate()
            .with_context(|| format!("配置文件无效: {}", path.display()))?;
        Ok(config)
    }

    /// 检查会让运行误操作或必然失败的取值
    ///
    /// - 前缀长度为 0 时 `?q=` 为空，列表会返回所有记录
    /// - 尝试次数为 0 时每次元素访问都直接失败
    pub fn validate(&self) -> Result<()> {
        if self.search_prefix_len == 0 {
            bail!("search_prefix_len 必须至少为 1");
        }
        if self.max_attempts == 0 {
            bail!("max_attempts 必须至少为 1");
        }
        let base = Url::parse(&self.admin_base_url)
            .with_context(|| format!("admin_base_url 不是合法的 URL: {}", self.admin_base_url))?;
        if !matches!(base.scheme(), "http" | "https") {
            bail!("admin_base_url 必须使用 http 或 https: {}", self.admin_base_url);
        }
        Ok(())
    }

    fn with_env_overrides(self) -> Self {
        let d = self;
        Self {
            admin_base_url: env_or("ADMIN_BASE_URL", d.admin_base_url),
            login_path: env_or("LOGIN_PATH", d.login_path),
            review_config_add_path: env_or("REVIEW_CONFIG_ADD_PATH", d.review_config_add_path),
            assessment_list_path: env_or("ASSESSMENT_LIST_PATH", d.assessment_list_path),
            unit_list_path: env_or("UNIT_LIST_PATH", d.unit_list_path),
            exam_list_path: env_or("EXAM_LIST_PATH", d.exam_list_path),
            browser: BrowserOptions {
                debug_port: std::env::var("BROWSER_DEBUG_PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .or(d.browser.debug_port),
                headless: parse_env("HEADLESS", d.browser.headless),
                chrome_executable: std::env::var("CHROME_EXECUTABLE")
                    .ok()
                    .or(d.browser.chrome_executable),
                window_width: d.browser.window_width,
                window_height: d.browser.window_height,
            },
            element_timeout_secs: parse_env("ELEMENT_TIMEOUT_SECS", d.element_timeout_secs),
            login_timeout_secs: parse_env("LOGIN_TIMEOUT_SECS", d.login_timeout_secs),
            max_attempts: parse_env("MAX_ATTEMPTS", d.max_attempts),
            retry_backoff_ms: parse_env("RETRY_BACKOFF_MS", d.retry_backoff_ms),
            search_prefix_len: parse_env("SEARCH_PREFIX_LEN", d.search_prefix_len),
            review_trigger_mode: env_or("REVIEW_TRIGGER_MODE", d.review_trigger_mode),
            ambiguity_policy: parse_env("AMBIGUITY_POLICY", d.ambiguity_policy),
            report_file: env_or("REPORT_FILE", d.report_file),
            input_file: env_or("INPUT_FILE", d.input_file),
            verbose_logging: parse_env("VERBOSE_LOGGING", d.verbose_logging),
        }
    }

    /// 拼接管理后台的完整 URL
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.admin_base_url.trim_end_matches('/'), path)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// 登录凭据
///
/// 只在一次运行期间保存在内存中，不会写入磁盘或日志
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
