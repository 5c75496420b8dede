//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一次运行的完整生命周期。
//!
//! ## 核心功能
//!
//! 1. **输入解析**：把输入文本切分为按顺序编号的行
//! 2. **资源管理**：启动浏览器、创建会话，任何路径下都只关闭一次
//! 3. **登录**：每次运行登录一次，失败即终止运行
//! 4. **逐条处理**：严格按输入顺序串行处理，条目失败不影响后续条目
//! 5. **结果汇总**：交给 `Reporter` 展示和落盘
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个条目的细节
//! - **资源所有者**：唯一持有 `Session` 的模块
//! - **向下委托**：委托 item_processor 处理单个条目

use anyhow::Result;
use tracing::{error, info, warn};

use crate::config::{Config, Credentials};
use crate::error::{AutomationError, Severity};
use crate::infrastructure::{DriverLauncher, Session};
use crate::models::{parse_batch, InputLine, RunReport};
use crate::orchestrator::item_processor::{process_line, ItemRecorder};
use crate::services::{AdminConsole, AdminLayout, LoginService, Reporter};
use crate::utils::logging::{log_item_start, log_items_loaded, print_final_stats};
use crate::workflow::{ItemCtx, ReviewFlow};

/// 应用主结构
pub struct App<L: DriverLauncher> {
    config: Config,
    launcher: L,
    layout: AdminLayout,
    flow: ReviewFlow,
}

impl<L: DriverLauncher> App<L> {
    pub fn new(config: Config, launcher: L) -> Self {
        Self {
            config,
            launcher,
            layout: AdminLayout::default(),
            flow: ReviewFlow::new(),
        }
    }

    /// 替换页面选择器
    pub fn with_layout(mut self, layout: AdminLayout) -> Self {
        self.layout = layout;
        self
    }

    /// 替换流程（例如固定时钟）
    pub fn with_flow(mut self, flow: ReviewFlow) -> Self {
        self.flow = flow;
        self
    }

    /// 运行一次批处理
    ///
    /// 返回的报告与输入的非空行一一对应、顺序一致。
    /// 只有浏览器启动失败和登录失败会返回错误。
    pub async fn run(
        &self,
        credentials: &Credentials,
        input: &str,
        reporter: &dyn Reporter,
    ) -> Result<RunReport> {
        if !credentials.is_complete() {
            anyhow::bail!("Username and password required.");
        }
        self.config.validate()?;

        let lines = parse_batch(input);
        if lines.is_empty() {
            warn!("⚠️ No data to process.");
            return Ok(RunReport::default());
        }
        let malformed = lines.iter().filter(|l| l.parsed.is_err()).count();
        log_items_loaded(lines.len(), malformed);

        // 启动浏览器
        info!("🌐 正在启动浏览器...");
        let driver = self
            .launcher
            .launch()
            .await
            .map_err(|e| log_abort(AutomationError::BrowserStartup(format!("{:#}", e)).into()))?;
        let session = Session::open(driver);

        let outcome = self.drive(&session, credentials, &lines, reporter).await;

        // 无论成功与否，只关闭一次
        if let Err(e) = session.close().await {
            warn!("⚠️ 浏览器未能正常关闭: {}", e);
        }
        let report = outcome.map_err(log_abort)?;

        reporter.on_finish(&report)?;
        print_final_stats(report.success_count(), report.failed_count(), report.len());
        Ok(report)
    }

    async fn drive(
        &self,
        session: &Session<L::Driver>,
        credentials: &Credentials,
        lines: &[InputLine],
        reporter: &dyn Reporter,
    ) -> Result<RunReport> {
        let driver = session.driver()?;

        LoginService::new(&self.config, self.layout.login.clone())
            .login(driver, credentials)
            .await?;

        let console = AdminConsole::new(driver, &self.config, self.layout.clone());
        let total = lines.len();
        let mut report = RunReport::default();

        for line in lines {
            log_item_start(line.index, total);
            let ctx = ItemCtx::new(line.index, total);
            let mut recorder = ItemRecorder::begin(&mut report, reporter, line.index, total);
            process_line(&self.flow, &console, line, &ctx, recorder.result()).await;
        }

        Ok(report)
    }
}

/// 错误是否属于终止整次运行的致命错误（启动失败、登录失败）
fn is_fatal(err: &anyhow::Error) -> bool {
    err.downcast_ref::<AutomationError>()
        .map(AutomationError::severity)
        == Some(Severity::Fatal)
}

/// 按严重程度记录终止运行的错误
fn log_abort(err: anyhow::Error) -> anyhow::Error {
    if is_fatal(&err) {
        error!("❌ 致命错误，运行终止: {:#}", err);
    } else {
        error!("❌ 运行意外终止: {:#}", err);
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_startup_and_login_errors_are_fatal() {
        assert!(is_fatal(&AutomationError::Login("bad password".into()).into()));
        assert!(is_fatal(&AutomationError::BrowserStartup("no chrome".into()).into()));
        assert!(!is_fatal(&AutomationError::Driver("connection reset".into()).into()));
        assert!(!is_fatal(&anyhow::anyhow!("session already closed")));
    }
}
