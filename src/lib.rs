//! # Assessment Review Enabler
//!
//! 通过浏览器自动化，在管理后台为一批评估批量开启"评审"
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（浏览器驱动），只暴露能力
//! - `UiDriver` - 驱动能力抽象（查找、等待、点击、输入）
//! - `Session` - 唯一的驱动 owner，保证只关闭一次
//! - `browser/` - 基于 chromiumoxide 的驱动实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个评估
//! - `ElementAccess` - 带 stale 重试的元素访问
//! - `LoginService` - 登录能力
//! - `AdminConsole` - 评审开启的四个阶段（实现 `ReviewBackend`）
//! - `Reporter` - 汇总表格、JSON 报告
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个评估"的完整处理流程
//! - `ItemCtx` - 上下文封装（条目序号 + 总数）
//! - `ReviewFlow` - 流程编排（配置 → 评估ID → 单元ID → 开启评审）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 运行生命周期、会话管理
//! - `orchestrator/item_processor` - 单个条目处理、结果登记
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{ChromeDriver, ChromeLauncher};
pub use config::{Config, Credentials};
pub use error::{AutomationError, AutomationResult, LineError, Severity};
pub use infrastructure::{DriverLauncher, Locator, Lookup, Session, UiDriver};
pub use models::{ItemResult, ItemStatus, RunReport, WorkItem};
pub use orchestrator::App;
pub use workflow::{ItemCtx, ReviewFlow};
