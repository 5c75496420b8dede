//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量处理器
//! - 管理运行生命周期（解析输入、启动浏览器、登录、关闭）
//! - 严格按输入顺序串行处理条目
//! - 输出全局统计信息
//!
//! ### `item_processor` - 单个条目处理器
//! - 拒绝格式错误的行
//! - 调用 ReviewFlow 处理合法条目
//! - 无论如何结束，都为该行登记恰好一个结果
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<InputLine>)
//!     ↓
//! item_processor (处理单个 InputLine)
//!     ↓
//! workflow::ReviewFlow (四个阶段)
//!     ↓
//! services (能力层：login / admin_console / element_access)
//!     ↓
//! infrastructure (基础设施：UiDriver / Session)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管批量，item_processor 管单个
//! 2. **资源隔离**：只有编排层持有 Session
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **无业务逻辑**：只做调度和统计，不做具体业务判断

pub mod batch_processor;
pub mod item_processor;

// 重新导出主要类型
pub use batch_processor::App;
pub use item_processor::{process_line, ItemRecorder};
