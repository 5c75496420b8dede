//! 基础设施层（Infrastructure）
//!
//! 持有稀缺资源（浏览器驱动），只暴露能力。

pub mod driver;
pub mod session;

pub use driver::{poll_until, DriverLauncher, Locator, Lookup, Readiness, UiDriver};
pub use session::Session;
