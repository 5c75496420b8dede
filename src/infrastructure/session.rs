//! 浏览器会话 - 基础设施层
//!
//! 持有唯一的驱动资源。会话在运行开始时创建、运行结束时关闭，
//! 不会在运行之间或条目之间共享。

use tracing::{debug, error, warn};

use crate::error::{AutomationError, AutomationResult};
use crate::infrastructure::driver::UiDriver;

/// 浏览器会话
///
/// 职责：
/// - 独占持有驱动
/// - `close()` 只释放一次驱动
/// - 如果某条路径忘记调用 `close()`，`Drop` 会记录警告，
///   驱动随自身的 `Drop` 一起释放
pub struct Session<D: UiDriver> {
    driver: Option<D>,
}

impl<D: UiDriver> Session<D> {
    /// 用已启动的驱动创建会话
    pub fn open(driver: D) -> Self {
        debug!("会话已创建");
        Self {
            driver: Some(driver),
        }
    }

    /// 获取驱动引用
    pub fn driver(&self) -> AutomationResult<&D> {
        self.driver
            .as_ref()
            .ok_or_else(|| AutomationError::Driver("会话已关闭".to_string()))
    }

    /// 关闭会话并释放驱动
    pub async fn close(mut self) -> AutomationResult<()> {
        match self.driver.take() {
            Some(mut driver) => {
                debug!("正在关闭会话...");
                driver.quit().await.map_err(|e| {
                    error!("关闭浏览器失败: {}", e);
                    e
                })
            }
            None => Ok(()),
        }
    }
}

impl<D: UiDriver> Drop for Session<D> {
    fn drop(&mut self) {
        if self.driver.is_some() {
            warn!("⚠️ 会话未显式关闭，随 Drop 释放驱动");
        }
    }
}
