//! 登录服务 - 业务能力层
//!
//! 每次运行登录一次。任何失败都是致命的，不重试（凭据错误不是瞬时问题）。

use std::time::Duration;

use tracing::{debug, info};

use crate::config::{Config, Credentials};
use crate::error::{AutomationError, AutomationResult};
use crate::infrastructure::{Locator, Lookup, Readiness, UiDriver};
use crate::services::admin_layout::LoginLayout;

/// 登录服务
pub struct LoginService {
    login_url: String,
    timeout: Duration,
    layout: LoginLayout,
}

impl LoginService {
    pub fn new(config: &Config, layout: LoginLayout) -> Self {
        Self {
            login_url: config.url(&config.login_path),
            timeout: config.login_timeout(),
            layout,
        }
    }

    /// 打开登录页、提交凭据，并等待登录后才出现的标记
    pub async fn login<D: UiDriver>(
        &self,
        driver: &D,
        credentials: &Credentials,
    ) -> AutomationResult<()> {
        info!("🔐 正在打开登录页...");
        self.submit_credentials(driver, credentials)
            .await
            .map_err(|e| match e {
                AutomationError::Login(_) => e,
                other => AutomationError::Login(other.to_string()),
            })?;
        info!("✅ 登录成功");
        Ok(())
    }

    async fn submit_credentials<D: UiDriver>(
        &self,
        driver: &D,
        credentials: &Credentials,
    ) -> AutomationResult<()> {
        driver.navigate(&self.login_url).await?;

        let username = self.wait_for(driver, &self.layout.username).await?;
        expect_done(
            driver.send_keys(&username, &credentials.username).await?,
            &self.layout.username,
        )?;

        let password = self.require_now(driver, &self.layout.password).await?;
        expect_done(
            driver.send_keys(&password, &credentials.password).await?,
            &self.layout.password,
        )?;

        let submit = self.require_now(driver, &self.layout.submit).await?;
        expect_done(driver.click(&submit).await?, &self.layout.submit)?;
        debug!("凭据已提交，等待登录标记");

        self.wait_for(driver, &self.layout.logged_in_marker)
            .await
            .map_err(|_| {
                AutomationError::Login(format!(
                    "{:?} 内未出现登录标记 {}",
                    self.timeout, self.layout.logged_in_marker
                ))
            })?;
        Ok(())
    }

    async fn wait_for<D: UiDriver>(
        &self,
        driver: &D,
        locator: &Locator,
    ) -> AutomationResult<D::Element> {
        driver
            .wait_until(locator, Readiness::Present, self.timeout)
            .await?
            .found()
            .ok_or_else(|| AutomationError::ElementTimeout {
                locator: locator.clone(),
            })
    }

    async fn require_now<D: UiDriver>(
        &self,
        driver: &D,
        locator: &Locator,
    ) -> AutomationResult<D::Element> {
        driver
            .find(locator)
            .await?
            .found()
            .ok_or_else(|| AutomationError::Login(format!("登录页缺少元素 {}", locator)))
    }
}

fn expect_done(lookup: Lookup<()>, locator: &Locator) -> AutomationResult<()> {
    lookup
        .found()
        .ok_or_else(|| AutomationError::Login(format!("登录页元素 {} 已失效", locator)))
}
