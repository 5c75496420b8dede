use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Handler, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::browser::chrome::ChromeDriver;
use crate::config::BrowserOptions;
use crate::infrastructure::DriverLauncher;

/// chromiumoxide 驱动启动器
///
/// - 配置了调试端口时连接到已打开的浏览器（不接管其生命周期）
/// - 否则启动一个新的无头浏览器
pub struct ChromeLauncher {
    options: BrowserOptions,
}

impl ChromeLauncher {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl DriverLauncher for ChromeLauncher {
    type Driver = ChromeDriver;

    async fn launch(&self) -> Result<ChromeDriver> {
        match self.options.debug_port {
            Some(port) => {
                let (browser, page, handler) = connect_to_browser(port).await?;
                ChromeDriver::new(browser, page, handler, false)
            }
            None => {
                let (browser, page, handler) = launch_headless_browser(&self.options).await?;
                ChromeDriver::new(browser, page, handler, true)
            }
        }
    }
}

/// 启动无头浏览器并创建空白页面
pub async fn launch_headless_browser(
    options: &BrowserOptions,
) -> Result<(Browser, Page, JoinHandle<()>)> {
    info!("🚀 启动浏览器...");
    debug!("浏览器选项: {:?}", options);

    let mut builder = BrowserConfig::builder()
        .window_size(options.window_width, options.window_height)
        .args(vec![
            "--no-sandbox",            // 禁用沙盒，防止权限问题导致的崩溃
            "--disable-dev-shm-usage", // 防止共享内存不足
            "--disable-gpu",
        ]);

    if options.headless {
        builder = builder.new_headless_mode();
    } else {
        builder = builder.with_head();
    }

    if let Some(executable) = options.chrome_executable.as_deref() {
        builder = builder.chrome_executable(Path::new(executable));
    }

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        anyhow::anyhow!("配置浏览器失败: {}", e)
    })?;

    let (browser, handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        anyhow::anyhow!("启动浏览器失败: {}", e)
    })?;
    debug!("浏览器启动成功");

    let handler_task = spawn_handler(handler);

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        anyhow::anyhow!("创建页面失败: {}", e)
    })?;

    info!("✅ 浏览器已就绪");
    Ok((browser, page, handler_task))
}

/// 连接到已打开调试端口的浏览器，并创建一个新页面
pub async fn connect_to_browser(port: u16) -> Result<(Browser, Page, JoinHandle<()>)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        anyhow::anyhow!("连接浏览器失败 (端口: {}): {}", port, e)
    })?;
    debug!("浏览器连接成功");

    let handler_task = spawn_handler(handler);

    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建新页面失败: {}", e);
        anyhow::anyhow!("创建新页面失败: {}", e)
    })?;

    Ok((browser, page, handler_task))
}

/// 在后台处理浏览器事件
fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    })
}
