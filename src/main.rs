use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use assessment_review_enabler::services::{ConsoleReporter, JsonReportWriter, MultiReporter};
use assessment_review_enabler::utils::logging;
use assessment_review_enabler::{App, ChromeLauncher, Config, Credentials};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = match std::env::var("CONFIG_FILE") {
        Ok(path) => Config::load(Path::new(&path))?,
        Err(_) => {
            let config = Config::from_env();
            config.validate()?;
            config
        }
    };

    // 初始化日志
    logging::init(config.verbose_logging);
    logging::log_startup(&config);

    let credentials = read_credentials()?;
    if !credentials.is_complete() {
        anyhow::bail!("Username and password required.");
    }

    let input = read_input(std::env::args().nth(1).map(PathBuf::from), &config)?;

    let reporter = MultiReporter::new()
        .with(ConsoleReporter)
        .with(JsonReportWriter::new(&config.report_file));
    let launcher = ChromeLauncher::new(config.browser.clone());

    // 初始化并运行应用
    App::new(config, launcher)
        .run(&credentials, &input, &reporter)
        .await?;

    Ok(())
}

/// 凭据优先读取环境变量，缺省时在终端提示输入
fn read_credentials() -> Result<Credentials> {
    let username = match std::env::var("ADMIN_USERNAME") {
        Ok(v) => v,
        Err(_) => prompt("Username: ")?,
    };
    let password = match std::env::var("ADMIN_PASSWORD") {
        Ok(v) => v,
        Err(_) => prompt("Password: ")?,
    };
    Ok(Credentials::new(username.trim(), password))
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// 输入来源：命令行参数指定的文件 → 配置中的输入文件 → 标准输入
fn read_input(arg: Option<PathBuf>, config: &Config) -> Result<String> {
    if let Some(path) = arg {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("无法读取输入文件: {}", path.display()));
    }

    let default_path = Path::new(&config.input_file);
    if default_path.exists() {
        info!("📁 读取输入文件: {}", default_path.display());
        return std::fs::read_to_string(default_path)
            .with_context(|| format!("无法读取输入文件: {}", default_path.display()));
    }

    info!("请粘贴数据（每行: 评估ID, 完成时间），以 EOF 结束:");
    let mut blob = String::new();
    io::stdin().read_to_string(&mut blob)?;
    Ok(blob)
}
