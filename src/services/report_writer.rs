//! 结果报告 - 业务能力层
//!
//! 接收按顺序到达的进度更新和最终的结果列表，只负责展示和落盘。

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::models::RunReport;
use crate::utils::logging::truncate_text;

/// 报告接收方
pub trait Reporter {
    /// 每个条目结束后调用一次，`done` 从 1 递增到 `total`
    fn on_progress(&self, done: usize, total: usize);

    /// 所有条目结束后调用一次
    fn on_finish(&self, report: &RunReport) -> Result<()>;
}

/// 控制台报告：进度日志 + 汇总表格
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn on_progress(&self, done: usize, total: usize) {
        let percent = if total == 0 {
            100.0
        } else {
            done as f64 * 100.0 / total as f64
        };
        info!("📈 进度: {}/{} ({:.0}%)", done, total, percent);
    }

    fn on_finish(&self, report: &RunReport) -> Result<()> {
        info!("\n📊 Summary");
        for line in render_table(report).lines() {
            info!("{}", line);
        }
        Ok(())
    }
}

/// 把结果写成 JSON 文件
pub struct JsonReportWriter {
    path: PathBuf,
}

impl JsonReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Reporter for JsonReportWriter {
    fn on_progress(&self, _done: usize, _total: usize) {}

    fn on_finish(&self, report: &RunReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        fs::write(&self.path, json)
            .with_context(|| format!("无法写入报告文件: {}", self.path.display()))?;
        info!("报告已保存至: {}", self.path.display());
        Ok(())
    }
}

/// 依次转发给多个报告接收方
#[derive(Default)]
pub struct MultiReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl MultiReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }
}

impl Reporter for MultiReporter {
    fn on_progress(&self, done: usize, total: usize) {
        for reporter in &self.reporters {
            reporter.on_progress(done, total);
        }
    }

    fn on_finish(&self, report: &RunReport) -> Result<()> {
        for reporter in &self.reporters {
            reporter.on_finish(report)?;
        }
        Ok(())
    }
}

/// 渲染 `{ID, Status, Details}` 表格
pub fn render_table(report: &RunReport) -> String {
    const DETAILS_WIDTH: usize = 120;

    let rows: Vec<(String, String, String)> = report
        .results
        .iter()
        .map(|r| {
            (
                r.id.clone(),
                r.status.to_string(),
                truncate_text(&r.details_text(), DETAILS_WIDTH),
            )
        })
        .collect();

    let id_width = rows
        .iter()
        .map(|(id, _, _)| id.chars().count())
        .chain(std::iter::once(2))
        .max()
        .unwrap_or(2);
    let status_width = 7;

    let mut out = format!(
        "{:<4} {:<id_width$} {:<status_width$} Details\n",
        "#", "ID", "Status"
    );
    out.push_str(&format!(
        "{}\n",
        "─".repeat(4 + 1 + id_width + 1 + status_width + 1 + 7)
    ));
    for (i, (id, status, details)) in rows.iter().enumerate() {
        out.push_str(&format!(
            "{:<4} {:<id_width$} {:<status_width$} {}\n",
            i + 1,
            id,
            status,
            details
        ));
    }
    out.push_str(&format!(
        "Success: {}/{}  Failed: {}\n",
        report.success_count(),
        report.len(),
        report.failed_count()
    ));
    out
}
