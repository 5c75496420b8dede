//! 输入行解析
//!
//! 每个非空行格式为 `<评估ID>,<完成时间>`，时间支持两种格式：
//! `YYYY-MM-DD HH:MM:SS` 和 `YYYY-MM-DD HH:MM`，按此顺序尝试。

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::error::LineError;

/// 秒级精度格式
pub const SECONDS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// 分钟级精度格式
pub const MINUTES_FORMAT: &str = "%Y-%m-%d %H:%M";

/// 时间戳匹配到的格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    Seconds,
    Minutes,
}

/// 一个待处理的条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// 原始评估ID（不透明字符串，通常是 UUID）
    pub assessment_id: String,
    /// 完成时间（无时区）
    pub completed_at: NaiveDateTime,
    pub timestamp_format: TimestampFormat,
}

impl WorkItem {
    /// 评审延迟（秒）：`max(0, now - 完成时间)`
    pub fn review_delay_secs(&self, now: NaiveDateTime) -> u64 {
        let elapsed = now.signed_duration_since(self.completed_at).num_seconds();
        u64::try_from(elapsed).unwrap_or(0)
    }

    /// ID 是否符合 UUID 形状（不符合也照常处理，只记录提示）
    pub fn is_uuid_shaped(&self) -> bool {
        uuid_pattern().is_some_and(|re| re.is_match(&self.assessment_id))
    }
}

/// 输入中的一行（已去除首尾空白）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLine {
    /// 行号（从 1 开始，只计非空行）
    pub index: usize,
    pub raw: String,
    pub parsed: Result<WorkItem, LineError>,
}

/// 解析整个输入文本
///
/// 空行被忽略；每个非空行都产出一个 `InputLine`，解析失败的行也保留，
/// 以保证结果数量与非空行数量一致。
pub fn parse_batch(blob: &str) -> Vec<InputLine> {
    blob.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| InputLine {
            index: i + 1,
            raw: line.to_string(),
            parsed: parse_line(line),
        })
        .collect()
}

/// 解析单行
pub fn parse_line(line: &str) -> Result<WorkItem, LineError> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() != 2 {
        return Err(LineError::Malformed);
    }

    let assessment_id = parts[0].trim();
    if assessment_id.is_empty() {
        return Err(LineError::Malformed);
    }

    let (completed_at, timestamp_format) = parse_timestamp(parts[1].trim())?;

    Ok(WorkItem {
        assessment_id: assessment_id.to_string(),
        completed_at,
        timestamp_format,
    })
}

/// 依次尝试秒级和分钟级格式
pub fn parse_timestamp(value: &str) -> Result<(NaiveDateTime, TimestampFormat), LineError> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, SECONDS_FORMAT) {
        return Ok((dt, TimestampFormat::Seconds));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, MINUTES_FORMAT) {
        return Ok((dt, TimestampFormat::Minutes));
    }
    Err(LineError::InvalidTimestamp(value.to_string()))
}

/// 取 ID 的前 `len` 个字符作为搜索关键字
pub fn search_prefix(id: &str, len: usize) -> &str {
    match id.char_indices().nth(len) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

fn uuid_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
                .ok()
        })
        .as_ref()
}
