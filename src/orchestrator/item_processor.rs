//! 单个条目处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **结果登记**：`ItemRecorder` 在离开作用域时把结果追加到运行报告，
//!    覆盖正常结束、提前返回、阶段失败等所有路径
//! 2. **行级校验**：格式错误的行在任何网络交互之前直接记为失败
//! 3. **流程调度**：把合法条目交给 `ReviewFlow`，把阶段失败写入明细

use tracing::{error, warn};

use crate::error::LineError;
use crate::models::{InputLine, ItemResult, RunReport};
use crate::services::{Reporter, ReviewBackend};
use crate::workflow::{ItemCtx, ReviewFlow};

/// 条目结果登记器
///
/// 创建时生成一个 Failed 状态的空结果；`Drop` 时把结果追加到报告并上报进度。
/// 因此每个输入行都恰好产出一个结果，且顺序与输入一致。
pub struct ItemRecorder<'r> {
    report: &'r mut RunReport,
    reporter: &'r dyn Reporter,
    total: usize,
    result: ItemResult,
}

impl<'r> ItemRecorder<'r> {
    pub fn begin(
        report: &'r mut RunReport,
        reporter: &'r dyn Reporter,
        index: usize,
        total: usize,
    ) -> Self {
        Self {
            report,
            reporter,
            total,
            result: ItemResult::new(index),
        }
    }

    pub fn result(&mut self) -> &mut ItemResult {
        &mut self.result
    }
}

impl Drop for ItemRecorder<'_> {
    fn drop(&mut self) {
        let index = self.result.index;
        let result = std::mem::replace(&mut self.result, ItemResult::new(index));
        self.report.push(result);
        self.reporter.on_progress(self.report.len(), self.total);
    }
}

/// 处理一个输入行
///
/// 不返回错误：所有条目级失败都写入 `result`，批次继续。
pub async fn process_line<B: ReviewBackend>(
    flow: &ReviewFlow,
    backend: &B,
    line: &InputLine,
    ctx: &ItemCtx,
    result: &mut ItemResult,
) {
    let item = match &line.parsed {
        Ok(item) => item,
        Err(e) => {
            reject_line(line, e, ctx, result);
            return;
        }
    };

    result.id = item.assessment_id.clone();
    if let Err(failure) = flow.run(backend, item, ctx, result).await {
        result.fail(format!("Error: {}", failure));
    }
}

fn reject_line(line: &InputLine, err: &LineError, ctx: &ItemCtx, result: &mut ItemResult) {
    match err {
        LineError::Malformed => {
            warn!("{} ⚠️ 格式错误，跳过: {}", ctx, line.raw);
        }
        LineError::InvalidTimestamp(_) => {
            // 字段数正确，第一个字段就是评估ID
            result.id = line
                .raw
                .split(',')
                .next()
                .map(str::trim)
                .unwrap_or_default()
                .to_string();
            error!("{} ❌ {}", ctx, err);
        }
    }
    result.fail(err.to_string());
}
