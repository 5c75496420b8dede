//! 条目处理上下文
//!
//! 封装"我正在处理第几行、共几行"这一信息

use std::fmt::Display;

/// 条目处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 行号（从 1 开始）
    pub index: usize,

    /// 非空行总数
    pub total: usize,
}

impl ItemCtx {
    pub fn new(index: usize, total: usize) -> Self {
        Self { index, total }
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[条目 {}/{}]", self.index, self.total)
    }
}
