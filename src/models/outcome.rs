use serde::Serialize;

/// 条目处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemStatus {
    Success,
    Failed,
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Success => write!(f, "Success"),
            ItemStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// 单个条目的处理结果
///
/// 条目开始时创建（默认为 Failed），各阶段向 `details` 追加记录，
/// 无论成功失败都会进入运行报告。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResult {
    /// 行号（从 1 开始）
    pub index: usize,
    /// 评估ID；行格式错误时为空
    pub id: String,
    pub status: ItemStatus,
    pub details: Vec<String>,
}

impl ItemResult {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            id: String::new(),
            status: ItemStatus::Failed,
            details: Vec::new(),
        }
    }

    /// 追加一条明细
    pub fn log(&mut self, detail: impl Into<String>) {
        self.details.push(detail.into());
    }

    pub fn succeed(&mut self) {
        self.status = ItemStatus::Success;
    }

    pub fn fail(&mut self, detail: impl Into<String>) {
        self.status = ItemStatus::Failed;
        self.log(detail);
    }

    pub fn is_success(&self) -> bool {
        self.status == ItemStatus::Success
    }

    /// 明细合并为一行，用于表格展示
    pub fn details_text(&self) -> String {
        self.details.join("; ")
    }
}

/// 一次运行的报告，结果按输入顺序排列
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub results: Vec<ItemResult>,
}

impl RunReport {
    pub fn push(&mut self, result: ItemResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.len() - self.success_count()
    }
}
