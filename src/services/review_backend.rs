//! 评审开启能力接口
//!
//! 流程层只依赖这四个阶段操作，不关心它们是如何在后台页面上完成的。

use async_trait::async_trait;

use crate::error::AutomationResult;

/// 列表页中选出的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPick {
    /// 选中行的文本
    pub value: String,
    /// 匹配的行数（大于 1 表示存在歧义）
    pub candidates: usize,
}

/// 开关的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleChange {
    /// 原来关闭，已开启
    Enabled,
    /// 原来就是开启状态，未点击
    AlreadyEnabled,
}

/// 阶段 4 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitToggle {
    pub change: ToggleChange,
    /// 考试列表中匹配的行数（大于 1 时打开的是第一行）
    pub candidates: usize,
}

/// 评审开启的四个阶段
#[async_trait]
pub trait ReviewBackend: Send + Sync {
    /// 阶段 1：为评估创建评审配置
    async fn create_review_config(&self, assessment_id: &str, delay_secs: u64)
        -> AutomationResult<()>;

    /// 阶段 2：按前缀搜索，得到后台认可的评估ID
    async fn resolve_assessment_id(&self, assessment_id: &str) -> AutomationResult<RowPick>;

    /// 阶段 3：按前缀搜索，得到所有依赖的单元ID（可能为空）
    async fn resolve_unit_ids(&self, resolved_id: &str) -> AutomationResult<Vec<String>>;

    /// 阶段 4：打开单元对应的考试记录并开启评审
    async fn enable_unit_review(&self, unit_id: &str) -> AutomationResult<UnitToggle>;
}
