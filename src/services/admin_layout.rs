//! 管理后台页面结构
//!
//! 集中定义各页面用到的选择器。后台是标准的 Django admin：
//! 登录表单、带 select2 下拉框的新增表单、带搜索的列表页。

use crate::infrastructure::Locator;

/// 登录页选择器
#[derive(Debug, Clone)]
pub struct LoginLayout {
    pub username: Locator,
    pub password: Locator,
    pub submit: Locator,
    /// 登录成功后才会出现的元素
    pub logged_in_marker: Locator,
}

impl Default for LoginLayout {
    fn default() -> Self {
        Self {
            username: Locator::id("id_username"),
            password: Locator::id("id_password"),
            submit: Locator::css(r#"input[type="submit"]"#),
            logged_in_marker: Locator::id("user-tools"),
        }
    }
}

/// 评审配置新增表单选择器
#[derive(Debug, Clone)]
pub struct ReviewConfigLayout {
    /// 打开评估下拉框
    pub picker_open: Locator,
    /// 下拉框中的搜索输入框
    pub picker_search: Locator,
    /// 下拉框中的候选项
    pub picker_options: Locator,
    /// 评审触发方式
    pub trigger_mode: Locator,
    /// 评审延迟（秒）
    pub delay_seconds: Locator,
}

impl Default for ReviewConfigLayout {
    fn default() -> Self {
        Self {
            picker_open: Locator::id("select2-id_assessment-container"),
            picker_search: Locator::css(".select2-container--open .select2-search__field"),
            picker_options: Locator::css(".select2-results__option"),
            trigger_mode: Locator::id("id_review_trigger_type"),
            delay_seconds: Locator::id("id_review_delay_in_seconds"),
        }
    }
}

/// 考试记录编辑页选择器
#[derive(Debug, Clone)]
pub struct ExamRecordLayout {
    /// 开启评审的开关
    pub review_toggle: Locator,
}

impl Default for ExamRecordLayout {
    fn default() -> Self {
        Self {
            review_toggle: Locator::id("id_is_review_enabled"),
        }
    }
}

/// 所有页面共用的选择器
#[derive(Debug, Clone)]
pub struct CommonLayout {
    /// 列表页容器（页面加载完成的标志）
    pub changelist: Locator,
    /// 列表页每行的主键链接
    pub result_links: Locator,
    /// 表单保存按钮
    pub save_button: Locator,
    /// 保存成功提示
    pub success_banner: Locator,
}

impl Default for CommonLayout {
    fn default() -> Self {
        Self {
            changelist: Locator::id("changelist"),
            result_links: Locator::css("#result_list tbody tr th a"),
            save_button: Locator::css(r#"input[name="_save"]"#),
            success_banner: Locator::css("ul.messagelist li.success"),
        }
    }
}

/// 管理后台页面结构
#[derive(Debug, Clone, Default)]
pub struct AdminLayout {
    pub login: LoginLayout,
    pub review_config: ReviewConfigLayout,
    pub exam_record: ExamRecordLayout,
    pub common: CommonLayout,
}
