//! 测试用的假管理后台
//!
//! `FakeDriver` 按当前 URL 模拟 Django admin 的几个页面，所有状态放在
//! `Arc<Mutex<SiteState>>` 中，驱动被会话拿走之后测试仍能检查状态。

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assessment_review_enabler::config::Config;
use assessment_review_enabler::error::{AutomationError, AutomationResult};
use assessment_review_enabler::infrastructure::{
    poll_until, DriverLauncher, Locator, Lookup, Readiness, UiDriver,
};
use assessment_review_enabler::services::AdminLayout;
use async_trait::async_trait;
use reqwest::Url;

pub const BASE_URL: &str = "https://admin.test";

/// 假驱动的轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// 测试配置：不等待、不退避
pub fn test_config() -> Config {
    Config {
        admin_base_url: BASE_URL.to_string(),
        element_timeout_secs: 0,
        login_timeout_secs: 0,
        retry_backoff_ms: 0,
        ..Default::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Blank,
    Login,
    Home,
    ReviewConfigAdd,
    AssessmentList(String),
    UnitList(String),
    ExamList(String),
    ExamRecord(String),
}

/// 一次成功保存的评审配置
#[derive(Debug, Clone, PartialEq)]
pub struct SavedConfig {
    pub assessment: String,
    pub trigger: String,
    pub delay: String,
}

#[derive(Default)]
struct ConfigForm {
    picker_open: bool,
    typed: String,
    selected: Option<String>,
    trigger: String,
    delay: String,
}

pub struct SiteState {
    layout: AdminLayout,
    config: Config,
    page: Page,
    form: ConfigForm,
    banner: bool,

    // 后台数据
    pub accept_login: bool,
    pub assessments: Vec<String>,
    /// (评估ID, 单元ID)
    pub units: Vec<(String, String)>,
    /// 单元ID → 评审开关
    pub review_enabled: HashMap<String, bool>,
    /// 保存时不出现成功提示的单元
    pub silent_save_units: Vec<String>,

    // 注入的 stale 次数（元素操作）
    stale: HashMap<Locator, usize>,
    // 注入的 stale 次数（定位）
    stale_lookups: HashMap<Locator, usize>,
    // 元素出现之前要经过的定位次数
    hidden_for: HashMap<Locator, usize>,

    // 记录
    pub navigations: Vec<String>,
    pub toggle_clicks: Vec<String>,
    pub saved_configs: Vec<SavedConfig>,
    pub saved_exams: Vec<String>,
    pub stale_served: usize,
    /// 每个 locator 被定位的次数
    pub lookups: HashMap<Locator, usize>,
    pub quits: usize,
}

impl SiteState {
    fn new(config: Config) -> Self {
        Self {
            layout: AdminLayout::default(),
            config,
            page: Page::Blank,
            form: ConfigForm::default(),
            banner: false,
            accept_login: true,
            assessments: Vec::new(),
            units: Vec::new(),
            review_enabled: HashMap::new(),
            silent_save_units: Vec::new(),
            stale: HashMap::new(),
            stale_lookups: HashMap::new(),
            hidden_for: HashMap::new(),
            navigations: Vec::new(),
            toggle_clicks: Vec::new(),
            saved_configs: Vec::new(),
            saved_exams: Vec::new(),
            stale_served: 0,
            lookups: HashMap::new(),
            quits: 0,
        }
    }

    fn route(&self, url: &str) -> Page {
        let Ok(parsed) = Url::parse(url) else {
            return Page::Blank;
        };
        let q = parsed
            .query_pairs()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        let path = parsed.path();
        let c = &self.config;
        if path == c.login_path {
            Page::Login
        } else if path == c.review_config_add_path {
            Page::ReviewConfigAdd
        } else if path == c.assessment_list_path {
            Page::AssessmentList(q)
        } else if path == c.unit_list_path {
            Page::UnitList(q)
        } else if path == c.exam_list_path {
            Page::ExamList(q)
        } else {
            Page::Blank
        }
    }

    /// 当前页面上与 locator 匹配的元素数量
    fn count(&self, locator: &Locator) -> usize {
        let l = &self.layout;
        let present = |cond: bool| usize::from(cond);
        match &self.page {
            Page::Login => present(
                *locator == l.login.username
                    || *locator == l.login.password
                    || *locator == l.login.submit,
            ),
            Page::Home => present(*locator == l.login.logged_in_marker),
            Page::ReviewConfigAdd => {
                let r = &l.review_config;
                if *locator == r.picker_options {
                    self.picker_options().len()
                } else if *locator == r.picker_search {
                    present(self.form.picker_open)
                } else if *locator == l.common.success_banner {
                    present(self.banner)
                } else {
                    present(
                        *locator == r.picker_open
                            || *locator == r.trigger_mode
                            || *locator == r.delay_seconds
                            || *locator == l.common.save_button,
                    )
                }
            }
            Page::AssessmentList(_) | Page::UnitList(_) | Page::ExamList(_) => {
                if *locator == l.common.result_links {
                    self.list_rows().len()
                } else {
                    present(*locator == l.common.changelist)
                }
            }
            Page::ExamRecord(_) => {
                if *locator == l.common.success_banner {
                    present(self.banner)
                } else {
                    present(
                        *locator == l.exam_record.review_toggle
                            || *locator == l.common.save_button,
                    )
                }
            }
            Page::Blank => 0,
        }
    }

    fn picker_options(&self) -> Vec<String> {
        if self.form.typed.is_empty() {
            return Vec::new();
        }
        self.assessments
            .iter()
            .filter(|a| a.starts_with(&self.form.typed))
            .cloned()
            .collect()
    }

    fn list_rows(&self) -> Vec<String> {
        match &self.page {
            Page::AssessmentList(q) => self
                .assessments
                .iter()
                .filter(|a| a.starts_with(q.as_str()))
                .cloned()
                .collect(),
            Page::UnitList(q) => self
                .units
                .iter()
                .filter(|(a, _)| a.starts_with(q.as_str()))
                .map(|(_, u)| u.clone())
                .collect(),
            Page::ExamList(q) => {
                let mut rows: Vec<String> = self
                    .review_enabled
                    .keys()
                    .filter(|u| u.starts_with(q.as_str()))
                    .cloned()
                    .collect();
                rows.sort();
                rows
            }
            _ => Vec::new(),
        }
    }

    fn take_stale(&mut self, locator: &Locator) -> bool {
        if take_one(&mut self.stale, locator) {
            self.stale_served += 1;
            true
        } else {
            false
        }
    }

    /// 一次定位：先记数，再按注入的状态决定结果
    fn lookup(&mut self, locator: &Locator) -> Lookup<usize> {
        *self.lookups.entry(locator.clone()).or_default() += 1;
        if take_one(&mut self.stale_lookups, locator) {
            self.stale_served += 1;
            return Lookup::Stale;
        }
        if take_one(&mut self.hidden_for, locator) {
            return Lookup::Found(0);
        }
        Lookup::Found(self.count(locator))
    }

    pub fn lookups_of(&self, locator: &Locator) -> usize {
        self.lookups.get(locator).copied().unwrap_or(0)
    }

    fn text_of(&self, el: &FakeElement) -> String {
        let l = &self.layout;
        if el.locator == l.common.success_banner {
            "The record was changed successfully.".to_string()
        } else if el.locator == l.review_config.picker_options {
            self.picker_options().get(el.row).cloned().unwrap_or_default()
        } else if el.locator == l.common.result_links {
            self.list_rows().get(el.row).cloned().unwrap_or_default()
        } else {
            String::new()
        }
    }

    fn click(&mut self, el: &FakeElement) {
        let l = self.layout.clone();
        match self.page.clone() {
            Page::Login if el.locator == l.login.submit => {
                if self.accept_login {
                    self.page = Page::Home;
                }
            }
            Page::ReviewConfigAdd => {
                if el.locator == l.review_config.picker_open {
                    self.form.picker_open = true;
                } else if el.locator == l.review_config.picker_options {
                    self.form.selected = self.picker_options().get(el.row).cloned();
                    self.form.picker_open = false;
                } else if el.locator == l.common.save_button {
                    if let Some(assessment) = self.form.selected.clone() {
                        self.saved_configs.push(SavedConfig {
                            assessment,
                            trigger: self.form.trigger.clone(),
                            delay: self.form.delay.clone(),
                        });
                        self.banner = true;
                    }
                }
            }
            Page::ExamList(_) if el.locator == l.common.result_links => {
                if let Some(unit) = self.list_rows().get(el.row).cloned() {
                    self.page = Page::ExamRecord(unit);
                    self.banner = false;
                }
            }
            Page::ExamRecord(unit) => {
                if el.locator == l.exam_record.review_toggle {
                    let state = self.review_enabled.entry(unit.clone()).or_default();
                    *state = !*state;
                    self.toggle_clicks.push(unit);
                } else if el.locator == l.common.save_button {
                    if !self.silent_save_units.contains(&unit) {
                        self.banner = true;
                    }
                    self.saved_exams.push(unit);
                }
            }
            _ => {}
        }
    }

    fn type_into(&mut self, el: &FakeElement, text: &str) {
        let r = &self.layout.review_config;
        if el.locator == r.picker_search {
            self.form.typed = text.to_string();
        } else if el.locator == r.trigger_mode {
            self.form.trigger = text.to_string();
        } else if el.locator == r.delay_seconds {
            self.form.delay = text.to_string();
        }
    }

    fn is_selected(&self, el: &FakeElement) -> bool {
        match &self.page {
            Page::ExamRecord(unit) if el.locator == self.layout.exam_record.review_toggle => {
                self.review_enabled.get(unit).copied().unwrap_or(false)
            }
            _ => false,
        }
    }
}

fn take_one(counters: &mut HashMap<Locator, usize>, locator: &Locator) -> bool {
    match counters.get_mut(locator) {
        Some(n) if *n > 0 => {
            *n -= 1;
            true
        }
        _ => false,
    }
}

/// 假后台的句柄（测试侧）
#[derive(Clone)]
pub struct FakeSite {
    state: Arc<Mutex<SiteState>>,
}

impl FakeSite {
    pub fn new(config: &Config) -> Self {
        Self {
            state: Arc::new(Mutex::new(SiteState::new(config.clone()))),
        }
    }

    /// 添加一个评估及其单元，单元评审开关初始为 `enabled`
    pub fn with_assessment(self, id: &str, units: &[(&str, bool)]) -> Self {
        {
            let mut s = self.state.lock().unwrap();
            s.assessments.push(id.to_string());
            for (unit, enabled) in units {
                s.units.push((id.to_string(), unit.to_string()));
                s.review_enabled.insert(unit.to_string(), *enabled);
            }
        }
        self
    }

    pub fn rejecting_login(self) -> Self {
        self.state.lock().unwrap().accept_login = false;
        self
    }

    pub fn without_save_banner_for(self, unit: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .silent_save_units
            .push(unit.to_string());
        self
    }

    /// 接下来 `times` 次对该元素的操作返回 Stale
    pub fn stale(self, locator: Locator, times: usize) -> Self {
        self.state.lock().unwrap().stale.insert(locator, times);
        self
    }

    /// 前 `times` 次定位该元素时返回 Stale（页面仍在跳转）
    pub fn stale_on_lookup(self, locator: Locator, times: usize) -> Self {
        self.state.lock().unwrap().stale_lookups.insert(locator, times);
        self
    }

    /// 前 `polls` 次定位都找不到该元素，之后才出现
    pub fn appearing_after(self, locator: Locator, polls: usize) -> Self {
        self.state.lock().unwrap().hidden_for.insert(locator, polls);
        self
    }

    /// 该元素永远不出现
    pub fn never_showing(self, locator: Locator) -> Self {
        self.appearing_after(locator, usize::MAX)
    }

    pub fn inspect<T>(&self, f: impl FnOnce(&SiteState) -> T) -> T {
        f(&*self.state.lock().unwrap())
    }

    pub fn driver(&self) -> FakeDriver {
        FakeDriver {
            state: self.state.clone(),
        }
    }

    pub fn launcher(&self) -> FakeLauncher {
        FakeLauncher {
            site: self.clone(),
            fail: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    locator: Locator,
    row: usize,
}

pub struct FakeDriver {
    state: Arc<Mutex<SiteState>>,
}

impl FakeDriver {
    fn elements(&self, locator: &Locator) -> Lookup<Vec<FakeElement>> {
        let found = self.state.lock().unwrap().lookup(locator);
        found.map(|n| {
            (0..n)
                .map(|row| FakeElement {
                    locator: locator.clone(),
                    row,
                })
                .collect()
        })
    }

    fn with_element<T>(
        &self,
        el: &FakeElement,
        f: impl FnOnce(&mut SiteState) -> T,
    ) -> Lookup<T> {
        let mut s = self.state.lock().unwrap();
        if s.take_stale(&el.locator) {
            return Lookup::Stale;
        }
        if s.count(&el.locator) <= el.row {
            return Lookup::Stale;
        }
        Lookup::Found(f(&mut *s))
    }
}

#[async_trait]
impl UiDriver for FakeDriver {
    type Element = FakeElement;

    async fn navigate(&self, url: &str) -> AutomationResult<()> {
        let mut s = self.state.lock().unwrap();
        s.navigations.push(url.to_string());
        s.page = s.route(url);
        s.banner = false;
        if s.page == Page::ReviewConfigAdd {
            s.form = ConfigForm::default();
        }
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> AutomationResult<Lookup<FakeElement>> {
        Ok(match self.elements(locator) {
            Lookup::Found(elements) => elements
                .into_iter()
                .next()
                .map_or(Lookup::NotFound, Lookup::Found),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Stale => Lookup::Stale,
        })
    }

    async fn find_all(&self, locator: &Locator) -> AutomationResult<Lookup<Vec<FakeElement>>> {
        Ok(self.elements(locator))
    }

    async fn wait_until(
        &self,
        locator: &Locator,
        _readiness: Readiness,
        timeout: Duration,
    ) -> AutomationResult<Lookup<FakeElement>> {
        poll_until(timeout, POLL_INTERVAL, || self.find(locator)).await
    }

    async fn text(&self, element: &FakeElement) -> AutomationResult<Lookup<String>> {
        Ok(self.with_element(element, |s| s.text_of(element)))
    }

    async fn click(&self, element: &FakeElement) -> AutomationResult<Lookup<()>> {
        Ok(self.with_element(element, |s| s.click(element)))
    }

    async fn send_keys(&self, element: &FakeElement, text: &str) -> AutomationResult<Lookup<()>> {
        Ok(self.with_element(element, |s| s.type_into(element, text)))
    }

    async fn is_selected(&self, element: &FakeElement) -> AutomationResult<Lookup<bool>> {
        Ok(self.with_element(element, |s| s.is_selected(element)))
    }

    async fn quit(&mut self) -> AutomationResult<()> {
        self.state.lock().unwrap().quits += 1;
        Ok(())
    }
}

pub struct FakeLauncher {
    site: FakeSite,
    fail: bool,
}

impl FakeLauncher {
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl DriverLauncher for FakeLauncher {
    type Driver = FakeDriver;

    async fn launch(&self) -> anyhow::Result<FakeDriver> {
        if self.fail {
            anyhow::bail!("chrome executable not found");
        }
        Ok(self.site.driver())
    }
}

/// 判断错误是否为某个驱动层错误
pub fn automation_error(err: &anyhow::Error) -> Option<&AutomationError> {
    err.downcast_ref::<AutomationError>()
}
