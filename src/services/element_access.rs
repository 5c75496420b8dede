//! 元素访问服务 - 业务能力层
//!
//! 屏蔽异步渲染带来的元素失效（stale）。每个操作都是
//! "等待就绪 → 定位 → 操作" 的完整循环，句柄失效时整轮重试，
//! 最多 `max_attempts` 次，每次之间固定等待 `backoff`。

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AutomationError, AutomationResult};
use crate::infrastructure::{Locator, Lookup, Readiness, UiDriver};

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 单次等待元素就绪的时间
    pub timeout: Duration,
    /// 最大尝试次数
    pub max_attempts: usize,
    /// 两次尝试之间的等待
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.element_timeout(),
            max_attempts: config.max_attempts,
            backoff: config.retry_backoff(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 5,
            backoff: Duration::from_secs(1),
        }
    }
}

/// 单个元素上的操作
#[derive(Debug, Clone, Copy)]
enum Action<'t> {
    ReadText,
    Click,
    Type(&'t str),
    Selected,
}

impl Action<'_> {
    fn readiness(&self) -> Readiness {
        match self {
            Action::Click => Readiness::Clickable,
            _ => Readiness::Present,
        }
    }
}

#[derive(Debug)]
enum ActionOutput {
    Text(String),
    Done,
    Selected(bool),
}

/// 元素访问器
///
/// 职责：
/// - 提供抗 stale 的读文本 / 点击 / 输入
/// - 只借用驱动，不持有
/// - 不认识评估 / 单元 / 考试记录
pub struct ElementAccess<'a, D: UiDriver> {
    driver: &'a D,
    policy: RetryPolicy,
}

impl<'a, D: UiDriver> ElementAccess<'a, D> {
    pub fn new(driver: &'a D, policy: RetryPolicy) -> Self {
        Self { driver, policy }
    }

    /// 读取元素文本
    pub async fn read_text(&self, locator: &Locator) -> AutomationResult<String> {
        match self.run(locator, Action::ReadText).await? {
            ActionOutput::Text(text) => Ok(text),
            other => Err(unexpected(locator, other)),
        }
    }

    /// 以脚本方式点击元素
    pub async fn click(&self, locator: &Locator) -> AutomationResult<()> {
        self.run(locator, Action::Click).await.map(|_| ())
    }

    /// 向元素输入文本
    pub async fn type_into(&self, locator: &Locator, text: &str) -> AutomationResult<()> {
        self.run(locator, Action::Type(text)).await.map(|_| ())
    }

    /// 读取勾选状态
    pub async fn is_selected(&self, locator: &Locator) -> AutomationResult<bool> {
        match self.run(locator, Action::Selected).await? {
            ActionOutput::Selected(selected) => Ok(selected),
            other => Err(unexpected(locator, other)),
        }
    }

    /// 等待容器出现后，读取所有匹配行的文本（可能为空）
    ///
    /// 任意一行在读取过程中失效，整轮重新读取。
    pub async fn read_all_texts(
        &self,
        container: &Locator,
        rows: &Locator,
    ) -> AutomationResult<Vec<String>> {
        let mut attempts = 0;
        while attempts < self.policy.max_attempts {
            match self
                .driver
                .wait_until(container, Readiness::Present, self.policy.timeout)
                .await?
            {
                Lookup::NotFound => {
                    return Err(AutomationError::ElementTimeout {
                        locator: container.clone(),
                    })
                }
                Lookup::Stale => {}
                Lookup::Found(_) => {
                    if let Some(texts) = self.collect_texts(rows).await? {
                        debug!("{} 共 {} 行", rows, texts.len());
                        return Ok(texts);
                    }
                }
            }
            attempts = self.backoff(rows, attempts).await;
        }
        Err(AutomationError::AttemptsExhausted {
            locator: rows.clone(),
            attempts,
        })
    }

    /// 在候选列表中点击文本与 `expected` 完全相同的一项
    ///
    /// 实时搜索的结果可能尚未渲染，没有匹配项时也会重试。
    pub async fn click_matching_text(
        &self,
        options: &Locator,
        expected: &str,
    ) -> AutomationResult<()> {
        let mut attempts = 0;
        let mut saw_options = false;
        while attempts < self.policy.max_attempts {
            if let Lookup::Found(elements) = self.driver.find_all(options).await? {
                saw_options |= !elements.is_empty();
                if self.click_first_match(&elements, expected).await? {
                    return Ok(());
                }
            }
            attempts = self.backoff(options, attempts).await;
        }

        if saw_options {
            Err(AutomationError::SuggestionNotFound {
                expected: expected.to_string(),
            })
        } else {
            Err(AutomationError::AttemptsExhausted {
                locator: options.clone(),
                attempts,
            })
        }
    }

    /// 核心循环：等待就绪 → 操作，stale 时重试
    async fn run(&self, locator: &Locator, action: Action<'_>) -> AutomationResult<ActionOutput> {
        let readiness = action.readiness();
        let mut attempts = 0;

        while attempts < self.policy.max_attempts {
            match self
                .driver
                .wait_until(locator, readiness, self.policy.timeout)
                .await?
            {
                Lookup::Found(element) => {
                    if let Lookup::Found(output) = self.perform(&element, action).await? {
                        return Ok(output);
                    }
                }
                // 存在性等待超时不是瞬时错误，直接上抛；可点击等待超时则重试
                Lookup::NotFound if readiness == Readiness::Present => {
                    return Err(AutomationError::ElementTimeout {
                        locator: locator.clone(),
                    });
                }
                Lookup::NotFound | Lookup::Stale => {}
            }
            attempts = self.backoff(locator, attempts).await;
        }

        Err(AutomationError::AttemptsExhausted {
            locator: locator.clone(),
            attempts,
        })
    }

    async fn perform(
        &self,
        element: &D::Element,
        action: Action<'_>,
    ) -> AutomationResult<Lookup<ActionOutput>> {
        let lookup = match action {
            Action::ReadText => self.driver.text(element).await?.map(ActionOutput::Text),
            Action::Click => self.driver.click(element).await?.map(|_| ActionOutput::Done),
            Action::Type(text) => self
                .driver
                .send_keys(element, text)
                .await?
                .map(|_| ActionOutput::Done),
            Action::Selected => self
                .driver
                .is_selected(element)
                .await?
                .map(ActionOutput::Selected),
        };
        Ok(lookup)
    }

    /// 读取所有行的文本；任意一行失效返回 None
    async fn collect_texts(&self, rows: &Locator) -> AutomationResult<Option<Vec<String>>> {
        let elements = match self.driver.find_all(rows).await? {
            Lookup::Found(elements) => elements,
            _ => return Ok(None),
        };

        let mut texts = Vec::with_capacity(elements.len());
        for element in &elements {
            match self.driver.text(element).await? {
                Lookup::Found(text) => texts.push(text.trim().to_string()),
                _ => return Ok(None),
            }
        }
        Ok(Some(texts))
    }

    /// 点击第一个文本匹配的元素；返回是否已点击
    async fn click_first_match(
        &self,
        elements: &[D::Element],
        expected: &str,
    ) -> AutomationResult<bool> {
        for element in elements {
            match self.driver.text(element).await? {
                Lookup::Found(text) if text.trim() == expected => {
                    return Ok(self.driver.click(element).await?.is_found());
                }
                Lookup::Found(_) => {}
                _ => return Ok(false),
            }
        }
        Ok(false)
    }

    /// 记录一次失败的尝试，未到上限时等待 backoff
    async fn backoff(&self, locator: &Locator, attempts: usize) -> usize {
        let attempts = attempts + 1;
        warn!(
            "元素 {} 不可用，重试 {}/{}...",
            locator, attempts, self.policy.max_attempts
        );
        if attempts < self.policy.max_attempts && !self.policy.backoff.is_zero() {
            sleep(self.policy.backoff).await;
        }
        attempts
    }
}

fn unexpected(locator: &Locator, output: ActionOutput) -> AutomationError {
    AutomationError::Driver(format!("{} 返回了意外的结果: {:?}", locator, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 前 `stale_for` 次操作返回 Stale 的驱动
    struct FlakyDriver {
        present: bool,
        stale_for: usize,
        operations: AtomicUsize,
        clicks: AtomicUsize,
        selected: bool,
    }

    impl FlakyDriver {
        fn new(stale_for: usize) -> Self {
            Self {
                present: true,
                stale_for,
                operations: AtomicUsize::new(0),
                clicks: AtomicUsize::new(0),
                selected: false,
            }
        }

        fn touch<T>(&self, value: T) -> Lookup<T> {
            let n = self.operations.fetch_add(1, Ordering::SeqCst);
            if n < self.stale_for {
                Lookup::Stale
            } else {
                Lookup::Found(value)
            }
        }

        fn operations(&self) -> usize {
            self.operations.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UiDriver for FlakyDriver {
        type Element = ();

        async fn navigate(&self, _url: &str) -> AutomationResult<()> {
            Ok(())
        }

        async fn find(&self, _locator: &Locator) -> AutomationResult<Lookup<()>> {
            Ok(if self.present { Lookup::Found(()) } else { Lookup::NotFound })
        }

        async fn find_all(&self, _locator: &Locator) -> AutomationResult<Lookup<Vec<()>>> {
            Ok(Lookup::Found(vec![(), ()]))
        }

        async fn wait_until(
            &self,
            locator: &Locator,
            _readiness: Readiness,
            _timeout: Duration,
        ) -> AutomationResult<Lookup<()>> {
            self.find(locator).await
        }

        async fn text(&self, _element: &()) -> AutomationResult<Lookup<String>> {
            Ok(self.touch("bf637137-1915".to_string()))
        }

        async fn click(&self, _element: &()) -> AutomationResult<Lookup<()>> {
            let result = self.touch(());
            if result.is_found() {
                self.clicks.fetch_add(1, Ordering::SeqCst);
            }
            Ok(result)
        }

        async fn send_keys(&self, _element: &(), _text: &str) -> AutomationResult<Lookup<()>> {
            Ok(self.touch(()))
        }

        async fn is_selected(&self, _element: &()) -> AutomationResult<Lookup<bool>> {
            Ok(self.touch(self.selected))
        }

        async fn quit(&mut self) -> AutomationResult<()> {
            Ok(())
        }
    }

    fn policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(10),
            max_attempts,
            backoff: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn read_text_recovers_after_transient_staleness() {
        let driver = FlakyDriver::new(2);
        let access = ElementAccess::new(&driver, policy(5));
        let text = access.read_text(&Locator::css("th a")).await.unwrap();
        assert_eq!(text, "bf637137-1915");
        assert_eq!(driver.operations(), 3);
    }

    #[tokio::test]
    async fn read_text_escalates_only_after_the_bound() {
        let driver = FlakyDriver::new(usize::MAX);
        let access = ElementAccess::new(&driver, policy(5));
        let err = access.read_text(&Locator::css("th a")).await.unwrap_err();
        assert!(matches!(
            err,
            AutomationError::AttemptsExhausted { attempts: 5, .. }
        ));
        assert_eq!(driver.operations(), 5);
    }

    #[tokio::test]
    async fn succeeding_on_the_last_attempt_is_not_an_error() {
        let driver = FlakyDriver::new(4);
        let access = ElementAccess::new(&driver, policy(5));
        access.click(&Locator::css("input[name=_save]")).await.unwrap();
        assert_eq!(driver.operations(), 5);
        assert_eq!(driver.clicks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn click_exhaustion_names_the_locator() {
        let driver = FlakyDriver::new(usize::MAX);
        let access = ElementAccess::new(&driver, policy(3));
        let err = access.click(&Locator::css("#submit")).await.unwrap_err();
        assert!(err.to_string().contains("#submit"));
        assert_eq!(driver.clicks.load(Ordering::SeqCst), 0);
        assert_eq!(driver.operations(), 3);
    }

    #[tokio::test]
    async fn missing_element_for_read_times_out_without_retrying() {
        let mut driver = FlakyDriver::new(0);
        driver.present = false;
        let access = ElementAccess::new(&driver, policy(5));
        let err = access.read_text(&Locator::css("#gone")).await.unwrap_err();
        assert!(matches!(err, AutomationError::ElementTimeout { .. }));
        assert_eq!(driver.operations(), 0);
    }

    #[tokio::test]
    async fn unclickable_element_is_retried_up_to_the_bound() {
        let mut driver = FlakyDriver::new(0);
        driver.present = false;
        let access = ElementAccess::new(&driver, policy(4));
        let err = access.click(&Locator::css("#hidden")).await.unwrap_err();
        assert!(matches!(
            err,
            AutomationError::AttemptsExhausted { attempts: 4, .. }
        ));
    }

    #[tokio::test]
    async fn read_all_texts_rereads_every_row_after_staleness() {
        let driver = FlakyDriver::new(1);
        let access = ElementAccess::new(&driver, policy(5));
        let rows = access
            .read_all_texts(&Locator::id("changelist"), &Locator::css("th a"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        // 第一轮第 1 行失效，第二轮读取 2 行
        assert_eq!(driver.operations(), 3);
    }

    #[tokio::test]
    async fn click_matching_text_reports_missing_suggestion() {
        let driver = FlakyDriver::new(0);
        let access = ElementAccess::new(&driver, policy(2));
        let err = access
            .click_matching_text(&Locator::css(".option"), "something-else")
            .await
            .unwrap_err();
        assert!(matches!(err, AutomationError::SuggestionNotFound { .. }));
        assert_eq!(driver.clicks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn click_matching_text_clicks_exact_match() {
        let driver = FlakyDriver::new(0);
        let access = ElementAccess::new(&driver, policy(2));
        access
            .click_matching_text(&Locator::css(".option"), "bf637137-1915")
            .await
            .unwrap();
        assert_eq!(driver.clicks.load(Ordering::SeqCst), 1);
    }
}
