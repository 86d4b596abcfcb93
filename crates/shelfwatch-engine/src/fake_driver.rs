//! Scripted in-memory page driver.
//!
//! Tests describe a browser session as a queue of page states; navigation,
//! refresh, and clicks on advancing elements pop the next state. All shared
//! counters live behind an `Arc` so a test can keep a clone of the driver it
//! hands to the session and inspect what happened afterwards.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use shelfwatch_core::QueryMode;

use crate::error::EngineError;
use crate::page::{DriverFactory, ElementHandle, PageDriver};

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeElement {
    pub id: String,
    pub displayed: bool,
    pub text: Option<String>,
    pub text_content: Option<String>,
    pub inner_text: Option<String>,
    pub attributes: HashMap<String, String>,
    pub click_fails: bool,
    pub click_advances: bool,
}

impl FakeElement {
    pub fn visible_text(id: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            displayed: true,
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn hidden_text(id: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            displayed: false,
            text: Some(text.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakePage {
    pub title: String,
    pub url: String,
    pub source: String,
    pub elements: HashMap<String, Vec<FakeElement>>,
}

impl FakePage {
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    pub fn with_elements(mut self, query: &str, elements: Vec<FakeElement>) -> Self {
        self.elements.insert(query.to_string(), elements);
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    queue: Mutex<VecDeque<FakePage>>,
    current: Mutex<FakePage>,
    clicked: Mutex<Vec<String>>,
    navigations: Mutex<Vec<String>>,
    failing_queries: Mutex<Vec<String>>,
    refreshes: AtomicU32,
    closes: AtomicU32,
    failing_navigations: AtomicU32,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeDriver {
    state: Arc<FakeState>,
}

impl FakeDriver {
    pub fn with_pages(pages: Vec<FakePage>) -> Self {
        let driver = Self::default();
        *driver.state.queue.lock().unwrap() = pages.into();
        driver
    }

    /// Pop the first scripted page without a navigation, for tests that
    /// exercise extraction directly.
    pub fn load_first_page(&self) {
        self.advance();
    }

    pub fn fail_query(&self, expression: &str) {
        self.state
            .failing_queries
            .lock()
            .unwrap()
            .push(expression.to_string());
    }

    pub fn fail_next_navigations(&self, count: u32) {
        self.state.failing_navigations.store(count, Ordering::SeqCst);
    }

    pub fn refreshes(&self) -> u32 {
        self.state.refreshes.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub fn clicked(&self) -> Vec<String> {
        self.state.clicked.lock().unwrap().clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.navigations.lock().unwrap().clone()
    }

    fn advance(&self) {
        if let Some(next) = self.state.queue.lock().unwrap().pop_front() {
            *self.state.current.lock().unwrap() = next;
        }
    }

    fn current(&self) -> MutexGuard<'_, FakePage> {
        self.state.current.lock().unwrap()
    }

    fn find_element(&self, id: &str) -> Option<FakeElement> {
        let page = self.current();
        page.elements.values().flatten().find(|e| e.id == id).cloned()
    }

    fn scripted_failure(message: &str) -> EngineError {
        EngineError::driver(std::io::Error::other(message.to_string()))
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn navigate(&self, url: &str) -> Result<(), EngineError> {
        self.state.navigations.lock().unwrap().push(url.to_string());
        let failing = self.state.failing_navigations.load(Ordering::SeqCst);
        if failing > 0 {
            self.state.failing_navigations.store(failing - 1, Ordering::SeqCst);
            return Err(EngineError::Navigation {
                url: url.to_string(),
                reason: "scripted navigation failure".to_string(),
            });
        }
        self.advance();
        Ok(())
    }

    async fn title(&self) -> Result<String, EngineError> {
        Ok(self.current().title.clone())
    }

    async fn current_url(&self) -> Result<String, EngineError> {
        Ok(self.current().url.clone())
    }

    async fn page_source(&self) -> Result<String, EngineError> {
        Ok(self.current().source.clone())
    }

    async fn query_all(
        &self,
        expression: &str,
        _mode: QueryMode,
    ) -> Result<Vec<ElementHandle>, EngineError> {
        if self
            .state
            .failing_queries
            .lock()
            .unwrap()
            .iter()
            .any(|q| q == expression)
        {
            return Err(Self::scripted_failure("scripted query failure"));
        }
        let page = self.current();
        Ok(page
            .elements
            .get(expression)
            .map(|matches| matches.iter().map(|e| ElementHandle(e.id.clone())).collect())
            .unwrap_or_default())
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, EngineError> {
        Ok(self.find_element(&element.0).is_some_and(|e| e.displayed))
    }

    async fn visible_text(&self, element: &ElementHandle) -> Result<Option<String>, EngineError> {
        Ok(self.find_element(&element.0).and_then(|e| e.text))
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, EngineError> {
        Ok(self
            .find_element(&element.0)
            .and_then(|e| e.attributes.get(name).cloned()))
    }

    async fn property(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, EngineError> {
        Ok(self.find_element(&element.0).and_then(|e| match name {
            "textContent" => e.text_content,
            "innerText" => e.inner_text,
            _ => None,
        }))
    }

    async fn scroll_into_view(&self, _element: &ElementHandle) -> Result<(), EngineError> {
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), EngineError> {
        let Some(found) = self.find_element(&element.0) else {
            return Err(Self::scripted_failure("click on unknown element"));
        };
        if found.click_fails {
            return Err(Self::scripted_failure("scripted click failure"));
        }
        self.state.clicked.lock().unwrap().push(found.id.clone());
        if found.click_advances {
            self.advance();
        }
        Ok(())
    }

    async fn click_via_script(&self, element: &ElementHandle) -> Result<(), EngineError> {
        let Some(found) = self.find_element(&element.0) else {
            return Err(Self::scripted_failure("script click on unknown element"));
        };
        self.state
            .clicked
            .lock()
            .unwrap()
            .push(format!("script:{}", found.id));
        if found.click_advances {
            self.advance();
        }
        Ok(())
    }

    async fn ready_state(&self) -> Result<String, EngineError> {
        Ok("complete".to_string())
    }

    async fn refresh(&self) -> Result<(), EngineError> {
        self.state.refreshes.fetch_add(1, Ordering::SeqCst);
        self.advance();
        Ok(())
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeFactory {
    drivers: Mutex<VecDeque<FakeDriver>>,
    created: AtomicU32,
}

impl FakeFactory {
    pub fn new(drivers: Vec<FakeDriver>) -> Self {
        Self {
            drivers: Mutex::new(drivers.into()),
            created: AtomicU32::new(0),
        }
    }

    pub fn created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DriverFactory for FakeFactory {
    async fn create(&self) -> Result<Box<dyn PageDriver>, EngineError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let driver = self
            .drivers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| EngineError::SessionSetup {
                reason: "no scripted driver left".to_string(),
            })?;
        Ok(Box::new(driver))
    }
}
