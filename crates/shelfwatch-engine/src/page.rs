//! The page capability boundary.
//!
//! Everything the engine needs from a browser fits in [`PageDriver`]; no
//! specific automation product is assumed. [`DriverFactory`] exists so the
//! retry controller can tear a wedged session down and build a fresh one.

use async_trait::async_trait;

use shelfwatch_core::QueryMode;

use crate::error::EngineError;

/// Opaque reference to one element in the current page. Only meaningful to
/// the driver that produced it, and only until the next navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle(pub String);

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), EngineError>;

    async fn title(&self) -> Result<String, EngineError>;

    async fn current_url(&self) -> Result<String, EngineError>;

    /// Full rendered markup of the current page.
    async fn page_source(&self) -> Result<String, EngineError>;

    /// All elements matching `expression` under the given addressing mode.
    /// No match is `Ok(vec![])`, not an error.
    async fn query_all(
        &self,
        expression: &str,
        mode: QueryMode,
    ) -> Result<Vec<ElementHandle>, EngineError>;

    async fn is_displayed(&self, handle: &ElementHandle) -> Result<bool, EngineError>;

    /// The element's rendered (layout-aware) text.
    async fn visible_text(&self, handle: &ElementHandle) -> Result<Option<String>, EngineError>;

    async fn attribute(
        &self,
        handle: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, EngineError>;

    /// A DOM property such as `textContent` or `innerText`.
    async fn property(
        &self,
        handle: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, EngineError>;

    async fn scroll_into_view(&self, handle: &ElementHandle) -> Result<(), EngineError>;

    /// Direct interaction click, subject to overlay/visibility rules.
    async fn click(&self, handle: &ElementHandle) -> Result<(), EngineError>;

    /// Script-dispatched click, for elements a direct click cannot reach.
    async fn click_via_script(&self, handle: &ElementHandle) -> Result<(), EngineError>;

    /// The document's `readyState` ("loading", "interactive", "complete").
    async fn ready_state(&self) -> Result<String, EngineError>;

    async fn refresh(&self) -> Result<(), EngineError>;

    async fn close(&self) -> Result<(), EngineError>;
}

/// Builds page drivers. One session is created at worker start; the restart
/// escalation tier replaces it through the same factory.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn create(&self) -> Result<Box<dyn PageDriver>, EngineError>;
}
