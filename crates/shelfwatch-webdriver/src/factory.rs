use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use shelfwatch_core::AppConfig;
use shelfwatch_engine::{DriverFactory, EngineError, PageDriver};

use crate::client::WebDriverSession;
use crate::protocol;
use crate::WebDriverError;

/// Creates browser sessions against one WebDriver endpoint. The engine
/// holds a factory for the whole run and asks for a fresh session whenever
/// the restart escalation fires.
pub struct WebDriverFactory {
    client: Client,
    base_url: String,
    new_session_body: Value,
}

impl WebDriverFactory {
    /// # Errors
    ///
    /// Returns [`WebDriverError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        endpoint: &str,
        user_agent: Option<&str>,
        page_load_timeout: Duration,
    ) -> Result<Self, WebDriverError> {
        // The overall request timeout must outlast the driver-side page
        // load timeout, or slow navigations would be cut off client-side.
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_owned(),
            new_session_body: new_session_body(user_agent, page_load_timeout),
        })
    }

    /// # Errors
    ///
    /// Returns [`WebDriverError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, WebDriverError> {
        Self::new(
            &config.webdriver_url,
            config.user_agent.as_deref(),
            Duration::from_secs(config.page_load_timeout_secs),
        )
    }

    async fn start_session(&self) -> Result<WebDriverSession, WebDriverError> {
        let url = format!("{}/session", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&self.new_session_body)
            .send()
            .await?;
        let value = protocol::decode(response).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| WebDriverError::Shape {
                context: "sessionId in new-session response".to_owned(),
            })?;
        tracing::info!(session = session_id, "webdriver session created");
        Ok(WebDriverSession::new(
            self.client.clone(),
            self.base_url.clone(),
            session_id.to_owned(),
        ))
    }
}

#[async_trait]
impl DriverFactory for WebDriverFactory {
    async fn create(&self) -> Result<Box<dyn PageDriver>, EngineError> {
        let session = self
            .start_session()
            .await
            .map_err(|err| EngineError::SessionSetup {
                reason: err.to_string(),
            })?;
        Ok(Box::new(session))
    }
}

/// W3C new-session request. `pageLoadStrategy: eager` returns control at
/// `interactive`; the engine's own readiness poll waits for `complete`.
fn new_session_body(user_agent: Option<&str>, page_load_timeout: Duration) -> Value {
    let mut args = vec![
        "--headless=new".to_owned(),
        "--disable-gpu".to_owned(),
        "--window-size=1366,900".to_owned(),
    ];
    if let Some(agent) = user_agent {
        args.push(format!("--user-agent={agent}"));
    }
    let timeout_ms = u64::try_from(page_load_timeout.as_millis()).unwrap_or(u64::MAX);
    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "pageLoadStrategy": "eager",
                "timeouts": { "pageLoad": timeout_ms },
                "goog:chromeOptions": { "args": args }
            }
        }
    })
}
