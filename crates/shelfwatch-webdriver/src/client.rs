use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use shelfwatch_core::QueryMode;
use shelfwatch_engine::{ElementHandle, EngineError, PageDriver};

use crate::protocol::{self, ELEMENT_KEY};
use crate::WebDriverError;

/// One live browser session, addressed as `{base_url}/session/{id}`.
pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: String,
}

impl WebDriverSession {
    pub(crate) fn new(client: Client, base_url: String, session_id: String) -> Self {
        Self {
            client,
            base_url,
            session_id,
        }
    }

    fn command_url(&self, suffix: &str) -> String {
        format!("{}/session/{}{suffix}", self.base_url, self.session_id)
    }

    async fn get_value(&self, suffix: &str) -> Result<Value, WebDriverError> {
        let response = self.client.get(self.command_url(suffix)).send().await?;
        protocol::decode(response).await
    }

    async fn post_value(&self, suffix: &str, body: &Value) -> Result<Value, WebDriverError> {
        let response = self
            .client
            .post(self.command_url(suffix))
            .json(body)
            .send()
            .await?;
        protocol::decode(response).await
    }

    async fn execute(&self, script: &str, args: Value) -> Result<Value, WebDriverError> {
        self.post_value("/execute/sync", &json!({ "script": script, "args": args }))
            .await
    }

    fn element_arg(handle: &ElementHandle) -> Value {
        json!({ ELEMENT_KEY: handle.0 })
    }
}

#[async_trait]
impl PageDriver for WebDriverSession {
    async fn navigate(&self, url: &str) -> Result<(), EngineError> {
        self.post_value("/url", &json!({ "url": url }))
            .await
            .map(|_| ())
            .map_err(|err| EngineError::Navigation {
                url: url.to_owned(),
                reason: err.to_string(),
            })
    }

    async fn title(&self) -> Result<String, EngineError> {
        let value = self.get_value("/title").await.map_err(EngineError::driver)?;
        protocol::as_string(&value, "title").map_err(EngineError::driver)
    }

    async fn current_url(&self) -> Result<String, EngineError> {
        let value = self.get_value("/url").await.map_err(EngineError::driver)?;
        protocol::as_string(&value, "current url").map_err(EngineError::driver)
    }

    async fn page_source(&self) -> Result<String, EngineError> {
        let value = self
            .get_value("/source")
            .await
            .map_err(EngineError::driver)?;
        protocol::as_string(&value, "page source").map_err(EngineError::driver)
    }

    async fn query_all(
        &self,
        expression: &str,
        mode: QueryMode,
    ) -> Result<Vec<ElementHandle>, EngineError> {
        let using = match mode {
            QueryMode::XPath => "xpath",
            QueryMode::Css => "css selector",
        };
        let value = self
            .post_value("/elements", &json!({ "using": using, "value": expression }))
            .await
            .map_err(EngineError::driver)?;
        let items = value.as_array().ok_or_else(|| {
            EngineError::driver(WebDriverError::Shape {
                context: "elements array".to_owned(),
            })
        })?;
        let mut handles = Vec::with_capacity(items.len());
        for item in items {
            let id = item.get(ELEMENT_KEY).and_then(Value::as_str).ok_or_else(|| {
                EngineError::driver(WebDriverError::Shape {
                    context: "element id key".to_owned(),
                })
            })?;
            handles.push(ElementHandle(id.to_owned()));
        }
        Ok(handles)
    }

    async fn is_displayed(&self, handle: &ElementHandle) -> Result<bool, EngineError> {
        let value = self
            .get_value(&format!("/element/{handle}/displayed"))
            .await
            .map_err(EngineError::driver)?;
        protocol::as_bool(&value, "displayed flag").map_err(EngineError::driver)
    }

    async fn visible_text(&self, handle: &ElementHandle) -> Result<Option<String>, EngineError> {
        let value = self
            .get_value(&format!("/element/{handle}/text"))
            .await
            .map_err(EngineError::driver)?;
        Ok(protocol::as_opt_string(&value))
    }

    async fn attribute(
        &self,
        handle: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, EngineError> {
        let value = self
            .get_value(&format!("/element/{handle}/attribute/{name}"))
            .await
            .map_err(EngineError::driver)?;
        Ok(protocol::as_opt_string(&value))
    }

    async fn property(
        &self,
        handle: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, EngineError> {
        let value = self
            .get_value(&format!("/element/{handle}/property/{name}"))
            .await
            .map_err(EngineError::driver)?;
        Ok(protocol::as_opt_string(&value))
    }

    async fn scroll_into_view(&self, handle: &ElementHandle) -> Result<(), EngineError> {
        self.execute(
            "arguments[0].scrollIntoView({block: 'center', inline: 'nearest'});",
            json!([Self::element_arg(handle)]),
        )
        .await
        .map(|_| ())
        .map_err(EngineError::driver)
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), EngineError> {
        self.post_value(&format!("/element/{handle}/click"), &json!({}))
            .await
            .map(|_| ())
            .map_err(EngineError::driver)
    }

    async fn click_via_script(&self, handle: &ElementHandle) -> Result<(), EngineError> {
        self.execute("arguments[0].click();", json!([Self::element_arg(handle)]))
            .await
            .map(|_| ())
            .map_err(EngineError::driver)
    }

    async fn ready_state(&self) -> Result<String, EngineError> {
        let value = self
            .execute("return document.readyState;", json!([]))
            .await
            .map_err(EngineError::driver)?;
        protocol::as_string(&value, "readyState").map_err(EngineError::driver)
    }

    async fn refresh(&self) -> Result<(), EngineError> {
        self.post_value("/refresh", &json!({}))
            .await
            .map(|_| ())
            .map_err(EngineError::driver)
    }

    async fn close(&self) -> Result<(), EngineError> {
        let response = self
            .client
            .delete(self.command_url(""))
            .send()
            .await
            .map_err(|err| EngineError::driver(WebDriverError::Http(err)))?;
        protocol::decode(response)
            .await
            .map(|_| ())
            .map_err(EngineError::driver)
    }
}
