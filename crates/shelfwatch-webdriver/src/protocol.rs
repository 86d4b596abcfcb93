//! Wire shapes of the W3C WebDriver JSON protocol.

use serde::Deserialize;
use serde_json::Value;

use crate::WebDriverError;

/// JSON key carrying an element id in responses and script arguments.
pub(crate) const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Every response wraps its payload in a `value` field, errors included.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub value: Value,
}

/// Error payload carried in the `value` of a non-2xx response.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    pub error: String,
    pub message: String,
}

/// Unwrap a response into its `value`, turning protocol errors into
/// [`WebDriverError::Protocol`].
pub(crate) async fn decode(response: reqwest::Response) -> Result<Value, WebDriverError> {
    let status = response.status();
    let envelope: Envelope = response.json().await?;
    if status.is_success() {
        return Ok(envelope.value);
    }
    let payload = serde_json::from_value::<ErrorPayload>(envelope.value).unwrap_or_else(|_| {
        ErrorPayload {
            error: format!("http {status}"),
            message: String::new(),
        }
    });
    Err(WebDriverError::Protocol {
        error: payload.error,
        message: payload.message,
    })
}

pub(crate) fn as_string(value: &Value, context: &str) -> Result<String, WebDriverError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| WebDriverError::Shape {
            context: context.to_owned(),
        })
}

pub(crate) fn as_bool(value: &Value, context: &str) -> Result<bool, WebDriverError> {
    value.as_bool().ok_or_else(|| WebDriverError::Shape {
        context: context.to_owned(),
    })
}

/// Nullable string fields (`attribute`, `property`): JSON null means the
/// element has no such value, which is not an error.
pub(crate) fn as_opt_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_owned)
}
