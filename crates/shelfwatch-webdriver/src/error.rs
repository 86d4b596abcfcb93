use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("webdriver request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webdriver returned {error}: {message}")]
    Protocol { error: String, message: String },

    #[error("webdriver response missing {context}")]
    Shape { context: String },
}
