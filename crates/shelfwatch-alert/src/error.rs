/// Errors raised while sending a notification.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
}
