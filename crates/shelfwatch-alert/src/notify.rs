use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::{AlertError, BatchSummary, Severity};

/// Outbound channel for batch summaries.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, summary: &BatchSummary) -> Result<(), AlertError>;
}

/// Fire the once-per-batch notification. A notifier failure is logged and
/// swallowed; a missed alert never fails a run that otherwise succeeded.
pub async fn notify_best_effort(notifier: &dyn Notifier, summary: &BatchSummary) {
    if let Err(err) = notifier.notify(summary).await {
        tracing::warn!(site = %summary.site, error = %err, "batch notification failed");
    }
}

/// Posts summaries as JSON to a configured webhook.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    /// # Errors
    ///
    /// Returns [`AlertError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self, AlertError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("shelfwatch/0.1")
            .build()?;
        Ok(Self {
            client,
            url: url.to_owned(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, summary: &BatchSummary) -> Result<(), AlertError> {
        let response = self.client.post(&self.url).json(summary).send().await?;
        response.error_for_status()?;
        tracing::debug!(site = %summary.site, "batch summary posted");
        Ok(())
    }
}

/// Fallback channel used when no webhook is configured: writes the summary
/// to the log at a level matching its grade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, summary: &BatchSummary) -> Result<(), AlertError> {
        match summary.severity {
            Severity::Critical => tracing::error!(
                site = %summary.site,
                run_id = summary.run_id,
                processed = summary.processed,
                aborted = summary.aborted,
                delivery = ?summary.delivery,
                "batch summary"
            ),
            Severity::Warning => tracing::warn!(
                site = %summary.site,
                run_id = summary.run_id,
                processed = summary.processed,
                aborted = summary.aborted,
                "batch summary"
            ),
            Severity::Ok => tracing::info!(
                site = %summary.site,
                run_id = summary.run_id,
                processed = summary.processed,
                "batch summary"
            ),
        }
        Ok(())
    }
}
