//! Batch summaries and the channel that reports them.
//!
//! After every batch the worker builds a [`BatchSummary`] from the result
//! rows and the delivery outcome, grades it with a [`Severity`], and hands
//! it to a [`Notifier`]. The notification fires exactly once per batch;
//! a notifier failure is logged and never fails the run.

mod error;
mod notify;
mod summary;

pub use error::AlertError;
pub use notify::{notify_best_effort, LogNotifier, Notifier, WebhookNotifier};
pub use summary::{BatchSummary, DeliveryOutcome, FieldEmptiness, Severity};
