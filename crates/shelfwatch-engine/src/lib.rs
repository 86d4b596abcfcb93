//! The extraction resilience engine.
//!
//! Drives one browser session against one storefront: navigates to product
//! detail pages, detects and dismisses anti-bot interstitials, walks
//! selector chains to pull structured fields out of hostile markup, and
//! retries with escalating countermeasures before giving up.
//!
//! The engine talks to the browser only through [`PageDriver`], so any
//! automation backend that can answer those primitives works.

mod blocks;
mod error;
mod extract;
mod page;
mod price;
mod recovery;
mod retry;
mod session;

#[cfg(test)]
pub(crate) mod fake_driver;

pub use blocks::{classify, PageClass, PageState};
pub use error::EngineError;
pub use extract::{extract_field, FieldKind};
pub use page::{DriverFactory, ElementHandle, PageDriver};
pub use price::extract_price;
pub use recovery::attempt_recovery;
pub use retry::{plan_retry, EscalationTier, NextStep, RetryPolicy};
pub use session::{EngineSession, Pacing, SessionConfig};
