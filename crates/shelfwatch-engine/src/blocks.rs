//! Block and challenge classification.

use shelfwatch_core::BlockSignatures;

use crate::error::EngineError;
use crate::page::PageDriver;

/// Minimum count of normal-page indicators that clears a page outright.
const NORMAL_INDICATOR_QUORUM: usize = 3;

/// Observable page state, captured once per classification pass.
#[derive(Debug, Clone)]
pub struct PageState {
    pub title: String,
    pub url: String,
    pub source: String,
}

impl PageState {
    /// Read title, URL, and source off the live page. Failures here are
    /// page-level and escalate; a page that cannot even be read is unusable.
    pub async fn capture(driver: &dyn PageDriver) -> Result<Self, EngineError> {
        Ok(Self {
            title: driver.title().await?,
            url: driver.current_url().await?,
            source: driver.page_source().await?,
        })
    }
}

/// Verdict on a captured page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageClass {
    Normal,
    /// Dismissable interstitial; recovery is worth attempting in-page.
    SoftBlock { phrase: String },
    /// Challenge or denial; only refresh/restart can help.
    HardBlock { reason: String },
}

/// Classify a captured page.
///
/// Order is load-bearing: enough normal-page indicators clear the page
/// outright even when a challenge phrase also appears in the markup (help
/// pages and review threads quote them), hard title signatures beat soft
/// phrases, and the domain check runs last so an off-domain bounce with a
/// normal-looking shell is still caught.
#[must_use]
pub fn classify(
    state: &PageState,
    signatures: &BlockSignatures,
    expected_domain: &str,
) -> PageClass {
    let title = state.title.to_lowercase();
    let url = state.url.to_lowercase();
    let source = state.source.to_lowercase();

    let indicator_hits = signatures
        .normal_indicators
        .iter()
        .filter(|phrase| source.contains(phrase.as_str()))
        .count();
    if indicator_hits >= NORMAL_INDICATOR_QUORUM {
        return PageClass::Normal;
    }

    for signature in &signatures.hard_title {
        if title.contains(signature.as_str()) {
            return PageClass::HardBlock {
                reason: format!("title signature: {signature}"),
            };
        }
    }

    for phrase in &signatures.soft {
        if source.contains(phrase.as_str()) {
            return PageClass::SoftBlock {
                phrase: phrase.clone(),
            };
        }
    }

    for signature in &signatures.hard_content {
        if source.contains(signature.as_str()) {
            return PageClass::HardBlock {
                reason: format!("content signature: {signature}"),
            };
        }
    }

    if !expected_domain.is_empty() && !url.contains(&expected_domain.to_lowercase()) {
        return PageClass::HardBlock {
            reason: format!("off expected domain {expected_domain}"),
        };
    }

    PageClass::Normal
}
