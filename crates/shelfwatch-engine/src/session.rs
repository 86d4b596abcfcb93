//! Extraction session: one driver, one site, a stream of targets.
//!
//! The session owns the live driver and walks each target through the
//! attempt ladder: navigate, classify, recover if the block is soft,
//! extract if the page is normal, escalate otherwise. Escalation follows
//! the retry plan; once the budget is spent the target is recorded as
//! aborted and the session moves on. A target can never take the batch
//! down.

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use shelfwatch_core::{
    BlockSignatures, CaptureTimestamps, ExtractedFields, ExtractionResult, ExtractionTarget,
    FieldSelectors, SiteProfile,
};

use crate::blocks::{classify, PageClass, PageState};
use crate::error::EngineError;
use crate::extract::{extract_field, FieldKind};
use crate::page::{DriverFactory, PageDriver};
use crate::price::extract_price;
use crate::recovery::attempt_recovery;
use crate::retry::{plan_retry, EscalationTier, NextStep, RetryPolicy};

/// Pause after a dismissal click, giving the storefront time to land back
/// on the product page before re-classification.
const RECOVERY_SETTLE: Duration = Duration::from_millis(750);

/// Poll interval for the document ready state.
const READY_POLL: Duration = Duration::from_millis(250);

/// Randomized inter-target pause, in a min..max window.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub min: Duration,
    pub max: Duration,
}

impl Pacing {
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    #[must_use]
    pub fn sample(&self) -> Duration {
        let span = self.max.saturating_sub(self.min).as_millis();
        if span == 0 {
            return self.min;
        }
        let extra = (span as f64 * rand::random::<f64>()) as u64;
        self.min + Duration::from_millis(extra)
    }
}

/// Everything a session needs to know about its site and its budget.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub profile: SiteProfile,
    /// Effective selector chains: the profile's, with any per-site
    /// overrides already merged in.
    pub selectors: FieldSelectors,
    pub retry: RetryPolicy,
    pub pacing: Pacing,
    pub page_load_timeout: Duration,
    /// The site's own wall-clock zone.
    pub local_zone: Tz,
    /// The operations reference zone stamped alongside it.
    pub reference_zone: Tz,
    /// Where blocked-page snapshots land; `None` disables them.
    pub diagnostics_dir: Option<PathBuf>,
}

pub struct EngineSession<'a> {
    factory: &'a dyn DriverFactory,
    config: &'a SessionConfig,
    signatures: BlockSignatures,
    driver: Box<dyn PageDriver>,
}

impl<'a> EngineSession<'a> {
    /// Create the initial driver and derive the site's signature sets.
    pub async fn start(
        factory: &'a dyn DriverFactory,
        config: &'a SessionConfig,
    ) -> Result<EngineSession<'a>, EngineError> {
        let driver = factory.create().await?;
        let signatures = BlockSignatures::for_profile(&config.profile);
        tracing::info!(site = %config.profile.site, "extraction session started");
        Ok(EngineSession {
            factory,
            config,
            signatures,
            driver,
        })
    }

    /// Drive one target to a terminal row. Never errors: a spent budget
    /// produces an aborted row with the target's identity intact.
    pub async fn process(&mut self, target: &ExtractionTarget) -> ExtractionResult {
        let mut attempt: u32 = 1;
        let mut navigate = true;
        loop {
            match self.attempt(target, attempt, navigate).await {
                Ok(fields) => {
                    return ExtractionResult::completed(
                        target.clone(),
                        fields,
                        self.config.profile.vat_included,
                        self.stamps(),
                    );
                }
                Err(err) => {
                    tracing::warn!(target = target.id, attempt, error = %err, "attempt failed");
                    match plan_retry(attempt, &self.config.retry) {
                        NextStep::Retry { tier, backoff } => {
                            tokio::time::sleep(backoff).await;
                            navigate = !self.escalate(tier).await;
                            attempt += 1;
                        }
                        NextStep::Abort => {
                            tracing::error!(
                                target = target.id,
                                attempts = attempt,
                                "retry budget spent, aborting target"
                            );
                            return ExtractionResult::aborted(
                                target.clone(),
                                self.config.profile.vat_included,
                                self.stamps(),
                            );
                        }
                    }
                }
            }
        }
    }

    /// Sleep the sampled inter-target pause.
    pub async fn pause_between_targets(&self) {
        let pause = self.config.pacing.sample();
        tracing::debug!(?pause, "pacing pause");
        tokio::time::sleep(pause).await;
    }

    /// Tear the driver down. Close failures are logged, not propagated;
    /// the session is over either way.
    pub async fn close(self) {
        if let Err(err) = self.driver.close().await {
            tracing::debug!(error = %err, "driver close failed");
        }
    }

    async fn attempt(
        &mut self,
        target: &ExtractionTarget,
        attempt: u32,
        navigate: bool,
    ) -> Result<ExtractedFields, EngineError> {
        if navigate {
            tracing::info!(target = target.id, url = %target.url, attempt, "navigating");
            self.driver.navigate(&target.url).await?;
        }
        self.wait_for_ready().await;

        let mut state = PageState::capture(self.driver.as_ref()).await?;
        let mut class = classify(&state, &self.signatures, &self.config.profile.domain);

        if let PageClass::SoftBlock { phrase } = &class {
            tracing::warn!(target = target.id, %phrase, "soft block interstitial");
            if attempt_recovery(
                self.driver.as_ref(),
                &self.config.profile.recovery_selectors,
                &self.signatures.soft,
            )
            .await
            {
                tokio::time::sleep(RECOVERY_SETTLE).await;
                state = PageState::capture(self.driver.as_ref()).await?;
                class = classify(&state, &self.signatures, &self.config.profile.domain);
            }
        }

        match class {
            PageClass::Normal => Ok(self.extract().await),
            PageClass::SoftBlock { .. } => Err(EngineError::SoftBlockUnrecovered),
            PageClass::HardBlock { reason } => {
                self.snapshot(target, &state).await;
                Err(EngineError::HardBlock { reason })
            }
        }
    }

    async fn extract(&self) -> ExtractedFields {
        let driver = self.driver.as_ref();
        let selectors = &self.config.selectors;

        let title = extract_field(driver, "title", &selectors.title, FieldKind::Text).await;
        let sold_by = extract_field(
            driver,
            "sold_by",
            &selectors.sold_by,
            FieldKind::LabeledIdentity,
        )
        .await;
        let ships_from = extract_field(
            driver,
            "ships_from",
            &selectors.ships_from,
            FieldKind::LabeledIdentity,
        )
        .await;
        let image_url = extract_field(
            driver,
            "image",
            &selectors.image,
            FieldKind::Attribute("src"),
        )
        .await;
        let availability = extract_field(
            driver,
            "availability",
            &selectors.availability,
            FieldKind::Text,
        )
        .await;
        let price = extract_price(
            driver,
            selectors,
            self.config.profile.price_grammar(),
            &self.config.profile.price_bounds,
        )
        .await;

        ExtractedFields {
            title,
            price,
            sold_by,
            ships_from,
            image_url,
            availability,
        }
    }

    /// Apply an escalation rung. Returns `true` when the page is already
    /// loaded and the next attempt can skip navigation.
    async fn escalate(&mut self, tier: EscalationTier) -> bool {
        match tier {
            EscalationTier::Refresh => match self.driver.refresh().await {
                Ok(()) => {
                    tracing::info!("page refreshed in place");
                    true
                }
                Err(err) => {
                    tracing::warn!(error = %err, "refresh failed, will navigate fresh");
                    false
                }
            },
            EscalationTier::Restart => {
                self.restart().await;
                false
            }
        }
    }

    /// Replace the driver with a fresh one. When creation fails the old
    /// driver is kept; the attempt budget still bounds the ladder.
    async fn restart(&mut self) {
        if let Err(err) = self.driver.close().await {
            tracing::debug!(error = %err, "old driver close failed");
        }
        match self.factory.create().await {
            Ok(driver) => {
                self.driver = driver;
                tracing::info!("driver restarted");
            }
            Err(err) => {
                tracing::error!(error = %err, "driver restart failed, keeping the old one");
            }
        }
    }

    async fn wait_for_ready(&self) {
        let deadline = tokio::time::Instant::now() + self.config.page_load_timeout;
        loop {
            match self.driver.ready_state().await {
                Ok(state) if state == "complete" => return,
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(error = %err, "ready-state poll failed");
                    return;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!("page never reached readyState complete, proceeding anyway");
                return;
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }

    fn stamps(&self) -> CaptureTimestamps {
        CaptureTimestamps::now(self.config.local_zone, self.config.reference_zone)
    }

    /// Write the blocked page's source next to the logs for a post-mortem.
    async fn snapshot(&self, target: &ExtractionTarget, state: &PageState) {
        let Some(dir) = &self.config.diagnostics_dir else {
            return;
        };
        if let Err(err) = tokio::fs::create_dir_all(dir).await {
            tracing::warn!(error = %err, "diagnostics dir unavailable");
            return;
        }
        let name = format!(
            "{}_{}_{}.html",
            self.config.profile.site,
            target.id,
            self.stamps().reference_compact
        );
        let path = dir.join(name);
        match tokio::fs::write(&path, &state.source).await {
            Ok(()) => tracing::info!(path = %path.display(), "blocked page snapshot written"),
            Err(err) => tracing::warn!(error = %err, "snapshot write failed"),
        }
    }
}
