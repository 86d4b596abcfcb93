//! The `run` subcommand: one invocation processes one site's batch.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use chrono_tz::Tz;

use shelfwatch_alert::{
    notify_best_effort, BatchSummary, DeliveryOutcome, LogNotifier, WebhookNotifier,
};
use shelfwatch_core::{
    merge_selectors, AppConfig, CaptureTimestamps, ExtractionResult, FieldSelectors, ResultSink,
    SelectorEntry, SiteProfile, TargetSource,
};
use shelfwatch_db::{PgResultSink, PgTargetSource};
use shelfwatch_delivery::{deliver_batch, package_batch, FsRemoteStore};
use shelfwatch_engine::{EngineSession, Pacing, RetryPolicy, SessionConfig};
use shelfwatch_webdriver::WebDriverFactory;

/// Webhook post timeout. The summary is tiny; the receiving end may not be.
const NOTIFY_TIMEOUT_SECS: u64 = 30;

pub(crate) async fn run_worker(config: &AppConfig, site: &str, limit: i64) -> anyhow::Result<()> {
    let sites = shelfwatch_core::load_sites(&config.sites_path)?;
    let profile = sites
        .get(site)
        .with_context(|| format!("site '{site}' is not in the catalog"))?
        .clone();

    let pool_config = shelfwatch_db::PoolConfig::from_app_config(config);
    let pool = shelfwatch_db::connect_pool(&config.database_url, pool_config).await?;

    let run = shelfwatch_db::create_crawl_run(&pool, site, "cli").await?;
    if let Err(err) = shelfwatch_db::start_crawl_run(&pool, run.id).await {
        fail_run_best_effort(&pool, run.id, format!("{err:#}")).await;
        return Err(err.into());
    }
    tracing::info!(site, run_id = run.id, run = %run.public_id, limit, "crawl run started");

    let mut results: Vec<ExtractionResult> = Vec::new();
    let mut errors: Vec<String> = Vec::new();
    let outcome = drive_batch(config, &profile, &pool, limit, &mut results, &mut errors).await;

    let delivery = match &outcome {
        Ok(delivery) => *delivery,
        Err(err) => {
            errors.push(format!("{err:#}"));
            DeliveryOutcome::Failed
        }
    };

    // Exactly one notification per batch, however the batch ended.
    let summary = BatchSummary::from_results(site, run.id, &results, delivery, errors);
    send_notification(config, &summary).await;

    match outcome {
        Ok(_) => {
            let processed = count_i32(results.len());
            let aborted = count_i32(results.iter().filter(|r| r.is_aborted()).count());
            if let Err(err) =
                shelfwatch_db::complete_crawl_run(&pool, run.id, processed, aborted).await
            {
                let message = format!("{err:#}");
                fail_run_best_effort(&pool, run.id, message).await;
                return Err(err.into());
            }
            tracing::info!(site, run_id = run.id, processed, aborted, "crawl run completed");
            Ok(())
        }
        Err(err) => {
            fail_run_best_effort(&pool, run.id, format!("{err:#}")).await;
            Err(err)
        }
    }
}

/// Process the batch end to end: merge selector overrides, pull targets,
/// drive the session, flush rows as they accumulate, package, deliver.
async fn drive_batch(
    config: &AppConfig,
    profile: &SiteProfile,
    pool: &sqlx::PgPool,
    limit: i64,
    results: &mut Vec<ExtractionResult>,
    errors: &mut Vec<String>,
) -> anyhow::Result<DeliveryOutcome> {
    let override_rows = shelfwatch_db::fetch_selector_overrides(pool, &profile.site).await?;
    if !override_rows.is_empty() {
        tracing::info!(
            site = %profile.site,
            overrides = override_rows.len(),
            "selector overrides loaded"
        );
    }
    let override_chains = shelfwatch_db::overrides_as_chains(override_rows);
    let selectors = merged_selectors(&profile.selectors, &override_chains);

    let session_config = build_session_config(config, profile, selectors)?;
    let factory = WebDriverFactory::from_app_config(config)?;

    let source = PgTargetSource::new(pool.clone(), &profile.site);
    let targets = source.next(limit).await.map_err(|e| anyhow::anyhow!(e))?;
    if targets.is_empty() {
        tracing::warn!(site = %profile.site, "no active targets, nothing to process");
        return Ok(DeliveryOutcome::Skipped);
    }
    tracing::info!(site = %profile.site, targets = targets.len(), "batch loaded");

    let sink = PgResultSink::new(pool.clone());
    let mut session = EngineSession::start(&factory, &session_config).await?;

    let flush_every = config.flush_every.max(1);
    let mut unflushed = 0usize;
    let mut batch_error: Option<anyhow::Error> = None;

    for (index, target) in targets.iter().enumerate() {
        if index > 0 {
            session.pause_between_targets().await;
        }
        let result = session.process(target).await;
        if result.is_aborted() {
            errors.push(format!(
                "target {} aborted after retries: {}",
                target.id, target.url
            ));
        }
        results.push(result);
        unflushed += 1;

        if unflushed >= flush_every {
            let tail = &results[results.len() - unflushed..];
            if let Err(err) = sink.append(&config.results_table, tail).await {
                batch_error = Some(anyhow::anyhow!(err));
                break;
            }
            unflushed = 0;
        }
    }
    session.close().await;

    if let Some(err) = batch_error {
        return Err(err.context("persisting result rows"));
    }
    if unflushed > 0 {
        let tail = &results[results.len() - unflushed..];
        sink.append(&config.results_table, tail)
            .await
            .map_err(|e| anyhow::anyhow!(e))
            .context("persisting result rows")?;
    }

    let stamp = CaptureTimestamps::now(session_config.local_zone, session_config.reference_zone);
    let batch = package_batch(results, &profile.site, &stamp).context("packaging batch")?;
    let store = FsRemoteStore::new(&config.remote_root);
    let receipt = deliver_batch(&store, &profile.site, stamp.local_date(), &batch)
        .await
        .context("delivering batch")?;
    tracing::info!(
        site = %profile.site,
        dir = %receipt.remote_dir.display(),
        rows = results.len(),
        "batch delivered"
    );
    Ok(DeliveryOutcome::Delivered)
}

fn build_session_config(
    config: &AppConfig,
    profile: &SiteProfile,
    selectors: FieldSelectors,
) -> anyhow::Result<SessionConfig> {
    let local_zone = profile.tz()?;
    let reference_zone: Tz = config.reference_timezone.parse().map_err(|_| {
        anyhow::anyhow!("unknown reference timezone '{}'", config.reference_timezone)
    })?;
    Ok(SessionConfig {
        profile: profile.clone(),
        selectors,
        retry: RetryPolicy::new(
            config.max_attempts,
            Duration::from_secs(config.backoff_unit_secs),
        ),
        pacing: Pacing::new(
            Duration::from_millis(config.pacing_min_ms),
            Duration::from_millis(config.pacing_max_ms),
        ),
        page_load_timeout: Duration::from_secs(config.page_load_timeout_secs),
        local_zone,
        reference_zone,
        diagnostics_dir: config.diagnostics_dir.clone(),
    })
}

/// Apply override chains field by field. Unknown field names are ignored;
/// the catalog's chains pass through untouched when no override exists.
fn merged_selectors(
    defaults: &FieldSelectors,
    overrides: &HashMap<String, Vec<SelectorEntry>>,
) -> FieldSelectors {
    let empty: Vec<SelectorEntry> = Vec::new();
    let chain = |field: &str, base: &[SelectorEntry]| {
        merge_selectors(base, overrides.get(field).unwrap_or(&empty))
    };
    FieldSelectors {
        title: chain("title", &defaults.title),
        price_combined: chain("price_combined", &defaults.price_combined),
        price_whole: chain("price_whole", &defaults.price_whole),
        price_fraction: chain("price_fraction", &defaults.price_fraction),
        price_generic: chain("price_generic", &defaults.price_generic),
        sold_by: chain("sold_by", &defaults.sold_by),
        ships_from: chain("ships_from", &defaults.ships_from),
        image: chain("image", &defaults.image),
        availability: chain("availability", &defaults.availability),
    }
}

async fn send_notification(config: &AppConfig, summary: &BatchSummary) {
    match config.webhook_url.as_deref() {
        Some(url) => match WebhookNotifier::new(url, NOTIFY_TIMEOUT_SECS) {
            Ok(notifier) => notify_best_effort(&notifier, summary).await,
            Err(err) => {
                tracing::warn!(error = %err, "webhook notifier unavailable, logging instead");
                notify_best_effort(&LogNotifier, summary).await;
            }
        },
        None => notify_best_effort(&LogNotifier, summary).await,
    }
}

/// Mark the run failed, logging any secondary error.
async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: i64, message: String) {
    if let Err(mark_err) = shelfwatch_db::fail_crawl_run(pool, run_id, &message).await {
        tracing::error!(run_id, error = %mark_err, "failed to mark crawl run as failed");
    }
}

fn count_i32(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}
