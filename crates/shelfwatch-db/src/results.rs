//! Write operations for result rows.
//!
//! Appends are the only write: result tables are an audit trail, never
//! updated in place, so partial-batch flushes can interleave freely.

use async_trait::async_trait;
use sqlx::PgPool;

use shelfwatch_core::{BoxError, ExtractionResult, ResultSink};

use crate::DbError;

/// Append a batch of result rows in one round-trip.
///
/// The table name comes from configuration (deployments archive into
/// per-period tables), so it is interpolated, not bound; the identifier
/// guard below rejects anything that is not a plain SQL identifier.
///
/// Uses a single `INSERT … SELECT * FROM UNNEST(…)` with one array per
/// column so the round-trip count does not grow with the batch.
///
/// # Errors
///
/// Returns [`DbError::InvalidTableName`] for a malformed table name, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn append_results(
    pool: &PgPool,
    table: &str,
    results: &[ExtractionResult],
) -> Result<u64, DbError> {
    if !is_plain_identifier(table) {
        return Err(DbError::InvalidTableName {
            name: table.to_string(),
        });
    }
    if results.is_empty() {
        return Ok(0);
    }

    // Collect each column into a parallel Vec for UNNEST binding.
    let mut target_ids: Vec<i64> = Vec::with_capacity(results.len());
    let mut sites: Vec<String> = Vec::with_capacity(results.len());
    let mut urls: Vec<String> = Vec::with_capacity(results.len());
    let mut statuses: Vec<String> = Vec::with_capacity(results.len());
    let mut titles: Vec<Option<String>> = Vec::with_capacity(results.len());
    let mut prices: Vec<Option<String>> = Vec::with_capacity(results.len());
    let mut sold_bys: Vec<Option<String>> = Vec::with_capacity(results.len());
    let mut ships_froms: Vec<Option<String>> = Vec::with_capacity(results.len());
    let mut image_urls: Vec<Option<String>> = Vec::with_capacity(results.len());
    let mut availabilities: Vec<Option<String>> = Vec::with_capacity(results.len());
    let mut vat_includeds: Vec<bool> = Vec::with_capacity(results.len());
    let mut captured_locals: Vec<String> = Vec::with_capacity(results.len());
    let mut captured_local_compacts: Vec<String> = Vec::with_capacity(results.len());
    let mut captured_references: Vec<String> = Vec::with_capacity(results.len());
    let mut captured_reference_compacts: Vec<String> = Vec::with_capacity(results.len());

    for result in results {
        target_ids.push(result.target.id);
        sites.push(result.target.site.clone());
        urls.push(result.target.url.clone());
        statuses.push(result.status.as_str().to_string());
        titles.push(result.fields.title.clone());
        prices.push(result.fields.price.clone());
        sold_bys.push(result.fields.sold_by.clone());
        ships_froms.push(result.fields.ships_from.clone());
        image_urls.push(result.fields.image_url.clone());
        availabilities.push(result.fields.availability.clone());
        vat_includeds.push(result.vat_included);
        captured_locals.push(result.captured.local.clone());
        captured_local_compacts.push(result.captured.local_compact.clone());
        captured_references.push(result.captured.reference.clone());
        captured_reference_compacts.push(result.captured.reference_compact.clone());
    }

    let sql = format!(
        "INSERT INTO {table} \
             (target_id, site, url, status, title, price, sold_by, ships_from, \
              image_url, availability, vat_included, captured_local, \
              captured_local_compact, captured_reference, captured_reference_compact) \
         SELECT * FROM UNNEST(\
              $1::bigint[], $2::text[], $3::text[], $4::text[], $5::text[], $6::text[], \
              $7::text[], $8::text[], $9::text[], $10::text[], $11::boolean[], \
              $12::text[], $13::text[], $14::text[], $15::text[])"
    );

    let outcome = sqlx::query(&sql)
        .bind(&target_ids)
        .bind(&sites)
        .bind(&urls)
        .bind(&statuses)
        .bind(&titles)
        .bind(&prices)
        .bind(&sold_bys)
        .bind(&ships_froms)
        .bind(&image_urls)
        .bind(&availabilities)
        .bind(&vat_includeds)
        .bind(&captured_locals)
        .bind(&captured_local_compacts)
        .bind(&captured_references)
        .bind(&captured_reference_compacts)
        .execute(pool)
        .await?;

    Ok(outcome.rows_affected())
}

/// A plain unquoted SQL identifier: ASCII letter or underscore first, then
/// letters, digits, or underscores.
fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// [`ResultSink`] over a Postgres results table.
#[derive(Debug, Clone)]
pub struct PgResultSink {
    pool: PgPool,
}

impl PgResultSink {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultSink for PgResultSink {
    async fn append(&self, table: &str, results: &[ExtractionResult]) -> Result<(), BoxError> {
        let appended = append_results(&self.pool, table, results).await?;
        tracing::info!(table, rows = appended, "result rows appended");
        Ok(())
    }
}
