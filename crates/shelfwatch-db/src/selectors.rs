//! Read operations for the `selector_overrides` table.
//!
//! Operators push fresh selectors here when a storefront layout shifts,
//! without redeploying the catalog file. Overrides are merged ahead of the
//! profile's own chains at session start.

use std::collections::HashMap;

use sqlx::PgPool;

use shelfwatch_core::{QueryMode, SelectorEntry};

use crate::DbError;

/// A row from the `selector_overrides` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SelectorOverrideRow {
    pub id: i64,
    pub site: String,
    /// Logical field the override targets (`title`, `price_combined`, ...).
    pub field: String,
    pub query: String,
    /// Stored mode tag; `None` or an unknown tag falls back to inference.
    pub mode: Option<String>,
    pub priority: i32,
}

/// Active overrides for a site, ordered so that per-field chains come out
/// highest-priority first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn fetch_selector_overrides(
    pool: &PgPool,
    site: &str,
) -> Result<Vec<SelectorOverrideRow>, DbError> {
    let rows = sqlx::query_as::<_, SelectorOverrideRow>(
        "SELECT id, site, field, query, mode, priority \
         FROM selector_overrides \
         WHERE site = $1 AND is_active \
         ORDER BY field, priority, id",
    )
    .bind(site)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Group override rows into per-field chains ready for
/// [`shelfwatch_core::merge_selectors`]. Row order is preserved within each
/// field.
#[must_use]
pub fn overrides_as_chains(rows: Vec<SelectorOverrideRow>) -> HashMap<String, Vec<SelectorEntry>> {
    let mut chains: HashMap<String, Vec<SelectorEntry>> = HashMap::new();
    for row in rows {
        let mode = row.mode.as_deref().and_then(QueryMode::parse);
        chains.entry(row.field).or_default().push(SelectorEntry {
            query: row.query,
            mode,
        });
    }
    chains
}
