//! Read operations for the `extraction_targets` table.

use async_trait::async_trait;
use sqlx::PgPool;

use shelfwatch_core::{BoxError, ExtractionTarget, TargetMeta, TargetSource};

use crate::DbError;

/// A row from the `extraction_targets` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TargetRow {
    pub id: i64,
    pub site: String,
    pub url: String,
    pub locale: String,
    pub retailer_id: Option<String>,
    pub sku: Option<String>,
    pub brand: Option<String>,
    pub item: Option<String>,
    pub form_factor: Option<String>,
    pub segment_lv1: Option<String>,
    pub segment_lv2: Option<String>,
    pub segment_lv3: Option<String>,
    pub capacity: Option<String>,
}

impl From<TargetRow> for ExtractionTarget {
    fn from(row: TargetRow) -> Self {
        Self {
            id: row.id,
            site: row.site,
            url: row.url,
            locale: row.locale,
            meta: TargetMeta {
                retailer_id: row.retailer_id,
                sku: row.sku,
                brand: row.brand,
                item: row.item,
                form_factor: row.form_factor,
                segment_lv1: row.segment_lv1,
                segment_lv2: row.segment_lv2,
                segment_lv3: row.segment_lv3,
                capacity: row.capacity,
            },
        }
    }
}

/// Up to `limit` active targets for a site, oldest first so the visit order
/// is stable across runs.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn fetch_targets(
    pool: &PgPool,
    site: &str,
    limit: i64,
) -> Result<Vec<TargetRow>, DbError> {
    let rows = sqlx::query_as::<_, TargetRow>(
        "SELECT id, site, url, locale, retailer_id, sku, brand, item, form_factor, \
                segment_lv1, segment_lv2, segment_lv3, capacity \
         FROM extraction_targets \
         WHERE site = $1 AND is_active \
         ORDER BY id \
         LIMIT $2",
    )
    .bind(site)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// [`TargetSource`] over the targets table, scoped to one site.
#[derive(Debug, Clone)]
pub struct PgTargetSource {
    pool: PgPool,
    site: String,
}

impl PgTargetSource {
    #[must_use]
    pub fn new(pool: PgPool, site: impl Into<String>) -> Self {
        Self {
            pool,
            site: site.into(),
        }
    }
}

#[async_trait]
impl TargetSource for PgTargetSource {
    async fn next(&self, limit: i64) -> Result<Vec<ExtractionTarget>, BoxError> {
        let rows = fetch_targets(&self.pool, &self.site, limit).await?;
        Ok(rows.into_iter().map(ExtractionTarget::from).collect())
    }
}
