use serde::{Deserialize, Serialize};

use crate::time::CaptureTimestamps;

/// Catalog metadata carried through from the target list into every result
/// row. The engine never interprets these; they exist so downstream
/// consumers can join results back to their own catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetMeta {
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

/// One product detail page to visit. Immutable once loaded; each retry
/// attempt consumes the same target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionTarget {
    pub id: i64,
    /// Site tag matching a catalog profile (e.g. `us`).
    pub site: String,
    pub url: String,
    /// Locale tag keying the price grammar; usually equal to the profile's.
    pub locale: String,
    pub meta: TargetMeta,
}

/// The extractable page fields. Absence is a legitimate value for every one
/// of them, never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub title: Option<String>,
    /// Canonical decimal string (see the price module), not raw page text.
    pub price: Option<String>,
    pub sold_by: Option<String>,
    pub ships_from: Option<String>,
    pub image_url: Option<String>,
    pub availability: Option<String>,
}

impl ExtractedFields {
    /// Field names paired with an absence flag, in stable order. Drives the
    /// per-field emptiness ratios in batch summaries.
    #[must_use]
    pub fn absence_flags(&self) -> [(&'static str, bool); 6] {
        [
            ("title", self.title.is_none()),
            ("price", self.price.is_none()),
            ("sold_by", self.sold_by.is_none()),
            ("ships_from", self.ships_from.is_none()),
            ("image_url", self.image_url.is_none()),
            ("availability", self.availability.is_none()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    /// The attempt finished without a page-level block. Individual fields
    /// may still be absent.
    Complete,
    /// Every retry was exhausted; all extractable fields are absent.
    Aborted,
}

impl ExtractionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionStatus::Complete => "complete",
            ExtractionStatus::Aborted => "aborted",
        }
    }
}

/// The outcome of processing one target, exactly one per target per batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub target: ExtractionTarget,
    pub fields: ExtractedFields,
    pub vat_included: bool,
    pub captured: CaptureTimestamps,
    pub status: ExtractionStatus,
}

impl ExtractionResult {
    /// Build a completed result, enforcing the attribution rule: a price
    /// with neither seller nor ships-from present is untrustworthy (it was
    /// most likely read off the wrong offer widget) and is cleared.
    #[must_use]
    pub fn completed(
        target: ExtractionTarget,
        mut fields: ExtractedFields,
        vat_included: bool,
        captured: CaptureTimestamps,
    ) -> Self {
        if fields.sold_by.is_none() && fields.ships_from.is_none() {
            fields.price = None;
        }
        Self {
            target,
            fields,
            vat_included,
            captured,
            status: ExtractionStatus::Complete,
        }
    }

    /// Build the terminal give-up result: target identity and timestamps
    /// preserved, every extractable field absent.
    #[must_use]
    pub fn aborted(
        target: ExtractionTarget,
        vat_included: bool,
        captured: CaptureTimestamps,
    ) -> Self {
        Self {
            target,
            fields: ExtractedFields::default(),
            vat_included,
            captured,
            status: ExtractionStatus::Aborted,
        }
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.status == ExtractionStatus::Aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ExtractionTarget {
        ExtractionTarget {
            id: 7,
            site: "us".to_string(),
            url: "https://shop.example.com/dp/B000000".to_string(),
            locale: "us".to_string(),
            meta: TargetMeta {
                sku: Some("B000000".to_string()),
                brand: Some("Acme".to_string()),
                ..TargetMeta::default()
            },
        }
    }

    fn stamps() -> CaptureTimestamps {
        CaptureTimestamps::at(
            chrono::DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
                .unwrap()
                .with_timezone(&chrono::Utc),
            chrono_tz::America::New_York,
            chrono_tz::Asia::Seoul,
        )
    }

    #[test]
    fn completed_keeps_price_when_seller_present() {
        let fields = ExtractedFields {
            price: Some("99.90".to_string()),
            sold_by: Some("Acme Retail".to_string()),
            ..ExtractedFields::default()
        };
        let result = ExtractionResult::completed(target(), fields, false, stamps());
        assert_eq!(result.fields.price.as_deref(), Some("99.90"));
    }

    #[test]
    fn completed_keeps_price_when_only_ships_from_present() {
        let fields = ExtractedFields {
            price: Some("99.90".to_string()),
            ships_from: Some("Acme Warehouse".to_string()),
            ..ExtractedFields::default()
        };
        let result = ExtractionResult::completed(target(), fields, false, stamps());
        assert_eq!(result.fields.price.as_deref(), Some("99.90"));
    }

    #[test]
    fn completed_clears_price_when_both_attributions_absent() {
        let fields = ExtractedFields {
            title: Some("Acme Widget".to_string()),
            price: Some("99.90".to_string()),
            ..ExtractedFields::default()
        };
        let result = ExtractionResult::completed(target(), fields, false, stamps());
        assert_eq!(result.fields.price, None, "unattributed price must clear");
        assert_eq!(result.fields.title.as_deref(), Some("Acme Widget"));
    }

    #[test]
    fn aborted_has_every_field_absent() {
        let result = ExtractionResult::aborted(target(), true, stamps());
        assert!(result.is_aborted());
        assert!(result
            .fields
            .absence_flags()
            .iter()
            .all(|(_, absent)| *absent));
        assert_eq!(result.target.id, 7, "target identity survives the abort");
    }

    #[test]
    fn absence_flags_track_field_state() {
        let fields = ExtractedFields {
            title: Some("x".to_string()),
            ..ExtractedFields::default()
        };
        let flags = fields.absence_flags();
        assert_eq!(flags[0], ("title", false));
        assert_eq!(flags[1], ("price", true));
    }

    #[test]
    fn status_round_trips_as_str() {
        assert_eq!(ExtractionStatus::Complete.as_str(), "complete");
        assert_eq!(ExtractionStatus::Aborted.as_str(), "aborted");
    }
}
