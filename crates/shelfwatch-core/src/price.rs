//! Locale-aware price normalization.
//!
//! Raw price text scraped off a page ("1.299,99 €", "$1,299.99", "¥1,299")
//! is normalized into a canonical decimal string with `.` as the fraction
//! separator and no grouping ("1299.99", "1299"). The grammar is keyed by
//! locale tag, never sniffed from the text itself: "1.299" is one thousand
//! two hundred ninety-nine in Berlin and a rounding oddity in Boston.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Numeric grammar for one locale family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceFormat {
    /// Comma as decimal separator, period as grouping (most of continental
    /// Europe): `1.299,99`.
    CommaDecimal,
    /// Period as decimal separator, comma as grouping (US/UK/India-like):
    /// `1,299.99`.
    PeriodDecimal,
    /// No fractional unit at all (Japan-like): `1,299`.
    IntegerOnly,
}

impl PriceFormat {
    /// Grammar implied by a locale tag. Unknown tags fall back to the
    /// period-decimal grammar.
    #[must_use]
    pub fn for_locale(tag: &str) -> Self {
        match tag.to_lowercase().as_str() {
            "de" | "fr" | "it" | "es" | "nl" | "at" | "be" => PriceFormat::CommaDecimal,
            "jp" => PriceFormat::IntegerOnly,
            _ => PriceFormat::PeriodDecimal,
        }
    }

    /// The decimal separator a combined-representation candidate must carry
    /// to be trusted. Integer-only locales have none.
    #[must_use]
    pub fn decimal_separator(self) -> Option<char> {
        match self {
            PriceFormat::CommaDecimal => Some(','),
            PriceFormat::PeriodDecimal => Some('.'),
            PriceFormat::IntegerOnly => None,
        }
    }
}

/// Sane-amount window; values outside it are rejected as noise picked up
/// from unrelated page regions. Configurable per deployment, wide enough by
/// default for integer-yen price tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBounds {
    pub min: Decimal,
    pub max: Decimal,
}

impl Default for PriceBounds {
    fn default() -> Self {
        Self {
            min: Decimal::new(1, 2),
            max: Decimal::from(10_000_000),
        }
    }
}

static COMMA_DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}(?:\.\d{3})+(?:,\d{1,2})?$|^\d+(?:,\d{1,2})?$")
        .unwrap_or_else(|e| panic!("comma-decimal pattern: {e}"))
});

static PERIOD_DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}(?:,\d{2,3})+(?:\.\d{1,2})?$|^\d+(?:\.\d{1,2})?$")
        .unwrap_or_else(|e| panic!("period-decimal pattern: {e}"))
});

static INTEGER_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}(?:,\d{3})+$|^\d+$")
        .unwrap_or_else(|e| panic!("integer-only pattern: {e}"))
});

static COMMA_DECIMAL_SCAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:\.\d{3})+(?:,\d{1,2})?|\d+(?:,\d{1,2})?")
        .unwrap_or_else(|e| panic!("comma-decimal scan pattern: {e}"))
});

static PERIOD_DECIMAL_SCAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:,\d{2,3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?")
        .unwrap_or_else(|e| panic!("period-decimal scan pattern: {e}"))
});

static INTEGER_ONLY_SCAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:,\d{3})+|\d+").unwrap_or_else(|e| panic!("integer scan pattern: {e}"))
});

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹', '￥', '₩'];

/// Normalize raw price text for a locale tag using default bounds.
///
/// Returns `None` for anything that is not a well-formed price in that
/// locale's grammar: leftover non-numeric residue, wrong separators, or an
/// amount outside the sane window.
#[must_use]
pub fn normalize(raw: &str, locale: &str) -> Option<String> {
    normalize_with(raw, PriceFormat::for_locale(locale), &PriceBounds::default())
}

/// Grammar- and bounds-explicit variant of [`normalize`].
#[must_use]
pub fn normalize_with(raw: &str, format: PriceFormat, bounds: &PriceBounds) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !CURRENCY_SYMBOLS.contains(c))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let canonical = match format {
        PriceFormat::CommaDecimal => {
            if !COMMA_DECIMAL.is_match(&cleaned) {
                return None;
            }
            cleaned.replace('.', "").replace(',', ".")
        }
        PriceFormat::PeriodDecimal => {
            if !PERIOD_DECIMAL.is_match(&cleaned) {
                return None;
            }
            cleaned.replace(',', "")
        }
        PriceFormat::IntegerOnly => {
            if !INTEGER_ONLY.is_match(&cleaned) {
                return None;
            }
            cleaned.replace([',', '.'], "")
        }
    };

    let value = Decimal::from_str(&canonical).ok()?;
    if value < bounds.min || value > bounds.max {
        return None;
    }

    Some(canonical)
}

/// Pull the first price-looking substring out of arbitrary text, in the
/// given grammar. Used by the generic extraction tier, where the matched
/// node carries prose around the amount; the result still has to pass
/// [`normalize_with`] before it is accepted.
#[must_use]
pub fn find_price_candidate(text: &str, format: PriceFormat) -> Option<String> {
    let pattern = match format {
        PriceFormat::CommaDecimal => &COMMA_DECIMAL_SCAN,
        PriceFormat::PeriodDecimal => &PERIOD_DECIMAL_SCAN,
        PriceFormat::IntegerOnly => &INTEGER_ONLY_SCAN,
    };
    pattern.find(text).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------
    // Grammar selection
    // ------------------------------------------------------------------

    #[test]
    fn locale_tags_map_to_grammars() {
        assert_eq!(PriceFormat::for_locale("de"), PriceFormat::CommaDecimal);
        assert_eq!(PriceFormat::for_locale("fr"), PriceFormat::CommaDecimal);
        assert_eq!(PriceFormat::for_locale("jp"), PriceFormat::IntegerOnly);
        assert_eq!(PriceFormat::for_locale("us"), PriceFormat::PeriodDecimal);
        assert_eq!(PriceFormat::for_locale("uk"), PriceFormat::PeriodDecimal);
        assert_eq!(PriceFormat::for_locale("in"), PriceFormat::PeriodDecimal);
    }

    #[test]
    fn unknown_locale_falls_back_to_period_decimal() {
        assert_eq!(PriceFormat::for_locale("xx"), PriceFormat::PeriodDecimal);
    }

    // ------------------------------------------------------------------
    // Canonicalization per grammar
    // ------------------------------------------------------------------

    #[test]
    fn comma_decimal_grouping_and_fraction() {
        assert_eq!(normalize("1.299,99", "de").as_deref(), Some("1299.99"));
    }

    #[test]
    fn period_decimal_grouping_and_fraction() {
        assert_eq!(normalize("1,299.99", "us").as_deref(), Some("1299.99"));
    }

    #[test]
    fn integer_only_strips_grouping() {
        assert_eq!(normalize("¥1,299", "jp").as_deref(), Some("1299"));
    }

    #[test]
    fn prose_is_rejected() {
        assert_eq!(normalize("free shipping", "us"), None);
    }

    #[test]
    fn fraction_digits_are_preserved_verbatim() {
        assert_eq!(normalize("99,90 €", "fr").as_deref(), Some("99.90"));
        assert_eq!(normalize("99,9", "fr").as_deref(), Some("99.9"));
    }

    #[test]
    fn currency_symbols_and_whitespace_are_stripped() {
        assert_eq!(normalize("$ 279.99", "us").as_deref(), Some("279.99"));
        assert_eq!(normalize("279,99\u{a0}€", "de").as_deref(), Some("279.99"));
        assert_eq!(normalize("£12.50", "uk").as_deref(), Some("12.50"));
    }

    #[test]
    fn wrong_grammar_for_locale_is_rejected() {
        // Comma-decimal text fed through the US grammar and vice versa.
        assert_eq!(normalize("1.299,99", "us"), None);
        assert_eq!(normalize("1,299.99", "de"), None);
    }

    #[test]
    fn indian_grouping_is_accepted() {
        assert_eq!(normalize("1,29,999.00", "in").as_deref(), Some("129999.00"));
    }

    #[test]
    fn empty_and_symbol_only_input_is_rejected() {
        assert_eq!(normalize("", "us"), None);
        assert_eq!(normalize("$ ", "us"), None);
    }

    // ------------------------------------------------------------------
    // Bounds
    // ------------------------------------------------------------------

    #[test]
    fn amounts_outside_bounds_are_rejected() {
        let bounds = PriceBounds {
            min: Decimal::from(5),
            max: Decimal::from(500),
        };
        assert_eq!(
            normalize_with("4.99", PriceFormat::PeriodDecimal, &bounds),
            None
        );
        assert_eq!(
            normalize_with("501", PriceFormat::PeriodDecimal, &bounds),
            None
        );
        assert_eq!(
            normalize_with("5.00", PriceFormat::PeriodDecimal, &bounds).as_deref(),
            Some("5.00")
        );
    }

    #[test]
    fn zero_is_below_default_bounds() {
        assert_eq!(normalize("0", "us"), None);
        assert_eq!(normalize("0,00", "de"), None);
    }

    // ------------------------------------------------------------------
    // Candidate scanning
    // ------------------------------------------------------------------

    #[test]
    fn candidate_is_found_inside_prose() {
        assert_eq!(
            find_price_candidate("Price: $1,299.99 & FREE Returns", PriceFormat::PeriodDecimal)
                .as_deref(),
            Some("1,299.99")
        );
        assert_eq!(
            find_price_candidate("nur 1.299,99 inkl. MwSt", PriceFormat::CommaDecimal).as_deref(),
            Some("1.299,99")
        );
    }

    #[test]
    fn candidate_absent_in_plain_prose() {
        assert_eq!(
            find_price_candidate("currently unavailable", PriceFormat::PeriodDecimal),
            None
        );
    }

    #[test]
    fn decimal_separator_per_grammar() {
        assert_eq!(PriceFormat::CommaDecimal.decimal_separator(), Some(','));
        assert_eq!(PriceFormat::PeriodDecimal.decimal_separator(), Some('.'));
        assert_eq!(PriceFormat::IntegerOnly.decimal_separator(), None);
    }
}
