//! Price extraction tiers.
//!
//! Three tiers, tried in order, all feeding the same locale grammar:
//!
//! 1. combined: a single node already carrying the full amount. Trusted
//!    only when the text shows the locale's decimal separator, because a
//!    bare "1299" in a combined node is as likely a review count.
//! 2. split: separate whole/fraction nodes, reconstructed digit-wise.
//! 3. generic: any price-bearing region, scanned for the first substring
//!    matching the grammar.
//!
//! Whatever a tier produces still has to pass normalization and the sane
//! bounds check before it is believed.

use shelfwatch_core::{
    find_price_candidate, normalize_with, FieldSelectors, PriceBounds, PriceFormat, SelectorEntry,
};

use crate::extract::best_text;
use crate::page::PageDriver;

/// Run the tiers against the current page. `None` means no tier produced a
/// validated amount, which the caller records as absence.
pub async fn extract_price(
    driver: &dyn PageDriver,
    selectors: &FieldSelectors,
    format: PriceFormat,
    bounds: &PriceBounds,
) -> Option<String> {
    if let Some(price) = combined_tier(driver, selectors, format, bounds).await {
        tracing::debug!(%price, "price from combined node");
        return Some(price);
    }
    if let Some(price) = split_tier(driver, selectors, bounds).await {
        tracing::debug!(%price, "price reconstructed from whole/fraction nodes");
        return Some(price);
    }
    if let Some(price) = generic_tier(driver, selectors, format, bounds).await {
        tracing::debug!(%price, "price from generic scan");
        return Some(price);
    }
    tracing::debug!("no price tier produced a validated amount");
    None
}

async fn combined_tier(
    driver: &dyn PageDriver,
    selectors: &FieldSelectors,
    format: PriceFormat,
    bounds: &PriceBounds,
) -> Option<String> {
    for entry in &selectors.price_combined {
        let handles = match driver.query_all(&entry.query, entry.effective_mode()).await {
            Ok(handles) => handles,
            Err(err) => {
                tracing::debug!(query = %entry.query, error = %err, "combined price query failed");
                continue;
            }
        };
        for handle in &handles {
            if !driver.is_displayed(handle).await.unwrap_or(false) {
                continue;
            }
            let Some(text) = best_text(driver, handle).await else {
                continue;
            };
            if let Some(sep) = format.decimal_separator() {
                if !text.contains(sep) {
                    continue;
                }
            }
            if let Some(price) = normalize_with(&text, format, bounds) {
                return Some(price);
            }
        }
    }
    None
}

async fn split_tier(
    driver: &dyn PageDriver,
    selectors: &FieldSelectors,
    bounds: &PriceBounds,
) -> Option<String> {
    let whole = first_digits(driver, &selectors.price_whole).await?;
    let candidate = match first_digits(driver, &selectors.price_fraction).await {
        Some(fraction) => format!("{whole}.{fraction}"),
        None => whole,
    };
    // Digit extraction already dropped grouping, so the reconstruction is
    // period-form regardless of locale.
    normalize_with(&candidate, PriceFormat::PeriodDecimal, bounds)
}

async fn generic_tier(
    driver: &dyn PageDriver,
    selectors: &FieldSelectors,
    format: PriceFormat,
    bounds: &PriceBounds,
) -> Option<String> {
    for entry in &selectors.price_generic {
        let handles = match driver.query_all(&entry.query, entry.effective_mode()).await {
            Ok(handles) => handles,
            Err(err) => {
                tracing::debug!(query = %entry.query, error = %err, "generic price query failed");
                continue;
            }
        };
        for handle in &handles {
            if !driver.is_displayed(handle).await.unwrap_or(false) {
                continue;
            }
            let Some(text) = best_text(driver, handle).await else {
                continue;
            };
            let Some(candidate) = find_price_candidate(&text, format) else {
                continue;
            };
            if let Some(price) = normalize_with(&candidate, format, bounds) {
                return Some(price);
            }
        }
    }
    None
}

/// First chain match whose text carries any digits, reduced to digits only.
async fn first_digits(driver: &dyn PageDriver, chain: &[SelectorEntry]) -> Option<String> {
    for entry in chain {
        let handles = match driver.query_all(&entry.query, entry.effective_mode()).await {
            Ok(handles) => handles,
            Err(err) => {
                tracing::debug!(query = %entry.query, error = %err, "price part query failed");
                continue;
            }
        };
        for handle in &handles {
            if !driver.is_displayed(handle).await.unwrap_or(false) {
                continue;
            }
            let Some(text) = best_text(driver, handle).await else {
                continue;
            };
            let digits: String = text.chars().filter(char::is_ascii_digit).collect();
            if !digits.is_empty() {
                return Some(digits);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_driver::{FakeDriver, FakeElement, FakePage};

    fn chain(queries: &[&str]) -> Vec<SelectorEntry> {
        queries.iter().map(|q| SelectorEntry::new(*q)).collect()
    }

    fn driver_for(page: FakePage) -> FakeDriver {
        let driver = FakeDriver::with_pages(vec![page]);
        driver.load_first_page();
        driver
    }

    #[tokio::test]
    async fn combined_node_wins_when_it_carries_the_separator() {
        let page = FakePage::default()
            .with_elements("#price", vec![FakeElement::visible_text("p", "1.299,99 €")]);
        let selectors = FieldSelectors {
            price_combined: chain(&["#price"]),
            ..FieldSelectors::default()
        };
        let driver = driver_for(page);

        let price = extract_price(
            &driver,
            &selectors,
            PriceFormat::CommaDecimal,
            &PriceBounds::default(),
        )
        .await;
        assert_eq!(price.as_deref(), Some("1299.99"));
    }

    #[tokio::test]
    async fn combined_node_without_separator_defers_to_split_nodes() {
        let page = FakePage::default()
            .with_elements("#price", vec![FakeElement::visible_text("p", "1299")])
            .with_elements("#whole", vec![FakeElement::visible_text("w", "1.299")])
            .with_elements("#fraction", vec![FakeElement::visible_text("f", "99")]);
        let selectors = FieldSelectors {
            price_combined: chain(&["#price"]),
            price_whole: chain(&["#whole"]),
            price_fraction: chain(&["#fraction"]),
            ..FieldSelectors::default()
        };
        let driver = driver_for(page);

        let price = extract_price(
            &driver,
            &selectors,
            PriceFormat::CommaDecimal,
            &PriceBounds::default(),
        )
        .await;
        assert_eq!(price.as_deref(), Some("1299.99"));
    }

    #[tokio::test]
    async fn split_reconstruction_without_fraction_is_integer() {
        let page = FakePage::default()
            .with_elements("#whole", vec![FakeElement::visible_text("w", "449")]);
        let selectors = FieldSelectors {
            price_whole: chain(&["#whole"]),
            price_fraction: chain(&["#fraction"]),
            ..FieldSelectors::default()
        };
        let driver = driver_for(page);

        let price = extract_price(
            &driver,
            &selectors,
            PriceFormat::PeriodDecimal,
            &PriceBounds::default(),
        )
        .await;
        assert_eq!(price.as_deref(), Some("449"));
    }

    #[tokio::test]
    async fn generic_tier_scans_prose() {
        let page = FakePage::default().with_elements(
            "#buybox",
            vec![FakeElement::visible_text(
                "b",
                "Price: $1,299.99 & FREE Returns",
            )],
        );
        let selectors = FieldSelectors {
            price_generic: chain(&["#buybox"]),
            ..FieldSelectors::default()
        };
        let driver = driver_for(page);

        let price = extract_price(
            &driver,
            &selectors,
            PriceFormat::PeriodDecimal,
            &PriceBounds::default(),
        )
        .await;
        assert_eq!(price.as_deref(), Some("1299.99"));
    }

    #[tokio::test]
    async fn integer_only_locale_needs_no_separator() {
        let page = FakePage::default()
            .with_elements("#price", vec![FakeElement::visible_text("p", "¥1,299")]);
        let selectors = FieldSelectors {
            price_combined: chain(&["#price"]),
            ..FieldSelectors::default()
        };
        let driver = driver_for(page);

        let price = extract_price(
            &driver,
            &selectors,
            PriceFormat::IntegerOnly,
            &PriceBounds::default(),
        )
        .await;
        assert_eq!(price.as_deref(), Some("1299"));
    }

    #[tokio::test]
    async fn prose_in_combined_node_falls_to_later_entry() {
        let page = FakePage::default()
            .with_elements("#a", vec![FakeElement::visible_text("a", "Currently unavailable")])
            .with_elements("#b", vec![FakeElement::visible_text("b", "279.99")]);
        let selectors = FieldSelectors {
            price_combined: chain(&["#a", "#b"]),
            ..FieldSelectors::default()
        };
        let driver = driver_for(page);

        let price = extract_price(
            &driver,
            &selectors,
            PriceFormat::PeriodDecimal,
            &PriceBounds::default(),
        )
        .await;
        assert_eq!(price.as_deref(), Some("279.99"));
    }

    #[tokio::test]
    async fn nothing_extractable_yields_none() {
        let page = FakePage::default();
        let selectors = FieldSelectors {
            price_combined: chain(&["#price"]),
            price_generic: chain(&["#buybox"]),
            ..FieldSelectors::default()
        };
        let driver = driver_for(page);

        let price = extract_price(
            &driver,
            &selectors,
            PriceFormat::PeriodDecimal,
            &PriceBounds::default(),
        )
        .await;
        assert_eq!(price, None);
    }
}
