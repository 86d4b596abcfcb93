//! Selector-chain field extraction.
//!
//! A chain is an ordered list of alternative query expressions for the same
//! logical field; storefront markup churns constantly, so every field gets
//! several shots. The first visible, non-empty, semantically valid match
//! wins. No match across the whole chain is absence, which is a legitimate
//! terminal state, never an error.

use shelfwatch_core::{SelectorEntry, LABEL_ONLY_PHRASES};

use crate::page::{ElementHandle, PageDriver};

/// How a matched element's content is turned into a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Plain text content.
    Text,
    /// Text that labels an identity (seller, ships-from): label-only
    /// matches are discarded, label prefixes stripped.
    LabeledIdentity,
    /// An attribute value, e.g. `src` for images.
    Attribute(&'static str),
}

/// Walk `chain` in priority order and return the first acceptable value.
///
/// Expression- and element-level driver failures are demoted to debug logs
/// and treated as non-matches; a flaky selector must never take the whole
/// attempt down.
pub async fn extract_field(
    driver: &dyn PageDriver,
    field: &str,
    chain: &[SelectorEntry],
    kind: FieldKind,
) -> Option<String> {
    for entry in chain {
        let handles = match driver.query_all(&entry.query, entry.effective_mode()).await {
            Ok(handles) => handles,
            Err(err) => {
                tracing::debug!(field, query = %entry.query, error = %err, "selector query failed");
                continue;
            }
        };

        for handle in &handles {
            if !driver.is_displayed(handle).await.unwrap_or(false) {
                continue;
            }

            let value = match kind {
                FieldKind::Attribute(name) => driver
                    .attribute(handle, name)
                    .await
                    .ok()
                    .flatten()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty()),
                FieldKind::Text => best_text(driver, handle).await,
                FieldKind::LabeledIdentity => match best_text(driver, handle).await {
                    Some(text) => strip_label(&text),
                    None => None,
                },
            };

            if let Some(value) = value {
                tracing::debug!(field, query = %entry.query, "field extracted");
                return Some(value);
            }
        }
    }

    tracing::debug!(field, "no selector in the chain produced a value");
    None
}

/// Read up to three textual representations of an element and keep the
/// longest non-empty one. Longer text is treated as more complete: the
/// rendered form is frequently truncated by layout.
pub(crate) async fn best_text(driver: &dyn PageDriver, handle: &ElementHandle) -> Option<String> {
    let reads = [
        driver.visible_text(handle).await,
        driver.property(handle, "textContent").await,
        driver.property(handle, "innerText").await,
    ];

    let mut best: Option<String> = None;
    for read in reads {
        let Ok(Some(text)) = read else { continue };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if best.as_ref().is_none_or(|b| text.len() > b.len()) {
            best = Some(text.to_string());
        }
    }
    best
}

/// Apply the label-only phrase filter to an identity field candidate.
///
/// An exact label match ("Sold by") is a false positive from a chain entry
/// that landed on the label node instead of the value node; a label prefix
/// ("Sold by: Acme") means the node holds both, so the label is stripped.
fn strip_label(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    for phrase in LABEL_ONLY_PHRASES {
        if lower == *phrase {
            return None;
        }
        if let Some(rest) = strip_prefix_ci(text, phrase) {
            let value = rest.trim_start_matches([':', '-', ' ']).trim();
            if value.is_empty() {
                return None;
            }
            return Some(value.to_string());
        }
    }
    Some(text.to_string())
}

/// Case-insensitive prefix strip that never slices mid-character.
fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut indices = text.char_indices();
    for p in prefix.chars() {
        let (_, t) = indices.next()?;
        if !t.to_lowercase().eq(p.to_lowercase()) {
            return None;
        }
    }
    Some(indices.next().map_or("", |(i, _)| &text[i..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_driver::{FakeDriver, FakeElement, FakePage};
    use shelfwatch_core::SelectorEntry;

    fn chain(queries: &[&str]) -> Vec<SelectorEntry> {
        queries.iter().map(|q| SelectorEntry::new(*q)).collect()
    }

    // ------------------------------------------------------------------
    // strip_label
    // ------------------------------------------------------------------

    #[test]
    fn exact_label_is_discarded() {
        assert_eq!(strip_label("Sold by"), None);
        assert_eq!(strip_label("ships from"), None);
        assert_eq!(strip_label("Vendu par"), None);
    }

    #[test]
    fn label_prefix_is_stripped() {
        assert_eq!(strip_label("Sold by: Acme Store").as_deref(), Some("Acme Store"));
        assert_eq!(strip_label("Vendu par Amazon").as_deref(), Some("Amazon"));
        assert_eq!(strip_label("Verkauft von - MegaShop").as_deref(), Some("MegaShop"));
    }

    #[test]
    fn accented_label_prefix_is_stripped() {
        assert_eq!(strip_label("Expédié par Amazon").as_deref(), Some("Amazon"));
    }

    #[test]
    fn plain_value_passes_through() {
        assert_eq!(strip_label("Acme Store").as_deref(), Some("Acme Store"));
    }

    #[test]
    fn label_with_only_separators_is_discarded() {
        assert_eq!(strip_label("Sold by:  "), None);
    }

    // ------------------------------------------------------------------
    // extract_field
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn earlier_chain_entry_wins_even_when_later_matches() {
        let page = FakePage::default()
            .with_elements("b", vec![FakeElement::visible_text("el-b", "value-b")])
            .with_elements("c", vec![FakeElement::visible_text("el-c", "value-c")]);
        let driver = FakeDriver::with_pages(vec![page]);
        driver.load_first_page();

        let value = extract_field(&driver, "title", &chain(&["a", "b", "c"]), FieldKind::Text).await;
        assert_eq!(value.as_deref(), Some("value-b"));
    }

    #[tokio::test]
    async fn invisible_elements_are_skipped() {
        let page = FakePage::default()
            .with_elements("a", vec![FakeElement::hidden_text("el-a", "hidden value")])
            .with_elements("b", vec![FakeElement::visible_text("el-b", "shown value")]);
        let driver = FakeDriver::with_pages(vec![page]);
        driver.load_first_page();

        let value = extract_field(&driver, "title", &chain(&["a", "b"]), FieldKind::Text).await;
        assert_eq!(value.as_deref(), Some("shown value"));
    }

    #[tokio::test]
    async fn longest_text_representation_wins() {
        let mut element = FakeElement::visible_text("el", "Acme Wid…");
        element.text_content = Some("Acme Widget 3000 with extras".to_string());
        let page = FakePage::default().with_elements("a", vec![element]);
        let driver = FakeDriver::with_pages(vec![page]);
        driver.load_first_page();

        let value = extract_field(&driver, "title", &chain(&["a"]), FieldKind::Text).await;
        assert_eq!(value.as_deref(), Some("Acme Widget 3000 with extras"));
    }

    #[tokio::test]
    async fn label_only_match_falls_through_to_next_entry() {
        let page = FakePage::default()
            .with_elements("a", vec![FakeElement::visible_text("el-a", "Sold by")])
            .with_elements("b", vec![FakeElement::visible_text("el-b", "Acme Store")]);
        let driver = FakeDriver::with_pages(vec![page]);
        driver.load_first_page();

        let value =
            extract_field(&driver, "sold_by", &chain(&["a", "b"]), FieldKind::LabeledIdentity)
                .await;
        assert_eq!(value.as_deref(), Some("Acme Store"));
    }

    #[tokio::test]
    async fn attribute_kind_reads_the_attribute() {
        let mut element = FakeElement::visible_text("img", "");
        element
            .attributes
            .insert("src".to_string(), "https://cdn.example.com/p.jpg".to_string());
        let page = FakePage::default().with_elements("#image", vec![element]);
        let driver = FakeDriver::with_pages(vec![page]);
        driver.load_first_page();

        let value = extract_field(
            &driver,
            "image",
            &chain(&["#image"]),
            FieldKind::Attribute("src"),
        )
        .await;
        assert_eq!(value.as_deref(), Some("https://cdn.example.com/p.jpg"));
    }

    #[tokio::test]
    async fn failing_query_is_absorbed_and_chain_continues() {
        let page = FakePage::default()
            .with_elements("good", vec![FakeElement::visible_text("el", "value")]);
        let driver = FakeDriver::with_pages(vec![page]);
        driver.load_first_page();
        driver.fail_query("bad");

        let value =
            extract_field(&driver, "title", &chain(&["bad", "good"]), FieldKind::Text).await;
        assert_eq!(value.as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn exhausted_chain_yields_absence() {
        let driver = FakeDriver::with_pages(vec![FakePage::default()]);
        driver.load_first_page();

        let value = extract_field(&driver, "title", &chain(&["a", "b"]), FieldKind::Text).await;
        assert_eq!(value, None);
    }
}
