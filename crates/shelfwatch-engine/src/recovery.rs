//! Interstitial recovery.
//!
//! Soft blocks are dismissable: the page offers a "continue shopping"
//! control and pressing it usually lands back on the product. Strategies
//! run in order of confidence and the first successful click wins; the
//! caller re-captures and re-classifies afterwards to see whether the
//! dismissal actually worked.

use shelfwatch_core::{QueryMode, SelectorEntry};

use crate::page::{ElementHandle, PageDriver};

const XPATH_UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const XPATH_LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

/// Try to dismiss a soft-block interstitial. Returns `true` when a
/// dismissal control accepted a click.
pub async fn attempt_recovery(
    driver: &dyn PageDriver,
    recovery_selectors: &[SelectorEntry],
    soft_phrases: &[String],
) -> bool {
    // Strategy 1: profile-configured dismissal controls.
    for entry in recovery_selectors {
        if click_first_match(driver, &entry.query, entry.effective_mode()).await {
            tracing::info!(query = %entry.query, "interstitial dismissed via configured selector");
            return true;
        }
    }

    // Strategy 2: buttons and submit inputs carrying a known phrase.
    for phrase in soft_phrases {
        for expression in [button_xpath(phrase), submit_xpath(phrase)] {
            if click_first_match(driver, &expression, QueryMode::XPath).await {
                tracing::info!(%phrase, "interstitial dismissed via button text");
                return true;
            }
        }
    }

    // Strategy 3: a plain link carrying the phrase, for shells that render
    // the dismissal as an anchor.
    for phrase in soft_phrases {
        if click_first_match(driver, &anchor_xpath(phrase), QueryMode::XPath).await {
            tracing::info!(%phrase, "interstitial dismissed via link text");
            return true;
        }
    }

    tracing::warn!("no dismissal control found on soft-blocked page");
    false
}

/// Case-insensitive text match in XPath 1.0: lowercase the node text via
/// translate() and compare against the already-lowercase phrase.
fn button_xpath(phrase: &str) -> String {
    format!(
        "//button[contains(translate(normalize-space(.), '{XPATH_UPPER}', '{XPATH_LOWER}'), '{phrase}')]"
    )
}

fn submit_xpath(phrase: &str) -> String {
    format!(
        "//input[@type='submit' and contains(translate(@value, '{XPATH_UPPER}', '{XPATH_LOWER}'), '{phrase}')]"
    )
}

fn anchor_xpath(phrase: &str) -> String {
    format!(
        "//a[contains(translate(normalize-space(.), '{XPATH_UPPER}', '{XPATH_LOWER}'), '{phrase}')]"
    )
}

async fn click_first_match(driver: &dyn PageDriver, expression: &str, mode: QueryMode) -> bool {
    let handles = match driver.query_all(expression, mode).await {
        Ok(handles) => handles,
        Err(err) => {
            tracing::debug!(query = %expression, error = %err, "recovery query failed");
            return false;
        }
    };
    for handle in &handles {
        if !driver.is_displayed(handle).await.unwrap_or(false) {
            continue;
        }
        if try_click(driver, handle).await {
            return true;
        }
    }
    false
}

/// Native click with a script-click fallback for overlapped controls.
async fn try_click(driver: &dyn PageDriver, handle: &ElementHandle) -> bool {
    if let Err(err) = driver.scroll_into_view(handle).await {
        tracing::debug!(error = %err, "scroll before click failed");
    }
    match driver.click(handle).await {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(error = %err, "native click failed, trying script click");
            driver.click_via_script(handle).await.is_ok()
        }
    }
}
