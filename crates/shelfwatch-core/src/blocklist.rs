//! Built-in interstitial signatures and label phrases.
//!
//! These sets are append-only: site profiles may add phrases on top but
//! never remove the base ones. All entries are lowercase; matching happens
//! against lowercased page text.

use crate::profile::SiteProfile;

/// Phrases that only appear on a real product page. Three or more of these
/// on a page overrule every block signature.
pub const NORMAL_PAGE_INDICATORS: &[&str] = &[
    "add to cart",
    "buy now",
    "product title",
    "price",
    "availability",
    "customer reviews",
    "product details",
    "ships from",
    "sold by",
];

/// Title fragments of terminal denial pages.
pub const HARD_BLOCK_TITLE_SIGNATURES: &[&str] = &[
    "503",
    "access denied",
    "error has occurred",
    "service unavailable",
    "sorry! something went wrong",
];

/// Body fragments of challenge pages (CAPTCHA and friends).
pub const HARD_BLOCK_CONTENT_SIGNATURES: &[&str] = &[
    "enter the characters you see below",
    "type the characters you see in this image",
    "verify you are human",
    "automated access",
    "unusual traffic",
    "suspicious activity",
    "robot check",
];

/// Dismissible-interstitial phrases, one per supported storefront language.
pub const SOFT_BLOCK_PHRASES: &[&str] = &[
    "continue shopping",
    "weiter shoppen",
    "continuer les achats",
    "continua a fare acquisti",
    "seguir comprando",
    "ショッピングを続ける",
];

/// Label-only strings that selector chains for seller/ships-from sometimes
/// land on instead of the value they label.
pub const LABEL_ONLY_PHRASES: &[&str] = &[
    "sold by",
    "ships from",
    "vendu par",
    "expédié par",
    "verkauft von",
    "versendet von",
    "venduto da",
    "spedito da",
    "vendido por",
    "enviado por",
];

/// The signature sets in effect for one site: the base sets plus whatever
/// the profile appends.
#[derive(Debug, Clone)]
pub struct BlockSignatures {
    pub normal_indicators: Vec<String>,
    pub hard_title: Vec<String>,
    pub hard_content: Vec<String>,
    pub soft: Vec<String>,
}

impl BlockSignatures {
    #[must_use]
    pub fn base() -> Self {
        Self {
            normal_indicators: to_owned(NORMAL_PAGE_INDICATORS),
            hard_title: to_owned(HARD_BLOCK_TITLE_SIGNATURES),
            hard_content: to_owned(HARD_BLOCK_CONTENT_SIGNATURES),
            soft: to_owned(SOFT_BLOCK_PHRASES),
        }
    }

    #[must_use]
    pub fn for_profile(profile: &SiteProfile) -> Self {
        let mut sig = Self::base();
        sig.soft
            .extend(profile.extra_soft_phrases.iter().map(|p| p.to_lowercase()));
        sig.hard_title
            .extend(profile.extra_hard_title_phrases.iter().map(|p| p.to_lowercase()));
        sig.hard_content
            .extend(profile.extra_hard_content_phrases.iter().map(|p| p.to_lowercase()));
        sig
    }
}

fn to_owned(set: &[&str]) -> Vec<String> {
    set.iter().map(|s| (*s).to_string()).collect()
}
