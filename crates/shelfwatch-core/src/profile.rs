use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::price::{PriceBounds, PriceFormat};
use crate::ConfigError;

/// Addressing mode for a page-query expression.
///
/// `XPath` walks the document hierarchy; `Css` matches on attributes and
/// classes. Every selector entry is one or the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    XPath,
    Css,
}

impl QueryMode {
    /// Guess the mode from the expression itself. XPath expressions start
    /// with an axis step or a grouping paren; everything else is CSS.
    #[must_use]
    pub fn infer(expression: &str) -> Self {
        let trimmed = expression.trim_start();
        if trimmed.starts_with("//") || trimmed.starts_with("(") || trimmed.starts_with("./") {
            QueryMode::XPath
        } else {
            QueryMode::Css
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QueryMode::XPath => "xpath",
            QueryMode::Css => "css",
        }
    }

    /// Parse a stored mode tag. Unknown or missing tags yield `None`, in
    /// which case callers fall back to [`QueryMode::infer`].
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "xpath" => Some(QueryMode::XPath),
            "css" => Some(QueryMode::Css),
            _ => None,
        }
    }
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate query expression in a selector chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorEntry {
    pub query: String,
    /// Explicit addressing mode; inferred from the expression when absent.
    #[serde(default)]
    pub mode: Option<QueryMode>,
}

impl SelectorEntry {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            mode: None,
        }
    }

    #[must_use]
    pub fn effective_mode(&self) -> QueryMode {
        self.mode.unwrap_or_else(|| QueryMode::infer(&self.query))
    }
}

/// Per-field selector chains for one site. Order encodes priority: earlier
/// entries are tried first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldSelectors {
    pub title: Vec<SelectorEntry>,
    /// Single nodes carrying a pre-composed "whole.fraction" price text.
    #[serde(default)]
    pub price_combined: Vec<SelectorEntry>,
    /// Whole-part nodes, paired positionally with `price_fraction`.
    #[serde(default)]
    pub price_whole: Vec<SelectorEntry>,
    #[serde(default)]
    pub price_fraction: Vec<SelectorEntry>,
    /// Last-resort expressions scanned for any price-looking text.
    #[serde(default)]
    pub price_generic: Vec<SelectorEntry>,
    #[serde(default)]
    pub sold_by: Vec<SelectorEntry>,
    #[serde(default)]
    pub ships_from: Vec<SelectorEntry>,
    #[serde(default)]
    pub image: Vec<SelectorEntry>,
    #[serde(default)]
    pub availability: Vec<SelectorEntry>,
}

/// Everything the engine needs to know about one storefront. Site-specific
/// behavior is data here, never code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Unique tag, used in artifact names and remote directories (e.g. `us`).
    pub site: String,
    /// Expected domain family; ending up anywhere else is a block signal.
    pub domain: String,
    /// Locale tag keying the price grammar (e.g. `us`, `de`, `jp`).
    pub locale: String,
    /// IANA timezone name for site-local capture timestamps.
    pub timezone: String,
    #[serde(default)]
    pub vat_included: bool,
    /// Overrides the grammar implied by `locale` when set.
    #[serde(default)]
    pub price_format: Option<PriceFormat>,
    #[serde(default)]
    pub price_bounds: PriceBounds,
    pub selectors: FieldSelectors,
    /// Exact structural candidates tried first during interstitial recovery.
    #[serde(default)]
    pub recovery_selectors: Vec<SelectorEntry>,
    #[serde(default)]
    pub extra_soft_phrases: Vec<String>,
    #[serde(default)]
    pub extra_hard_title_phrases: Vec<String>,
    #[serde(default)]
    pub extra_hard_content_phrases: Vec<String>,
}

impl SiteProfile {
    /// Parsed site-local timezone.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the name is not a known IANA zone.
    pub fn tz(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.timezone.parse::<chrono_tz::Tz>().map_err(|_| {
            ConfigError::Validation(format!(
                "site '{}' has unknown timezone '{}'",
                self.site, self.timezone
            ))
        })
    }

    /// The price grammar in effect: the explicit override, or the one the
    /// locale tag implies.
    #[must_use]
    pub fn price_grammar(&self) -> PriceFormat {
        self.price_format
            .unwrap_or_else(|| PriceFormat::for_locale(&self.locale))
    }
}

#[derive(Debug, Deserialize)]
pub struct SitesFile {
    pub sites: Vec<SiteProfile>,
}

impl SitesFile {
    #[must_use]
    pub fn get(&self, site: &str) -> Option<&SiteProfile> {
        self.sites.iter().find(|p| p.site == site)
    }
}

/// Load and validate the site catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sites(path: &Path) -> Result<SitesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SitesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let sites_file: SitesFile = serde_yaml::from_str(&content)?;

    validate_sites(&sites_file)?;

    Ok(sites_file)
}

fn validate_sites(sites_file: &SitesFile) -> Result<(), ConfigError> {
    let mut seen_tags = HashSet::new();

    for profile in &sites_file.sites {
        if profile.site.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site tag must be non-empty".to_string(),
            ));
        }
        if profile.domain.trim().is_empty() || profile.locale.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "site '{}' must set domain and locale",
                profile.site
            )));
        }

        if !seen_tags.insert(profile.site.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate site tag: '{}'",
                profile.site
            )));
        }

        profile.tz()?;

        if profile.price_bounds.min >= profile.price_bounds.max {
            return Err(ConfigError::Validation(format!(
                "site '{}' has inverted price bounds",
                profile.site
            )));
        }

        if profile.selectors.title.is_empty() {
            return Err(ConfigError::Validation(format!(
                "site '{}' has no title selectors",
                profile.site
            )));
        }
        if profile.selectors.price_combined.is_empty()
            && profile.selectors.price_generic.is_empty()
        {
            return Err(ConfigError::Validation(format!(
                "site '{}' has no price selectors",
                profile.site
            )));
        }
        if profile.selectors.price_whole.is_empty() != profile.selectors.price_fraction.is_empty()
        {
            return Err(ConfigError::Validation(format!(
                "site '{}' must set price_whole and price_fraction together",
                profile.site
            )));
        }
    }

    Ok(())
}

/// Merge a selector chain with runtime overrides.
///
/// Override entries are prepended so they are tried first; duplicates are
/// dropped by expression value, keeping the earliest occurrence.
#[must_use]
pub fn merge_selectors(
    defaults: &[SelectorEntry],
    overrides: &[SelectorEntry],
) -> Vec<SelectorEntry> {
    let mut merged = Vec::with_capacity(defaults.len() + overrides.len());
    let mut seen = HashSet::new();

    for entry in overrides.iter().chain(defaults.iter()) {
        if seen.insert(entry.query.clone()) {
            merged.push(entry.clone());
        }
    }

    merged
}
