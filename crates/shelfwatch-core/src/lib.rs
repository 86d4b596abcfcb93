//! Shared types, configuration, and pure logic for the shelfwatch workers.
//!
//! Everything here is backend-agnostic: no database, no browser, no
//! network. The engine, storage, delivery, and alert crates all build on
//! these types.

use thiserror::Error;

mod app_config;
mod blocklist;
mod config;
mod io;
mod price;
mod profile;
mod time;
mod types;

pub use app_config::{AppConfig, Environment};
pub use blocklist::{
    BlockSignatures, HARD_BLOCK_CONTENT_SIGNATURES, HARD_BLOCK_TITLE_SIGNATURES,
    LABEL_ONLY_PHRASES, NORMAL_PAGE_INDICATORS, SOFT_BLOCK_PHRASES,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use io::{BoxError, ResultSink, TargetSource};
pub use price::{find_price_candidate, normalize, normalize_with, PriceBounds, PriceFormat};
pub use profile::{
    load_sites, merge_selectors, FieldSelectors, QueryMode, SelectorEntry, SiteProfile, SitesFile,
};
pub use time::CaptureTimestamps;
pub use types::{
    ExtractedFields, ExtractionResult, ExtractionStatus, ExtractionTarget, TargetMeta,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read site catalog {path}: {source}")]
    SitesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse site catalog: {0}")]
    SitesFileParse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}
