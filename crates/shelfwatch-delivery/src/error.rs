use std::path::PathBuf;

/// Errors raised while packaging or delivering a batch.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("staging i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("zip compression failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("remote store operation failed for {path}: {source}")]
    Remote {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
