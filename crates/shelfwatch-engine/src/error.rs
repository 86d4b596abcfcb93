use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("page driver failure: {0}")]
    Driver(#[source] shelfwatch_core::BoxError),

    #[error("hard block detected: {reason}")]
    HardBlock { reason: String },

    #[error("soft block could not be dismissed")]
    SoftBlockUnrecovered,

    #[error("session could not be established: {reason}")]
    SessionSetup { reason: String },
}

impl EngineError {
    /// Wrap a backend-specific failure from a page driver implementation.
    #[must_use]
    pub fn driver<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        EngineError::Driver(Box::new(source))
    }
}
