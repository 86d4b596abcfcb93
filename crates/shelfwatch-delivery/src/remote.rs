use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::DeliveryError;

/// Destination for packaged artifacts. Paths are relative to the store
/// root; implementations resolve them however their transport requires.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create `dir` and any missing parents. Succeeds when the directory
    /// already exists.
    async fn ensure_dir(&self, dir: &Path) -> Result<(), DeliveryError>;

    /// Copy a local file to the store at `remote`, replacing any previous
    /// file of the same name.
    async fn put_file(&self, local: &Path, remote: &Path) -> Result<(), DeliveryError>;
}

/// Store backed by a mounted filesystem path, the shape the delivery share
/// takes in production.
#[derive(Debug, Clone)]
pub struct FsRemoteStore {
    root: PathBuf,
}

impl FsRemoteStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }
}

#[async_trait]
impl RemoteStore for FsRemoteStore {
    async fn ensure_dir(&self, dir: &Path) -> Result<(), DeliveryError> {
        let absolute = self.resolve(dir);
        tokio::fs::create_dir_all(&absolute)
            .await
            .map_err(|source| DeliveryError::Remote {
                path: absolute,
                source,
            })
    }

    async fn put_file(&self, local: &Path, remote: &Path) -> Result<(), DeliveryError> {
        let absolute = self.resolve(remote);
        tokio::fs::copy(local, &absolute)
            .await
            .map(|_| ())
            .map_err(|source| DeliveryError::Remote {
                path: absolute,
                source,
            })
    }
}
