use std::path::PathBuf;

use crate::{DeliveryError, PackagedBatch, RemoteStore};

/// Where a batch landed on the store, for run records and notifications.
/// All paths are store-relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub remote_dir: PathBuf,
    pub zip_file: PathBuf,
    pub manifest_file: PathBuf,
}

/// Place a packaged batch on the store under `{site}/{date_dir}/`, archive
/// first, manifest second. The batch counts as delivered only when both
/// uploads succeed in that order; the raw CSV never leaves staging.
///
/// # Errors
///
/// Returns the first directory or upload failure. A failed manifest upload
/// leaves the archive behind on the store; the manifest's absence is what
/// tells downstream loaders the batch is incomplete.
pub async fn deliver_batch(
    store: &dyn RemoteStore,
    site: &str,
    date_dir: &str,
    batch: &PackagedBatch,
) -> Result<DeliveryReceipt, DeliveryError> {
    let site_dir = PathBuf::from(site);
    store.ensure_dir(&site_dir).await?;
    let remote_dir = site_dir.join(date_dir);
    store.ensure_dir(&remote_dir).await?;

    let zip_file = remote_dir.join(&batch.zip_name);
    store.put_file(&batch.zip_path, &zip_file).await?;
    let manifest_file = remote_dir.join(&batch.manifest_name);
    store.put_file(&batch.manifest_path, &manifest_file).await?;

    tracing::info!(dir = %remote_dir.display(), zip = %batch.zip_name, "batch delivered");
    Ok(DeliveryReceipt {
        remote_dir,
        zip_file,
        manifest_file,
    })
}
