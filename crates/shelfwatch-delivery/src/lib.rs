//! Batch packaging and remote delivery.
//!
//! A finished batch becomes three artifacts in a scoped staging directory:
//! a CSV, a single-entry zip of that CSV, and an MD5 manifest binding both
//! filenames to their digests. The pipeline then places the zip and the
//! manifest into a per-site, per-date directory on the remote store. The
//! staging directory disappears when the batch value is dropped, delivered
//! or not.

mod error;
mod package;
mod pipeline;
mod remote;

pub use error::DeliveryError;
pub use package::{package_batch, PackagedBatch};
pub use pipeline::{deliver_batch, DeliveryReceipt};
pub use remote::{FsRemoteStore, RemoteStore};
