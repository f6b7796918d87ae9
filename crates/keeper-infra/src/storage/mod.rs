//! Blob storage backends.
//!
//! - [`s3::S3BlobStore`]: the production backend
//! - [`filesystem::LocalBlobStore`]: one file per key in a local directory
//! - [`memory::InMemoryBlobStore`]: process-local, for tests and dry runs

pub mod filesystem;
pub mod memory;
pub mod s3;

use std::path::Path;
use std::time::Duration;

use keeper_core::storage::box_blob_store::BoxBlobStore;
use keeper_types::config::{BackendKind, KeeperConfig};
use keeper_types::error::ConfigError;

use self::filesystem::LocalBlobStore;
use self::memory::InMemoryBlobStore;
use self::s3::S3BlobStore;

/// Construct the backend selected by `config.backend`.
///
/// The filesystem backend defaults to `{data_dir}/objects` when no root is
/// configured. S3 needs a bucket name and credentials.
pub fn build_blob_store(config: &KeeperConfig, data_dir: &Path) -> Result<BoxBlobStore, ConfigError> {
    let store = match config.backend {
        BackendKind::S3 => {
            let timeout = Duration::from_secs(config.request_timeout_secs);
            BoxBlobStore::new(S3BlobStore::new(&config.bucket, timeout)?)
        }
        BackendKind::Filesystem => {
            let root = config
                .filesystem
                .root
                .clone()
                .unwrap_or_else(|| data_dir.join("objects"));
            BoxBlobStore::new(LocalBlobStore::new(root))
        }
        BackendKind::Memory => BoxBlobStore::new(InMemoryBlobStore::new()),
    };

    tracing::debug!(backend = %config.backend, "blob store ready");
    Ok(store)
}
