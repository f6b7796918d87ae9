//! Local directory blob store.
//!
//! One file per object key under a root directory. Versions are the SHA-256
//! of the file contents, so an unchanged file keeps its version across
//! restarts. Writes go to a temporary file in the same directory and are
//! renamed into place.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use uuid::Uuid;

use keeper_core::storage::blob_store::BlobStore;
use keeper_types::error::StorageError;
use keeper_types::storage::{ObjectVersion, StoredObject, WriteCondition};

/// Filesystem implementation of `BlobStore`.
pub struct LocalBlobStore {
    root: PathBuf,
    /// Serializes precondition checks with the writes that follow them.
    write_lock: Mutex<()>,
}

impl LocalBlobStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an object key to a file path, rejecting keys that could escape the root.
    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty()
            || key.starts_with('.')
            || key.contains('/')
            || key.contains('\\')
            || key.contains("..")
            || key.contains('\0')
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    async fn read_current(&self, path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
        match tokio::fs::read(path).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(path, e)),
        }
    }
}

/// Content version of an object body: lowercase hex SHA-256.
pub fn content_version(body: &[u8]) -> ObjectVersion {
    ObjectVersion::new(format!("{:x}", Sha256::digest(body)))
}

/// Write `body` to `tmp_path` and rename it over `path`. The temporary file
/// is removed if either step fails.
async fn replace_file(tmp_path: &Path, path: &Path, body: &[u8]) -> Result<(), StorageError> {
    if let Err(e) = tokio::fs::write(tmp_path, body).await {
        let _ = tokio::fs::remove_file(tmp_path).await;
        return Err(io_error(tmp_path, e));
    }
    if let Err(e) = tokio::fs::rename(tmp_path, path).await {
        let _ = tokio::fs::remove_file(tmp_path).await;
        return Err(io_error(path, e));
    }
    Ok(())
}

fn io_error(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Io(format!("{}: {err}", path.display()))
}

impl BlobStore for LocalBlobStore {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn get_object(&self, key: &str) -> Result<StoredObject, StorageError> {
        let path = self.object_path(key)?;
        let body = self
            .read_current(&path)
            .await?
            .ok_or(StorageError::NotFound)?;
        let version = content_version(&body);
        Ok(StoredObject { body, version })
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        condition: &WriteCondition,
    ) -> Result<ObjectVersion, StorageError> {
        let path = self.object_path(key)?;
        let _guard = self.write_lock.lock().await;

        if !matches!(condition, WriteCondition::Unconditional) {
            let current = self.read_current(&path).await?;
            let current_version = current.as_deref().map(content_version);
            if !condition.is_satisfied_by(current_version.as_ref()) {
                tracing::debug!(key, "write precondition not met");
                return Err(StorageError::PreconditionFailed);
            }
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error(&self.root, e))?;

        let tmp_path = self.root.join(format!(".{key}.{}.tmp", Uuid::now_v7()));
        replace_file(&tmp_path, &path, &body).await?;

        let version = content_version(&body);
        tracing::trace!(key, version = %version, "wrote object file");
        Ok(version)
    }
}
