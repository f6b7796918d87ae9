//! Blob store trait.
//!
//! Defines the interface for key-addressed whole-object storage.
//! Implementations live in keeper-infra.

use keeper_types::error::StorageError;
use keeper_types::storage::{ObjectVersion, StoredObject, WriteCondition};

/// Trait for a remote (or local) key-addressed object store.
///
/// Objects are read and written whole: no range reads, no appends.
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait BlobStore: Send + Sync {
    /// Short backend name used in log fields (e.g. "s3", "memory").
    fn name(&self) -> &str;

    /// Fetch the object at `key`.
    ///
    /// Returns `StorageError::NotFound` if nothing is stored there.
    fn get_object(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<StoredObject, StorageError>> + Send;

    /// Write `body` at `key`, replacing any existing object.
    ///
    /// Returns `StorageError::PreconditionFailed` if `condition` does not hold
    /// against the object currently stored. On success returns the version of
    /// the newly written object.
    fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        condition: &WriteCondition,
    ) -> impl std::future::Future<Output = Result<ObjectVersion, StorageError>> + Send;
}
