//! In-memory blob store.
//!
//! Backs `backend = "memory"` and tests that need a real `BlobStore`
//! without touching disk or network. Contents are lost on drop.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use keeper_core::storage::blob_store::BlobStore;
use keeper_types::error::StorageError;
use keeper_types::storage::{ObjectVersion, StoredObject, WriteCondition};

/// `DashMap`-backed implementation of `BlobStore`.
///
/// Each write gets a fresh UUID v7 version. Preconditions are checked and
/// applied under the map's shard lock, so conditional writes are atomic.
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: DashMap<String, StoredObject>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get_object(&self, key: &str) -> Result<StoredObject, StorageError> {
        self.objects
            .get(key)
            .map(|object| object.value().clone())
            .ok_or(StorageError::NotFound)
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        condition: &WriteCondition,
    ) -> Result<ObjectVersion, StorageError> {
        let version = ObjectVersion::new(Uuid::now_v7().to_string());
        let object = StoredObject {
            body,
            version: version.clone(),
        };

        match self.objects.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if !condition.is_satisfied_by(Some(&occupied.get().version)) {
                    return Err(StorageError::PreconditionFailed);
                }
                occupied.insert(object);
            }
            Entry::Vacant(vacant) => {
                if !condition.is_satisfied_by(None) {
                    return Err(StorageError::PreconditionFailed);
                }
                vacant.insert(object);
            }
        }

        tracing::trace!(key, version = %version, "stored object in memory");
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = InMemoryBlobStore::new();
        let version = store
            .put_object("k", b"hello".to_vec(), &WriteCondition::Unconditional)
            .await
            .unwrap();

        let object = store.get_object("k").await.unwrap();
        assert_eq!(object.body, b"hello");
        assert_eq!(object.version, version);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = InMemoryBlobStore::new();
        assert_eq!(
            store.get_object("missing").await.unwrap_err(),
            StorageError::NotFound
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_every_write_gets_new_version() {
        let store = InMemoryBlobStore::new();
        let v1 = store
            .put_object("k", b"a".to_vec(), &WriteCondition::Unconditional)
            .await
            .unwrap();
        let v2 = store
            .put_object("k", b"a".to_vec(), &WriteCondition::Unconditional)
            .await
            .unwrap();
        assert_ne!(v1, v2);
    }

    #[tokio::test]
    async fn test_if_match_rejects_stale_version() {
        let store = InMemoryBlobStore::new();
        let v1 = store
            .put_object("k", b"a".to_vec(), &WriteCondition::Unconditional)
            .await
            .unwrap();
        store
            .put_object("k", b"b".to_vec(), &WriteCondition::IfMatch(v1.clone()))
            .await
            .unwrap();

        let err = store
            .put_object("k", b"c".to_vec(), &WriteCondition::IfMatch(v1))
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::PreconditionFailed);
        assert_eq!(store.get_object("k").await.unwrap().body, b"b");
    }

    #[tokio::test]
    async fn test_if_absent() {
        let store = InMemoryBlobStore::new();
        store
            .put_object("k", b"a".to_vec(), &WriteCondition::IfAbsent)
            .await
            .unwrap();
        let err = store
            .put_object("k", b"b".to_vec(), &WriteCondition::IfAbsent)
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::PreconditionFailed);
    }

    #[tokio::test]
    async fn test_if_match_on_missing_object_fails() {
        let store = InMemoryBlobStore::new();
        let err = store
            .put_object(
                "k",
                b"a".to_vec(),
                &WriteCondition::IfMatch(ObjectVersion::new("v1")),
            )
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::PreconditionFailed);
        assert!(store.is_empty());
    }
}
