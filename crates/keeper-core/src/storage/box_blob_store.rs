//! BoxBlobStore -- object-safe dynamic dispatch wrapper for BlobStore.
//!
//! Same blanket-impl pattern as the other boxed ports:
//! 1. Define an object-safe `BlobStoreDyn` trait with boxed futures
//! 2. Blanket-impl `BlobStoreDyn` for all `T: BlobStore`
//! 3. `BoxBlobStore` wraps `Box<dyn BlobStoreDyn>` and implements `BlobStore` itself

use std::future::Future;
use std::pin::Pin;

use keeper_types::error::StorageError;
use keeper_types::storage::{ObjectVersion, StoredObject, WriteCondition};

use super::blob_store::BlobStore;

/// Object-safe version of [`BlobStore`] with boxed futures.
pub trait BlobStoreDyn: Send + Sync {
    fn name(&self) -> &str;

    fn get_object_boxed<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<StoredObject, StorageError>> + Send + 'a>>;

    fn put_object_boxed<'a>(
        &'a self,
        key: &'a str,
        body: Vec<u8>,
        condition: &'a WriteCondition,
    ) -> Pin<Box<dyn Future<Output = Result<ObjectVersion, StorageError>> + Send + 'a>>;
}

impl<T: BlobStore> BlobStoreDyn for T {
    fn name(&self) -> &str {
        BlobStore::name(self)
    }

    fn get_object_boxed<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<StoredObject, StorageError>> + Send + 'a>> {
        Box::pin(self.get_object(key))
    }

    fn put_object_boxed<'a>(
        &'a self,
        key: &'a str,
        body: Vec<u8>,
        condition: &'a WriteCondition,
    ) -> Pin<Box<dyn Future<Output = Result<ObjectVersion, StorageError>> + Send + 'a>> {
        Box::pin(self.put_object(key, body, condition))
    }
}

/// Type-erased blob store for runtime backend selection.
///
/// Since `BlobStore` uses RPITIT it cannot be a trait object directly. The
/// backend is picked from configuration at startup, so the CLI pins
/// `BookmarkStore<BoxBlobStore>`.
pub struct BoxBlobStore {
    inner: Box<dyn BlobStoreDyn + Send + Sync>,
}

impl BoxBlobStore {
    /// Wrap a concrete `BlobStore` in a type-erased box.
    pub fn new<T: BlobStore + 'static>(store: T) -> Self {
        Self {
            inner: Box::new(store),
        }
    }
}

impl BlobStore for BoxBlobStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_object(&self, key: &str) -> Result<StoredObject, StorageError> {
        self.inner.get_object_boxed(key).await
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        condition: &WriteCondition,
    ) -> Result<ObjectVersion, StorageError> {
        self.inner.put_object_boxed(key, body, condition).await
    }
}
