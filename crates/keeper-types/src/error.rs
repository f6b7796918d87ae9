use thiserror::Error;

/// Errors from blob storage backends (used by the `BlobStore` trait in keeper-core).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("object not found")]
    NotFound,

    #[error("precondition failed: object changed since it was read")]
    PreconditionFailed,

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned status {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("i/o error: {0}")]
    Io(String),
}

impl StorageError {
    /// Whether this error means "the object does not exist" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound)
    }
}

/// Errors surfaced by bookmark store operations.
///
/// Read-side failures never appear here; they are downgraded to an absent
/// document inside the store.
#[derive(Debug, Error)]
pub enum BookmarkError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to persist bookmarks")]
    Persist(#[source] StorageError),

    #[error("gave up after {attempts} conflicting write attempts")]
    WriteConflict { attempts: u32 },

    #[error("failed to encode bookmarks document: {0}")]
    Encode(String),
}

/// Errors raised while building a store or a storage backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("bucket name is missing or empty")]
    MissingBucketName,

    #[error("bucket key is missing or empty")]
    MissingBucketKey,

    #[error("storage credentials are missing (need both access key id and secret access key)")]
    MissingCredentials,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
