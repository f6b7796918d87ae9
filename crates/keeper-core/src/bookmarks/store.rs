//! Bookmark store service.
//!
//! `BookmarkStore` owns a user's bookmark document in blob storage. Every
//! public operation validates the user id before any I/O, then runs a
//! read-modify-write cycle: load the document (absent, unreadable and
//! undecodable all collapse to "no document"), transform the list in memory,
//! and write the whole document back.
//!
//! Writes are conditional on the version seen at load time unless the write
//! policy turns that off. A lost race reloads and re-applies the mutation, up
//! to `max_attempts` cycles.

use keeper_types::bookmark::{BookmarkDocument, MutationOutcome, UserId, parse_batch};
use keeper_types::config::{BucketConfig, WritePolicy};
use keeper_types::error::{BookmarkError, ConfigError, StorageError};
use keeper_types::storage::WriteCondition;

use super::ops::{self, ListChange};
use crate::storage::blob_store::BlobStore;

/// Object key layout and write policy for a [`BookmarkStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Fixed suffix of every per-user key.
    pub key_suffix: String,
    /// Placed between the user id and the suffix.
    pub separator: String,
    pub writes: WritePolicy,
}

impl StoreOptions {
    pub fn new(key_suffix: impl Into<String>) -> Self {
        Self {
            key_suffix: key_suffix.into(),
            separator: "-".to_string(),
            writes: WritePolicy::default(),
        }
    }

    /// Build options from the `[bucket]` and `[writes]` config sections.
    pub fn from_config(bucket: &BucketConfig, writes: WritePolicy) -> Result<Self, ConfigError> {
        Ok(Self {
            key_suffix: bucket.key_suffix()?.to_string(),
            separator: bucket.separator.clone(),
            writes,
        })
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_write_policy(mut self, writes: WritePolicy) -> Self {
        self.writes = writes;
        self
    }
}

/// What a load observed: the decoded document (if any) and the
/// precondition a write based on it must carry.
struct Snapshot {
    document: Option<BookmarkDocument>,
    condition: WriteCondition,
}

/// Per-user bookmark lists persisted in a [`BlobStore`].
///
/// Generic over the storage backend to keep keeper-core free of
/// infrastructure dependencies.
pub struct BookmarkStore<B: BlobStore> {
    backend: B,
    options: StoreOptions,
}

impl<B: BlobStore> BookmarkStore<B> {
    /// Create a store over `backend`.
    ///
    /// Fails if the key suffix is blank or the write policy allows no attempts.
    pub fn new(backend: B, options: StoreOptions) -> Result<Self, ConfigError> {
        if options.key_suffix.trim().is_empty() {
            return Err(ConfigError::MissingBucketKey);
        }
        if options.writes.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "writes.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self { backend, options })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// The object key holding `user`'s document: `{user}{separator}{suffix}`.
    pub fn object_key(&self, user: &UserId) -> String {
        format!(
            "{}{}{}",
            user, self.options.separator, self.options.key_suffix
        )
    }

    /// Load the user's document, or `None` if it is missing, unreadable or
    /// not a well-formed document.
    #[tracing::instrument(name = "bookmarks.load", skip(self))]
    pub async fn load_document(
        &self,
        user_id: &str,
    ) -> Result<Option<BookmarkDocument>, BookmarkError> {
        let user = UserId::parse(user_id)?;
        Ok(self.fetch(&user).await.document)
    }

    /// Overwrite the user's document unconditionally.
    #[tracing::instrument(name = "bookmarks.save", skip(self, document))]
    pub async fn save_document(
        &self,
        user_id: &str,
        document: &BookmarkDocument,
    ) -> Result<(), BookmarkError> {
        let user = UserId::parse(user_id)?;
        let key = self.object_key(&user);
        let body = document
            .to_vec()
            .map_err(|e| BookmarkError::Encode(e.to_string()))?;
        self.backend
            .put_object(&key, body, &WriteCondition::Unconditional)
            .await
            .map_err(BookmarkError::Persist)?;
        Ok(())
    }

    /// The user's bookmarks in render order; empty if there is no document.
    #[tracing::instrument(name = "bookmarks.list", skip(self))]
    pub async fn get_bookmarks_list(&self, user_id: &str) -> Result<Vec<String>, BookmarkError> {
        let user = UserId::parse(user_id)?;
        Ok(self
            .fetch(&user)
            .await
            .document
            .map(|document| document.bookmarks_list)
            .unwrap_or_default())
    }

    /// Append the entries of `items` not already bookmarked.
    ///
    /// Creates the document on first use. Entries already present, or
    /// repeated within `items`, are skipped with a warning.
    #[tracing::instrument(name = "bookmarks.add", skip(self, items), fields(items = items.len()))]
    pub async fn add_bookmarks(
        &self,
        user_id: &str,
        items: &[String],
    ) -> Result<MutationOutcome, BookmarkError> {
        let user = UserId::parse(user_id)?;
        self.mutate(&user, |current| {
            // An absent document starts from the default empty document.
            let document = current.unwrap_or_default();
            let change = ops::merge_additions(&document.bookmarks_list, items);
            Some(apply_change(document, change))
        })
        .await
    }

    /// [`add_bookmarks`](Self::add_bookmarks) for a dynamically-typed batch.
    ///
    /// Anything other than an array of strings is logged and ignored without
    /// touching storage.
    pub async fn add_bookmarks_value(
        &self,
        user_id: &str,
        items: &serde_json::Value,
    ) -> Result<MutationOutcome, BookmarkError> {
        UserId::parse(user_id)?;
        let Some(items) = parse_batch(items) else {
            tracing::warn!(user_id, "bookmarks should be an array of strings, nothing added");
            return Ok(MutationOutcome::malformed());
        };
        self.add_bookmarks(user_id, &items).await
    }

    /// Remove every bookmark whose value is in `items`.
    ///
    /// Names that are not bookmarked are ignored. Like add, this creates an
    /// empty document if none exists yet.
    #[tracing::instrument(name = "bookmarks.delete", skip(self, items), fields(items = items.len()))]
    pub async fn delete_bookmarks(
        &self,
        user_id: &str,
        items: &[String],
    ) -> Result<MutationOutcome, BookmarkError> {
        let user = UserId::parse(user_id)?;
        self.mutate(&user, |current| {
            let document = current.unwrap_or_default();
            let change = ops::remove_entries(&document.bookmarks_list, items);
            Some(apply_change(document, change))
        })
        .await
    }

    /// [`delete_bookmarks`](Self::delete_bookmarks) for a dynamically-typed batch.
    pub async fn delete_bookmarks_value(
        &self,
        user_id: &str,
        items: &serde_json::Value,
    ) -> Result<MutationOutcome, BookmarkError> {
        UserId::parse(user_id)?;
        let Some(items) = parse_batch(items) else {
            tracing::warn!(user_id, "bookmarks should be an array of strings, nothing deleted");
            return Ok(MutationOutcome::malformed());
        };
        self.delete_bookmarks(user_id, &items).await
    }

    /// Empty the user's list, keeping every other document field.
    ///
    /// Does nothing (and creates nothing) when there is no document.
    #[tracing::instrument(name = "bookmarks.clear", skip(self))]
    pub async fn clear_bookmarks(&self, user_id: &str) -> Result<MutationOutcome, BookmarkError> {
        let user = UserId::parse(user_id)?;
        self.mutate(&user, |current| {
            let Some(mut document) = current else {
                tracing::warn!("no bookmarks available, nothing to clear");
                return None;
            };
            let cleared = std::mem::take(&mut document.bookmarks_list);
            let outcome = MutationOutcome {
                applied: cleared,
                ..MutationOutcome::default()
            };
            Some((document, outcome))
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Read-modify-write plumbing
    // -----------------------------------------------------------------------

    async fn fetch(&self, user: &UserId) -> Snapshot {
        let key = self.object_key(user);
        let (document, condition) = match self.backend.get_object(&key).await {
            Ok(object) => match BookmarkDocument::from_slice(&object.body) {
                Ok(document) => (Some(document), WriteCondition::IfMatch(object.version)),
                Err(e) => {
                    tracing::warn!(
                        key = %key,
                        error = %e,
                        "cannot parse bookmarks document, treating it as absent"
                    );
                    (None, WriteCondition::IfMatch(object.version))
                }
            },
            Err(e) if e.is_not_found() => {
                tracing::debug!(key = %key, "no bookmarks document stored yet");
                (None, WriteCondition::IfAbsent)
            }
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    backend = self.backend.name(),
                    error = %e,
                    "bookmarks document fetch failed, treating it as absent"
                );
                // Version unknown: fall back to an unconditional write.
                (None, WriteCondition::Unconditional)
            }
        };

        let condition = if self.options.writes.conditional {
            condition
        } else {
            WriteCondition::Unconditional
        };

        Snapshot {
            document,
            condition,
        }
    }

    /// Run `apply` against the current document and write its result back.
    ///
    /// `apply` returns `None` when there is nothing to write. It may run more
    /// than once if another writer changes the document in between.
    async fn mutate<F>(&self, user: &UserId, mut apply: F) -> Result<MutationOutcome, BookmarkError>
    where
        F: FnMut(Option<BookmarkDocument>) -> Option<(BookmarkDocument, MutationOutcome)>,
    {
        let key = self.object_key(user);
        let max_attempts = self.options.writes.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let snapshot = self.fetch(user).await;

            let Some((document, mut outcome)) = apply(snapshot.document) else {
                return Ok(MutationOutcome::untouched());
            };

            let body = document
                .to_vec()
                .map_err(|e| BookmarkError::Encode(e.to_string()))?;

            match self
                .backend
                .put_object(&key, body, &snapshot.condition)
                .await
            {
                Ok(version) => {
                    tracing::debug!(key = %key, version = %version, attempt, "bookmarks document saved");
                    outcome.persisted = true;
                    return Ok(outcome);
                }
                Err(StorageError::PreconditionFailed) if attempt < max_attempts => {
                    tracing::warn!(
                        key = %key,
                        attempt,
                        max_attempts,
                        "bookmarks document changed concurrently, retrying"
                    );
                }
                Err(StorageError::PreconditionFailed) => {
                    return Err(BookmarkError::WriteConflict { attempts: attempt });
                }
                Err(e) => return Err(BookmarkError::Persist(e)),
            }
        }
    }
}

fn apply_change(
    mut document: BookmarkDocument,
    change: ListChange,
) -> (BookmarkDocument, MutationOutcome) {
    document.bookmarks_list = change.list;
    let outcome = MutationOutcome {
        applied: change.applied,
        skipped: change.skipped,
        ..MutationOutcome::default()
    };
    (document, outcome)
}
