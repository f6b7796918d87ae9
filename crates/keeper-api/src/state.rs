//! Application state wiring the bookmark store to its configured backend.
//!
//! `BookmarkStore` is generic over the blob backend; the CLI pins it to
//! `BoxBlobStore` so the backend can be chosen from config at startup.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use keeper_core::bookmarks::{BookmarkStore, StoreOptions};
use keeper_core::storage::box_blob_store::BoxBlobStore;
use keeper_infra::config::{load_effective_config, resolve_data_dir};
use keeper_infra::storage::build_blob_store;
use keeper_types::config::KeeperConfig;

pub type ConcreteBookmarkStore = BookmarkStore<BoxBlobStore>;

/// Shared state for command handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConcreteBookmarkStore>,
}

impl AppState {
    /// Resolve the data directory, load config and build the store.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_effective_config(&data_dir).await;
        Self::from_config(&config, &data_dir)
    }

    pub fn from_config(config: &KeeperConfig, data_dir: &Path) -> anyhow::Result<Self> {
        let backend = build_blob_store(config, data_dir)
            .with_context(|| format!("failed to set up the {} backend", config.backend))?;
        let options = StoreOptions::from_config(&config.bucket, config.writes)
            .context("invalid [bucket] configuration")?;
        let store = BookmarkStore::new(backend, options).context("invalid store configuration")?;

        tracing::debug!(
            backend = %config.backend,
            data_dir = %data_dir.display(),
            "application state ready"
        );

        Ok(Self {
            store: Arc::new(store),
        })
    }
}
