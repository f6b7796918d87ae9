//! Shared domain types for Bookmarks Keeper.
//!
//! This crate contains the types passed between the store, its storage
//! adapters and the CLI: the per-user bookmark document, validated user
//! identifiers, mutation outcomes, blob storage types, configuration and
//! the error enums.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, secrecy, thiserror.

pub mod bookmark;
pub mod config;
pub mod error;
pub mod storage;
