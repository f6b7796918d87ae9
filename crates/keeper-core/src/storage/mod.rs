//! Storage abstractions for Bookmarks Keeper.
//!
//! Defines the whole-object blob store trait and its type-erased wrapper.
//! Implementations live in keeper-infra.

pub mod blob_store;
pub mod box_blob_store;
