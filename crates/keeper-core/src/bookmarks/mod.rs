//! Per-user bookmark lists.
//!
//! - `store`: `BookmarkStore`, the read-modify-write service over a `BlobStore`
//! - `ops`: pure list transforms used by add and delete

pub mod ops;
pub mod store;

pub use store::{BookmarkStore, StoreOptions};
