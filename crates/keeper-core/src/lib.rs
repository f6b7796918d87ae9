//! Business logic and storage trait definitions for Bookmarks Keeper.
//!
//! This crate defines the `BlobStore` port that the infrastructure layer
//! implements, and the `BookmarkStore` service built on top of it. It depends
//! only on `keeper-types` -- never on `keeper-infra` or any HTTP/IO crate.

pub mod bookmarks;
pub mod layout;
pub mod storage;
