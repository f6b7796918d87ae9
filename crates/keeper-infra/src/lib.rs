//! Infrastructure layer for Bookmarks Keeper.
//!
//! Contains implementations of the `BlobStore` trait defined in `keeper-core`
//! (S3 over HTTPS with SigV4 signing, local filesystem, in-memory) and the
//! configuration loader that decides which one the store runs on.

pub mod config;
pub mod storage;
