//! Redis staging store for redis-mysql-sync
//!
//! Staged records live in Redis as hashes under keys of the form
//! `<prefix>:<rest>`. This crate provides the [`StagingStore`] seam the
//! sync driver is written against, the Redis implementation of it, and the
//! lazy [`KeyScanner`] built on the `SCAN` cursor.

mod client;
mod error;
mod scanner;
mod store;
pub mod testing;

pub use client::{RedisConnectOpts, RedisStagingStore};
pub use error::SourceError;
pub use scanner::{KeyScanner, ScannedKey, DEFAULT_MAX_ROUNDS, DEFAULT_PAGE_SIZE};
pub use store::{StagingStore, SCAN_START};
