//! Transactional MySQL destination.
//!
//! This crate defines the [`DestinationSink`] trait the sync coordinator
//! writes through, the [`MySQLSink`] implementation over a single
//! pass-scoped `mysql_async` connection, and an in-memory sink for tests.

mod error;
mod mysql;
pub mod testing;
mod traits;

pub use error::SinkError;
pub use mysql::{MySQLConnectOpts, MySQLSink};
pub use traits::DestinationSink;
