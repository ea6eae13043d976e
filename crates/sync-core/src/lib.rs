//! Core types for redis-mysql-sync.
//!
//! This crate provides the foundational types shared by the source, sink
//! and driver crates:
//!
//! - [`SchemaRegistry`] / [`SchemaDescriptor`] - destination column sets, registered at startup
//! - [`DestinationBinding`] - a (table, schema id) pair records may be routed to
//! - [`StagedRecord`] - a hash read from the staging store
//! - [`ProjectedRow`] / [`FieldValue`] - a record narrowed to one schema, values typed
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── mysql-types    (FieldValue → MySQL values, INSERT statements)
//!    ├─── redis-source   (StagedRecord from Redis hashes)
//!    └─── mysql-sink     (executes INSERT statements transactionally)
//! ```

pub mod schema;
pub mod types;
pub mod values;

pub use schema::{
    DestinationBinding, FieldDefinition, SchemaDescriptor, SchemaError, SchemaRegistry,
};
pub use types::{FieldType, FieldValue};
pub use values::{key_prefix, ProjectedRow, StagedRecord, KEY_SEPARATOR};
