//! In-memory staging store for tests.

mod memory;

pub use memory::MemoryStagingStore;
