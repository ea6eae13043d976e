//! In-memory destination for tests.

mod memory;

pub use memory::MemorySink;
