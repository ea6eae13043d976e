//! In-memory stores wired into the driver, for tests.
//!
//! [`MemoryConnector`] hands the driver a fresh session of a shared
//! [`MemoryStagingStore`] and [`MemorySink`] on every pass, so tests can
//! stage records, inject failures and inspect both stores through the
//! connector's public handles while passes run.

use crate::sync::StoreConnector;
use async_trait::async_trait;
use mysql_sink::testing::MemorySink;
use mysql_sink::SinkError;
use redis_source::testing::MemoryStagingStore;
use redis_source::SourceError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Default)]
pub struct MemoryConnector {
    pub store: MemoryStagingStore,
    pub sink: MemorySink,
    fail_source: Arc<AtomicBool>,
    fail_destination: Arc<AtomicBool>,
    destination_delay_ms: Arc<AtomicU64>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(sink: MemorySink) -> Self {
        Self {
            sink,
            ..Self::default()
        }
    }

    /// Make the staging store unreachable.
    pub fn fail_source_connect(&self, on: bool) {
        self.fail_source.store(on, Ordering::SeqCst);
    }

    /// Make the destination unreachable.
    pub fn fail_destination_connect(&self, on: bool) {
        self.fail_destination.store(on, Ordering::SeqCst);
    }

    /// Stall every destination connect by `delay`.
    pub fn delay_destination_connect(&self, delay: Duration) {
        self.destination_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    type Source = MemoryStagingStore;
    type Destination = MemorySink;

    async fn connect_source(&self) -> Result<MemoryStagingStore, SourceError> {
        if self.fail_source.load(Ordering::SeqCst) {
            return Err(SourceError::Store("connection refused".to_string()));
        }
        Ok(self.store.session())
    }

    async fn connect_destination(&self) -> Result<MemorySink, SinkError> {
        let delay = self.destination_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_destination.load(Ordering::SeqCst) {
            return Err(SinkError::Connect("connection refused".to_string()));
        }
        Ok(self.sink.session())
    }
}
