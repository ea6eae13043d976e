//! StagingStore trait definition.

use crate::error::SourceError;
use async_trait::async_trait;
use sync_core::StagedRecord;

/// Cursor value that starts a scan and, when returned, ends it.
pub const SCAN_START: u64 = 0;

/// One pass-scoped session against the key-value store holding staged
/// records.
///
/// Implementations expose the three primitives the sync needs: cursor
/// iteration over keys, reading a record's field map and deleting a key.
#[async_trait]
pub trait StagingStore: Send {
    /// Fetch one page of keys starting at `cursor`.
    ///
    /// Returns the cursor for the next page; [`SCAN_START`] means the
    /// iteration is complete. `count` is a hint, pages may be larger or
    /// smaller and may repeat keys. Keys are raw bytes: the store does not
    /// guarantee they are UTF-8.
    async fn scan_page(
        &mut self,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<Vec<u8>>), SourceError>;

    /// Read every field of the record stored under `key`.
    ///
    /// A key that no longer exists yields an empty record.
    async fn fetch_record(&mut self, key: &str) -> Result<StagedRecord, SourceError>;

    /// Delete `key`. Returns whether the key was present.
    async fn delete_record(&mut self, key: &str) -> Result<bool, SourceError>;

    /// Release the session. Further calls fail with [`SourceError::Closed`].
    async fn close(&mut self) -> Result<(), SourceError>;
}
