use crate::error::SourceError;
use crate::store::{StagingStore, SCAN_START};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use sync_core::StagedRecord;

#[derive(Default)]
struct MemoryState {
    records: BTreeMap<String, HashMap<String, String>>,
    fail_read: HashSet<String>,
    fail_delete: HashSet<String>,
    non_terminating: bool,
    duplicate_delivery: bool,
    undecodable: Vec<Vec<u8>>,
    sessions_opened: usize,
    sessions_closed: usize,
    deleted: Vec<String>,
}

/// Hash-per-key store kept in memory, with failure injection.
///
/// Clones share the same data, so a test can keep one handle for
/// assertions while sessions obtained from [`MemoryStagingStore::session`]
/// are handed to the code under test.
#[derive(Clone, Default)]
pub struct MemoryStagingStore {
    state: Arc<Mutex<MemoryState>>,
    closed: bool,
}

impl MemoryStagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stage (or replace) the hash stored under `key`.
    pub fn stage(&self, key: impl Into<String>, fields: HashMap<String, String>) {
        self.state().records.insert(key.into(), fields);
    }

    pub fn stage_pairs(&self, key: &str, pairs: &[(&str, &str)]) {
        let fields = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.stage(key, fields);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state().records.contains_key(key)
    }

    pub fn record(&self, key: &str) -> Option<HashMap<String, String>> {
        self.state().records.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.state().records.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().records.is_empty()
    }

    /// Make `HGETALL` of `key` fail.
    pub fn fail_read_for(&self, key: &str) {
        self.state().fail_read.insert(key.to_string());
    }

    /// Make `DEL` of `key` fail until [`MemoryStagingStore::clear_failures`].
    pub fn fail_delete_for(&self, key: &str) {
        self.state().fail_delete.insert(key.to_string());
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.fail_read.clear();
        state.fail_delete.clear();
    }

    /// Never hand back the start-of-scan cursor.
    pub fn set_non_terminating(&self, on: bool) {
        self.state().non_terminating = on;
    }

    /// Deliver every key of a page twice.
    pub fn set_duplicate_delivery(&self, on: bool) {
        self.state().duplicate_delivery = on;
    }

    /// Deliver `bytes` as an extra key on the first SCAN page. The key
    /// holds no record and cannot be read or deleted by name.
    pub fn stage_undecodable_key(&self, bytes: &[u8]) {
        self.state().undecodable.push(bytes.to_vec());
    }

    /// Open a new session sharing this store's data.
    pub fn session(&self) -> Self {
        self.state().sessions_opened += 1;
        Self {
            state: Arc::clone(&self.state),
            closed: false,
        }
    }

    pub fn sessions_opened(&self) -> usize {
        self.state().sessions_opened
    }

    pub fn sessions_closed(&self) -> usize {
        self.state().sessions_closed
    }

    /// Keys removed through `delete_record`, in order, including repeats.
    pub fn deleted_keys(&self) -> Vec<String> {
        self.state().deleted.clone()
    }

    fn ensure_open(&self) -> Result<(), SourceError> {
        if self.closed {
            Err(SourceError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StagingStore for MemoryStagingStore {
    async fn scan_page(
        &mut self,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<Vec<u8>>), SourceError> {
        self.ensure_open()?;
        let state = self.state();
        let start = usize::try_from(cursor).unwrap_or(usize::MAX);
        let count = count.max(1);

        let mut page: Vec<Vec<u8>> = state
            .records
            .keys()
            .skip(start)
            .take(count)
            .map(|key| key.as_bytes().to_vec())
            .collect();
        if cursor == SCAN_START {
            page.extend(state.undecodable.iter().cloned());
        }
        if state.duplicate_delivery {
            page.extend(page.clone());
        }

        let end = start.saturating_add(count);
        let next = if !state.non_terminating && end >= state.records.len() {
            SCAN_START
        } else {
            end as u64
        };
        Ok((next, page))
    }

    async fn fetch_record(&mut self, key: &str) -> Result<StagedRecord, SourceError> {
        self.ensure_open()?;
        let state = self.state();
        if state.fail_read.contains(key) {
            return Err(SourceError::Store(format!("injected read failure for {key}")));
        }
        let fields = state.records.get(key).cloned().unwrap_or_default();
        Ok(StagedRecord::new(key, fields))
    }

    async fn delete_record(&mut self, key: &str) -> Result<bool, SourceError> {
        self.ensure_open()?;
        let mut state = self.state();
        if state.fail_delete.contains(key) {
            return Err(SourceError::Store(format!(
                "injected delete failure for {key}"
            )));
        }
        let removed = state.records.remove(key).is_some();
        state.deleted.push(key.to_string());
        Ok(removed)
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        if !self.closed {
            self.closed = true;
            self.state().sessions_closed += 1;
        }
        Ok(())
    }
}
