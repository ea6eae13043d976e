//! Lazy, cursor-based key enumeration.
//!
//! The scanner pulls one SCAN page at a time and never materialises the
//! full key space, so it stays cheap on stores holding millions of keys.
//! Each scanner starts a fresh cursor.

use crate::error::SourceError;
use crate::store::{StagingStore, SCAN_START};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Default SCAN COUNT hint.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Default number of cursor round-trips before a scan is declared stuck.
pub const DEFAULT_MAX_ROUNDS: usize = 100_000;

/// A key as delivered by SCAN.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScannedKey {
    Text(String),
    /// Not valid UTF-8; it cannot carry a `<prefix>:` and is never routed.
    Undecodable(Vec<u8>),
}

impl ScannedKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(key) => ScannedKey::Text(key),
            Err(e) => ScannedKey::Undecodable(e.into_bytes()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScannedKey::Text(key) => Some(key),
            ScannedKey::Undecodable(_) => None,
        }
    }
}

impl fmt::Display for ScannedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScannedKey::Text(key) => f.write_str(key),
            ScannedKey::Undecodable(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
        }
    }
}

pub struct KeyScanner<'a, S: StagingStore + ?Sized> {
    store: &'a mut S,
    page_size: usize,
    max_rounds: usize,
    cursor: u64,
    rounds: usize,
    buffer: VecDeque<Vec<u8>>,
    finished: bool,
}

impl<'a, S: StagingStore + ?Sized> KeyScanner<'a, S> {
    pub fn new(store: &'a mut S, page_size: usize, max_rounds: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            max_rounds: max_rounds.max(1),
            cursor: SCAN_START,
            rounds: 0,
            buffer: VecDeque::new(),
            finished: false,
        }
    }

    /// Next key of the scan, or `None` once the cursor has wrapped around.
    ///
    /// Keys may repeat; callers that care deduplicate.
    pub async fn next_key(&mut self) -> Result<Option<ScannedKey>, SourceError> {
        loop {
            if let Some(key) = self.buffer.pop_front() {
                return Ok(Some(ScannedKey::from_bytes(key)));
            }
            if self.finished {
                return Ok(None);
            }
            if self.rounds >= self.max_rounds {
                return Err(SourceError::ScanDidNotTerminate {
                    rounds: self.rounds,
                });
            }

            let (next, keys) = self.store.scan_page(self.cursor, self.page_size).await?;
            self.rounds += 1;
            tracing::trace!(
                "SCAN cursor {} -> {} returned {} keys",
                self.cursor,
                next,
                keys.len()
            );
            self.buffer.extend(keys);
            self.cursor = next;
            if next == SCAN_START {
                self.finished = true;
            }
        }
    }

    /// Pull up to `limit` distinct keys, in delivery order.
    pub async fn take_distinct(&mut self, limit: usize) -> Result<Vec<ScannedKey>, SourceError> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        while keys.len() < limit {
            match self.next_key().await? {
                Some(key) => {
                    if seen.insert(key.clone()) {
                        keys.push(key);
                    }
                }
                None => break,
            }
        }
        Ok(keys)
    }

    /// Cursor round-trips issued so far.
    pub fn rounds(&self) -> usize {
        self.rounds
    }
}
