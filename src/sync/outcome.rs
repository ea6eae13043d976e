//! Per-key results and the pass summary.
//!
//! Nothing that happens to a single key is an error at the pass level.
//! Every binding a key was routed to gets a [`SyncOutcome`], every key a
//! [`KeyDisposition`], and the pass returns all of them in a
//! [`PassSummary`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use sync_core::SchemaError;

/// Result of one (key, binding) unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SyncOutcome {
    Committed,
    Skipped(SkipReason),
    Failed(FailureReason),
}

impl SyncOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, SyncOutcome::Committed)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, SyncOutcome::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SyncOutcome::Failed(_))
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Committed => f.write_str("committed"),
            SyncOutcome::Skipped(reason) => write!(f, "skipped: {reason}"),
            SyncOutcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Why a record was not written. The key stays staged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Key has no `<prefix>:` part
    UnresolvedKey,
    /// No binding's table contains the prefix
    NoMatchingBinding,
    /// Key was gone (or emptied) between scan and read
    RecordVanished,
    UnknownSchema(String),
    MissingField(String),
    InvalidValue { field: String, reason: String },
    /// Statement rendered only
    DryRun,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnresolvedKey => f.write_str("key has no prefix"),
            SkipReason::NoMatchingBinding => f.write_str("no binding matches the key prefix"),
            SkipReason::RecordVanished => f.write_str("record no longer staged"),
            SkipReason::UnknownSchema(id) => write!(f, "unknown schema '{id}'"),
            SkipReason::MissingField(field) => write!(f, "missing field '{field}'"),
            SkipReason::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{field}': {reason}")
            }
            SkipReason::DryRun => f.write_str("dry run"),
        }
    }
}

impl From<SchemaError> for SkipReason {
    fn from(e: SchemaError) -> Self {
        match e {
            SchemaError::UnknownSchema(id) => SkipReason::UnknownSchema(id),
            SchemaError::MissingField { field, .. } => SkipReason::MissingField(field),
            SchemaError::InvalidValue { field, reason, .. } => {
                SkipReason::InvalidValue { field, reason }
            }
            // Configuration errors are caught at load; keep the message if one slips through.
            other @ (SchemaError::DuplicateSchema(_) | SchemaError::InvalidField { .. }) => {
                SkipReason::InvalidValue {
                    field: String::new(),
                    reason: other.to_string(),
                }
            }
        }
    }
}

/// Why a unit failed. The key stays staged and is retried next pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    SourceReadFailed(String),
    DestinationWriteFailed(String),
    /// An earlier binding of the same key failed
    NotAttempted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::SourceReadFailed(msg) => write!(f, "source read failed: {msg}"),
            FailureReason::DestinationWriteFailed(msg) => {
                write!(f, "destination write failed: {msg}")
            }
            FailureReason::NotAttempted => f.write_str("not attempted after earlier failure"),
        }
    }
}

/// What happened to the staged key at the end of its processing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum KeyDisposition {
    Deleted,
    /// A binding failed; every binding is retried next pass
    RetainedForRetry,
    /// Committed but the delete failed; the next pass rewrites and deletes again
    OrphanCommit(String),
    /// Nothing committed and nothing failed
    Retained,
}

impl fmt::Display for KeyDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyDisposition::Deleted => f.write_str("deleted"),
            KeyDisposition::RetainedForRetry => f.write_str("retained for retry"),
            KeyDisposition::OrphanCommit(msg) => write!(f, "orphan commit: {msg}"),
            KeyDisposition::Retained => f.write_str("retained"),
        }
    }
}

/// Outcome of one binding of a key. `table` is `None` when the key never
/// reached a binding (unresolved, unmatched, unreadable).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingOutcome {
    pub table: Option<String>,
    pub outcome: SyncOutcome,
}

impl BindingOutcome {
    pub fn for_table(table: impl Into<String>, outcome: SyncOutcome) -> Self {
        Self {
            table: Some(table.into()),
            outcome,
        }
    }

    pub fn for_key(outcome: SyncOutcome) -> Self {
        Self {
            table: None,
            outcome,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyReport {
    pub key: String,
    pub outcomes: Vec<BindingOutcome>,
    pub disposition: KeyDisposition,
}

impl KeyReport {
    /// A key that never reached a binding.
    pub fn unrouted(key: impl Into<String>, outcome: SyncOutcome) -> Self {
        Self {
            key: key.into(),
            outcomes: vec![BindingOutcome::for_key(outcome)],
            disposition: KeyDisposition::Retained,
        }
    }

    pub fn outcome_for(&self, table: &str) -> Option<&SyncOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.table.as_deref() == Some(table))
            .map(|o| &o.outcome)
    }

    pub fn is_deleted(&self) -> bool {
        self.disposition == KeyDisposition::Deleted
    }

    /// Deleted although some bindings never received the record.
    pub fn is_deleted_with_skips(&self) -> bool {
        self.is_deleted() && self.outcomes.iter().any(|o| o.outcome.is_skipped())
    }
}

/// Everything one pass did.
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub keys_scanned: usize,
    pub keys: Vec<KeyReport>,
}

impl PassSummary {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            keys_scanned: 0,
            keys: Vec::new(),
        }
    }

    pub fn key(&self, key: &str) -> Option<&KeyReport> {
        self.keys.iter().find(|r| r.key == key)
    }

    fn count_outcomes(&self, pred: impl Fn(&SyncOutcome) -> bool) -> usize {
        self.keys
            .iter()
            .flat_map(|r| r.outcomes.iter())
            .filter(|o| pred(&o.outcome))
            .count()
    }

    fn count_keys(&self, pred: impl Fn(&KeyDisposition) -> bool) -> usize {
        self.keys.iter().filter(|r| pred(&r.disposition)).count()
    }

    pub fn committed(&self) -> usize {
        self.count_outcomes(SyncOutcome::is_committed)
    }

    pub fn skipped(&self) -> usize {
        self.count_outcomes(SyncOutcome::is_skipped)
    }

    pub fn failed(&self) -> usize {
        self.count_outcomes(SyncOutcome::is_failed)
    }

    pub fn deleted(&self) -> usize {
        self.count_keys(|d| *d == KeyDisposition::Deleted)
    }

    pub fn deleted_with_skips(&self) -> usize {
        self.keys.iter().filter(|r| r.is_deleted_with_skips()).count()
    }

    pub fn orphaned(&self) -> usize {
        self.count_keys(|d| matches!(d, KeyDisposition::OrphanCommit(_)))
    }

    pub fn retained(&self) -> usize {
        self.count_keys(|d| {
            matches!(d, KeyDisposition::Retained | KeyDisposition::RetainedForRetry)
        })
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn log(&self) {
        tracing::info!(
            "Sync pass finished in {}ms: {} keys, {} committed, {} skipped, {} failed, {} deleted ({} with skipped bindings), {} retained, {} orphaned",
            self.duration().num_milliseconds(),
            self.keys.len(),
            self.committed(),
            self.skipped(),
            self.failed(),
            self.deleted(),
            self.deleted_with_skips(),
            self.retained(),
            self.orphaned()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> PassSummary {
        let mut summary = PassSummary::new(Utc::now());
        summary.keys_scanned = 3;
        summary.keys.push(KeyReport {
            key: "xywy:1".into(),
            outcomes: vec![BindingOutcome::for_table("scrapy_xywy", SyncOutcome::Committed)],
            disposition: KeyDisposition::Deleted,
        });
        summary.keys.push(KeyReport {
            key: "haodf:1".into(),
            outcomes: vec![
                BindingOutcome::for_table(
                    "scrapy_haodf",
                    SyncOutcome::Failed(FailureReason::DestinationWriteFailed("dup".into())),
                ),
                BindingOutcome::for_table(
                    "scrapy_haodf_doc",
                    SyncOutcome::Failed(FailureReason::NotAttempted),
                ),
            ],
            disposition: KeyDisposition::RetainedForRetry,
        });
        summary
            .keys
            .push(KeyReport::unrouted("junk", SyncOutcome::Skipped(SkipReason::UnresolvedKey)));
        summary
    }

    #[test]
    fn test_counters() {
        let s = summary();
        assert_eq!(s.committed(), 1);
        assert_eq!(s.failed(), 2);
        assert_eq!(s.skipped(), 1);
        assert_eq!(s.deleted(), 1);
        assert_eq!(s.retained(), 2);
        assert_eq!(s.orphaned(), 0);
        assert_eq!(s.deleted_with_skips(), 0);
        assert!(s.key("xywy:1").unwrap().is_deleted());
        assert_eq!(
            s.key("haodf:1").unwrap().outcome_for("scrapy_haodf_doc"),
            Some(&SyncOutcome::Failed(FailureReason::NotAttempted))
        );
    }

    #[test]
    fn test_deleted_with_skips_counted() {
        let mut s = summary();
        s.keys.push(KeyReport {
            key: "xywy:2".into(),
            outcomes: vec![
                BindingOutcome::for_table("scrapy_xywy", SyncOutcome::Committed),
                BindingOutcome::for_table(
                    "scrapy_xywy_doc",
                    SyncOutcome::Skipped(SkipReason::MissingField("doc_name".into())),
                ),
            ],
            disposition: KeyDisposition::Deleted,
        });
        assert_eq!(s.deleted(), 2);
        assert_eq!(s.deleted_with_skips(), 1);
        assert!(s.key("xywy:2").unwrap().is_deleted_with_skips());
        assert!(!s.key("xywy:1").unwrap().is_deleted_with_skips());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(summary()).unwrap();
        assert_eq!(json["keys_scanned"], 3);
        assert_eq!(json["keys"][0]["disposition"]["kind"], "deleted");
        assert_eq!(json["keys"][1]["outcomes"][0]["outcome"]["kind"], "failed");
        assert_eq!(
            json["keys"][1]["outcomes"][0]["outcome"]["detail"]["kind"],
            "destination_write_failed"
        );
        assert_eq!(json["keys"][2]["outcomes"][0]["table"], serde_json::Value::Null);
    }

    #[test]
    fn test_skip_reason_from_schema_error() {
        let reason: SkipReason = SchemaError::MissingField {
            schema: "xywy".into(),
            field: "doc_name".into(),
        }
        .into();
        assert_eq!(reason, SkipReason::MissingField("doc_name".into()));
        assert_eq!(reason.to_string(), "missing field 'doc_name'");
    }
}
