//! Commit-then-delete for one staged key.
//!
//! Each binding of a key is written in its own destination transaction.
//! The source key is deleted once, after every binding has been handled,
//! and only when at least one write committed and none failed:
//!
//! ```text
//! Pending ── all eligible bindings committed ──▶ Deleted
//!    │
//!    ├── a binding failed ──▶ RetainedForRetry   (later bindings NotAttempted)
//!    ├── committed, DEL failed ──▶ OrphanCommit  (retried next pass)
//!    └── nothing committed, nothing failed ──▶ Retained
//! ```
//!
//! A retained key is offered again on the next pass, which rewrites every
//! binding. Destination tables must therefore absorb repeated inserts of
//! the same row, see [`sync_core::DestinationBinding`].

use crate::sync::outcome::{
    BindingOutcome, FailureReason, KeyDisposition, KeyReport, SkipReason, SyncOutcome,
};
use mysql_sink::{DestinationSink, SinkError};
use mysql_types::{InsertStatement, WriteMode};
use redis_source::StagingStore;
use sync_core::ProjectedRow;
use tracing::{debug, error, info, warn};

/// One binding of a key, projected or with the reason it cannot be.
#[derive(Debug, Clone)]
pub struct SyncUnit {
    pub table: String,
    pub row: Result<ProjectedRow, SkipReason>,
}

pub struct SyncCoordinator<'a, S: StagingStore + ?Sized, D: DestinationSink + ?Sized> {
    source: &'a mut S,
    sink: &'a mut D,
    write_mode: WriteMode,
    dry_run: bool,
}

impl<'a, S, D> SyncCoordinator<'a, S, D>
where
    S: StagingStore + ?Sized,
    D: DestinationSink + ?Sized,
{
    pub fn new(source: &'a mut S, sink: &'a mut D, write_mode: WriteMode, dry_run: bool) -> Self {
        Self {
            source,
            sink,
            write_mode,
            dry_run,
        }
    }

    /// Write one row in its own transaction.
    pub async fn commit_row(&mut self, row: ProjectedRow) -> SyncOutcome {
        let statement = InsertStatement::new(row, self.write_mode);

        if self.dry_run {
            info!("[dry-run] {}", statement.to_literal_sql());
            return SyncOutcome::Skipped(SkipReason::DryRun);
        }
        debug!("{}", statement.to_literal_sql());

        if let Err(e) = self.sink.begin().await {
            return self.abort(statement.table(), e).await;
        }
        if let Err(e) = self.sink.execute(&statement).await {
            return self.abort(statement.table(), e).await;
        }
        match self.sink.commit().await {
            Ok(()) => SyncOutcome::Committed,
            Err(e) => self.abort(statement.table(), e).await,
        }
    }

    async fn abort(&mut self, table: &str, cause: SinkError) -> SyncOutcome {
        let mut message = cause.to_string();
        if let Err(e) = self.sink.rollback().await {
            error!("Rollback on {table} failed: {e}");
            message = format!("{message} (rollback failed: {e})");
        }
        warn!("Write to {table} failed: {message}");
        SyncOutcome::Failed(FailureReason::DestinationWriteFailed(message))
    }

    /// Process every binding of `key` in order, then settle the key.
    pub async fn sync_key(&mut self, key: &str, units: Vec<SyncUnit>) -> KeyReport {
        let mut outcomes = Vec::with_capacity(units.len());
        let mut aborted = false;

        for unit in units {
            let outcome = if aborted {
                SyncOutcome::Failed(FailureReason::NotAttempted)
            } else {
                match unit.row {
                    Ok(row) => self.commit_row(row).await,
                    Err(reason) => {
                        debug!("Skipping {key} for {}: {reason}", unit.table);
                        SyncOutcome::Skipped(reason)
                    }
                }
            };
            aborted |= outcome.is_failed();
            outcomes.push(BindingOutcome::for_table(unit.table, outcome));
        }

        let any_committed = outcomes.iter().any(|o| o.outcome.is_committed());
        let disposition = if aborted {
            KeyDisposition::RetainedForRetry
        } else if any_committed {
            let disposition = self.delete(key).await;
            if disposition == KeyDisposition::Deleted {
                let skipped: Vec<&str> = outcomes
                    .iter()
                    .filter(|o| o.outcome.is_skipped())
                    .filter_map(|o| o.table.as_deref())
                    .collect();
                if !skipped.is_empty() {
                    warn!(
                        "Deleted {key} without writing it to {}: record not eligible",
                        skipped.join(", ")
                    );
                }
            }
            disposition
        } else {
            KeyDisposition::Retained
        };

        KeyReport {
            key: key.to_string(),
            outcomes,
            disposition,
        }
    }

    async fn delete(&mut self, key: &str) -> KeyDisposition {
        match self.source.delete_record(key).await {
            Ok(removed) => {
                if !removed {
                    debug!("{key} was already gone from the staging store");
                }
                KeyDisposition::Deleted
            }
            Err(e) => {
                error!(
                    "Orphan commit: {key} was written to the destination but could not be deleted from the staging store: {e}"
                );
                KeyDisposition::OrphanCommit(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysql_sink::testing::MemorySink;
    use redis_source::testing::MemoryStagingStore;
    use sync_core::FieldValue;

    fn row(table: &str, title: &str) -> ProjectedRow {
        let mut row = ProjectedRow::new(table);
        row.push("title", FieldValue::Text(title.into()));
        row
    }

    fn unit(table: &str) -> SyncUnit {
        SyncUnit {
            table: table.into(),
            row: Ok(row(table, "t")),
        }
    }

    fn staged() -> MemoryStagingStore {
        let store = MemoryStagingStore::new();
        store.stage_pairs("haodf:1", &[("title", "t")]);
        store
    }

    #[tokio::test]
    async fn test_commit_then_delete() {
        let store = staged();
        let sink = MemorySink::new();
        let (mut src, mut dst) = (store.session(), sink.session());
        let mut coordinator = SyncCoordinator::new(&mut src, &mut dst, WriteMode::Insert, false);

        let report = coordinator.sync_key("haodf:1", vec![unit("scrapy_haodf")]).await;

        assert_eq!(report.disposition, KeyDisposition::Deleted);
        assert_eq!(sink.row_count("scrapy_haodf"), 1);
        assert!(!store.contains("haodf:1"));
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_bindings() {
        let store = staged();
        let sink = MemorySink::new();
        sink.reject_table("scrapy_haodf");
        let (mut src, mut dst) = (store.session(), sink.session());
        let mut coordinator = SyncCoordinator::new(&mut src, &mut dst, WriteMode::Insert, false);

        let report = coordinator
            .sync_key(
                "haodf:1",
                vec![unit("scrapy_haodf_doc"), unit("scrapy_haodf"), unit("scrapy_haodf_ask")],
            )
            .await;

        assert_eq!(report.outcome_for("scrapy_haodf_doc"), Some(&SyncOutcome::Committed));
        assert!(matches!(
            report.outcome_for("scrapy_haodf"),
            Some(SyncOutcome::Failed(FailureReason::DestinationWriteFailed(_)))
        ));
        assert_eq!(
            report.outcome_for("scrapy_haodf_ask"),
            Some(&SyncOutcome::Failed(FailureReason::NotAttempted))
        );
        assert_eq!(report.disposition, KeyDisposition::RetainedForRetry);
        assert_eq!(sink.rollbacks(), 1);
        assert_eq!(sink.row_count("scrapy_haodf_ask"), 0);
        assert!(store.contains("haodf:1"));
    }

    #[tokio::test]
    async fn test_skipped_binding_does_not_block_delete() {
        let store = staged();
        let sink = MemorySink::new();
        let (mut src, mut dst) = (store.session(), sink.session());
        let mut coordinator = SyncCoordinator::new(&mut src, &mut dst, WriteMode::Insert, false);

        let skipped = SyncUnit {
            table: "scrapy_haodf_doc".into(),
            row: Err(SkipReason::MissingField("doc_name".into())),
        };
        let report = coordinator
            .sync_key("haodf:1", vec![skipped, unit("scrapy_haodf")])
            .await;

        assert_eq!(report.disposition, KeyDisposition::Deleted);
        assert!(report.is_deleted_with_skips());
        assert!(!store.contains("haodf:1"));
    }

    #[tokio::test]
    async fn test_all_skipped_retains_key() {
        let store = staged();
        let sink = MemorySink::new();
        let (mut src, mut dst) = (store.session(), sink.session());
        let mut coordinator = SyncCoordinator::new(&mut src, &mut dst, WriteMode::Insert, false);

        let report = coordinator
            .sync_key(
                "haodf:1",
                vec![SyncUnit {
                    table: "scrapy_haodf".into(),
                    row: Err(SkipReason::MissingField("doc_name".into())),
                }],
            )
            .await;

        assert_eq!(report.disposition, KeyDisposition::Retained);
        assert!(store.contains("haodf:1"));
        assert_eq!(sink.commits(), 0);
    }

    #[tokio::test]
    async fn test_commit_failure_rolls_back() {
        let store = staged();
        let sink = MemorySink::new();
        sink.fail_commits(true);
        let (mut src, mut dst) = (store.session(), sink.session());
        let mut coordinator = SyncCoordinator::new(&mut src, &mut dst, WriteMode::Insert, false);

        let report = coordinator.sync_key("haodf:1", vec![unit("scrapy_haodf")]).await;

        assert_eq!(report.disposition, KeyDisposition::RetainedForRetry);
        assert_eq!(sink.total_rows(), 0);
        assert!(store.contains("haodf:1"));
    }

    #[tokio::test]
    async fn test_rollback_failure_is_reported() {
        let store = staged();
        let sink = MemorySink::new();
        sink.reject_table("scrapy_haodf");
        sink.fail_rollbacks(true);
        let (mut src, mut dst) = (store.session(), sink.session());
        let mut coordinator = SyncCoordinator::new(&mut src, &mut dst, WriteMode::Insert, false);

        let report = coordinator.sync_key("haodf:1", vec![unit("scrapy_haodf")]).await;

        match report.outcome_for("scrapy_haodf") {
            Some(SyncOutcome::Failed(FailureReason::DestinationWriteFailed(msg))) => {
                assert!(msg.contains("rollback failed"), "{msg}");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_failure_is_orphan_commit() {
        let store = staged();
        store.fail_delete_for("haodf:1");
        let sink = MemorySink::new();
        let (mut src, mut dst) = (store.session(), sink.session());
        let mut coordinator = SyncCoordinator::new(&mut src, &mut dst, WriteMode::Insert, false);

        let report = coordinator.sync_key("haodf:1", vec![unit("scrapy_haodf")]).await;

        assert!(matches!(report.disposition, KeyDisposition::OrphanCommit(_)));
        assert_eq!(sink.row_count("scrapy_haodf"), 1);
        assert!(store.contains("haodf:1"));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = staged();
        let sink = MemorySink::new();
        let (mut src, mut dst) = (store.session(), sink.session());
        let mut coordinator = SyncCoordinator::new(&mut src, &mut dst, WriteMode::Insert, true);

        let report = coordinator.sync_key("haodf:1", vec![unit("scrapy_haodf")]).await;

        assert_eq!(
            report.outcome_for("scrapy_haodf"),
            Some(&SyncOutcome::Skipped(SkipReason::DryRun))
        );
        assert_eq!(report.disposition, KeyDisposition::Retained);
        assert_eq!(sink.total_rows(), 0);
        assert!(store.contains("haodf:1"));
    }
}
