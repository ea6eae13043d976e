use crate::error::SinkError;
use crate::traits::DestinationSink;
use async_trait::async_trait;
use mysql_types::{InsertStatement, WriteMode};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use sync_core::{FieldValue, ProjectedRow};

#[derive(Default)]
struct SinkState {
    tables: BTreeMap<String, Vec<ProjectedRow>>,
    unique_columns: HashMap<String, String>,
    rejected_tables: HashSet<String>,
    fail_commit: bool,
    fail_rollback: bool,
    sessions_opened: usize,
    sessions_closed: usize,
    commits: usize,
    rollbacks: usize,
}

enum PendingWrite {
    Insert(ProjectedRow),
    Replace { index: usize, row: ProjectedRow },
}

/// Table → rows store kept in memory, with failure injection and an
/// optional single-column unique constraint per table.
///
/// Clones share committed data; each session keeps its own uncommitted
/// writes, visible to nobody until `commit`.
#[derive(Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<SinkState>>,
    pending: Arc<Mutex<Vec<PendingWrite>>>,
    in_transaction: bool,
    closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn pending(&self) -> MutexGuard<'_, Vec<PendingWrite>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Declare `column` unique in `table`.
    pub fn with_unique_column(self, table: &str, column: &str) -> Self {
        self.state()
            .unique_columns
            .insert(table.to_string(), column.to_string());
        self
    }

    /// Reject every write to `table` until [`MemorySink::clear_failures`].
    pub fn reject_table(&self, table: &str) {
        self.state().rejected_tables.insert(table.to_string());
    }

    pub fn fail_commits(&self, on: bool) {
        self.state().fail_commit = on;
    }

    pub fn fail_rollbacks(&self, on: bool) {
        self.state().fail_rollback = on;
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.rejected_tables.clear();
        state.fail_commit = false;
        state.fail_rollback = false;
    }

    /// Committed rows of `table`.
    pub fn rows(&self, table: &str) -> Vec<ProjectedRow> {
        self.state().tables.get(table).cloned().unwrap_or_default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.state().tables.get(table).map_or(0, Vec::len)
    }

    pub fn total_rows(&self) -> usize {
        self.state().tables.values().map(Vec::len).sum()
    }

    pub fn commits(&self) -> usize {
        self.state().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state().rollbacks
    }

    /// Open a new session sharing this sink's committed data.
    pub fn session(&self) -> Self {
        self.state().sessions_opened += 1;
        Self {
            state: Arc::clone(&self.state),
            pending: Arc::new(Mutex::new(Vec::new())),
            in_transaction: false,
            closed: false,
        }
    }

    pub fn sessions_opened(&self) -> usize {
        self.state().sessions_opened
    }

    pub fn sessions_closed(&self) -> usize {
        self.state().sessions_closed
    }

    fn ensure_open(&self) -> Result<(), SinkError> {
        if self.closed {
            Err(SinkError::Closed)
        } else {
            Ok(())
        }
    }

    fn apply(state: &mut SinkState, table: &str, write: PendingWrite) {
        let rows = state.tables.entry(table.to_string()).or_default();
        match write {
            PendingWrite::Insert(row) => rows.push(row),
            PendingWrite::Replace { index, row } => {
                if let Some(slot) = rows.get_mut(index) {
                    *slot = row;
                } else {
                    rows.push(row);
                }
            }
        }
    }

    fn commit_pending(&self) {
        let writes: Vec<PendingWrite> = self.pending().drain(..).collect();
        let mut state = self.state();
        for write in writes {
            let table = match &write {
                PendingWrite::Insert(row) | PendingWrite::Replace { row, .. } => row.table.clone(),
            };
            Self::apply(&mut state, &table, write);
        }
    }
}

fn unique_value<'a>(row: &'a ProjectedRow, column: &str) -> Option<&'a FieldValue> {
    row.get(column)
}

#[async_trait]
impl DestinationSink for MemorySink {
    async fn begin(&mut self) -> Result<(), SinkError> {
        self.ensure_open()?;
        if self.in_transaction {
            return Err(SinkError::Transaction(
                "transaction already open".to_string(),
            ));
        }
        self.in_transaction = true;
        Ok(())
    }

    async fn execute(&mut self, statement: &InsertStatement) -> Result<u64, SinkError> {
        self.ensure_open()?;
        let row = statement.row().clone();
        let write = {
            let state = self.state();
            if state.rejected_tables.contains(&row.table) {
                return Err(SinkError::Rejected(format!(
                    "injected constraint violation on {}",
                    row.table
                )));
            }

            let existing = state.unique_columns.get(&row.table).and_then(|column| {
                let value = unique_value(&row, column)?;
                let committed = state.tables.get(&row.table)?;
                committed
                    .iter()
                    .position(|r| unique_value(r, column) == Some(value))
                    .map(|index| (index, column.clone()))
            });

            match (existing, statement.mode()) {
                (None, _) => PendingWrite::Insert(row),
                (Some((_, column)), WriteMode::Insert) => {
                    return Err(SinkError::Rejected(format!(
                        "Duplicate entry for key '{}.{column}'",
                        row.table
                    )));
                }
                (Some(_), WriteMode::InsertIgnore) => return Ok(0),
                (Some((index, _)), WriteMode::Upsert) => PendingWrite::Replace { index, row },
            }
        };

        let affected = match write {
            PendingWrite::Insert(_) => 1,
            PendingWrite::Replace { .. } => 2,
        };
        self.pending().push(write);
        if !self.in_transaction {
            self.commit_pending();
        }
        Ok(affected)
    }

    async fn commit(&mut self) -> Result<(), SinkError> {
        self.ensure_open()?;
        if !self.in_transaction {
            return Err(SinkError::Transaction("no open transaction".to_string()));
        }
        self.in_transaction = false;
        if self.state().fail_commit {
            self.pending().clear();
            return Err(SinkError::Transaction("injected commit failure".to_string()));
        }
        self.commit_pending();
        self.state().commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), SinkError> {
        self.ensure_open()?;
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.pending().clear();
        if self.state().fail_rollback {
            return Err(SinkError::Transaction(
                "injected rollback failure".to_string(),
            ));
        }
        self.state().rollbacks += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if !self.closed {
            self.pending().clear();
            self.in_transaction = false;
            self.closed = true;
            self.state().sessions_closed += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(table: &str, id: &str, mode: WriteMode) -> InsertStatement {
        let mut row = ProjectedRow::new(table);
        row.push("id", FieldValue::Text(id.to_string()));
        InsertStatement::new(row, mode)
    }

    #[tokio::test]
    async fn test_rows_invisible_until_commit() {
        let sink = MemorySink::new();
        let mut session = sink.session();
        session.begin().await.unwrap();
        session
            .execute(&statement("t", "1", WriteMode::Insert))
            .await
            .unwrap();
        assert_eq!(sink.row_count("t"), 0);
        session.commit().await.unwrap();
        assert_eq!(sink.row_count("t"), 1);
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let sink = MemorySink::new();
        let mut session = sink.session();
        session.begin().await.unwrap();
        session
            .execute(&statement("t", "1", WriteMode::Insert))
            .await
            .unwrap();
        session.rollback().await.unwrap();
        assert_eq!(sink.row_count("t"), 0);
        assert_eq!(sink.rollbacks(), 1);
    }

    #[tokio::test]
    async fn test_unique_column_by_write_mode() {
        let sink = MemorySink::new().with_unique_column("t", "id");
        let mut session = sink.session();
        session
            .execute(&statement("t", "1", WriteMode::Insert))
            .await
            .unwrap();

        let err = session
            .execute(&statement("t", "1", WriteMode::Insert))
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Rejected(_)));

        let ignored = session
            .execute(&statement("t", "1", WriteMode::InsertIgnore))
            .await
            .unwrap();
        assert_eq!(ignored, 0);

        let upserted = session
            .execute(&statement("t", "1", WriteMode::Upsert))
            .await
            .unwrap();
        assert_eq!(upserted, 2);
        assert_eq!(sink.row_count("t"), 1);
    }

    #[tokio::test]
    async fn test_commit_failure_discards_writes() {
        let sink = MemorySink::new();
        sink.fail_commits(true);
        let mut session = sink.session();
        session.begin().await.unwrap();
        session
            .execute(&statement("t", "1", WriteMode::Insert))
            .await
            .unwrap();
        assert!(session.commit().await.is_err());
        assert_eq!(sink.row_count("t"), 0);
    }

    #[tokio::test]
    async fn test_closed_session_refuses_work() {
        let sink = MemorySink::new();
        let mut session = sink.session();
        session.close().await.unwrap();
        assert!(matches!(session.begin().await, Err(SinkError::Closed)));
        assert_eq!(sink.sessions_opened(), 1);
        assert_eq!(sink.sessions_closed(), 1);
    }
}
