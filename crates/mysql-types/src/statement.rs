//! Single-row INSERT statements built from projected rows.

use crate::forward::MySQLValue;
use crate::literal::{quote_identifier, to_literal};
use mysql_async::{Params, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use sync_core::ProjectedRow;

/// How a row is written when the destination already holds a matching
/// unique key.
///
/// `InsertIgnore` and `Upsert` make re-delivery of the same record
/// harmless, which is what retried keys need.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Plain `INSERT`; a duplicate key fails the write
    #[default]
    Insert,
    /// `INSERT IGNORE`; duplicates are silently dropped
    InsertIgnore,
    /// `INSERT ... ON DUPLICATE KEY UPDATE`; duplicates overwrite the row
    Upsert,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Insert => "insert",
            WriteMode::InsertIgnore => "insert_ignore",
            WriteMode::Upsert => "upsert",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An INSERT of exactly one row into one table.
#[derive(Debug, Clone)]
pub struct InsertStatement {
    row: ProjectedRow,
    mode: WriteMode,
}

impl InsertStatement {
    pub fn new(row: ProjectedRow, mode: WriteMode) -> Self {
        Self { row, mode }
    }

    pub fn table(&self) -> &str {
        &self.row.table
    }

    pub fn row(&self) -> &ProjectedRow {
        &self.row
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Statement text with `?` placeholders, one per column.
    pub fn sql(&self) -> String {
        let placeholders = vec!["?"; self.row.len()].join(", ");
        self.render(&placeholders)
    }

    /// Positional parameters matching [`InsertStatement::sql`].
    pub fn params(&self) -> Params {
        if self.row.is_empty() {
            return Params::Empty;
        }
        let values: Vec<Value> = self
            .row
            .columns
            .iter()
            .map(|(_, v)| MySQLValue::from(v).into_inner())
            .collect();
        Params::Positional(values)
    }

    /// Statement text with every value inlined as an escaped literal.
    pub fn to_literal_sql(&self) -> String {
        let values = self
            .row
            .columns
            .iter()
            .map(|(_, v)| to_literal(v))
            .collect::<Vec<_>>()
            .join(", ");
        self.render(&values)
    }

    fn render(&self, values: &str) -> String {
        let columns = self
            .row
            .columns
            .iter()
            .map(|(c, _)| quote_identifier(c))
            .collect::<Vec<_>>();

        let verb = match self.mode {
            WriteMode::InsertIgnore => "INSERT IGNORE INTO",
            WriteMode::Insert | WriteMode::Upsert => "INSERT INTO",
        };

        let mut sql = format!(
            "{verb} {} ({}) VALUES ({values})",
            quote_identifier(&self.row.table),
            columns.join(", ")
        );

        if self.mode == WriteMode::Upsert && !columns.is_empty() {
            let updates = columns
                .iter()
                .map(|c| format!("{c} = VALUES({c})"))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" ON DUPLICATE KEY UPDATE ");
            sql.push_str(&updates);
        }

        sql
    }
}
