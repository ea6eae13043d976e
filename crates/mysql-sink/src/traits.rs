//! DestinationSink trait definition.

use crate::error::SinkError;
use async_trait::async_trait;
use mysql_types::InsertStatement;

/// One pass-scoped session against the relational destination.
///
/// The coordinator drives the transaction explicitly:
///
/// ```ignore
/// sink.begin().await?;
/// match sink.execute(&statement).await {
///     Ok(_) => sink.commit().await?,
///     Err(e) => sink.rollback().await?,
/// }
/// ```
///
/// Sources of rows use generics over this trait, so the MySQL session and
/// the in-memory test sink are statically dispatched.
#[async_trait]
pub trait DestinationSink: Send {
    /// Open a transaction.
    async fn begin(&mut self) -> Result<(), SinkError>;

    /// Execute one single-row INSERT. Returns the affected row count.
    async fn execute(&mut self, statement: &InsertStatement) -> Result<u64, SinkError>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> Result<(), SinkError>;

    /// Roll back the open transaction. Rolling back with no open
    /// transaction is a no-op.
    async fn rollback(&mut self) -> Result<(), SinkError>;

    /// Release the session. An open transaction is rolled back.
    async fn close(&mut self) -> Result<(), SinkError>;
}
