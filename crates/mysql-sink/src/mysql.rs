//! MySQL-backed destination.
//!
//! Uses manual BEGIN/COMMIT/ROLLBACK on a single owned connection rather
//! than `mysql_async::Transaction`, so the transaction does not borrow the
//! connection across trait calls.

use crate::error::SinkError;
use crate::traits::DestinationSink;
use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder};
use mysql_types::InsertStatement;
use std::fmt;
use tracing::{debug, warn};

/// MySQL connection options
#[derive(Clone)]
pub struct MySQLConnectOpts {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
}

impl fmt::Debug for MySQLConnectOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySQLConnectOpts")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .finish()
    }
}

impl MySQLConnectOpts {
    /// `user@host:port/database`, without the password, for log lines.
    pub fn target(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

/// A single MySQL connection used for the duration of one pass.
pub struct MySQLSink {
    conn: Option<Conn>,
    in_transaction: bool,
    target: String,
}

impl MySQLSink {
    pub async fn connect(opts: &MySQLConnectOpts) -> Result<Self, SinkError> {
        let builder = OptsBuilder::default()
            .ip_or_hostname(opts.host.clone())
            .tcp_port(opts.port)
            .user(Some(opts.user.clone()))
            .pass(opts.password.clone())
            .db_name(Some(opts.database.clone()));

        let mut conn = Conn::new(builder)
            .await
            .map_err(|e| SinkError::Connect(format!("{}: {e}", opts.target())))?;
        conn.ping().await?;

        debug!("Connected to MySQL at {}", opts.target());
        Ok(Self {
            conn: Some(conn),
            in_transaction: false,
            target: opts.target(),
        })
    }

    fn conn(&mut self) -> Result<&mut Conn, SinkError> {
        self.conn.as_mut().ok_or(SinkError::Closed)
    }
}

#[async_trait]
impl DestinationSink for MySQLSink {
    async fn begin(&mut self) -> Result<(), SinkError> {
        if self.in_transaction {
            return Err(SinkError::Transaction(
                "transaction already open".to_string(),
            ));
        }
        self.conn()?.query_drop("BEGIN").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn execute(&mut self, statement: &InsertStatement) -> Result<u64, SinkError> {
        let sql = statement.sql();
        let conn = self.conn()?;
        conn.exec_drop(&sql, statement.params()).await?;
        Ok(conn.affected_rows())
    }

    async fn commit(&mut self) -> Result<(), SinkError> {
        if !self.in_transaction {
            return Err(SinkError::Transaction("no open transaction".to_string()));
        }
        let result = self.conn()?.query_drop("COMMIT").await;
        // A failed COMMIT leaves the server-side transaction rolled back or
        // unknown; either way it is no longer ours to commit.
        self.in_transaction = false;
        result?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), SinkError> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.conn()?.query_drop("ROLLBACK").await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if self.in_transaction {
            if let Err(e) = self.rollback().await {
                warn!("Rollback on close failed: {e}");
            }
        }
        if let Some(conn) = self.conn.take() {
            conn.disconnect().await?;
            debug!("Closed MySQL connection to {}", self.target);
        }
        Ok(())
    }
}
