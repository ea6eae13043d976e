//! Redis-backed staging store.
//!
//! Records are Redis hashes. Keys are enumerated with `SCAN`, read with
//! `HGETALL` and removed with a `MULTI`/`DEL`/`EXEC` pipeline.

use crate::error::SourceError;
use crate::store::StagingStore;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::IntoConnectionInfo;
use std::collections::HashMap;
use std::fmt;
use sync_core::StagedRecord;
use tracing::debug;

/// Redis connection options
#[derive(Clone)]
pub struct RedisConnectOpts {
    pub host: String,
    pub port: u16,
    /// Logical database index (`SELECT n`)
    pub db: i64,
    pub password: Option<String>,
}

impl fmt::Debug for RedisConnectOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConnectOpts")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db", &self.db)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl RedisConnectOpts {
    /// `host:port/db`, without credentials, for log lines.
    pub fn target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.db)
    }
}

/// A single Redis connection used for the duration of one pass.
pub struct RedisStagingStore {
    conn: Option<MultiplexedConnection>,
    target: String,
}

impl RedisStagingStore {
    /// Open a connection and verify it with `PING`.
    pub async fn connect(opts: &RedisConnectOpts) -> Result<Self, SourceError> {
        let mut info = (opts.host.as_str(), opts.port).into_connection_info()?;
        info.redis.db = opts.db;
        info.redis.password = opts.password.clone();

        let client = redis::Client::open(info)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        debug!("Connected to Redis at {}", opts.target());
        Ok(Self {
            conn: Some(conn),
            target: opts.target(),
        })
    }

    fn conn(&mut self) -> Result<&mut MultiplexedConnection, SourceError> {
        self.conn.as_mut().ok_or(SourceError::Closed)
    }
}

#[async_trait]
impl StagingStore for RedisStagingStore {
    async fn scan_page(
        &mut self,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<Vec<u8>>), SourceError> {
        let conn = self.conn()?;
        let (next, keys): (u64, Vec<Vec<u8>>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("COUNT")
            .arg(count)
            .query_async(conn)
            .await?;
        Ok((next, keys))
    }

    async fn fetch_record(&mut self, key: &str) -> Result<StagedRecord, SourceError> {
        let conn = self.conn()?;
        let fields: HashMap<String, String> =
            redis::cmd("HGETALL").arg(key).query_async(conn).await?;
        Ok(StagedRecord::new(key, fields))
    }

    async fn delete_record(&mut self, key: &str) -> Result<bool, SourceError> {
        let conn = self.conn()?;
        // MULTI/EXEC makes dispatch of the delete atomic on the Redis side;
        // it does not span the MySQL transaction.
        let (removed,): (i64,) = redis::pipe().atomic().del(key).query_async(conn).await?;
        Ok(removed > 0)
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        if self.conn.take().is_some() {
            debug!("Closed Redis connection to {}", self.target);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let opts = RedisConnectOpts {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: 15,
            password: Some("hunter2".to_string()),
        };
        let printed = format!("{opts:?}");
        assert!(!printed.contains("hunter2"));
        assert_eq!(opts.target(), "127.0.0.1:6379/15");
    }
}
