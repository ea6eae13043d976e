//! RedisMysqlSync Library
//!
//! Periodically drains records staged in Redis into MySQL. Each staged
//! record is a Redis hash under a key of the form `<prefix>:<rest>`; the
//! prefix decides which destination tables the record is routed to, the
//! table's schema decides which fields are written, and the key is removed
//! from Redis only after the MySQL write has committed.
//!
//! # Features
//!
//! - Cursor-based key discovery: `SCAN` pages, never a full `KEYS` listing
//! - Loose routing: a key prefix matches every table name containing it
//! - Strict projection: a record must carry every field of a schema to be written
//! - Commit-then-delete: the source key outlives every failed or partial write
//! - Pass-scoped connections: both stores are opened and closed per pass
//!
//! # CLI Usage
//!
//! ```bash
//! # One pass, as invoked by cron or a systemd timer
//! redis-mysql-sync run-once --config sync.yaml \
//!   --redis-host 127.0.0.1 --redis-db 15 \
//!   --mysql-host 127.0.0.1 --mysql-database spider01
//!
//! # Built-in timer, one pass every 5 seconds
//! redis-mysql-sync schedule --config sync.yaml --every 5s ...
//!
//! # Check the configuration without connecting anywhere
//! redis-mysql-sync validate --config sync.yaml
//! ```

use clap::Parser;
use std::fmt;

pub mod config;
pub mod error;
pub mod sync;
pub mod testing;

pub use config::SyncConfig;
pub use error::{StoreKind, SyncError};
pub use sync::{
    LiveConnector, PassSummary, StoreConnector, SyncDriver, SyncOutcome,
};

#[derive(Parser, Clone)]
pub struct RedisOpts {
    /// Redis host holding the staged records
    #[arg(long, default_value = "127.0.0.1", env = "REDIS_HOST")]
    pub redis_host: String,

    /// Redis port
    #[arg(long, default_value = "6379", env = "REDIS_PORT")]
    pub redis_port: u16,

    /// Redis logical database index
    #[arg(long, default_value = "0", env = "REDIS_DB")]
    pub redis_db: i64,

    /// Redis password
    #[arg(long, env = "REDIS_PASSWORD")]
    pub redis_password: Option<String>,
}

impl fmt::Debug for RedisOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        redis_source::RedisConnectOpts::from(self).fmt(f)
    }
}

#[derive(Parser, Clone)]
pub struct MySQLOpts {
    /// MySQL host receiving the rows
    #[arg(long, default_value = "127.0.0.1", env = "MYSQL_HOST")]
    pub mysql_host: String,

    /// MySQL port
    #[arg(long, default_value = "3306", env = "MYSQL_PORT")]
    pub mysql_port: u16,

    /// MySQL username
    #[arg(long, default_value = "root", env = "MYSQL_USER")]
    pub mysql_user: String,

    /// MySQL password
    #[arg(long, env = "MYSQL_PASSWORD")]
    pub mysql_password: Option<String>,

    /// MySQL database name
    #[arg(long, env = "MYSQL_DATABASE")]
    pub mysql_database: String,
}

impl fmt::Debug for MySQLOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        mysql_sink::MySQLConnectOpts::from(self).fmt(f)
    }
}

// CLI type → store crate connection option conversions
impl From<&RedisOpts> for redis_source::RedisConnectOpts {
    fn from(opts: &RedisOpts) -> Self {
        Self {
            host: opts.redis_host.clone(),
            port: opts.redis_port,
            db: opts.redis_db,
            password: opts.redis_password.clone(),
        }
    }
}

impl From<&MySQLOpts> for mysql_sink::MySQLConnectOpts {
    fn from(opts: &MySQLOpts) -> Self {
        Self {
            host: opts.mysql_host.clone(),
            port: opts.mysql_port,
            user: opts.mysql_user.clone(),
            password: opts.mysql_password.clone(),
            database: opts.mysql_database.clone(),
        }
    }
}
