//! Per-pass acquisition of store sessions.

use async_trait::async_trait;
use mysql_sink::{DestinationSink, MySQLConnectOpts, MySQLSink, SinkError};
use redis_source::{RedisConnectOpts, RedisStagingStore, SourceError, StagingStore};

/// Opens fresh sessions to both stores. The driver calls it at the start
/// of every pass and closes what it got at the end, so no connection
/// outlives a pass.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Source: StagingStore;
    type Destination: DestinationSink;

    async fn connect_source(&self) -> Result<Self::Source, SourceError>;

    async fn connect_destination(&self) -> Result<Self::Destination, SinkError>;
}

/// Redis staging store and MySQL destination.
#[derive(Debug, Clone)]
pub struct LiveConnector {
    pub redis: RedisConnectOpts,
    pub mysql: MySQLConnectOpts,
}

impl LiveConnector {
    pub fn new(redis: RedisConnectOpts, mysql: MySQLConnectOpts) -> Self {
        Self { redis, mysql }
    }
}

#[async_trait]
impl StoreConnector for LiveConnector {
    type Source = RedisStagingStore;
    type Destination = MySQLSink;

    async fn connect_source(&self) -> Result<RedisStagingStore, SourceError> {
        tracing::debug!("Connecting to Redis at {}", self.redis.target());
        RedisStagingStore::connect(&self.redis).await
    }

    async fn connect_destination(&self) -> Result<MySQLSink, SinkError> {
        tracing::debug!("Connecting to MySQL at {}", self.mysql.target());
        MySQLSink::connect(&self.mysql).await
    }
}
