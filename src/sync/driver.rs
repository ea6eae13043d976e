//! One sync pass: scan, resolve, project, commit, pace.

use crate::config::{duration::format_duration, SyncConfig};
use crate::error::{StoreKind, SyncError};
use crate::sync::connector::StoreConnector;
use crate::sync::coordinator::{SyncCoordinator, SyncUnit};
use crate::sync::outcome::{
    FailureReason, KeyDisposition, KeyReport, PassSummary, SkipReason, SyncOutcome,
};
use crate::sync::projector::project_for_binding;
use crate::sync::resolver::resolve_destinations;
use chrono::Utc;
use mysql_sink::DestinationSink;
use redis_source::{KeyScanner, ScannedKey, StagingStore};
use std::future::Future;
use std::time::Duration;
use sync_core::{key_prefix, SchemaRegistry};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Default bound on opening either store.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs sync passes between one staging store and one destination.
///
/// Passes never overlap: while one is running, [`SyncDriver::run_pass`]
/// refuses with [`SyncError::PassAlreadyRunning`] instead of queueing.
pub struct SyncDriver<C: StoreConnector> {
    connector: C,
    config: SyncConfig,
    registry: SchemaRegistry,
    connect_timeout: Duration,
    pass_lock: Mutex<()>,
}

impl<C: StoreConnector> SyncDriver<C> {
    pub fn new(connector: C, config: &SyncConfig) -> Result<Self, SyncError> {
        config.validate()?;
        let registry = config.registry()?;
        Ok(Self {
            connector,
            config: config.clone(),
            registry,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            pass_lock: Mutex::new(()),
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// A pass over at most `batch_size` keys.
    pub async fn run_once(&self) -> Result<PassSummary, SyncError> {
        self.run_pass(self.config.batch_size).await
    }

    /// A pass over at most `max_keys` distinct keys.
    ///
    /// Only a failure to connect or to enumerate keys is an error; every
    /// per-key problem is reported in the returned summary. Both store
    /// sessions are closed before this returns, whatever the result.
    pub async fn run_pass(&self, max_keys: usize) -> Result<PassSummary, SyncError> {
        let _guard = self
            .pass_lock
            .try_lock()
            .map_err(|_| SyncError::PassAlreadyRunning)?;

        let started_at = Utc::now();
        info!(
            "Starting sync pass (max {max_keys} keys{})",
            if self.config.dry_run { ", dry run" } else { "" }
        );

        let mut source = self
            .connect(StoreKind::Source, self.connector.connect_source())
            .await?;
        let mut sink = match self
            .connect(StoreKind::Destination, self.connector.connect_destination())
            .await
        {
            Ok(sink) => sink,
            Err(e) => {
                close_source(&mut source).await;
                return Err(e);
            }
        };

        let result = self
            .process(&mut source, &mut sink, max_keys, PassSummary::new(started_at))
            .await;

        close_source(&mut source).await;
        if let Err(e) = sink.close().await {
            error!("Failed to close destination session: {e}");
        }

        let mut summary = result?;
        summary.finished_at = Utc::now();
        summary.log();
        Ok(summary)
    }

    async fn connect<T, E, F>(&self, store: StoreKind, connecting: F) -> Result<T, SyncError>
    where
        E: std::fmt::Display,
        F: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.connect_timeout, connecting).await {
            Ok(Ok(session)) => Ok(session),
            Ok(Err(e)) => Err(SyncError::ConnectionInit {
                store,
                reason: e.to_string(),
            }),
            Err(_) => Err(SyncError::ConnectionInit {
                store,
                reason: format!("timed out after {}", format_duration(&self.connect_timeout)),
            }),
        }
    }

    async fn process(
        &self,
        source: &mut C::Source,
        sink: &mut C::Destination,
        max_keys: usize,
        mut summary: PassSummary,
    ) -> Result<PassSummary, SyncError> {
        let keys = {
            let mut scanner = KeyScanner::new(
                &mut *source,
                self.config.scan_page_size,
                self.config.max_scan_rounds,
            );
            scanner.take_distinct(max_keys).await?
        };
        summary.keys_scanned = keys.len();
        debug!("Scanned {} keys", keys.len());

        let last = keys.len().saturating_sub(1);
        for (i, key) in keys.into_iter().enumerate() {
            let report = match key {
                ScannedKey::Text(key) => self.process_key(source, sink, &key).await,
                ScannedKey::Undecodable(_) => {
                    warn!("Skipping key that is not valid UTF-8: {key}");
                    KeyReport::unrouted(
                        key.to_string(),
                        SyncOutcome::Skipped(SkipReason::UnresolvedKey),
                    )
                }
            };
            debug!("{}: {}", report.key, report.disposition);
            summary.keys.push(report);

            // Sessions are released right after the last key.
            if i < last && !self.config.key_delay.is_zero() {
                tokio::time::sleep(self.config.key_delay).await;
            }
        }

        Ok(summary)
    }

    async fn process_key(
        &self,
        source: &mut C::Source,
        sink: &mut C::Destination,
        key: &str,
    ) -> KeyReport {
        let Some(prefix) = key_prefix(key) else {
            debug!("Skipping {key}: {}", SkipReason::UnresolvedKey);
            return KeyReport::unrouted(key, SyncOutcome::Skipped(SkipReason::UnresolvedKey));
        };

        let bindings = resolve_destinations(prefix, &self.config.bindings);
        if bindings.is_empty() {
            debug!("Skipping {key}: {}", SkipReason::NoMatchingBinding);
            return KeyReport::unrouted(key, SyncOutcome::Skipped(SkipReason::NoMatchingBinding));
        }

        let record = match source.fetch_record(key).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to read {key}: {e}");
                let mut report = KeyReport::unrouted(
                    key,
                    SyncOutcome::Failed(FailureReason::SourceReadFailed(e.to_string())),
                );
                report.disposition = KeyDisposition::RetainedForRetry;
                return report;
            }
        };
        if record.is_empty() {
            debug!("Skipping {key}: {}", SkipReason::RecordVanished);
            return KeyReport::unrouted(key, SyncOutcome::Skipped(SkipReason::RecordVanished));
        }

        let units = bindings
            .into_iter()
            .map(|binding| SyncUnit {
                table: binding.table.clone(),
                row: project_for_binding(&record, &self.registry, binding),
            })
            .collect();

        SyncCoordinator::new(source, sink, self.config.write_mode, self.config.dry_run)
            .sync_key(key, units)
            .await
    }
}

async fn close_source<S: StagingStore>(source: &mut S) {
    if let Err(e) = source.close().await {
        error!("Failed to close staging session: {e}");
    }
}
