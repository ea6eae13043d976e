//! Command-line interface for redis-mysql-sync
//!
//! # Usage Examples
//!
//! ```bash
//! # One pass, as invoked by cron or a systemd timer
//! redis-mysql-sync run-once --config sync.yaml \
//!   --redis-host 127.0.0.1 --redis-db 15 \
//!   --mysql-host 127.0.0.1 --mysql-user root --mysql-database spider01
//!
//! # Print the pass summary as JSON
//! redis-mysql-sync run-once --config sync.yaml --mysql-database spider01 --json
//!
//! # Poll every 5 seconds until Ctrl-C
//! redis-mysql-sync schedule --config sync.yaml --mysql-database spider01 --every 5s
//!
//! # Check the configuration without connecting anywhere
//! redis-mysql-sync validate --config sync.yaml
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use redis_mysql_sync::config::duration::{format_duration, parse_duration};
use redis_mysql_sync::{
    LiveConnector, MySQLOpts, PassSummary, RedisOpts, SyncConfig, SyncDriver, SyncError,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

#[derive(Parser)]
#[command(name = "redis-mysql-sync")]
#[command(about = "Drain records staged in Redis hashes into MySQL tables")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single sync pass and exit
    RunOnce {
        #[command(flatten)]
        pass: PassArgs,

        /// Print the pass summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Run a sync pass at a fixed interval until interrupted
    Schedule {
        #[command(flatten)]
        pass: PassArgs,

        /// Interval between pass starts (e.g. 5s, 500ms, 1m)
        #[arg(long, default_value = "5s")]
        every: String,
    },

    /// Load and check a sync configuration
    Validate {
        /// Sync configuration file (YAML)
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
    },
}

#[derive(Args)]
struct PassArgs {
    /// Sync configuration file (YAML)
    #[arg(long, value_name = "PATH")]
    config: PathBuf,

    /// Redis connection options
    #[command(flatten)]
    redis: RedisOpts,

    /// MySQL connection options
    #[command(flatten)]
    mysql: MySQLOpts,

    /// Keys per pass (overrides the configuration file)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Render statements without writing or deleting anything
    #[arg(long)]
    dry_run: bool,

    /// Timeout for opening either store
    #[arg(long, default_value = "10s")]
    connect_timeout: String,
}

impl PassArgs {
    fn build_driver(&self) -> anyhow::Result<SyncDriver<LiveConnector>> {
        let mut config = SyncConfig::from_file(&self.config)?;
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        config.dry_run |= self.dry_run;

        let connect_timeout = parse_duration(&self.connect_timeout)
            .with_context(|| format!("Invalid --connect-timeout: {}", self.connect_timeout))?;

        tracing::debug!("Staging store: {:?}", self.redis);
        tracing::debug!("Destination: {:?}", self.mysql);

        let connector = LiveConnector::new((&self.redis).into(), (&self.mysql).into());
        let driver = SyncDriver::new(connector, &config)?.with_connect_timeout(connect_timeout);
        Ok(driver)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::RunOnce { pass, json } => {
            let driver = pass.build_driver()?;
            let summary = driver.run_once().await.context("Sync pass failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Commands::Schedule { pass, every } => {
            let every = parse_duration(&every)
                .with_context(|| format!("Invalid --every: {every}"))?;
            let driver = pass.build_driver()?;
            run_schedule(&driver, every).await?;
        }
        Commands::Validate { config } => {
            let config = SyncConfig::from_file(&config)?;
            print_config(&config)?;
        }
    }

    Ok(())
}

async fn run_schedule(driver: &SyncDriver<LiveConnector>, every: Duration) -> anyhow::Result<()> {
    if every.is_zero() {
        anyhow::bail!("--every must be greater than zero");
    }
    tracing::info!("Running a sync pass every {}", format_duration(&every));

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match driver.run_once().await {
                    Ok(_) => {}
                    Err(SyncError::PassAlreadyRunning) => {
                        tracing::warn!("Previous sync pass still running, skipping this tick");
                    }
                    Err(e) => tracing::error!("Sync pass failed: {e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping");
                return Ok(());
            }
        }
    }
}

fn print_summary(summary: &PassSummary) {
    for report in &summary.keys {
        for outcome in &report.outcomes {
            match &outcome.table {
                Some(table) => println!("{} -> {table}: {}", report.key, outcome.outcome),
                None => println!("{}: {}", report.key, outcome.outcome),
            }
        }
        println!("{}: {}", report.key, report.disposition);
    }
    println!(
        "{} keys, {} committed, {} skipped, {} failed, {} deleted ({} with skipped bindings), {} retained, {} orphaned",
        summary.keys.len(),
        summary.committed(),
        summary.skipped(),
        summary.failed(),
        summary.deleted(),
        summary.deleted_with_skips(),
        summary.retained(),
        summary.orphaned()
    );
}

fn print_config(config: &SyncConfig) -> anyhow::Result<()> {
    let registry = config.registry()?;
    println!(
        "batch_size={} scan_page_size={} key_delay={} write_mode={}{}",
        config.batch_size,
        config.scan_page_size,
        format_duration(&config.key_delay),
        config.write_mode,
        if config.dry_run { " dry_run" } else { "" }
    );
    for binding in &config.bindings {
        let key_column = binding
            .key_column
            .as_deref()
            .map(|c| format!(" + {c}"))
            .unwrap_or_default();
        match registry.resolve(&binding.schema) {
            Ok(schema) => {
                let columns: Vec<String> = schema
                    .fields
                    .iter()
                    .map(|f| format!("{} {}", f.name, f.field_type))
                    .collect();
                println!(
                    "{} <- {}: ({}){key_column}",
                    binding.table,
                    schema.id,
                    columns.join(", ")
                );
            }
            Err(e) => println!("{} <- {}: {e}", binding.table, binding.schema),
        }
    }
    Ok(())
}
