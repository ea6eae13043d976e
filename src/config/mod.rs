//! Sync configuration.
//!
//! Connection details come from the command line (see [`crate::RedisOpts`]
//! and [`crate::MySQLOpts`]); everything describing *what* is synced lives
//! in a YAML file:
//!
//! ```yaml
//! batch_size: 10
//! key_delay: 1s
//! write_mode: insert
//! schemas:
//!   - id: xywy
//!     fields: [title, quest, url]
//! bindings:
//!   - table: scrapy_xywy
//!     schema: xywy
//! ```

pub mod duration;

use crate::error::SyncError;
use anyhow::Context;
use mysql_types::WriteMode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use sync_core::{DestinationBinding, SchemaDescriptor, SchemaRegistry};
use tracing::warn;

fn default_batch_size() -> usize {
    10
}

fn default_scan_page_size() -> usize {
    redis_source::DEFAULT_PAGE_SIZE
}

fn default_max_scan_rounds() -> usize {
    redis_source::DEFAULT_MAX_ROUNDS
}

fn default_key_delay() -> Duration {
    Duration::from_secs(1)
}

/// What to sync and how fast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Keys processed per pass
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// SCAN COUNT hint
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: usize,

    /// Cursor round-trips allowed before a scan is declared stuck
    #[serde(default = "default_max_scan_rounds")]
    pub max_scan_rounds: usize,

    /// Pause after each key, shedding load from both stores
    #[serde(default = "default_key_delay", with = "duration")]
    pub key_delay: Duration,

    /// How rows are written when the destination already has them
    #[serde(default)]
    pub write_mode: WriteMode,

    /// Render statements without writing or deleting anything
    #[serde(default)]
    pub dry_run: bool,

    /// Destination column sets
    pub schemas: Vec<SchemaDescriptor>,

    /// Destination tables in routing order
    pub bindings: Vec<DestinationBinding>,
}

impl SyncConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: SyncConfig =
            serde_yaml::from_str(content).context("Failed to parse sync configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sync configuration {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid sync configuration {}", path.display()))
    }

    /// Build the schema registry.
    pub fn registry(&self) -> Result<SchemaRegistry, SyncError> {
        SchemaRegistry::new(self.schemas.clone()).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Check limits, schemas and bindings.
    ///
    /// A binding naming an unregistered schema is allowed: records routed
    /// to it are skipped at projection time. It is logged here so the typo
    /// is visible at startup.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.batch_size == 0 {
            return Err(SyncError::Config("batch_size must be at least 1".into()));
        }
        if self.scan_page_size == 0 {
            return Err(SyncError::Config("scan_page_size must be at least 1".into()));
        }
        if self.max_scan_rounds == 0 {
            return Err(SyncError::Config("max_scan_rounds must be at least 1".into()));
        }

        let registry = self.registry()?;

        let mut seen = HashSet::new();
        for binding in &self.bindings {
            if binding.table.trim().is_empty() {
                return Err(SyncError::Config("binding with empty table name".into()));
            }
            if !seen.insert((binding.table.as_str(), binding.schema.as_str())) {
                return Err(SyncError::Config(format!(
                    "binding {} -> {} declared more than once",
                    binding.table, binding.schema
                )));
            }

            match registry.resolve(&binding.schema) {
                Ok(schema) => {
                    if let Some(column) = &binding.key_column {
                        if column.trim().is_empty() {
                            return Err(SyncError::Config(format!(
                                "binding {} has an empty key_column",
                                binding.table
                            )));
                        }
                        if schema.fields.iter().any(|f| &f.name == column) {
                            return Err(SyncError::Config(format!(
                                "key_column '{column}' of binding {} collides with a field of schema '{}'",
                                binding.table, schema.id
                            )));
                        }
                    }
                }
                Err(_) => warn!(
                    "Binding {} references unknown schema '{}'; records routed to it will be skipped",
                    binding.table, binding.schema
                ),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
batch_size: 2
key_delay: 250ms
write_mode: upsert
schemas:
  - id: xywy
    fields: [title, quest, url]
  - id: haodf
    fields:
      - answer_url
      - { name: grade, type: integer }
bindings:
  - table: scrapy_xywy
    schema: xywy
  - table: scrapy_haodf
    schema: haodf
    key_column: source_key
"#;

    #[test]
    fn test_sample_config() {
        let config = SyncConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.scan_page_size, 100);
        assert_eq!(config.key_delay, Duration::from_millis(250));
        assert_eq!(config.write_mode, WriteMode::Upsert);
        assert!(!config.dry_run);
        assert_eq!(config.bindings.len(), 2);
        assert_eq!(
            config.bindings[1].key_column.as_deref(),
            Some("source_key")
        );
        assert_eq!(config.registry().unwrap().ids(), vec!["xywy", "haodf"]);
    }

    #[test]
    fn test_defaults() {
        let config = SyncConfig::from_yaml("schemas: []\nbindings: []\n").unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.key_delay, Duration::from_secs(1));
        assert_eq!(config.write_mode, WriteMode::Insert);
        assert_eq!(config.max_scan_rounds, 100_000);
    }

    #[test]
    fn test_zero_batch_rejected() {
        let err = SyncConfig::from_yaml("batch_size: 0\nschemas: []\nbindings: []\n").unwrap_err();
        assert!(format!("{err:#}").contains("batch_size"));
    }

    #[test]
    fn test_duplicate_schema_rejected() {
        let yaml = "schemas:\n  - {id: a, fields: [x]}\n  - {id: a, fields: [y]}\nbindings: []\n";
        assert!(SyncConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_unknown_schema_is_not_fatal() {
        let yaml = "schemas: []\nbindings:\n  - {table: scrapy_sprain_doc, schema: sprain}\n";
        assert!(SyncConfig::from_yaml(yaml).is_ok());
    }

    #[test]
    fn test_key_column_collision_rejected() {
        let yaml = "schemas:\n  - {id: a, fields: [url]}\nbindings:\n  - {table: t_a, schema: a, key_column: url}\n";
        assert!(SyncConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(SyncConfig::from_yaml("schemas: []\nbindings: []\nbatchsize: 3\n").is_err());
    }
}
