//! YAML loader configuration.
//!
//! ```yaml
//! database:
//!   path: warehouse.db
//! loader:
//!   batch_size: 2500
//!   inference: all_rows      # or first_row
//!   skip_blank_rows:
//!     csv: false
//!     xlsx: true
//! logging:
//!   level: info
//!   json: false
//! ```
//!
//! Every section and key is optional.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{IngestionError, IngestionResult};
use crate::ingestion::{BlankRowPolicy, IngestionOptions, InferencePolicy};
use crate::loader::DEFAULT_BATCH_SIZE;
use crate::logging::LogConfig;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    pub database: DatabaseConfig,
    pub loader: LoaderSection,
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite database file. `None` means the caller decides (the CLI requires one).
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderSection {
    pub batch_size: usize,
    pub inference: InferencePolicy,
    pub skip_blank_rows: BlankRowPolicy,
}

impl Default for LoaderSection {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            inference: InferencePolicy::default(),
            skip_blank_rows: BlankRowPolicy::default(),
        }
    }
}

impl LoaderConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> IngestionResult<Self> {
        let cfg: Self = serde_yaml::from_str(yaml)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> IngestionResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loaded loader config");
        Self::from_yaml_str(&raw)
    }

    pub fn validate(&self) -> IngestionResult<()> {
        if self.loader.batch_size == 0 {
            return Err(IngestionError::Config {
                message: "loader.batch_size must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Ingestion options carrying this config's loader settings (no format/table override,
    /// no observer).
    pub fn to_options(&self) -> IngestionOptions {
        IngestionOptions {
            batch_size: self.loader.batch_size,
            inference: self.loader.inference,
            skip_blank_rows: self.loader.skip_blank_rows,
            ..IngestionOptions::default()
        }
    }
}
