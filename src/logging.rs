//! `tracing` subscriber setup for the `tabload` binary and embedding applications.

use std::sync::Once;

use serde::Deserialize;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt};

use crate::error::{IngestionError, IngestionResult};

static INIT: Once = Once::new();

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Either a simple level like "info" or a full EnvFilter string
    /// e.g. "info,tabload=debug". `RUST_LOG` wins when set.
    pub level: Option<String>,
    /// Emit logs as JSON lines when true; otherwise human-readable text.
    pub json: bool,
    /// Include the event target in each line.
    pub with_targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Some("info".to_owned()),
            json: false,
            with_targets: false,
        }
    }
}

/// Install the global subscriber. Only the first call has an effect.
pub fn init(cfg: &LogConfig) -> IngestionResult<()> {
    let mut result = Ok(());
    INIT.call_once(|| {
        let level = cfg.level.clone().unwrap_or_else(|| "info".into());
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let fmt_layer = if cfg.json {
            fmt::layer()
                .with_target(cfg.with_targets)
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .boxed()
        } else {
            fmt::layer()
                .with_target(cfg.with_targets)
                .with_ansi(true)
                .boxed()
        };

        let subscriber = Registry::default().with(filter).with(fmt_layer);
        result = tracing::subscriber::set_global_default(subscriber).map_err(|e| IngestionError::Config {
            message: format!("failed to set global tracing subscriber: {e}"),
        });
    });
    result
}
