//! Structured logging via the `tracing` crate.
//!
//! The engine itself only emits events; initialization is host-optional and
//! idempotent, so library consumers with their own subscriber are never
//! stepped on.

use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Configuration for tracing initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    pub default_level: String,
    /// Per-module overrides as `(module, level)` pairs.
    pub module_filters: Vec<(String, String)>,
    pub show_targets: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            module_filters: vec![
                ("geoworld_core::raster".to_string(), "warn".to_string()),
                ("geoworld_core::cache".to_string(), "warn".to_string()),
            ],
            show_targets: true,
        }
    }
}

impl TracingConfig {
    pub fn to_env_filter_string(&self) -> String {
        let mut parts = vec![self.default_level.clone()];
        for (module, level) in &self.module_filters {
            parts.push(format!("{module}={level}"));
        }
        parts.join(",")
    }
}

static TRACING_INIT: Once = Once::new();

/// Initialize tracing with default settings (idempotent, first call wins).
pub fn init_tracing_default() {
    init_tracing(&TracingConfig::default());
}

/// Initialize tracing. `RUST_LOG` in the environment overrides the config.
pub fn init_tracing(config: &TracingConfig) {
    let filter_str = config.to_env_filter_string();
    let show_targets = config.show_targets;
    TRACING_INIT.call_once(move || {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(show_targets)
            .compact();

        // Ignore the error if the host already installed a subscriber.
        let _ = subscriber.try_init();
    });
}
