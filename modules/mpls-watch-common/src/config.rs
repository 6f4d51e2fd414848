use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IceWatchError;
use crate::types::TrustTier;

fn default_max_distance_km() -> f64 {
    50.0
}
fn default_min_corroboration_sources() -> usize {
    2
}
fn default_cluster_expiry_hours() -> f64 {
    6.0
}
fn default_fresh_max_hours() -> f64 {
    3.0
}
fn default_temporal_window_hours() -> f64 {
    2.0
}
fn default_geo_window_km() -> f64 {
    3.0
}
fn default_sim_threshold() -> f64 {
    0.25
}
fn default_log_level() -> String {
    "INFO".to_string()
}
fn default_poll_queue_capacity() -> usize {
    1024
}
fn default_adapter_deadline_secs() -> u64 {
    30
}
fn default_webhook_timeout_secs() -> u64 {
    10
}
fn default_shutdown_grace_secs() -> u64 {
    10
}
fn default_max_consecutive_transient_failures() -> u32 {
    5
}

/// Per-source adapter configuration (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub enabled: bool,
    pub interval_sec: u64,
    pub trust: TrustTier,
    #[serde(default)]
    pub adapter_params: toml::Table,
}

/// Global pipeline configuration (spec §6). Loaded from a TOML file via
/// `Config::load`; every tunable carries the spec's documented default so a
/// missing file section never silently disables a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub webhook_url: String,

    #[serde(default = "default_max_distance_km")]
    pub max_distance_km: f64,

    #[serde(default = "default_min_corroboration_sources")]
    pub min_corroboration_sources: usize,

    #[serde(default = "default_cluster_expiry_hours")]
    pub cluster_expiry_hours: f64,

    #[serde(default = "default_fresh_max_hours")]
    pub fresh_max_hours: f64,

    #[serde(default = "default_temporal_window_hours")]
    pub temporal_window_hours: f64,

    #[serde(default = "default_geo_window_km")]
    pub geo_window_km: f64,

    #[serde(default = "default_sim_threshold")]
    pub sim_threshold: f64,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_poll_queue_capacity")]
    pub poll_queue_capacity: usize,

    #[serde(default = "default_adapter_deadline_secs")]
    pub adapter_deadline_secs: u64,

    #[serde(default = "default_webhook_timeout_secs")]
    pub webhook_timeout_secs: u64,

    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    #[serde(default = "default_max_consecutive_transient_failures")]
    pub max_consecutive_transient_failures: u32,

    /// City/region reference point. Defaults to downtown Minneapolis —
    /// the gazetteer is region-specific (spec Non-goals), but the reference
    /// point stays configurable for testing against other regions.
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,
    #[serde(default = "default_center_lon")]
    pub center_lon: f64,

    #[serde(default)]
    pub sources: HashMap<String, AdapterConfig>,

    /// Database connection string for the Postgres-backed Store. Empty
    /// string selects the in-memory Store (used by tests and `--dry-run`
    /// demos).
    #[serde(default)]
    pub database_url: String,
}

fn default_center_lat() -> f64 {
    44.9778
}
fn default_center_lon() -> f64 {
    -93.2650
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults plus
    /// environment overrides for the two secrets that should never live in
    /// a checked-in config file.
    pub fn load(path: Option<&Path>) -> Result<Self, IceWatchError> {
        let mut config: Config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .map_err(|e| IceWatchError::Config(format!("reading {}: {e}", p.display())))?;
                toml::from_str(&raw)
                    .map_err(|e| IceWatchError::Config(format!("parsing {}: {e}", p.display())))?
            }
            None => Config {
                webhook_url: String::new(),
                max_distance_km: default_max_distance_km(),
                min_corroboration_sources: default_min_corroboration_sources(),
                cluster_expiry_hours: default_cluster_expiry_hours(),
                fresh_max_hours: default_fresh_max_hours(),
                temporal_window_hours: default_temporal_window_hours(),
                geo_window_km: default_geo_window_km(),
                sim_threshold: default_sim_threshold(),
                dry_run: false,
                log_level: default_log_level(),
                poll_queue_capacity: default_poll_queue_capacity(),
                adapter_deadline_secs: default_adapter_deadline_secs(),
                webhook_timeout_secs: default_webhook_timeout_secs(),
                shutdown_grace_secs: default_shutdown_grace_secs(),
                max_consecutive_transient_failures: default_max_consecutive_transient_failures(),
                center_lat: default_center_lat(),
                center_lon: default_center_lon(),
                sources: HashMap::new(),
                database_url: String::new(),
            },
        };

        if let Ok(url) = std::env::var("ICE_WATCH_WEBHOOK_URL") {
            config.webhook_url = url;
        }
        if let Ok(url) = std::env::var("ICE_WATCH_DATABASE_URL") {
            config.database_url = url;
        }

        if config.webhook_url.is_empty() && !config.dry_run {
            return Err(IceWatchError::Config(
                "webhook_url is required unless --dry-run is set".to_string(),
            ));
        }

        Ok(config)
    }

    pub fn temporal_window(&self) -> chrono::Duration {
        chrono::Duration::milliseconds((self.temporal_window_hours * 3_600_000.0) as i64)
    }

    pub fn cluster_expiry(&self) -> chrono::Duration {
        chrono::Duration::milliseconds((self.cluster_expiry_hours * 3_600_000.0) as i64)
    }

    pub fn fresh_max(&self) -> chrono::Duration {
        chrono::Duration::milliseconds((self.fresh_max_hours * 3_600_000.0) as i64)
    }

    /// Log the presence (never the value) of sensitive configuration.
    pub fn log_redacted(&self) {
        if self.webhook_url.is_empty() {
            tracing::info!("webhook_url = (empty)");
        } else {
            tracing::info!("webhook_url = ({} chars)", self.webhook_url.len());
        }
        tracing::info!(
            sources = self.sources.len(),
            dry_run = self.dry_run,
            "configuration loaded"
        );
    }
}
