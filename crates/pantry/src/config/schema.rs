use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PantryConfig {
    pub version: String,
    /// Falls back to `~/.pantry/data/pantry.db` when absent.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Pause before the single transparent retry of a conflicting write.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default = "default_leftover_shelf_life_days")]
    pub leftover_shelf_life_days: u32,
    #[serde(default = "default_search_limit")]
    pub default_search_limit: u32,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_retry_backoff_ms() -> u64 {
    25
}

fn default_leftover_shelf_life_days() -> u32 {
    4
}

fn default_search_limit() -> u32 {
    50
}

impl Default for PantryConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            thresholds: Thresholds::default(),
            leftover_shelf_life_days: default_leftover_shelf_life_days(),
            default_search_limit: default_search_limit(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Numeric cut-offs used by the resolver, the status machine and the
/// duplicate detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Remaining/initial ratio at or below which a container is `LOW`.
    #[serde(default = "default_low_stock_ratio")]
    pub low_stock_ratio: f64,
    /// Fuzzy candidates must score strictly above this.
    #[serde(default = "default_fuzzy_candidate_floor")]
    pub fuzzy_candidate_floor: f64,
    /// The best candidate must score strictly above this to be accepted.
    #[serde(default = "default_fuzzy_match_floor")]
    pub fuzzy_match_floor: f64,
    #[serde(default = "default_duplicate_window_hours")]
    pub duplicate_window_hours: i64,
    /// Relative distance within which two quantities count as the same purchase.
    #[serde(default = "default_duplicate_qty_tolerance")]
    pub duplicate_qty_tolerance: f64,
}

fn default_low_stock_ratio() -> f64 {
    0.20
}

fn default_fuzzy_candidate_floor() -> f64 {
    0.5
}

fn default_fuzzy_match_floor() -> f64 {
    0.85
}

fn default_duplicate_window_hours() -> i64 {
    4
}

fn default_duplicate_qty_tolerance() -> f64 {
    0.20
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            low_stock_ratio: default_low_stock_ratio(),
            fuzzy_candidate_floor: default_fuzzy_candidate_floor(),
            fuzzy_match_floor: default_fuzzy_match_floor(),
            duplicate_window_hours: default_duplicate_window_hours(),
            duplicate_qty_tolerance: default_duplicate_qty_tolerance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}
