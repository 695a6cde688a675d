use std::path::Path;

use crate::config::schema::PantryConfig;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PantryConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<PantryConfig, ConfigError> {
    let config: PantryConfig = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub(crate) fn validate_config(config: &PantryConfig) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let t = &config.thresholds;
    if !(t.low_stock_ratio > 0.0 && t.low_stock_ratio < 1.0) {
        return Err(ConfigError::Validation {
            message: format!(
                "low_stock_ratio must be between 0 and 1 (exclusive), got {}",
                t.low_stock_ratio
            ),
        });
    }

    if !(t.fuzzy_candidate_floor >= 0.0
        && t.fuzzy_candidate_floor < t.fuzzy_match_floor
        && t.fuzzy_match_floor <= 1.0)
    {
        return Err(ConfigError::Validation {
            message: format!(
                "fuzzy thresholds must satisfy 0 <= candidate ({}) < match ({}) <= 1",
                t.fuzzy_candidate_floor, t.fuzzy_match_floor
            ),
        });
    }

    if t.duplicate_window_hours < 0 {
        return Err(ConfigError::Validation {
            message: "duplicate_window_hours must not be negative".to_string(),
        });
    }

    if !(t.duplicate_qty_tolerance >= 0.0 && t.duplicate_qty_tolerance.is_finite()) {
        return Err(ConfigError::Validation {
            message: "duplicate_qty_tolerance must be a non-negative number".to_string(),
        });
    }

    if config.default_search_limit == 0 {
        return Err(ConfigError::Validation {
            message: "default_search_limit must be at least 1".to_string(),
        });
    }

    Ok(())
}
