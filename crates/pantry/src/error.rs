use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PantryError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Concurrent update detected on container {container_id}")]
    ConcurrencyConflict { container_id: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

impl PantryError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        PantryError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        PantryError::InvalidOperation(message.into())
    }

    /// Whether running the same unit of work again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PantryError::ConcurrencyConflict { .. } => true,
            PantryError::Database(e) => e.is_busy(),
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for PantryError {
    fn from(err: rusqlite::Error) -> Self {
        PantryError::Database(err.into())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Recoverable conditions reported alongside a successful result.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerWarning {
    /// No factor between the two units; the quantity was used as-is.
    ConversionUnavailable { from: String, to: String },
    /// The container held less than was asked for.
    Shortfall {
        requested: f64,
        deducted: f64,
        unit: String,
    },
    /// Remaining stock fell to or below the low-stock ratio.
    LowStock { percent: u32 },
}

impl std::fmt::Display for LedgerWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerWarning::ConversionUnavailable { from, to } => write!(
                f,
                "No conversion from '{}' to '{}'; quantity used as-is",
                from, to
            ),
            LedgerWarning::Shortfall {
                requested,
                deducted,
                unit,
            } => write!(
                f,
                "Only {} {} deducted of {} {} requested",
                trim_float(*deducted),
                unit,
                trim_float(*requested),
                unit
            ),
            LedgerWarning::LowStock { percent } => {
                write!(f, "Running low: {}% remaining", percent)
            }
        }
    }
}

/// Joins warnings into the single message carried by operation results.
pub fn render_warnings(warnings: &[LedgerWarning]) -> Option<String> {
    if warnings.is_empty() {
        None
    } else {
        Some(
            warnings
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

fn trim_float(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    format!("{}", rounded)
}

pub type Result<T> = std::result::Result<T, PantryError>;
