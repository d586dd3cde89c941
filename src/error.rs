use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while grouping a table. These are cloneable so a failed
/// aggregation can be kept in the dashboard context and shown in-page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("unknown column '{column}' (available: {available})")]
    Schema { column: String, available: String },
    #[error("column '{column}' cannot be both the grouping and the value column")]
    GroupedOnValue { column: String },
    #[error("column '{column}' was excluded from the grouped sums")]
    Excluded { column: String },
    #[error("column '{column}' is not numeric")]
    TypeMismatch { column: String },
}

/// Error type for loading, configuration, and export failures.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("missing resource {}: {source}", .path.display())]
    MissingResource { path: PathBuf, source: io::Error },
    #[error("malformed {}: {details}", .path.display())]
    Format { path: PathBuf, details: String },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

impl DashboardError {
    pub(crate) fn format(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        DashboardError::Format {
            path: path.into(),
            details: details.into(),
        }
    }
}
