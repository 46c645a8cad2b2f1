use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the loader, filter engine, aggregator and binner.
///
/// `Load` and `Schema` are fatal for a page; `InsufficientData` and
/// `DegenerateRange` are recovered per chart.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to load `{path}`: {message}")]
    Load { path: PathBuf, message: String },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("not enough data for {statistic}: {detail}")]
    InsufficientData {
        statistic: &'static str,
        detail: String,
    },

    #[error("cannot bucket `{column}`: observed range is degenerate ({detail})")]
    DegenerateRange { column: String, detail: String },

    #[error("CSV export failed: {0}")]
    Export(String),
}

impl DataError {
    pub(crate) fn load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        DataError::Load {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn unknown_column(name: &str) -> Self {
        DataError::Schema(format!("unknown column `{name}`"))
    }

    pub(crate) fn insufficient(statistic: &'static str, detail: impl Into<String>) -> Self {
        DataError::InsufficientData {
            statistic,
            detail: detail.into(),
        }
    }

    /// Whether a chart should swallow this error and show a placeholder.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DataError::InsufficientData { .. } | DataError::DegenerateRange { .. }
        )
    }
}

impl From<csv::Error> for DataError {
    fn from(e: csv::Error) -> Self {
        DataError::Export(e.to_string())
    }
}

impl From<std::io::Error> for DataError {
    fn from(e: std::io::Error) -> Self {
        DataError::Export(e.to_string())
    }
}

pub type Result<T, E = DataError> = std::result::Result<T, E>;
