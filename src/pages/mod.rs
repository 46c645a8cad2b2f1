//! Per-page view models: filter state in, chart-ready tables out.
//!
//! Each chart is computed on its own and yields a [`ChartResult`], so one
//! chart running out of data never stops its siblings from rendering.

use crate::data::{DataError, RowSet};

pub mod coffee;
pub mod student;

/// What a chart shows instead of itself when it has nothing to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub message: String,
}

impl Placeholder {
    pub fn new(message: impl Into<String>) -> Self {
        Placeholder {
            message: message.into(),
        }
    }
}

pub type ChartResult<T> = Result<T, Placeholder>;

/// Run one chart's computation, converting any failure into a placeholder.
pub fn chart<T>(name: &str, compute: impl FnOnce() -> crate::data::Result<T>) -> ChartResult<T> {
    compute().map_err(|e| {
        if e.is_recoverable() {
            log::warn!("{name}: {e}");
            Placeholder::new(match e {
                DataError::InsufficientData { .. } => {
                    "Not enough data for the selected filters.".to_string()
                }
                other => other.to_string(),
            })
        } else {
            log::error!("{name}: {e}");
            Placeholder::new(format!("Chart unavailable: {e}"))
        }
    })
}

/// Fail with `InsufficientData` when the filters left nothing.
pub(crate) fn require_rows(rows: &RowSet, what: &'static str) -> crate::data::Result<()> {
    if rows.is_empty() {
        return Err(DataError::InsufficientData {
            statistic: what,
            detail: "no rows match the selected filters".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_errors_become_friendly_placeholders() {
        let out: ChartResult<()> = chart("demo", || {
            Err(DataError::InsufficientData {
                statistic: "correlation",
                detail: "1 pair".into(),
            })
        });
        assert_eq!(
            out.unwrap_err().message,
            "Not enough data for the selected filters."
        );
    }

    #[test]
    fn schema_errors_are_reported_verbatim() {
        let out: ChartResult<()> = chart("demo", || Err(DataError::Schema("unknown column `x`".into())));
        assert!(out.unwrap_err().message.contains("unknown column `x`"));
    }
}
