use super::error::{DataError, Result};
use super::model::{ColumnKind, RowSet, Value};

// ---------------------------------------------------------------------------
// Bucket edges
// ---------------------------------------------------------------------------

/// Equal-width partition of a numeric column into labelled buckets.
///
/// Bucket `i` covers `(edges[i], edges[i + 1]]`; bucket 0 also includes
/// `edges[0]`. A value sitting exactly on an interior edge therefore lands in
/// the lower bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketEdges {
    /// Source column that was bucketed.
    pub source: String,
    /// Name of the derived label column.
    pub column: String,
    pub edges: Vec<f64>,
    pub labels: Vec<String>,
}

impl BucketEdges {
    /// Equal-width edges over `[min, max]`.
    pub fn equal_width(source: &str, min: f64, max: f64, labels: Vec<String>) -> Result<Self> {
        let n = labels.len();
        if n == 0 {
            return Err(DataError::DegenerateRange {
                column: source.to_string(),
                detail: "zero buckets requested".into(),
            });
        }
        if !(min < max) {
            return Err(DataError::DegenerateRange {
                column: source.to_string(),
                detail: format!("min {min} equals max {max}"),
            });
        }
        let repeated = labels
            .iter()
            .enumerate()
            .find_map(|(i, l)| labels[..i].contains(l).then_some(l));
        if let Some(dup) = repeated {
            return Err(DataError::DegenerateRange {
                column: source.to_string(),
                detail: format!("bucket label `{dup}` repeats"),
            });
        }
        let width = (max - min) / n as f64;
        let mut edges: Vec<f64> = (0..n).map(|i| min + width * i as f64).collect();
        edges.push(max);
        Ok(BucketEdges {
            source: source.to_string(),
            column: derived_name(source),
            edges,
            labels,
        })
    }

    /// One bucket holding exactly `value`; the fallback for a degenerate range.
    pub fn single(source: &str, value: f64, label: &str) -> Self {
        BucketEdges {
            source: source.to_string(),
            column: derived_name(source),
            edges: vec![value, value],
            labels: vec![label.to_string()],
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Bucket index of `v`, or `None` outside `[edges[0], edges[n]]`.
    pub fn bucket_of(&self, v: f64) -> Option<usize> {
        let (first, last) = (self.edges[0], self.edges[self.edges.len() - 1]);
        if v.is_nan() || v < first || v > last {
            return None;
        }
        let interior = &self.edges[1..self.edges.len() - 1];
        Some(interior.partition_point(|&e| e < v))
    }

    /// Labels as values, ready for a cross-tab axis.
    pub fn label_values(&self) -> Vec<Value> {
        self.labels.iter().map(|l| Value::Text(l.clone())).collect()
    }
}

fn derived_name(source: &str) -> String {
    format!("{source}_bucket")
}

/// `lo-hi` labels with enough decimals that neighbouring edges differ.
fn range_labels(min: f64, max: f64, n: usize) -> Vec<String> {
    let width = (max - min) / n as f64;
    let decimals = label_decimals(width);
    (0..n)
        .map(|i| {
            let lo = min + width * i as f64;
            let hi = if i + 1 == n { max } else { lo + width };
            format!("{lo:.decimals$}-{hi:.decimals$}")
        })
        .collect()
}

fn label_decimals(width: f64) -> usize {
    if !(width.is_finite() && width > 0.0) {
        return 1;
    }
    (-width.log10()).ceil().clamp(0.0, 14.0) as usize + 1
}

// ---------------------------------------------------------------------------
// Bucketize
// ---------------------------------------------------------------------------

fn observed_range(rows: &RowSet, column: &str) -> Result<(f64, f64)> {
    rows.numeric_range(column)?.ok_or_else(|| {
        DataError::insufficient("bucketing", format!("no values in `{column}`"))
    })
}

/// Split `column` into `bucket_count` equal-width buckets spanning its
/// observed range in `rows`, appending a `<column>_bucket` label column.
///
/// Edges follow the row-set given, so they move as filters change.
pub fn bucketize(rows: &RowSet, column: &str, bucket_count: usize) -> Result<(RowSet, BucketEdges)> {
    let (min, max) = observed_range(rows, column)?;
    let labels = range_labels(min, max, bucket_count);
    let edges = BucketEdges::equal_width(column, min, max, labels)?;
    Ok((assign(rows, &edges)?, edges))
}

/// Like [`bucketize`], with one caller-supplied label per bucket.
pub fn bucketize_labeled(rows: &RowSet, column: &str, labels: &[&str]) -> Result<(RowSet, BucketEdges)> {
    let (min, max) = observed_range(rows, column)?;
    let labels = labels.iter().map(|l| l.to_string()).collect();
    let edges = BucketEdges::equal_width(column, min, max, labels)?;
    Ok((assign(rows, &edges)?, edges))
}

/// Append the bucket label column for precomputed `edges`. Values outside
/// the edges, and missing values, get a missing label.
pub fn assign(rows: &RowSet, edges: &BucketEdges) -> Result<RowSet> {
    let id = rows
        .schema()
        .column_of_kind(&edges.source, ColumnKind::Numeric)?;
    let out = rows.with_derived_column(&edges.column, ColumnKind::Categorical, |rec| {
        rec.get(id)
            .as_f64()
            .and_then(|v| edges.bucket_of(v))
            .map_or(Value::Missing, |i| Value::Text(edges.labels[i].clone()))
    })?;
    log::debug!(
        "bucketed `{}` into {} buckets over [{}, {}]",
        edges.source,
        edges.len(),
        edges.edges[0],
        edges.edges[edges.edges.len() - 1]
    );
    Ok(out)
}
