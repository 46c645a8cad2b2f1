use std::collections::{BTreeMap, HashMap};

use super::error::{DataError, Result};
use super::model::{ColumnId, ColumnKind, RowSet, Value};

// ---------------------------------------------------------------------------
// Group-by reduction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggOp {
    Sum,
    Mean,
    /// Number of non-missing cells in the value column.
    Count,
}

impl AggOp {
    /// Value of an empty group / unobserved cross-tab cell.
    pub fn identity(self) -> f64 {
        match self {
            AggOp::Sum | AggOp::Count => 0.0,
            AggOp::Mean => f64::NAN,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Acc {
    sum: f64,
    count: usize,
}

impl Acc {
    fn push(&mut self, value: &Value) {
        if let Some(v) = value.as_f64() {
            self.sum += v;
            self.count += 1;
        } else if !value.is_missing() {
            // non-numeric but present: only meaningful for Count
            self.count += 1;
        }
    }

    fn finish(self, op: AggOp) -> f64 {
        match op {
            AggOp::Sum => self.sum,
            AggOp::Count => self.count as f64,
            AggOp::Mean if self.count == 0 => f64::NAN,
            AggOp::Mean => self.sum / self.count as f64,
        }
    }
}

/// A group-by request: `keys` → reduce `value` with `op`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    pub keys: Vec<String>,
    pub value: String,
    pub op: AggOp,
    /// Companion column giving the display order of groups (e.g. `Weekdaysort`).
    pub sort_by: Option<String>,
}

impl GroupSpec {
    pub fn new(keys: &[&str], value: &str, op: AggOp) -> Self {
        GroupSpec {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            value: value.to_string(),
            op,
            sort_by: None,
        }
    }

    pub fn sort_by(mut self, column: &str) -> Self {
        self.sort_by = Some(column.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: Vec<Value>,
    pub value: f64,
}

impl GroupRow {
    /// Key rendered as a single label (`a / b` for composite keys).
    pub fn label(&self) -> String {
        self.key
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// Result of [`group_reduce`]: one row per distinct key, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedTable {
    pub keys: Vec<String>,
    pub value: String,
    pub op: AggOp,
    pub rows: Vec<GroupRow>,
}

impl OrderedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.rows.iter().map(|r| r.value).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupRow> + '_ {
        self.rows.iter()
    }

    pub fn get(&self, key: &[Value]) -> Option<f64> {
        self.rows.iter().find(|r| r.key == key).map(|r| r.value)
    }
}

fn value_column(rows: &RowSet, name: &str, op: AggOp) -> Result<ColumnId> {
    match op {
        AggOp::Count => rows.column(name),
        AggOp::Sum | AggOp::Mean => rows.schema().column_of_kind(name, ColumnKind::Numeric),
    }
}

/// Group `rows` by `spec.keys` and reduce `spec.value`.
///
/// Groups are ordered ascending by the `sort_by` column's value in each
/// group's first row when that column exists in the schema; otherwise by
/// first appearance. Missing keys form their own group, so the sum over all
/// groups always equals the ungrouped sum.
pub fn group_reduce(rows: &RowSet, spec: &GroupSpec) -> Result<OrderedTable> {
    let key_ids = spec
        .keys
        .iter()
        .map(|k| rows.column(k))
        .collect::<Result<Vec<_>>>()?;
    let value_id = value_column(rows, &spec.value, spec.op)?;
    let sort_id = match &spec.sort_by {
        Some(col) if rows.schema().contains(col) => Some(rows.column(col)?),
        Some(col) => {
            log::debug!("sort key `{col}` not in schema; keeping first-appearance order");
            None
        }
        None => None,
    };

    let mut slots: HashMap<Vec<Value>, usize> = HashMap::new();
    // (key, sort value of first row, accumulator)
    let mut groups: Vec<(Vec<Value>, Value, Acc)> = Vec::new();
    for rec in rows.rows() {
        let key: Vec<Value> = key_ids.iter().map(|id| rec.get(*id).clone()).collect();
        let slot = *slots.entry(key.clone()).or_insert_with(|| {
            let sort_value = sort_id.map_or(Value::Missing, |id| rec.get(id).clone());
            groups.push((key, sort_value, Acc::default()));
            groups.len() - 1
        });
        groups[slot].2.push(rec.get(value_id));
    }

    if sort_id.is_some() {
        // stable: ties keep first-appearance order
        groups.sort_by(|a, b| a.1.cmp(&b.1));
    }

    Ok(OrderedTable {
        keys: spec.keys.clone(),
        value: spec.value.clone(),
        op: spec.op,
        rows: groups
            .into_iter()
            .map(|(key, _, acc)| GroupRow {
                key,
                value: acc.finish(spec.op),
            })
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// Scalar statistics
// ---------------------------------------------------------------------------

fn paired(rows: &RowSet, x: &str, y: &str) -> Result<Vec<(f64, f64)>> {
    let xi = rows.schema().column_of_kind(x, ColumnKind::Numeric)?;
    let yi = rows.schema().column_of_kind(y, ColumnKind::Numeric)?;
    Ok(rows
        .rows()
        .filter_map(|r| Some((r.get(xi).as_f64()?, r.get(yi).as_f64()?)))
        .collect())
}

struct Moments {
    n: f64,
    mean_x: f64,
    mean_y: f64,
    sxx: f64,
    syy: f64,
    sxy: f64,
}

fn moments(pairs: &[(f64, f64)]) -> Moments {
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    Moments {
        n,
        mean_x,
        mean_y,
        sxx,
        syy,
        sxy,
    }
}

/// Pearson correlation of two numeric columns over rows where both are present.
///
/// Undefined (an error, never `0.0`) with fewer than two pairs or when either
/// column is constant.
pub fn correlation(rows: &RowSet, x: &str, y: &str) -> Result<f64> {
    const WHAT: &str = "correlation";
    let pairs = paired(rows, x, y)?;
    if pairs.len() < 2 {
        return Err(DataError::insufficient(
            WHAT,
            format!("{} paired observations of `{x}` and `{y}`, need 2", pairs.len()),
        ));
    }
    let m = moments(&pairs);
    if m.sxx == 0.0 || m.syy == 0.0 {
        return Err(DataError::insufficient(
            WHAT,
            format!("`{x}` or `{y}` is constant over {} rows", pairs.len()),
        ));
    }
    Ok((m.sxy / (m.sxx.sqrt() * m.syy.sqrt())).clamp(-1.0, 1.0))
}

/// Least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

pub fn linear_fit(rows: &RowSet, x: &str, y: &str) -> Result<LinearFit> {
    const WHAT: &str = "trendline";
    let pairs = paired(rows, x, y)?;
    if pairs.len() < 2 {
        return Err(DataError::insufficient(
            WHAT,
            format!("{} points, need 2", pairs.len()),
        ));
    }
    let m = moments(&pairs);
    if m.sxx == 0.0 {
        return Err(DataError::insufficient(
            WHAT,
            format!("`{x}` is constant over {} points", m.n),
        ));
    }
    let slope = m.sxy / m.sxx;
    Ok(LinearFit {
        slope,
        intercept: m.mean_y - slope * m.mean_x,
    })
}

pub fn mean(rows: &RowSet, column: &str) -> Result<f64> {
    let id = rows.schema().column_of_kind(column, ColumnKind::Numeric)?;
    let (sum, n) = rows
        .numbers(id)
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        return Err(DataError::insufficient(
            "mean",
            format!("no values in `{column}`"),
        ));
    }
    Ok(sum / n as f64)
}

/// Count, mean and five-number summary of a numeric column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Linear-interpolated quantile of sorted data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn describe(rows: &RowSet, column: &str) -> Result<Summary> {
    let id = rows.schema().column_of_kind(column, ColumnKind::Numeric)?;
    let mut values: Vec<f64> = rows.numbers(id).collect();
    if values.is_empty() {
        return Err(DataError::insufficient(
            "summary",
            format!("no values in `{column}`"),
        ));
    }
    values.sort_by(f64::total_cmp);
    Ok(Summary {
        count: values.len(),
        mean: values.iter().sum::<f64>() / values.len() as f64,
        min: values[0],
        q1: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q3: quantile(&values, 0.75),
        max: values[values.len() - 1],
    })
}

/// Row counts per category.
///
/// With `categories`, the result follows that order and includes zero counts;
/// other values are left out. Without, it is every observed value, most
/// frequent first (ties by value).
pub fn value_counts(
    rows: &RowSet,
    column: &str,
    categories: Option<&[Value]>,
) -> Result<Vec<(Value, usize)>> {
    let id = rows.column(column)?;
    let mut counts: BTreeMap<&Value, usize> = BTreeMap::new();
    for v in rows.values(id).filter(|v| !v.is_missing()) {
        *counts.entry(v).or_default() += 1;
    }
    Ok(match categories {
        Some(order) => order
            .iter()
            .map(|c| (c.clone(), counts.get(c).copied().unwrap_or(0)))
            .collect(),
        None => {
            let mut out: Vec<(Value, usize)> =
                counts.into_iter().map(|(v, n)| (v.clone(), n)).collect();
            out.sort_by(|a, b| b.1.cmp(&a.1));
            out
        }
    })
}

// ---------------------------------------------------------------------------
// Cross-tabulation
// ---------------------------------------------------------------------------

/// How the labels along one cross-tab axis are chosen and ordered.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisOrder {
    /// Observed values, ascending.
    Ascending,
    /// Observed values, ascending by a companion column's value.
    SortKey(String),
    /// A fixed, complete label set (e.g. bucket labels), in this order.
    Labels(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub column: String,
    pub order: AxisOrder,
}

impl Axis {
    pub fn ascending(column: &str) -> Self {
        Axis {
            column: column.to_string(),
            order: AxisOrder::Ascending,
        }
    }

    pub fn sorted_by(column: &str, sort_key: &str) -> Self {
        Axis {
            column: column.to_string(),
            order: AxisOrder::SortKey(sort_key.to_string()),
        }
    }

    pub fn labels(column: &str, labels: Vec<Value>) -> Self {
        Axis {
            column: column.to_string(),
            order: AxisOrder::Labels(labels),
        }
    }

    fn resolve(&self, rows: &RowSet) -> Result<(ColumnId, Vec<Value>)> {
        let id = rows.column(&self.column)?;
        let labels = match &self.order {
            AxisOrder::Labels(labels) => labels.clone(),
            AxisOrder::Ascending => rows.distinct(&self.column)?.into_iter().collect(),
            AxisOrder::SortKey(sort_col) => {
                let sort_id = rows.column(sort_col)?;
                let mut firsts: BTreeMap<&Value, &Value> = BTreeMap::new();
                for rec in rows.rows() {
                    let v = rec.get(id);
                    if !v.is_missing() {
                        firsts.entry(v).or_insert(rec.get(sort_id));
                    }
                }
                let mut pairs: Vec<(&Value, &Value)> = firsts.into_iter().collect();
                pairs.sort_by(|a, b| a.1.cmp(b.1));
                pairs.into_iter().map(|(v, _)| v.clone()).collect()
            }
        };
        Ok((id, labels))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossTab {
    pub rows: Axis,
    pub cols: Axis,
    /// Column reduced into each cell; `None` counts rows.
    pub value: Option<String>,
    pub op: AggOp,
}

/// Dense row-major matrix of aggregated values.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub row_labels: Vec<Value>,
    pub col_labels: Vec<Value>,
    cells: Vec<f64>,
}

impl Matrix {
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.col_labels.len() + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let w = self.col_labels.len();
        &self.cells[row * w..(row + 1) * w]
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.row_labels.len(), self.col_labels.len())
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Largest finite cell, used to scale color maps.
    pub fn max(&self) -> Option<f64> {
        self.cells
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .max_by(f64::total_cmp)
    }

    pub fn total(&self) -> f64 {
        self.cells.iter().filter(|v| v.is_finite()).sum()
    }
}

/// Cross-tabulate two key columns into a dense matrix covering every label
/// pair, filling unobserved cells with the operation's identity.
pub fn cross_tab(rows: &RowSet, spec: &CrossTab) -> Result<Matrix> {
    let (row_id, row_labels) = spec.rows.resolve(rows)?;
    let (col_id, col_labels) = spec.cols.resolve(rows)?;
    let value_id = match &spec.value {
        Some(name) => Some(value_column(rows, name, spec.op)?),
        None if spec.op == AggOp::Count => None,
        None => {
            return Err(DataError::Schema(format!(
                "{:?} cross-tab needs a value column",
                spec.op
            )))
        }
    };

    let row_index: HashMap<&Value, usize> =
        row_labels.iter().enumerate().map(|(i, v)| (v, i)).collect();
    let col_index: HashMap<&Value, usize> =
        col_labels.iter().enumerate().map(|(i, v)| (v, i)).collect();

    let width = col_labels.len();
    let mut accs = vec![Acc::default(); row_labels.len() * width];
    let mut skipped = 0usize;
    for rec in rows.rows() {
        let (Some(&r), Some(&c)) = (row_index.get(rec.get(row_id)), col_index.get(rec.get(col_id)))
        else {
            skipped += 1;
            continue;
        };
        let acc = &mut accs[r * width + c];
        match value_id {
            Some(id) => acc.push(rec.get(id)),
            None => acc.count += 1,
        }
    }
    if skipped > 0 {
        log::debug!("cross-tab skipped {skipped} rows with keys outside the label sets");
    }

    let cells = accs
        .into_iter()
        .map(|acc| {
            if acc.count == 0 {
                spec.op.identity()
            } else {
                acc.finish(spec.op)
            }
        })
        .collect();
    Ok(Matrix {
        row_labels,
        col_labels,
        cells,
    })
}

/// Label set of a matrix axis as strings, for rendering.
pub fn label_strings(labels: &[Value]) -> Vec<String> {
    labels.iter().map(Value::to_string).collect()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::data::loader::{parse_csv, DatasetSpec};

    fn sales() -> RowSet {
        let csv = "\
Weekday,Weekdaysort,hour_of_day,money
Tue,2,9,10
Mon,1,9,5
Tue,2,10,7
Mon,1,10,
Wed,3,9,3
";
        parse_csv(csv.as_bytes(), Path::new("sales.csv"), &DatasetSpec::new()).unwrap()
    }

    fn text(s: &str) -> Value {
        Value::from(s)
    }

    #[test]
    fn groups_follow_sort_key() {
        let spec = GroupSpec::new(&["Weekday"], "money", AggOp::Sum).sort_by("Weekdaysort");
        let table = group_reduce(&sales(), &spec).unwrap();
        let got: Vec<(String, f64)> = table.iter().map(|r| (r.label(), r.value)).collect();
        assert_eq!(
            got,
            vec![
                ("Mon".to_string(), 5.0),
                ("Tue".to_string(), 17.0),
                ("Wed".to_string(), 3.0)
            ]
        );
    }

    #[test]
    fn signed_zero_keys_share_a_group() {
        let rows = parse_csv(b"k,v\n0,1\n-0,2\n", Path::new("k.csv"), &DatasetSpec::new()).unwrap();
        let table = group_reduce(&rows, &GroupSpec::new(&["k"], "v", AggOp::Sum)).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&[Value::Number(0.0)]), Some(3.0));
    }

    #[test]
    fn groups_fall_back_to_first_appearance() {
        let spec = GroupSpec::new(&["Weekday"], "money", AggOp::Count).sort_by("Monthsort");
        let table = group_reduce(&sales(), &spec).unwrap();
        let got: Vec<(String, f64)> = table.iter().map(|r| (r.label(), r.value)).collect();
        assert_eq!(
            got,
            vec![
                ("Tue".to_string(), 2.0),
                ("Mon".to_string(), 1.0),
                ("Wed".to_string(), 1.0)
            ]
        );
    }

    #[test]
    fn mean_skips_missing_values() {
        let spec = GroupSpec::new(&["Weekday"], "money", AggOp::Mean);
        let table = group_reduce(&sales(), &spec).unwrap();
        assert_eq!(table.get(&[text("Mon")]), Some(5.0));
        assert_eq!(table.get(&[text("Tue")]), Some(8.5));
    }

    #[test]
    fn sum_over_groups_conserves_total() {
        let rows = sales();
        let spec = GroupSpec::new(&["Weekday", "hour_of_day"], "money", AggOp::Sum);
        let table = group_reduce(&rows, &spec).unwrap();
        let id = rows.column("money").unwrap();
        assert_eq!(table.total(), rows.numbers(id).sum::<f64>());
    }

    #[test]
    fn sum_of_categorical_column_is_a_schema_error() {
        let spec = GroupSpec::new(&["hour_of_day"], "Weekday", AggOp::Sum);
        assert!(matches!(
            group_reduce(&sales(), &spec),
            Err(DataError::Schema(_))
        ));
    }

    #[test]
    fn correlation_of_perfect_line_is_one() {
        let csv = "x,y\n1,2\n2,4\n3,6\n";
        let rows = parse_csv(csv.as_bytes(), Path::new("xy.csv"), &DatasetSpec::new()).unwrap();
        assert!((correlation(&rows, "x", "y").unwrap() - 1.0).abs() < 1e-12);
        let fit = linear_fit(&rows, "x", "y").unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!(fit.intercept.abs() < 1e-12);
    }

    #[test]
    fn correlation_needs_two_pairs() {
        let csv = "x,y\n1,2\n2,\n";
        let rows = parse_csv(csv.as_bytes(), Path::new("xy.csv"), &DatasetSpec::new()).unwrap();
        assert!(matches!(
            correlation(&rows, "x", "y"),
            Err(DataError::InsufficientData { .. })
        ));
    }

    #[test]
    fn correlation_of_constant_column_is_undefined() {
        let csv = "x,y\n1,5\n2,5\n3,5\n";
        let rows = parse_csv(csv.as_bytes(), Path::new("xy.csv"), &DatasetSpec::new()).unwrap();
        assert!(correlation(&rows, "x", "y").unwrap_err().is_recoverable());
    }

    #[test]
    fn describe_interpolates_quartiles() {
        let csv = "v\n1\n2\n3\n4\n5\n";
        let rows = parse_csv(csv.as_bytes(), Path::new("v.csv"), &DatasetSpec::new()).unwrap();
        let s = describe(&rows, "v").unwrap();
        assert_eq!((s.min, s.q1, s.median, s.q3, s.max), (1.0, 2.0, 3.0, 4.0, 5.0));
        assert_eq!(s.mean, 3.0);
    }

    #[test]
    fn value_counts_respects_fixed_categories() {
        let order = [text("Wed"), text("Thu"), text("Tue")];
        let counts = value_counts(&sales(), "Weekday", Some(&order)).unwrap();
        assert_eq!(
            counts,
            vec![(text("Wed"), 1), (text("Thu"), 0), (text("Tue"), 2)]
        );
    }

    #[test]
    fn cross_tab_is_dense_and_zero_filled() {
        let spec = CrossTab {
            rows: Axis::sorted_by("Weekday", "Weekdaysort"),
            cols: Axis::ascending("hour_of_day"),
            value: Some("money".into()),
            op: AggOp::Sum,
        };
        let m = cross_tab(&sales(), &spec).unwrap();
        assert_eq!(m.shape(), (3, 2));
        assert_eq!(m.row_labels, vec![text("Mon"), text("Tue"), text("Wed")]);
        assert_eq!(m.row(0), &[5.0, 0.0]);
        assert_eq!(m.row(1), &[10.0, 7.0]);
        assert_eq!(m.row(2), &[3.0, 0.0]);
    }

    #[test]
    fn cross_tab_keeps_unobserved_labels() {
        let spec = CrossTab {
            rows: Axis::labels("Weekday", vec![text("Mon"), text("Sun")]),
            cols: Axis::ascending("hour_of_day"),
            value: None,
            op: AggOp::Count,
        };
        let m = cross_tab(&sales(), &spec).unwrap();
        assert_eq!(m.shape(), (2, 2));
        assert_eq!(m.row(1), &[0.0, 0.0]);
        assert_eq!(m.total(), 2.0);
    }
}
