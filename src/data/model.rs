use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use csv::StringRecord;

use super::error::{DataError, Result};

// ---------------------------------------------------------------------------
// Value – a single typed cell
// ---------------------------------------------------------------------------

/// A typed cell. Ordered so it can key `BTreeMap` / `BTreeSet` downstream.
///
/// Equality, ordering and hashing agree: `0.0` and `-0.0` are the same
/// number.
#[derive(Debug, Clone)]
pub enum Value {
    Missing,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

/// Collapses `-0.0` onto `0.0` so both compare and hash alike.
fn canonical(f: f64) -> f64 {
    if f == 0.0 {
        0.0
    } else {
        f
    }
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn rank(v: &Value) -> u8 {
            match v {
                Missing => 0,
                Bool(_) => 1,
                Number(_) => 2,
                Text(_) => 3,
                Date(_) => 4,
            }
        }
        match (self, other) {
            (Missing, Missing) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Number(a), Number(b)) => canonical(*a).total_cmp(&canonical(*b)),
            (Text(a), Text(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Number(f) => canonical(*f).to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Date(d) => d.hash(state),
            Value::Missing => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Number(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Missing => write!(f, "<missing>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Whether this value may live in a column of `kind`.
    pub fn fits(&self, kind: ColumnKind) -> bool {
        matches!(
            (self, kind),
            (Value::Missing, _)
                | (Value::Number(_), ColumnKind::Numeric)
                | (Value::Text(_), ColumnKind::Categorical)
                | (Value::Date(_), ColumnKind::Date)
                | (Value::Bool(_), ColumnKind::Bool)
        )
    }
}

// ---------------------------------------------------------------------------
// Schema – column definitions and typed handles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Date,
    Bool,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Date => "date",
            ColumnKind::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// Index of a validated column within one [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(usize);

impl ColumnId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
    /// Appended by the pipeline (e.g. bucket labels); never exported.
    pub derived: bool,
}

#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<ColumnDef>,
    index: HashMap<String, ColumnId>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            if index.insert(col.name.clone(), ColumnId(i)).is_some() {
                return Err(DataError::Schema(format!(
                    "duplicate column `{}`",
                    col.name
                )));
            }
        }
        Ok(Schema { columns, index })
    }

    /// Resolve a column name to its handle.
    pub fn column(&self, name: &str) -> Result<ColumnId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| DataError::unknown_column(name))
    }

    /// Resolve a column and check it has the expected kind.
    pub fn column_of_kind(&self, name: &str, kind: ColumnKind) -> Result<ColumnId> {
        let id = self.column(name)?;
        let actual = self.kind(id);
        if actual != kind {
            return Err(DataError::Schema(format!(
                "column `{name}` is {actual}, expected {kind}"
            )));
        }
        Ok(id)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn def(&self, id: ColumnId) -> &ColumnDef {
        &self.columns[id.0]
    }

    pub fn kind(&self, id: ColumnId) -> ColumnKind {
        self.columns[id.0].kind
    }

    pub fn name(&self, id: ColumnId) -> &str {
        &self.columns[id.0].name
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn with_column(&self, def: ColumnDef) -> Result<Schema> {
        let mut columns = self.columns.clone();
        columns.push(def);
        Schema::new(columns)
    }
}

// ---------------------------------------------------------------------------
// Record / RowSet
// ---------------------------------------------------------------------------

/// One parsed CSV row, plus the raw fields it was parsed from.
#[derive(Debug, Clone)]
pub struct Record {
    values: Vec<Value>,
    raw: StringRecord,
    /// The row's bytes in the source file, without the line terminator.
    line: Option<Arc<[u8]>>,
}

impl Record {
    pub fn new(values: Vec<Value>, raw: StringRecord) -> Self {
        Record {
            values,
            raw,
            line: None,
        }
    }

    pub fn with_source_line(mut self, line: &[u8]) -> Self {
        self.line = Some(Arc::from(line));
        self
    }

    pub fn get(&self, id: ColumnId) -> &Value {
        &self.values[id.0]
    }

    pub fn raw(&self) -> &StringRecord {
        &self.raw
    }

    pub fn source_line(&self) -> Option<&[u8]> {
        self.line.as_deref()
    }
}

/// How the source file was laid out, kept for byte-faithful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFormat {
    pub header: StringRecord,
    /// Header bytes as found in the file, without BOM or terminator.
    pub header_line: Option<Vec<u8>>,
    pub bom: bool,
    pub crlf: bool,
    pub trailing_newline: bool,
}

/// An immutable, uniformly-schemed collection of records.
///
/// Records are shared behind `Arc`, so filtering clones handles rather than
/// cells and never touches the source row-set.
#[derive(Debug, Clone)]
pub struct RowSet {
    schema: Arc<Schema>,
    source: Arc<SourceFormat>,
    rows: Vec<Arc<Record>>,
}

impl RowSet {
    pub fn new(schema: Schema, source: SourceFormat, rows: Vec<Record>) -> Result<Self> {
        for (i, rec) in rows.iter().enumerate() {
            if rec.values.len() != schema.len() {
                return Err(DataError::Schema(format!(
                    "row {i} has {} values, schema has {} columns",
                    rec.values.len(),
                    schema.len()
                )));
            }
            for (def, v) in schema.columns().iter().zip(&rec.values) {
                if !v.fits(def.kind) {
                    return Err(DataError::Schema(format!(
                        "row {i}: value `{v}` does not fit {} column `{}`",
                        def.kind, def.name
                    )));
                }
            }
        }
        Ok(RowSet {
            schema: Arc::new(schema),
            source: Arc::new(source),
            rows: rows.into_iter().map(Arc::new).collect(),
        })
    }

    /// A row-set with the same schema and the given subset of rows.
    pub(crate) fn derive(&self, rows: Vec<Arc<Record>>) -> RowSet {
        RowSet {
            schema: Arc::clone(&self.schema),
            source: Arc::clone(&self.source),
            rows,
        }
    }

    /// Same schema, no rows.
    pub fn empty_like(&self) -> RowSet {
        self.derive(Vec::new())
    }

    /// Append a derived column computed per row.
    pub(crate) fn with_derived_column(
        &self,
        name: &str,
        kind: ColumnKind,
        mut value_of: impl FnMut(&Record) -> Value,
    ) -> Result<RowSet> {
        let schema = self.schema.with_column(ColumnDef {
            name: name.to_string(),
            kind,
            derived: true,
        })?;
        let rows = self
            .rows
            .iter()
            .map(|rec| {
                let mut values = rec.values.clone();
                values.push(value_of(rec));
                Arc::new(Record {
                    values,
                    raw: rec.raw.clone(),
                    line: rec.line.clone(),
                })
            })
            .collect();
        Ok(RowSet {
            schema: Arc::new(schema),
            source: Arc::clone(&self.source),
            rows,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn source(&self) -> &SourceFormat {
        &self.source
    }

    pub fn column(&self, name: &str) -> Result<ColumnId> {
        self.schema.column(name)
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = &Record> + '_ {
        self.rows.iter().map(|r| r.as_ref())
    }

    pub(crate) fn shared_rows(&self) -> &[Arc<Record>] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> Option<&Record> {
        self.rows.get(i).map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate one column's values in row order.
    pub fn values(&self, id: ColumnId) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |r| r.get(id))
    }

    /// Iterate one numeric column, skipping missing cells.
    pub fn numbers(&self, id: ColumnId) -> impl Iterator<Item = f64> + '_ {
        self.values(id).filter_map(Value::as_f64)
    }

    /// Sorted set of distinct non-missing values of a column.
    pub fn distinct(&self, name: &str) -> Result<BTreeSet<Value>> {
        let id = self.column(name)?;
        Ok(self
            .values(id)
            .filter(|v| !v.is_missing())
            .cloned()
            .collect())
    }

    /// Observed `(min, max)` of a numeric column, ignoring missing cells.
    pub fn numeric_range(&self, name: &str) -> Result<Option<(f64, f64)>> {
        let id = self.schema.column_of_kind(name, ColumnKind::Numeric)?;
        Ok(self.numbers(id).fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        }))
    }

    /// Observed `(min, max)` of a date column, ignoring missing cells.
    pub fn date_range(&self, name: &str) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let id = self.schema.column_of_kind(name, ColumnKind::Date)?;
        Ok(self.values(id).filter_map(Value::as_date).fold(None, |acc, d| match acc {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        }))
    }

    /// Whether two row-sets hold the same records (by identity) in the same order.
    pub fn same_rows(&self, other: &RowSet) -> bool {
        self.rows.len() == other.rows.len()
            && self
                .rows
                .iter()
                .zip(&other.rows)
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}
