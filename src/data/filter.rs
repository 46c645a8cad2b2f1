use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;

use super::error::{DataError, Result};
use super::model::{ColumnId, ColumnKind, Record, RowSet, Schema, Value};

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// One condition over a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals {
        column: String,
        value: Value,
    },
    /// Numeric `low <= x <= high`. `low > high` selects nothing.
    RangeInclusive {
        column: String,
        low: f64,
        high: f64,
    },
    /// Value is one of the selected set. An empty set selects nothing.
    SetMembership {
        column: String,
        values: BTreeSet<Value>,
    },
    DateRangeInclusive {
        column: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl Predicate {
    pub fn column(&self) -> &str {
        match self {
            Predicate::Equals { column, .. }
            | Predicate::RangeInclusive { column, .. }
            | Predicate::SetMembership { column, .. }
            | Predicate::DateRangeInclusive { column, .. } => column,
        }
    }

    /// Check the predicate against the schema and bind its column handle.
    fn compile(&self, schema: &Schema) -> Result<Compiled<'_>> {
        let id = schema.column(self.column())?;
        let kind = schema.kind(id);
        let mismatch = |what: &str| {
            DataError::Schema(format!(
                "{what} cannot be applied to {kind} column `{}`",
                self.column()
            ))
        };
        match self {
            Predicate::Equals { value, .. } => {
                if !value.fits(kind) {
                    return Err(mismatch(&format!("equality with `{value}`")));
                }
                Ok(Compiled::Equals(id, value))
            }
            Predicate::RangeInclusive { low, high, .. } => {
                if kind != ColumnKind::Numeric {
                    return Err(mismatch("a numeric range"));
                }
                Ok(Compiled::Range(id, *low, *high))
            }
            Predicate::SetMembership { values, .. } => {
                if let Some(bad) = values.iter().find(|v| !v.fits(kind)) {
                    return Err(mismatch(&format!("membership of `{bad}`")));
                }
                Ok(Compiled::Member(id, values))
            }
            Predicate::DateRangeInclusive { start, end, .. } => {
                if kind != ColumnKind::Date {
                    return Err(mismatch("a date range"));
                }
                Ok(Compiled::Dates(id, *start, *end))
            }
        }
    }
}

enum Compiled<'a> {
    Equals(ColumnId, &'a Value),
    Range(ColumnId, f64, f64),
    Member(ColumnId, &'a BTreeSet<Value>),
    Dates(ColumnId, NaiveDate, NaiveDate),
}

impl Compiled<'_> {
    /// True when no row can pass, whatever the data.
    fn selects_nothing(&self) -> bool {
        match self {
            Compiled::Range(_, low, high) => low > high,
            Compiled::Member(_, values) => values.is_empty(),
            Compiled::Dates(_, start, end) => start > end,
            Compiled::Equals(..) => false,
        }
    }

    fn matches(&self, rec: &Record) -> bool {
        match self {
            Compiled::Equals(id, value) => rec.get(*id) == *value,
            Compiled::Range(id, low, high) => rec
                .get(*id)
                .as_f64()
                .is_some_and(|v| *low <= v && v <= *high),
            Compiled::Member(id, values) => values.contains(rec.get(*id)),
            Compiled::Dates(id, start, end) => rec
                .get(*id)
                .as_date()
                .is_some_and(|d| *start <= d && d <= *end),
        }
    }
}

// ---------------------------------------------------------------------------
// Filter specification
// ---------------------------------------------------------------------------

/// An ordered conjunction of predicates. No predicates means "all rows".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    predicates: Vec<Predicate>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn equals(self, column: &str, value: impl Into<Value>) -> Self {
        self.with(Predicate::Equals {
            column: column.to_string(),
            value: value.into(),
        })
    }

    pub fn range(self, column: &str, low: f64, high: f64) -> Self {
        self.with(Predicate::RangeInclusive {
            column: column.to_string(),
            low,
            high,
        })
    }

    pub fn one_of<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.with(Predicate::SetMembership {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn dates(self, column: &str, start: NaiveDate, end: NaiveDate) -> Self {
        self.with(Predicate::DateRangeInclusive {
            column: column.to_string(),
            start,
            end,
        })
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

/// Apply `spec` to `rows`, keeping row order. The input is never modified.
///
/// Every predicate is validated against the schema first, so an unknown or
/// mistyped column fails with [`DataError::Schema`] even on an empty input.
pub fn apply(rows: &RowSet, spec: &FilterSpec) -> Result<RowSet> {
    let compiled = spec
        .predicates
        .iter()
        .map(|p| p.compile(rows.schema()))
        .collect::<Result<Vec<_>>>()?;

    if compiled.iter().any(Compiled::selects_nothing) {
        log::debug!("filter selects nothing; returning empty row-set");
        return Ok(rows.empty_like());
    }

    let kept: Vec<Arc<_>> = rows
        .shared_rows()
        .iter()
        .filter(|rec| compiled.iter().all(|p| p.matches(rec)))
        .cloned()
        .collect();
    log::debug!(
        "filter kept {} of {} rows ({} predicates)",
        kept.len(),
        rows.len(),
        compiled.len()
    );
    Ok(rows.derive(kept))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::data::loader::{parse_csv, DatasetSpec};

    fn coffee() -> RowSet {
        let csv = "\
hour_of_day,money,coffee_name,Date
8,38.7,Latte,2024-03-01
9,28.9,Americano,2024-03-01
10,38.7,Latte,2024-03-02
11,33.8,Cappuccino,2024-03-03
12,,Latte,2024-03-04
";
        parse_csv(csv.as_bytes(), Path::new("coffee.csv"), &DatasetSpec::new()).unwrap()
    }

    fn hours(rows: &RowSet) -> Vec<f64> {
        let id = rows.column("hour_of_day").unwrap();
        rows.numbers(id).collect()
    }

    #[test]
    fn empty_spec_keeps_everything() {
        let rows = coffee();
        let spec = FilterSpec::new();
        assert!(spec.is_empty());
        let out = apply(&rows, &spec).unwrap();
        assert!(out.same_rows(&rows));
    }

    #[test]
    fn conjunction_preserves_order() {
        let rows = coffee();
        let spec = FilterSpec::new()
            .range("hour_of_day", 8.0, 11.0)
            .one_of("coffee_name", ["Latte", "Cappuccino"]);
        let out = apply(&rows, &spec).unwrap();
        assert_eq!(hours(&out), vec![8.0, 10.0, 11.0]);
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn empty_membership_selects_nothing() {
        let rows = coffee();
        let spec = FilterSpec::new()
            .range("hour_of_day", 0.0, 24.0)
            .one_of("coffee_name", Vec::<Value>::new());
        assert!(apply(&rows, &spec).unwrap().is_empty());
    }

    #[test]
    fn inverted_range_selects_nothing() {
        let spec = FilterSpec::new().range("hour_of_day", 11.0, 9.0);
        assert!(apply(&coffee(), &spec).unwrap().is_empty());
    }

    #[test]
    fn missing_cells_never_satisfy_a_range() {
        let spec = FilterSpec::new().range("money", f64::MIN, f64::MAX);
        assert_eq!(apply(&coffee(), &spec).unwrap().len(), 4);
    }

    #[test]
    fn date_range_is_inclusive() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        let spec = FilterSpec::new().dates("Date", d(2), d(3));
        assert_eq!(hours(&apply(&coffee(), &spec).unwrap()), vec![10.0, 11.0]);
    }

    #[test]
    fn unknown_column_is_a_schema_error() {
        let spec = FilterSpec::new().equals("Coffee", "Latte");
        assert!(matches!(apply(&coffee(), &spec), Err(DataError::Schema(_))));
    }

    #[test]
    fn mistyped_predicate_is_a_schema_error_even_when_empty() {
        let rows = coffee().empty_like();
        let spec = FilterSpec::new().range("coffee_name", 0.0, 1.0);
        assert!(matches!(apply(&rows, &spec), Err(DataError::Schema(_))));
    }

    #[test]
    fn equals_and_membership_agree_on_signed_zero() {
        let rows = parse_csv(b"k,v\n0,1\n-0,2\n", Path::new("k.csv"), &DatasetSpec::new()).unwrap();
        let equals = apply(&rows, &FilterSpec::new().equals("k", 0.0)).unwrap();
        let member = apply(&rows, &FilterSpec::new().one_of("k", [0.0])).unwrap();
        assert_eq!(equals.len(), 2);
        assert_eq!(member.len(), 2);
    }

    #[test]
    fn reapplying_is_idempotent() {
        let rows = coffee();
        let spec = FilterSpec::new().equals("coffee_name", "Latte");
        let once = apply(&rows, &spec).unwrap();
        let twice = apply(&once, &spec).unwrap();
        assert!(once.same_rows(&twice));
    }
}
