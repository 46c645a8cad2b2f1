//! Property tests for the filter, aggregate and binning stages.

use std::collections::BTreeSet;
use std::path::Path;

use proptest::prelude::*;

use rusty_dash::data::aggregate::{cross_tab, group_reduce, AggOp, Axis, CrossTab, GroupSpec};
use rusty_dash::data::bin::bucketize;
use rusty_dash::data::filter::{apply, FilterSpec};
use rusty_dash::data::loader::{parse_csv, DatasetSpec};
use rusty_dash::data::{ColumnKind, RowSet, Value};

// =============================================================================
// Test Data Strategies
// =============================================================================

/// A (category, value) row; empty strings become missing cells.
fn row() -> impl Strategy<Value = (String, Option<i32>)> {
    (
        prop_oneof![Just("a"), Just("b"), Just("c"), Just("")].prop_map(str::to_string),
        prop_oneof![
            8 => (0i32..100).prop_map(Some),
            1 => Just(None),
        ],
    )
}

fn table() -> impl Strategy<Value = Vec<(String, Option<i32>)>> {
    prop::collection::vec(row(), 1..60)
}

fn to_rows(rows: &[(String, Option<i32>)]) -> RowSet {
    let mut csv = String::from("cat,v\n");
    for (cat, v) in rows {
        let v = v.map(|v| v.to_string()).unwrap_or_default();
        csv.push_str(&format!("{cat},{v}\n"));
    }
    let spec = DatasetSpec::new()
        .column("cat", ColumnKind::Categorical)
        .column("v", ColumnKind::Numeric);
    parse_csv(csv.as_bytes(), Path::new("prop.csv"), &spec).unwrap()
}

fn raw(rows: &RowSet) -> Vec<Vec<String>> {
    rows.rows()
        .map(|r| r.raw().iter().map(str::to_string).collect())
        .collect()
}

// =============================================================================
// Filter properties
// =============================================================================

proptest! {
    #[test]
    fn prop_filter_is_ordered_subset(data in table(), lo in 0i32..100, span in 0i32..100) {
        let rows = to_rows(&data);
        let hi = lo + span;
        let out = apply(&rows, &FilterSpec::new().range("v", lo as f64, hi as f64)).unwrap();

        let expected: Vec<Vec<String>> = raw(&rows)
            .into_iter()
            .zip(&data)
            .filter(|(_, (_, v))| v.is_some_and(|v| v >= lo && v <= hi))
            .map(|(r, _)| r)
            .collect();
        prop_assert_eq!(raw(&out), expected);
    }

    #[test]
    fn prop_filter_is_idempotent(data in table(), cats in prop::collection::vec(prop_oneof![Just("a"), Just("b"), Just("c")], 0..3)) {
        let rows = to_rows(&data);
        let spec = FilterSpec::new().one_of("cat", cats).range("v", 10.0, 80.0);
        let once = apply(&rows, &spec).unwrap();
        let twice = apply(&once, &spec).unwrap();
        prop_assert_eq!(raw(&once), raw(&twice));
    }

    #[test]
    fn prop_empty_membership_selects_nothing(data in table()) {
        let rows = to_rows(&data);
        let out = apply(&rows, &FilterSpec::new().one_of("cat", Vec::<Value>::new())).unwrap();
        prop_assert!(out.is_empty());
        prop_assert_eq!(out.schema().len(), rows.schema().len());
    }
}

// =============================================================================
// Aggregation properties
// =============================================================================

proptest! {
    #[test]
    fn prop_group_sum_conserves_total(data in table()) {
        let rows = to_rows(&data);
        let table = group_reduce(&rows, &GroupSpec::new(&["cat"], "v", AggOp::Sum)).unwrap();
        let expected: i64 = data.iter().filter_map(|(_, v)| *v).map(i64::from).sum();
        prop_assert!((table.total() - expected as f64).abs() < 1e-6);
    }

    #[test]
    fn prop_cross_tab_shape_matches_distinct_keys(data in table()) {
        let rows = to_rows(&data);
        let m = cross_tab(
            &rows,
            &CrossTab {
                rows: Axis::ascending("cat"),
                cols: Axis::ascending("v"),
                value: None,
                op: AggOp::Count,
            },
        )
        .unwrap();

        let cats: BTreeSet<&str> = data.iter().map(|(c, _)| c.as_str()).filter(|c| !c.is_empty()).collect();
        let values: BTreeSet<i32> = data.iter().filter_map(|(_, v)| *v).collect();
        prop_assert_eq!(m.shape(), (cats.len(), values.len()));

        let complete = data.iter().filter(|(c, v)| !c.is_empty() && v.is_some()).count();
        prop_assert_eq!(m.total(), complete as f64);
    }
}

// =============================================================================
// Binning properties
// =============================================================================

proptest! {
    #[test]
    fn prop_uniform_column_fills_buckets_evenly(k in 1i32..40) {
        let data: Vec<(String, Option<i32>)> = (1..=5 * k).map(|v| ("a".to_string(), Some(v))).collect();
        let rows = to_rows(&data);
        let (out, edges) = bucketize(&rows, "v", 5).unwrap();
        prop_assert_eq!(edges.len(), 5);

        let counts = group_reduce(&out, &GroupSpec::new(&[edges.column.as_str()], "v", AggOp::Count)).unwrap();
        prop_assert_eq!(counts.total(), (5 * k) as f64);
        for group in counts.iter() {
            prop_assert!((group.value - k as f64).abs() <= 1.0, "bucket {} holds {}", group.label(), group.value);
        }
    }
}
