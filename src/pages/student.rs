//! Student-performance page: demographic filters, study/score scatter,
//! bucketed heatmaps, correlation insights and proportion pies.

use std::path::Path;

use super::{chart, require_rows, ChartResult};
use crate::data::aggregate::{
    correlation, cross_tab, describe, linear_fit, mean, value_counts, AggOp, Axis, CrossTab,
    LinearFit, Matrix, Summary,
};
use crate::data::bin::{assign, bucketize, bucketize_labeled, BucketEdges};
use crate::data::filter::{apply, FilterSpec};
use crate::data::loader::{self, DatasetSpec};
use crate::data::{ColumnKind, DataError, Result, RowSet, Value};

pub const HOURS_STUDIED: &str = "Hours_Studied";
pub const ATTENDANCE: &str = "Attendance";
pub const EXAM_SCORE: &str = "Exam_Score";
pub const PHYSICAL_ACTIVITY: &str = "Physical_Activity";
pub const SLEEP_HOURS: &str = "Sleep_Hours";
pub const GENDER: &str = "Gender";
pub const FAMILY_INCOME: &str = "Family_Income";
pub const SCHOOL_TYPE: &str = "School_Type";
pub const INTERNET_ACCESS: &str = "Internet_Access";
pub const PARENTAL_INVOLVEMENT: &str = "Parental_Involvement";
pub const ACCESS_TO_RESOURCES: &str = "Access_to_Resources";
pub const MOTIVATION_LEVEL: &str = "Motivation_Level";

pub const GENDERS: [&str; 2] = ["Male", "Female"];
pub const LEVELS: [&str; 3] = ["Low", "Medium", "High"];
pub const SCHOOL_TYPES: [&str; 2] = ["Public", "Private"];
pub const YES_NO: [&str; 2] = ["No", "Yes"];
pub const ATTENDANCE_BOUNDS: (f64, f64) = (60.0, 100.0);

pub const SCORE_LABELS: [&str; 5] = ["60-68", "68-76", "76-84", "84-92", "92-100"];
pub const ACTIVITY_LABELS: [&str; 5] = ["Very Low", "Low", "Medium", "High", "Very High"];
pub const SLEEP_LABELS: [&str; 5] = ["4-5h", "5-6h", "6-7h", "7-8h", "8-10h"];

const NUMERIC: [&str; 5] = [HOURS_STUDIED, ATTENDANCE, EXAM_SCORE, PHYSICAL_ACTIVITY, SLEEP_HOURS];
const CATEGORICAL: [&str; 7] = [
    GENDER,
    FAMILY_INCOME,
    SCHOOL_TYPE,
    INTERNET_ACCESS,
    PARENTAL_INVOLVEMENT,
    ACCESS_TO_RESOURCES,
    MOTIVATION_LEVEL,
];

pub fn dataset_spec() -> DatasetSpec {
    let spec = NUMERIC
        .iter()
        .fold(DatasetSpec::new(), |s, c| s.column(c, ColumnKind::Numeric));
    CATEGORICAL
        .iter()
        .fold(spec, |s, c| s.column(c, ColumnKind::Categorical))
}

// ---------------------------------------------------------------------------
// Dataset and filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StudentData {
    rows: RowSet,
}

impl StudentData {
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_rows(loader::load(path, &dataset_spec())?)
    }

    pub fn from_rows(rows: RowSet) -> Result<Self> {
        for name in NUMERIC {
            rows.schema().column_of_kind(name, ColumnKind::Numeric)?;
        }
        for name in CATEGORICAL {
            rows.schema().column_of_kind(name, ColumnKind::Categorical)?;
        }
        Ok(StudentData { rows })
    }

    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    pub fn filtered(&self, filters: &StudentFilters) -> Result<RowSet> {
        apply(&self.rows, &filters.to_spec())
    }
}

/// Sidebar selections; `None` means "All" for that selector. There is no
/// "select nothing" state on this page.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentFilters {
    pub gender: Option<String>,
    pub family_income: Option<String>,
    pub school_type: Option<String>,
    pub attendance: (f64, f64),
}

impl Default for StudentFilters {
    fn default() -> Self {
        StudentFilters {
            gender: None,
            family_income: None,
            school_type: None,
            attendance: ATTENDANCE_BOUNDS,
        }
    }
}

impl StudentFilters {
    pub fn to_spec(&self) -> FilterSpec {
        let mut spec = FilterSpec::new();
        for (column, choice) in [
            (GENDER, &self.gender),
            (FAMILY_INCOME, &self.family_income),
            (SCHOOL_TYPE, &self.school_type),
        ] {
            if let Some(value) = choice {
                spec = spec.equals(column, value.as_str());
            }
        }
        spec.range(ATTENDANCE, self.attendance.0, self.attendance.1)
    }

    pub fn is_default(&self) -> bool {
        *self == StudentFilters::default()
    }
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Scatter {
    pub points: Vec<[f64; 2]>,
    /// Absent when the points do not determine a line.
    pub trend: Option<LinearFit>,
}

pub fn study_scatter(rows: &RowSet) -> Result<Scatter> {
    require_rows(rows, "study scatter")?;
    let x = rows.schema().column_of_kind(HOURS_STUDIED, ColumnKind::Numeric)?;
    let y = rows.schema().column_of_kind(EXAM_SCORE, ColumnKind::Numeric)?;
    let points = rows
        .rows()
        .filter_map(|r| Some([r.get(x).as_f64()?, r.get(y).as_f64()?]))
        .collect();
    let trend = match linear_fit(rows, HOURS_STUDIED, EXAM_SCORE) {
        Ok(fit) => Some(fit),
        Err(e) => {
            log::warn!("study scatter trendline: {e}");
            None
        }
    };
    Ok(Scatter { points, trend })
}

/// Bucket `column`, falling back to a single bucket when every value is equal.
fn bucket_axis(
    rows: &RowSet,
    column: &str,
    labels: &[&str],
    bucket_count: usize,
) -> Result<(RowSet, BucketEdges)> {
    let attempt = if labels.len() == bucket_count {
        bucketize_labeled(rows, column, labels)
    } else {
        bucketize(rows, column, bucket_count)
    };
    match attempt {
        Err(DataError::DegenerateRange { detail, .. }) => {
            log::debug!("`{column}` collapses to one bucket ({detail})");
            let value = rows
                .numeric_range(column)?
                .map(|(lo, _)| lo)
                .ok_or_else(|| DataError::insufficient("bucketing", format!("no values in `{column}`")))?;
            let edges = BucketEdges::single(column, value, &value.to_string());
            Ok((assign(rows, &edges)?, edges))
        }
        other => other,
    }
}

/// Counts of exam-score buckets (rows) against buckets of `column` (columns).
pub fn score_heatmap(
    rows: &RowSet,
    column: &str,
    labels: &[&str],
    bucket_count: usize,
) -> Result<Matrix> {
    require_rows(rows, "score heatmap")?;
    let (rows, score_edges) = bucket_axis(rows, EXAM_SCORE, &SCORE_LABELS, bucket_count)?;
    let (rows, edges) = bucket_axis(&rows, column, labels, bucket_count)?;
    cross_tab(
        &rows,
        &CrossTab {
            rows: Axis::labels(&score_edges.column, score_edges.label_values()),
            cols: Axis::labels(&edges.column, edges.label_values()),
            value: None,
            op: AggOp::Count,
        },
    )
}

/// Correlations and averages shown beside the heatmaps.
#[derive(Debug, Clone, PartialEq)]
pub struct Insights {
    pub activity_correlation: ChartResult<f64>,
    pub sleep_correlation: ChartResult<f64>,
    pub average_activity: ChartResult<f64>,
    pub average_sleep: ChartResult<f64>,
    pub average_score: ChartResult<f64>,
}

impl Insights {
    pub fn compute(rows: &RowSet) -> Self {
        Insights {
            activity_correlation: chart("activity correlation", || {
                correlation(rows, PHYSICAL_ACTIVITY, EXAM_SCORE)
            }),
            sleep_correlation: chart("sleep correlation", || {
                correlation(rows, SLEEP_HOURS, EXAM_SCORE)
            }),
            average_activity: chart("average activity", || mean(rows, PHYSICAL_ACTIVITY)),
            average_sleep: chart("average sleep", || mean(rows, SLEEP_HOURS)),
            average_score: chart("average score", || mean(rows, EXAM_SCORE)),
        }
    }
}

/// Category counts in a fixed order, for a pie chart.
pub fn proportions(rows: &RowSet, column: &str, categories: &[&str]) -> Result<Vec<(Value, usize)>> {
    let order: Vec<Value> = categories.iter().map(|c| Value::from(*c)).collect();
    let counts = value_counts(rows, column, Some(&order))?;
    if counts.iter().all(|(_, n)| *n == 0) {
        return Err(DataError::insufficient(
            "proportions",
            format!("no `{column}` values to plot"),
        ));
    }
    Ok(counts)
}

/// Exam-score summary per category of `column`; empty categories are left out.
pub fn score_by(rows: &RowSet, column: &str, categories: &[&str]) -> Result<Vec<(String, Summary)>> {
    let mut out = Vec::new();
    for category in categories {
        let subset = apply(rows, &FilterSpec::new().equals(column, *category))?;
        match describe(&subset, EXAM_SCORE) {
            Ok(summary) => out.push((category.to_string(), summary)),
            Err(e) if e.is_recoverable() => continue,
            Err(e) => return Err(e),
        }
    }
    if out.is_empty() {
        return Err(DataError::insufficient(
            "score distribution",
            format!("no exam scores for any `{column}` category"),
        ));
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Page view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StudentView {
    pub scatter: ChartResult<Scatter>,
    pub activity_heatmap: ChartResult<Matrix>,
    pub sleep_heatmap: ChartResult<Matrix>,
    pub insights: Insights,
    pub internet_access: ChartResult<Vec<(Value, usize)>>,
    pub parental_involvement: ChartResult<Vec<(Value, usize)>>,
    pub access_to_resources: ChartResult<Vec<(Value, usize)>>,
    pub score_by_motivation: ChartResult<Vec<(String, Summary)>>,
}

impl StudentView {
    pub fn compute(filtered: &RowSet, bucket_count: usize) -> Self {
        StudentView {
            scatter: chart("study scatter", || study_scatter(filtered)),
            activity_heatmap: chart("activity heatmap", || {
                score_heatmap(filtered, PHYSICAL_ACTIVITY, &ACTIVITY_LABELS, bucket_count)
            }),
            sleep_heatmap: chart("sleep heatmap", || {
                score_heatmap(filtered, SLEEP_HOURS, &SLEEP_LABELS, bucket_count)
            }),
            insights: Insights::compute(filtered),
            internet_access: chart("internet access", || {
                proportions(filtered, INTERNET_ACCESS, &YES_NO)
            }),
            parental_involvement: chart("parental involvement", || {
                proportions(filtered, PARENTAL_INVOLVEMENT, &LEVELS)
            }),
            access_to_resources: chart("access to resources", || {
                proportions(filtered, ACCESS_TO_RESOURCES, &LEVELS)
            }),
            score_by_motivation: chart("score by motivation", || {
                score_by(filtered, MOTIVATION_LEVEL, &LEVELS)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::data::loader::parse_csv;

    const HEADER: &str = "Hours_Studied,Attendance,Parental_Involvement,Access_to_Resources,Sleep_Hours,Motivation_Level,Internet_Access,Family_Income,School_Type,Physical_Activity,Gender,Exam_Score";

    fn data(rows: &[&str]) -> StudentData {
        let mut csv = format!("{HEADER}\n");
        for r in rows {
            csv.push_str(r);
            csv.push('\n');
        }
        let rows = parse_csv(csv.as_bytes(), Path::new("students.csv"), &dataset_spec()).unwrap();
        StudentData::from_rows(rows).unwrap()
    }

    fn sample() -> StudentData {
        data(&[
            "23,84,Low,High,7,Low,Yes,Low,Public,3,Male,67",
            "19,64,Low,Medium,8,Low,Yes,Medium,Public,4,Female,61",
            "24,98,Medium,Medium,7,Medium,Yes,Medium,Public,4,Male,74",
            "29,89,Low,Medium,8,Medium,Yes,Medium,Public,4,Male,71",
            "19,92,Medium,Medium,6,Medium,Yes,Medium,Public,4,Female,70",
            "19,88,Medium,Medium,8,Medium,Yes,Medium,Public,3,Male,71",
            "29,84,Medium,Low,7,Low,Yes,Low,Private,2,Male,67",
            "25,78,Low,High,6,Medium,Yes,High,Public,2,Male,66",
            "17,94,Medium,High,6,High,Yes,Medium,Private,1,Male,69",
            "23,98,Medium,Medium,8,Medium,Yes,High,Public,5,Male,72",
            "15,70,High,Low,9,Medium,No,High,Public,6,Female,68",
            "30,100,High,High,4,High,Yes,High,Private,0,Female,100",
        ])
    }

    #[test]
    fn default_filters_apply_attendance_bounds_only() {
        let spec = StudentFilters::default().to_spec();
        assert_eq!(spec.predicates().len(), 1);
        assert_eq!(sample().filtered(&StudentFilters::default()).unwrap().len(), 12);
    }

    #[test]
    fn female_high_income_subset() {
        let d = sample();
        let filters = StudentFilters {
            gender: Some("Female".into()),
            family_income: Some("High".into()),
            ..StudentFilters::default()
        };
        let rows = d.filtered(&filters).unwrap();
        assert_eq!(rows.len(), 2);
        // two points always lie on a line
        let r = correlation(&rows, PHYSICAL_ACTIVITY, EXAM_SCORE).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_row_subset_has_no_correlation() {
        let d = sample();
        let filters = StudentFilters {
            gender: Some("Female".into()),
            family_income: Some("Low".into()),
            ..StudentFilters::default()
        };
        let rows = d.filtered(&filters).unwrap();
        assert!(rows.is_empty() || rows.len() == 1);
        let insights = Insights::compute(&rows);
        assert!(insights.activity_correlation.is_err());
    }

    #[test]
    fn heatmap_is_five_by_five_and_counts_every_row() {
        let rows = sample().rows().clone();
        let m = score_heatmap(&rows, SLEEP_HOURS, &SLEEP_LABELS, 5).unwrap();
        assert_eq!(m.shape(), (5, 5));
        assert_eq!(m.total(), 12.0);
        assert_eq!(m.col_labels[0], Value::from("4-5h"));
    }

    #[test]
    fn heatmap_uses_range_labels_for_other_bucket_counts() {
        let rows = sample().rows().clone();
        let m = score_heatmap(&rows, SLEEP_HOURS, &SLEEP_LABELS, 3).unwrap();
        assert_eq!(m.shape(), (3, 3));
        assert_eq!(m.total(), 12.0);
    }

    #[test]
    fn heatmap_falls_back_to_a_single_bucket() {
        let d = data(&[
            "10,80,Low,Low,7,Low,Yes,Low,Public,3,Male,70",
            "12,80,Low,Low,7,Low,Yes,Low,Public,3,Male,75",
        ]);
        let m = score_heatmap(d.rows(), SLEEP_HOURS, &SLEEP_LABELS, 5).unwrap();
        assert_eq!(m.shape(), (5, 1));
        assert_eq!(m.total(), 2.0);
    }

    #[test]
    fn pies_keep_category_order_and_guard_empty() {
        let d = sample();
        let counts = proportions(d.rows(), INTERNET_ACCESS, &YES_NO).unwrap();
        assert_eq!(counts, vec![(Value::from("No"), 1), (Value::from("Yes"), 11)]);
        assert!(proportions(&d.rows().empty_like(), INTERNET_ACCESS, &YES_NO).is_err());
    }

    #[test]
    fn score_by_skips_empty_categories() {
        let d = sample();
        let low_only = d
            .filtered(&StudentFilters {
                school_type: Some("Private".into()),
                ..StudentFilters::default()
            })
            .unwrap();
        let groups = score_by(&low_only, MOTIVATION_LEVEL, &LEVELS).unwrap();
        let names: Vec<&str> = groups.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Low", "High"]);
    }

    #[test]
    fn view_survives_an_empty_selection() {
        let d = sample();
        let filters = StudentFilters {
            attendance: (99.5, 99.6),
            ..StudentFilters::default()
        };
        let rows = d.filtered(&filters).unwrap();
        let view = StudentView::compute(&rows, 5);
        assert!(view.scatter.is_err());
        assert!(view.activity_heatmap.is_err());
        assert!(view.internet_access.is_err());
        assert!(view.insights.average_score.is_err());
    }
}
