use std::fs;
use std::io::Write;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

use rusty_dash::data::aggregate::{correlation, group_reduce, AggOp, GroupSpec};
use rusty_dash::data::export::{export_to_path, to_csv_bytes};
use rusty_dash::data::filter::{apply, FilterSpec};
use rusty_dash::data::loader::load;
use rusty_dash::data::{DataError, Value};
use rusty_dash::pages::coffee::{self, revenue_by_coffee, CoffeeData, DashboardView};
use rusty_dash::pages::student::{self, Insights, StudentData, StudentFilters};

const COFFEE_CSV: &str = "\
hour_of_day,cash_type,money,coffee_name,Time_of_Day,Weekday,Month_name,Weekdaysort,Monthsort,Date,Time
8,card,38.7,Latte,Morning,Fri,Mar,5,3,2024-03-01,08:15:50.520000
9,card,38.7,Latte,Morning,Fri,Mar,5,3,2024-03-01,09:19:22.539000
10,card,28.9,Americano,Morning,Fri,Mar,5,3,2024-03-01,10:20:12.870000
11,card,33.8,Latte,Morning,Sat,Mar,6,3,2024-03-02,11:05:01.000000
11,cash,40,Latte,Morning,Sat,Mar,6,3,2024-03-02,11:45:01.000000
12,card,38.7,Latte,Afternoon,Sat,Mar,6,3,2024-03-02,12:05:01.000000
";

const STUDENT_CSV: &str = "\
Hours_Studied,Attendance,Parental_Involvement,Access_to_Resources,Sleep_Hours,Motivation_Level,Internet_Access,Family_Income,School_Type,Physical_Activity,Gender,Exam_Score
10,80,Low,High,7,Low,Yes,High,Public,2,Female,70
20,90,Medium,High,8,Medium,Yes,High,Public,4,Female,80
30,95,High,High,6,High,No,High,Private,6,Female,90
15,85,Low,Low,7,Low,Yes,High,Public,5,Male,60
25,75,High,Medium,9,High,Yes,Low,Public,1,Female,99
";

fn temp_csv(content: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().unwrap();
    write!(tmp, "{}", content).unwrap();
    tmp
}

#[test]
fn test_coffee_hours_and_type_filter() {
    let tmp = temp_csv(COFFEE_CSV);
    let data = CoffeeData::load(tmp.path()).unwrap();

    let mut filters = data.default_filters();
    filters.hours = (9, 11);
    filters.coffees = ["Latte".to_string()].into_iter().collect();
    let filtered = data.filtered(&filters).unwrap();

    let money = filtered.column(coffee::MONEY).unwrap();
    let manual: f64 = filtered.numbers(money).sum();
    assert_eq!(filtered.len(), 3);

    let table = revenue_by_coffee(&filtered).unwrap();
    assert_eq!(table.len(), 1);
    let latte = table.get(&[Value::from("Latte")]).unwrap();
    assert!((latte - manual).abs() < 1e-9);
    assert!((latte - 112.5).abs() < 1e-9);

    let view = DashboardView::compute(&filtered);
    assert_eq!(view.kpis.unwrap().transactions, 3);
}

#[test]
fn test_coffee_filter_leaves_source_untouched() {
    let tmp = temp_csv(COFFEE_CSV);
    let data = CoffeeData::load(tmp.path()).unwrap();
    let before = to_csv_bytes(data.rows()).unwrap();

    let mut filters = data.default_filters();
    filters.coffees.clear();
    assert!(data.filtered(&filters).unwrap().is_empty());

    assert_eq!(data.rows().len(), 6);
    assert_eq!(to_csv_bytes(data.rows()).unwrap(), before);
}

#[test]
fn test_student_subset_statistics() {
    let tmp = temp_csv(STUDENT_CSV);
    let data = StudentData::load(tmp.path()).unwrap();

    let filters = StudentFilters {
        gender: Some("Female".into()),
        family_income: Some("High".into()),
        ..StudentFilters::default()
    };
    let filtered = data.filtered(&filters).unwrap();
    assert_eq!(filtered.len(), 3);

    let r = correlation(&filtered, student::PHYSICAL_ACTIVITY, student::EXAM_SCORE).unwrap();
    assert!((r - 1.0).abs() < 1e-9);

    let insights = Insights::compute(&filtered);
    let sleep = insights.sleep_correlation.unwrap();
    assert!((sleep + 0.5).abs() < 1e-9);
    assert!((insights.average_score.unwrap() - 80.0).abs() < 1e-9);

    let scatter = student::study_scatter(&filtered).unwrap();
    let fit = scatter.trend.unwrap();
    assert!((fit.slope - 1.0).abs() < 1e-9);
    assert!((fit.intercept - 60.0).abs() < 1e-9);
}

#[test]
fn test_export_reproduces_source_file() {
    let source = "id,coffee_name,money\r\n1,\"Americano, large\",28.9\r\n2,Latte,38.7\r\n3,Latte,33.8";
    let tmp = temp_csv(source);
    let spec = rusty_dash::data::loader::DatasetSpec::new();
    let rows = load(tmp.path(), &spec).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("copy.csv");
    export_to_path(&rows, &out).unwrap();
    assert_eq!(fs::read_to_string(&out).unwrap(), source);

    let latte = apply(&rows, &FilterSpec::new().equals("coffee_name", "Latte")).unwrap();
    let out = dir.path().join("latte.csv");
    export_to_path(&latte, &out).unwrap();
    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        "id,coffee_name,money\r\n2,Latte,38.7\r\n3,Latte,33.8"
    );
}

#[test]
fn test_export_keeps_bom_and_source_quoting() {
    let source = "\u{FEFF}\"id\",coffee_name,money\n1,\"Latte\",38.7\n2,\"Mocha\",\"33.8\"\n";
    let tmp = temp_csv(source);
    let rows = load(tmp.path(), &rusty_dash::data::loader::DatasetSpec::new()).unwrap();
    assert!(rows.column("id").is_ok());

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("copy.csv");
    export_to_path(&rows, &out).unwrap();
    assert_eq!(fs::read(&out).unwrap(), source.as_bytes());
}

#[test]
fn test_grouping_by_sort_column() {
    let tmp = temp_csv(COFFEE_CSV);
    let rows = load(tmp.path(), &coffee::dataset_spec()).unwrap();
    let table = group_reduce(
        &rows,
        &GroupSpec::new(&[coffee::WEEKDAY], coffee::MONEY, AggOp::Count).sort_by(coffee::WEEKDAY_SORT),
    )
    .unwrap();
    let labels: Vec<String> = table.iter().map(|r| r.label()).collect();
    assert_eq!(labels, vec!["Fri", "Sat"]);
    assert_eq!(table.total(), 6.0);
}

#[test]
fn test_missing_file_is_load_error() {
    let err = load(Path::new("does/not/exist.csv"), &coffee::dataset_spec()).unwrap_err();
    assert!(matches!(err, DataError::Load { .. }));
    assert!(!err.is_recoverable());
}

#[test]
fn test_missing_declared_column_is_load_error() {
    let tmp = temp_csv("Date,money\n2024-03-01,10\n");
    let err = CoffeeData::load(tmp.path()).unwrap_err();
    assert!(matches!(err, DataError::Load { .. }));
}
