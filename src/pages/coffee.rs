//! Coffee-sales pages: the unfiltered EDA gallery and the filtered dashboard.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;

use super::{chart, require_rows, ChartResult};
use crate::data::aggregate::{
    cross_tab, group_reduce, value_counts, AggOp, Axis, CrossTab, GroupSpec, Matrix, OrderedTable,
};
use crate::data::filter::{apply, FilterSpec};
use crate::data::loader::{self, DatasetSpec};
use crate::data::{ColumnKind, DataError, Result, RowSet, Value};

pub const DATE: &str = "Date";
pub const HOUR: &str = "hour_of_day";
pub const WEEKDAY: &str = "Weekday";
pub const WEEKDAY_SORT: &str = "Weekdaysort";
pub const MONTH: &str = "Month_name";
pub const MONTH_SORT: &str = "Monthsort";
pub const COFFEE: &str = "coffee_name";
pub const MONEY: &str = "money";

pub fn dataset_spec() -> DatasetSpec {
    DatasetSpec::new()
        .column(DATE, ColumnKind::Date)
        .column(HOUR, ColumnKind::Numeric)
        .column(WEEKDAY, ColumnKind::Categorical)
        .column(WEEKDAY_SORT, ColumnKind::Numeric)
        .column(MONTH, ColumnKind::Categorical)
        .column(MONTH_SORT, ColumnKind::Numeric)
        .column(COFFEE, ColumnKind::Categorical)
        .column(MONEY, ColumnKind::Numeric)
}

// ---------------------------------------------------------------------------
// Dataset and filters
// ---------------------------------------------------------------------------

/// Slider / checkbox domains, taken from the full dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct CoffeeBounds {
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub min_hour: u32,
    pub max_hour: u32,
    pub coffees: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CoffeeData {
    rows: RowSet,
    bounds: CoffeeBounds,
}

impl CoffeeData {
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_rows(loader::load(path, &dataset_spec())?)
    }

    /// Validate the schema and derive filter bounds.
    pub fn from_rows(rows: RowSet) -> Result<Self> {
        let schema = rows.schema();
        for (name, kind) in [
            (DATE, ColumnKind::Date),
            (HOUR, ColumnKind::Numeric),
            (WEEKDAY, ColumnKind::Categorical),
            (WEEKDAY_SORT, ColumnKind::Numeric),
            (MONTH, ColumnKind::Categorical),
            (MONTH_SORT, ColumnKind::Numeric),
            (COFFEE, ColumnKind::Categorical),
            (MONEY, ColumnKind::Numeric),
        ] {
            schema.column_of_kind(name, kind)?;
        }

        let (first_date, last_date) = rows.date_range(DATE)?.ok_or_else(|| {
            DataError::insufficient("coffee dataset", "no dated transactions")
        })?;
        let (min_hour, max_hour) = rows.numeric_range(HOUR)?.ok_or_else(|| {
            DataError::insufficient("coffee dataset", "no hour_of_day values")
        })?;
        let coffees = rows
            .distinct(COFFEE)?
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();

        Ok(CoffeeData {
            bounds: CoffeeBounds {
                first_date,
                last_date,
                min_hour: min_hour.max(0.0) as u32,
                max_hour: max_hour.max(0.0) as u32,
                coffees,
            },
            rows,
        })
    }

    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    pub fn bounds(&self) -> &CoffeeBounds {
        &self.bounds
    }

    /// Full date and hour range, every coffee selected.
    pub fn default_filters(&self) -> CoffeeFilters {
        let b = &self.bounds;
        CoffeeFilters {
            start: b.first_date,
            end: b.last_date,
            hours: (b.min_hour, b.max_hour),
            coffees: b.coffees.iter().cloned().collect(),
        }
    }

    pub fn filtered(&self, filters: &CoffeeFilters) -> Result<RowSet> {
        apply(&self.rows, &filters.to_spec())
    }
}

/// Sidebar selections for the coffee dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct CoffeeFilters {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub hours: (u32, u32),
    /// Unticking every coffee shows an empty dashboard, not the full one.
    pub coffees: BTreeSet<String>,
}

impl CoffeeFilters {
    pub fn to_spec(&self) -> FilterSpec {
        FilterSpec::new()
            .dates(DATE, self.start, self.end)
            .range(HOUR, f64::from(self.hours.0), f64::from(self.hours.1))
            .one_of(COFFEE, self.coffees.iter().map(String::as_str))
    }
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

pub fn daily_revenue(rows: &RowSet) -> Result<Vec<(NaiveDate, f64)>> {
    require_rows(rows, "daily revenue")?;
    let table = group_reduce(rows, &GroupSpec::new(&[DATE], MONEY, AggOp::Sum).sort_by(DATE))?;
    Ok(table
        .iter()
        .filter_map(|r| Some((r.key[0].as_date()?, r.value)))
        .collect())
}

pub fn coffee_mix(rows: &RowSet) -> Result<Vec<(Value, usize)>> {
    require_rows(rows, "coffee mix")?;
    value_counts(rows, COFFEE, None)
}

pub fn revenue_by_weekday(rows: &RowSet) -> Result<OrderedTable> {
    require_rows(rows, "weekday revenue")?;
    group_reduce(
        rows,
        &GroupSpec::new(&[WEEKDAY], MONEY, AggOp::Sum).sort_by(WEEKDAY_SORT),
    )
}

pub fn revenue_by_month(rows: &RowSet) -> Result<OrderedTable> {
    require_rows(rows, "monthly revenue")?;
    group_reduce(
        rows,
        &GroupSpec::new(&[MONTH], MONEY, AggOp::Sum).sort_by(MONTH_SORT),
    )
}

pub fn sales_by_hour(rows: &RowSet) -> Result<OrderedTable> {
    require_rows(rows, "hourly sales")?;
    group_reduce(rows, &GroupSpec::new(&[HOUR], MONEY, AggOp::Count).sort_by(HOUR))
}

pub fn revenue_by_coffee(rows: &RowSet) -> Result<OrderedTable> {
    require_rows(rows, "coffee revenue")?;
    group_reduce(rows, &GroupSpec::new(&[COFFEE], MONEY, AggOp::Sum).sort_by(COFFEE))
}

/// Weekday × hour revenue; weekdays in `Weekdaysort` order, hours ascending.
pub fn revenue_heatmap(rows: &RowSet) -> Result<Matrix> {
    require_rows(rows, "revenue heatmap")?;
    cross_tab(
        rows,
        &CrossTab {
            rows: Axis::sorted_by(WEEKDAY, WEEKDAY_SORT),
            cols: Axis::ascending(HOUR),
            value: Some(MONEY.to_string()),
            op: AggOp::Sum,
        },
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kpis {
    pub revenue: f64,
    pub transactions: usize,
    pub average_ticket: Option<f64>,
}

pub fn kpis(rows: &RowSet) -> Result<Kpis> {
    let id = rows.schema().column_of_kind(MONEY, ColumnKind::Numeric)?;
    let (revenue, paid) = rows
        .numbers(id)
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    Ok(Kpis {
        revenue,
        transactions: rows.len(),
        average_ticket: (paid > 0).then(|| revenue / paid as f64),
    })
}

// ---------------------------------------------------------------------------
// Page views
// ---------------------------------------------------------------------------

/// Charts of the EDA gallery, over the whole dataset.
#[derive(Debug, Clone)]
pub struct GalleryView {
    pub daily_revenue: ChartResult<Vec<(NaiveDate, f64)>>,
    pub coffee_mix: ChartResult<Vec<(Value, usize)>>,
    pub weekday_revenue: ChartResult<OrderedTable>,
    pub hourly_sales: ChartResult<OrderedTable>,
    pub monthly_revenue: ChartResult<OrderedTable>,
}

impl GalleryView {
    pub fn compute(rows: &RowSet) -> Self {
        GalleryView {
            daily_revenue: chart("daily revenue", || daily_revenue(rows)),
            coffee_mix: chart("coffee mix", || coffee_mix(rows)),
            weekday_revenue: chart("weekday revenue", || revenue_by_weekday(rows)),
            hourly_sales: chart("hourly sales", || sales_by_hour(rows)),
            monthly_revenue: chart("monthly revenue", || revenue_by_month(rows)),
        }
    }
}

/// Charts of the filtered dashboard.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub kpis: ChartResult<Kpis>,
    pub heatmap: ChartResult<Matrix>,
    pub coffee_revenue: ChartResult<OrderedTable>,
}

impl DashboardView {
    pub fn compute(filtered: &RowSet) -> Self {
        DashboardView {
            kpis: chart("kpis", || kpis(filtered)),
            heatmap: chart("revenue heatmap", || revenue_heatmap(filtered)),
            coffee_revenue: chart("coffee revenue", || revenue_by_coffee(filtered)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::data::loader::parse_csv;

    const SAMPLE: &str = "\
hour_of_day,cash_type,money,coffee_name,Time_of_Day,Weekday,Month_name,Weekdaysort,Monthsort,Date,Time
10,card,38.7,Latte,Morning,Fri,Mar,5,3,2024-03-01,10:15:50.520000
12,card,38.7,Hot Chocolate,Afternoon,Fri,Mar,5,3,2024-03-01,12:19:22.539000
9,card,28.9,Americano,Morning,Sat,Mar,6,3,2024-03-02,09:20:12.870000
18,card,33.8,Latte,Night,Mon,Apr,1,4,2024-04-01,18:05:01.000000
";

    fn data() -> CoffeeData {
        let rows = parse_csv(SAMPLE.as_bytes(), Path::new("coffee.csv"), &dataset_spec()).unwrap();
        CoffeeData::from_rows(rows).unwrap()
    }

    #[test]
    fn bounds_cover_the_dataset() {
        let b = data().bounds().clone();
        assert_eq!(b.first_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(b.last_date, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!((b.min_hour, b.max_hour), (9, 18));
        assert_eq!(b.coffees, vec!["Americano", "Hot Chocolate", "Latte"]);
    }

    #[test]
    fn default_filters_keep_every_row() {
        let d = data();
        let filtered = d.filtered(&d.default_filters()).unwrap();
        assert_eq!(filtered.len(), 4);
    }

    #[test]
    fn unticking_every_coffee_empties_the_dashboard() {
        let d = data();
        let mut filters = d.default_filters();
        filters.coffees.clear();
        let filtered = d.filtered(&filters).unwrap();
        assert!(filtered.is_empty());

        let view = DashboardView::compute(&filtered);
        assert!(view.heatmap.is_err());
        assert!(view.coffee_revenue.is_err());
        assert_eq!(view.kpis.unwrap().transactions, 0);
    }

    #[test]
    fn weekday_revenue_follows_sort_column() {
        let table = revenue_by_weekday(data().rows()).unwrap();
        let labels: Vec<String> = table.iter().map(|r| r.label()).collect();
        assert_eq!(labels, vec!["Mon", "Fri", "Sat"]);
        assert_eq!(table.get(&[Value::from("Fri")]), Some(77.4));
    }

    #[test]
    fn heatmap_rows_are_weekdays_and_columns_hours() {
        let m = revenue_heatmap(data().rows()).unwrap();
        assert_eq!(m.shape(), (3, 4));
        assert_eq!(
            m.col_labels,
            vec![
                Value::Number(9.0),
                Value::Number(10.0),
                Value::Number(12.0),
                Value::Number(18.0)
            ]
        );
        assert_eq!(m.row(0), &[0.0, 0.0, 0.0, 33.8]);
    }

    #[test]
    fn daily_revenue_is_chronological() {
        let series = daily_revenue(data().rows()).unwrap();
        assert_eq!(series.len(), 3);
        assert!(series.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(series[0].1, 77.4);
    }

    #[test]
    fn gallery_charts_fail_independently() {
        let empty = data().rows().empty_like();
        let view = GalleryView::compute(&empty);
        assert!(view.daily_revenue.is_err());
        assert!(view.coffee_mix.is_err());
        assert!(view.hourly_sales.is_err());
    }
}
