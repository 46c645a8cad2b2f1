use std::collections::BTreeMap;

use rusty_dash::color::{Theme, ThemePreset};
use rusty_dash::config::DashboardConfig;
use rusty_dash::data::RowSet;
use rusty_dash::pages::coffee::{CoffeeData, CoffeeFilters, DashboardView, GalleryView};
use rusty_dash::pages::student::{StudentData, StudentFilters, StudentView};

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Overview,
    CoffeeGallery,
    CoffeeDashboard,
    StudentFactors,
}

impl Page {
    pub const ALL: [Page; 4] = [
        Page::Overview,
        Page::CoffeeGallery,
        Page::CoffeeDashboard,
        Page::StudentFactors,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Page::Overview => "Overview",
            Page::CoffeeGallery => "EDA Gallery",
            Page::CoffeeDashboard => "Coffee Dashboard",
            Page::StudentFactors => "Student Factors",
        }
    }
}

// ---------------------------------------------------------------------------
// Per-page state
// ---------------------------------------------------------------------------

/// Coffee dataset plus the dashboard's current selections and derived views.
pub struct CoffeePage {
    pub data: CoffeeData,
    pub filters: CoffeeFilters,
    pub gallery: GalleryView,
    pub filtered: RowSet,
    pub view: DashboardView,
}

impl CoffeePage {
    fn new(data: CoffeeData) -> Self {
        let filters = data.default_filters();
        let gallery = GalleryView::compute(data.rows());
        let filtered = select_coffee(&data, &filters);
        let view = DashboardView::compute(&filtered);
        CoffeePage {
            data,
            filters,
            gallery,
            filtered,
            view,
        }
    }

    /// Rebuild the filter spec from the current selections and recompute.
    pub fn refilter(&mut self) {
        self.filtered = select_coffee(&self.data, &self.filters);
        self.view = DashboardView::compute(&self.filtered);
    }

    pub fn reset_filters(&mut self) {
        self.filters = self.data.default_filters();
        self.refilter();
    }
}

fn select_coffee(data: &CoffeeData, filters: &CoffeeFilters) -> RowSet {
    let filtered = data.filtered(filters).unwrap_or_else(|e| {
        log::error!("coffee filter failed: {e}");
        data.rows().empty_like()
    });
    log::debug!(
        "coffee dashboard: {} of {} transactions selected",
        filtered.len(),
        data.rows().len()
    );
    filtered
}

pub struct StudentPage {
    pub data: StudentData,
    pub filters: StudentFilters,
    pub filtered: RowSet,
    pub view: StudentView,
    bucket_count: usize,
}

impl StudentPage {
    fn new(data: StudentData, bucket_count: usize) -> Self {
        let filters = StudentFilters::default();
        let filtered = select_students(&data, &filters);
        let view = StudentView::compute(&filtered, bucket_count);
        StudentPage {
            data,
            filters,
            filtered,
            view,
            bucket_count,
        }
    }

    pub fn refilter(&mut self) {
        self.filtered = select_students(&self.data, &self.filters);
        self.view = StudentView::compute(&self.filtered, self.bucket_count);
    }

    pub fn reset_filters(&mut self) {
        self.filters = StudentFilters::default();
        self.refilter();
    }
}

fn select_students(data: &StudentData, filters: &StudentFilters) -> RowSet {
    let filtered = data.filtered(filters).unwrap_or_else(|e| {
        log::error!("student filter failed: {e}");
        data.rows().empty_like()
    });
    log::debug!(
        "student page: {} of {} students selected",
        filtered.len(),
        data.rows().len()
    );
    filtered
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,
    pub page: Page,

    /// Validated theme presets and the one in use.
    pub themes: BTreeMap<ThemePreset, Theme>,
    pub theme: Theme,

    /// A load failure is kept as its message and shown in place of the page.
    pub coffee: Result<CoffeePage, String>,
    pub student: Result<StudentPage, String>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig, themes: BTreeMap<ThemePreset, Theme>, theme: Theme) -> Self {
        let mut state = AppState {
            coffee: Err("not loaded".into()),
            student: Err("not loaded".into()),
            config,
            page: Page::Overview,
            themes,
            theme,
            status_message: None,
        };
        state.reload();
        state
    }

    /// (Re)load both datasets from the configured paths.
    pub fn reload(&mut self) {
        self.coffee = CoffeeData::load(&self.config.coffee_csv)
            .map(CoffeePage::new)
            .map_err(|e| {
                log::error!("Failed to load coffee data: {e}");
                e.to_string()
            });
        let bucket_count = self.config.bucket_count;
        self.student = StudentData::load(&self.config.student_csv)
            .map(|data| StudentPage::new(data, bucket_count))
            .map_err(|e| {
                log::error!("Failed to load student data: {e}");
                e.to_string()
            });
        self.status_message = None;
    }

    pub fn set_theme(&mut self, preset: ThemePreset) {
        if let Some(theme) = self.themes.get(&preset) {
            log::debug!("theme -> {preset}");
            self.theme = theme.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rusty_dash::data::loader::parse_csv;
    use rusty_dash::pages::coffee;

    use super::*;

    const COFFEE_CSV: &str = "\
hour_of_day,cash_type,money,coffee_name,Time_of_Day,Weekday,Month_name,Weekdaysort,Monthsort,Date,Time
8,card,38.7,Latte,Morning,Fri,Mar,5,3,2024-03-01,08:15:50.520000
10,card,28.9,Americano,Morning,Fri,Mar,5,3,2024-03-01,10:20:12.870000
12,cash,40,Latte,Afternoon,Sat,Mar,6,3,2024-03-02,12:05:01.000000
";

    fn page() -> CoffeePage {
        let rows = parse_csv(COFFEE_CSV.as_bytes(), Path::new("coffee.csv"), &coffee::dataset_spec()).unwrap();
        CoffeePage::new(CoffeeData::from_rows(rows).unwrap())
    }

    #[test]
    fn new_page_shows_default_selection() {
        let page = page();
        assert_eq!(page.filtered.len(), 3);
        assert_eq!(page.view.kpis.as_ref().unwrap().transactions, 3);
    }

    #[test]
    fn refilter_updates_rows_and_view_together() {
        let mut page = page();
        page.filters.coffees = ["Latte".to_string()].into_iter().collect();
        page.refilter();
        assert_eq!(page.filtered.len(), 2);
        assert_eq!(page.view.kpis.as_ref().unwrap().transactions, 2);

        page.reset_filters();
        assert_eq!(page.filtered.len(), 3);
    }
}
