use eframe::egui::{self, RichText, Ui};
use rusty_dash::color::{ColorMap, SequentialScale, Theme};
use rusty_dash::data::aggregate::OrderedTable;
use rusty_dash::data::Value;
use rusty_dash::pages::coffee::Kpis;
use rusty_dash::pages::student::{
    ACCESS_TO_RESOURCES, EXAM_SCORE, HOURS_STUDIED, INTERNET_ACCESS, MOTIVATION_LEVEL,
    PARENTAL_INVOLVEMENT, PHYSICAL_ACTIVITY, SLEEP_HOURS,
};
use rusty_dash::pages::ChartResult;

use crate::state::AppState;
use crate::ui::{panels, plot};

const PREVIEW_ROWS: usize = 50;

/// Draw a chart, or its placeholder when it could not be computed.
fn section<T>(ui: &mut Ui, title: &str, result: &ChartResult<T>, draw: impl FnOnce(&mut Ui, &T)) {
    ui.add_space(8.0);
    ui.heading(title);
    match result {
        Ok(value) => draw(ui, value),
        Err(placeholder) => plot::placeholder(ui, placeholder),
    }
}

fn table_bars(table: &OrderedTable) -> Vec<(String, f64)> {
    table.iter().map(|r| (r.label(), r.value)).collect()
}

fn load_error(ui: &mut Ui, what: &str, message: &str) {
    ui.heading(what);
    ui.label(RichText::new(format!("Could not load the data: {message}")).color(egui::Color32::RED));
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

pub fn overview(ui: &mut Ui, state: &AppState) {
    ui.heading("Rusty Dash");
    ui.label("Two interactive dashboards over small tabular datasets.");
    ui.add_space(8.0);

    ui.strong("Coffee sales");
    ui.label(
        "Transactions from a coffee vending machine. The EDA gallery shows revenue and sales \
         patterns over the whole dataset. The dashboard filters by date, hour and coffee type.",
    );
    match &state.coffee {
        Ok(page) => ui.label(format!(
            "{} transactions from {} to {}.",
            page.data.rows().len(),
            page.data.bounds().first_date,
            page.data.bounds().last_date
        )),
        Err(e) => ui.label(RichText::new(e).color(egui::Color32::RED)),
    };
    ui.add_space(8.0);

    ui.strong("Student performance factors");
    ui.label(
        "How study time, attendance, sleep and physical activity relate to exam scores, \
         with filters on gender, family income, school type and attendance.",
    );
    match &state.student {
        Ok(page) => ui.label(format!("{} students.", page.data.rows().len())),
        Err(e) => ui.label(RichText::new(e).color(egui::Color32::RED)),
    };
    ui.add_space(8.0);

    ui.label(format!(
        "Coffee data: {}   Student data: {}",
        state.config.coffee_csv.display(),
        state.config.student_csv.display()
    ));
}

// ---------------------------------------------------------------------------
// Coffee sales
// ---------------------------------------------------------------------------

pub fn coffee_gallery(ui: &mut Ui, state: &mut AppState) {
    let page = match &state.coffee {
        Ok(page) => page,
        Err(e) => return load_error(ui, "EDA Gallery", e),
    };
    let theme = &state.theme;
    let gallery = &page.gallery;

    section(ui, "Daily revenue", &gallery.daily_revenue, |ui, series| {
        plot::date_line(ui, "daily_revenue", series, theme.primary, "Revenue");
    });
    ui.add_space(8.0);
    ui.heading("Coffee type distribution");
    pie_section(ui, "Share of transactions", &gallery.coffee_mix, theme);
    section(ui, "Revenue by weekday", &gallery.weekday_revenue, |ui, table| {
        plot::bar_chart(ui, "weekday_revenue", &table_bars(table), theme.primary, "Weekday", "Revenue");
    });
    section(ui, "Sales by hour", &gallery.hourly_sales, |ui, table| {
        plot::bar_chart(ui, "hourly_sales", &table_bars(table), theme.secondary, "Hour", "Transactions");
    });
    section(ui, "Revenue by month", &gallery.monthly_revenue, |ui, table| {
        plot::bar_chart(ui, "monthly_revenue", &table_bars(table), theme.primary, "Month", "Revenue");
    });

    ui.add_space(8.0);
    ui.heading("Data preview");
    let rows = page.data.rows();
    plot::data_preview(ui, "gallery_preview", rows, PREVIEW_ROWS);
    if let Some(msg) = panels::download_button(ui, "Download CSV", "Coffee_sales.csv", rows) {
        state.status_message = Some(msg);
    }
}

pub fn coffee_dashboard(ui: &mut Ui, state: &mut AppState) {
    let page = match &state.coffee {
        Ok(page) => page,
        Err(e) => return load_error(ui, "Coffee Dashboard", e),
    };
    let theme = &state.theme;
    let view = &page.view;

    ui.heading("Coffee Dashboard");
    match &view.kpis {
        Ok(kpis) => kpi_row(ui, kpis),
        Err(placeholder) => plot::placeholder(ui, placeholder),
    }

    section(ui, "Revenue by weekday and hour", &view.heatmap, |ui, m| {
        plot::heatmap(ui, m, SequentialScale::Coffee, ("Hour", "Weekday"), 1);
    });
    section(ui, "Revenue by coffee", &view.coffee_revenue, |ui, table| {
        let keys: Vec<Value> = table.iter().map(|r| r.key[0].clone()).collect();
        let colors = ColorMap::new(&keys, theme);
        let bars: Vec<(Value, f64)> = table.iter().map(|r| (r.key[0].clone(), r.value)).collect();
        plot::colored_bar_chart(ui, "coffee_revenue", &bars, &colors, "Coffee", "Revenue");
    });

    ui.add_space(8.0);
    ui.heading("Filtered data");
    plot::data_preview(ui, "coffee_preview", &page.filtered, PREVIEW_ROWS);
    if let Some(msg) = panels::download_button(ui, "Download CSV", "coffee_filtered.csv", &page.filtered) {
        state.status_message = Some(msg);
    }
}

fn kpi_row(ui: &mut Ui, kpis: &Kpis) {
    ui.horizontal(|ui: &mut Ui| {
        kpi(ui, "Revenue", format!("{:.2}", kpis.revenue));
        kpi(ui, "Transactions", kpis.transactions.to_string());
        let ticket = kpis
            .average_ticket
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "-".to_string());
        kpi(ui, "Average ticket", ticket);
    });
}

fn kpi(ui: &mut Ui, label: &str, value: String) {
    ui.group(|ui: &mut Ui| {
        ui.vertical(|ui: &mut Ui| {
            ui.label(label);
            ui.label(RichText::new(value).size(22.0).strong());
        });
    });
}

fn keys(counts: &[(Value, usize)]) -> Vec<Value> {
    counts.iter().map(|(k, _)| k.clone()).collect()
}

// ---------------------------------------------------------------------------
// Student performance
// ---------------------------------------------------------------------------

pub fn student_factors(ui: &mut Ui, state: &mut AppState) {
    let page = match &state.student {
        Ok(page) => page,
        Err(e) => return load_error(ui, "Student Factors", e),
    };
    let theme = &state.theme;
    let view = &page.view;

    ui.heading("Student Performance Factors");
    ui.label(format!(
        "{} of {} students match the filters.",
        page.filtered.len(),
        page.data.rows().len()
    ));

    section(ui, "Study hours vs exam score", &view.scatter, |ui, s| {
        plot::scatter(
            ui,
            "study_scatter",
            &s.points,
            s.trend,
            (theme.primary, theme.secondary),
            (HOURS_STUDIED, EXAM_SCORE),
        );
    });

    ui.columns(2, |cols| {
        section(&mut cols[0], "Physical activity vs score", &view.activity_heatmap, |ui, m| {
            plot::heatmap(ui, m, theme.sequential, (PHYSICAL_ACTIVITY, EXAM_SCORE), 0);
        });
        section(&mut cols[1], "Sleep vs score", &view.sleep_heatmap, |ui, m| {
            plot::heatmap(ui, m, theme.sequential, (SLEEP_HOURS, EXAM_SCORE), 0);
        });
    });

    insights(ui, view);

    ui.add_space(8.0);
    ui.heading("Access and support");
    ui.columns(3, |cols| {
        pie_section(&mut cols[0], INTERNET_ACCESS, &view.internet_access, theme);
        pie_section(&mut cols[1], PARENTAL_INVOLVEMENT, &view.parental_involvement, theme);
        pie_section(&mut cols[2], ACCESS_TO_RESOURCES, &view.access_to_resources, theme);
    });

    section(ui, "Exam score by motivation", &view.score_by_motivation, |ui, groups| {
        plot::box_plot(ui, "motivation_box", groups, theme.primary, (MOTIVATION_LEVEL, EXAM_SCORE));
    });

    ui.add_space(8.0);
    ui.heading("Filtered data");
    plot::data_preview(ui, "student_preview", &page.filtered, PREVIEW_ROWS);
    if let Some(msg) = panels::download_button(ui, "Download CSV", "students_filtered.csv", &page.filtered) {
        state.status_message = Some(msg);
    }
}

fn insights(ui: &mut Ui, view: &rusty_dash::pages::student::StudentView) {
    let i = &view.insights;
    let line = |r: &ChartResult<f64>, decimals: usize| match r {
        Ok(v) => format!("{v:.decimals$}"),
        Err(p) => p.message.clone(),
    };
    ui.add_space(8.0);
    ui.heading("Insights");
    egui::Grid::new("insights").striped(true).show(ui, |ui: &mut Ui| {
        ui.label("Correlation, activity and score");
        ui.label(line(&i.activity_correlation, 2));
        ui.end_row();
        ui.label("Correlation, sleep and score");
        ui.label(line(&i.sleep_correlation, 2));
        ui.end_row();
        ui.label("Average physical activity (h/week)");
        ui.label(line(&i.average_activity, 1));
        ui.end_row();
        ui.label("Average sleep (h)");
        ui.label(line(&i.average_sleep, 1));
        ui.end_row();
        ui.label("Average exam score");
        ui.label(line(&i.average_score, 1));
        ui.end_row();
    });
}

fn pie_section(ui: &mut Ui, title: &str, counts: &ChartResult<Vec<(Value, usize)>>, theme: &Theme) {
    match counts {
        Ok(counts) => {
            let colors = ColorMap::new(&keys(counts), theme);
            plot::pie(ui, title, counts, &colors);
        }
        Err(placeholder) => {
            ui.strong(title);
            plot::placeholder(ui, placeholder);
        }
    }
}
