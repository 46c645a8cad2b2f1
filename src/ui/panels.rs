use std::path::PathBuf;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;
use rusty_dash::color::ThemePreset;
use rusty_dash::data::export;
use rusty_dash::data::RowSet;
use rusty_dash::pages::student::{ATTENDANCE_BOUNDS, GENDERS, LEVELS, SCHOOL_TYPES};

use crate::state::{AppState, CoffeePage, Page, StudentPage};

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / page selector.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Reload data").clicked() {
                state.reload();
                ui.close_menu();
            }
            if ui.button("Quit").clicked() {
                ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });

        ui.separator();

        for page in Page::ALL {
            ui.selectable_value(&mut state.page, page, page.title());
        }

        ui.separator();

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the filter panel of the current page.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| match state.page {
            Page::CoffeeDashboard => match &mut state.coffee {
                Ok(page) => coffee_filters(ui, page),
                Err(_) => {
                    ui.label("No coffee data loaded.");
                }
            },
            Page::StudentFactors => {
                theme_selector(ui, state);
                ui.separator();
                match &mut state.student {
                    Ok(page) => student_filters(ui, page),
                    Err(_) => {
                        ui.label("No student data loaded.");
                    }
                }
            }
            Page::Overview | Page::CoffeeGallery => {}
        });
}

fn coffee_filters(ui: &mut Ui, page: &mut CoffeePage) {
    ui.heading("Filters");
    ui.separator();

    let bounds = page.data.bounds().clone();
    let filters = &mut page.filters;
    let mut changed = false;

    // ---- Date range ----
    ui.strong("Date range");
    ui.horizontal(|ui: &mut Ui| {
        changed |= ui
            .add(DatePickerButton::new(&mut filters.start).id_salt("coffee_start"))
            .changed();
        ui.label("to");
        changed |= ui
            .add(DatePickerButton::new(&mut filters.end).id_salt("coffee_end"))
            .changed();
    });
    filters.start = filters.start.clamp(bounds.first_date, bounds.last_date);
    filters.end = filters.end.clamp(bounds.first_date, bounds.last_date);
    ui.separator();

    // ---- Hour range ----
    ui.strong("Hour of day");
    let hours = bounds.min_hour..=bounds.max_hour;
    changed |= ui
        .add(egui::Slider::new(&mut filters.hours.0, hours.clone()).text("from"))
        .changed();
    changed |= ui
        .add(egui::Slider::new(&mut filters.hours.1, hours).text("to"))
        .changed();
    ui.separator();

    // ---- Coffee types ----
    let header = format!(
        "Coffee  ({}/{})",
        filters.coffees.len(),
        bounds.coffees.len()
    );
    ui.strong(header);
    ui.horizontal(|ui: &mut Ui| {
        if ui.small_button("All").clicked() {
            filters.coffees = bounds.coffees.iter().cloned().collect();
            changed = true;
        }
        if ui.small_button("None").clicked() {
            filters.coffees.clear();
            changed = true;
        }
    });
    for coffee in &bounds.coffees {
        let mut checked = filters.coffees.contains(coffee);
        if ui.checkbox(&mut checked, coffee.as_str()).changed() {
            if checked {
                filters.coffees.insert(coffee.clone());
            } else {
                filters.coffees.remove(coffee);
            }
            changed = true;
        }
    }
    ui.separator();

    if ui.button("Reset filters").clicked() {
        page.reset_filters();
    } else if changed {
        page.refilter();
    }
}

fn theme_selector(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Visualization Settings");
    ui.strong("Color theme");
    let current = state.theme.preset;
    let mut picked = None;
    egui::ComboBox::from_id_salt("theme")
        .selected_text(current.name())
        .show_ui(ui, |ui: &mut Ui| {
            for preset in ThemePreset::ALL {
                if ui.selectable_label(current == preset, preset.name()).clicked() {
                    picked = Some(preset);
                }
            }
        });
    if let Some(preset) = picked {
        state.set_theme(preset);
    }
}

fn student_filters(ui: &mut Ui, page: &mut StudentPage) {
    ui.heading("Filters");
    ui.separator();

    let filters = &mut page.filters;
    let mut changed = false;

    changed |= choice(ui, "Gender", "gender", &mut filters.gender, &GENDERS);
    changed |= choice(
        ui,
        "Family income",
        "family_income",
        &mut filters.family_income,
        &LEVELS,
    );
    changed |= choice(
        ui,
        "School type",
        "school_type",
        &mut filters.school_type,
        &SCHOOL_TYPES,
    );
    ui.separator();

    ui.strong("Attendance (%)");
    let range = ATTENDANCE_BOUNDS.0..=ATTENDANCE_BOUNDS.1;
    changed |= ui
        .add(
            egui::Slider::new(&mut filters.attendance.0, range.clone())
                .step_by(1.0)
                .text("min"),
        )
        .changed();
    changed |= ui
        .add(
            egui::Slider::new(&mut filters.attendance.1, range)
                .step_by(1.0)
                .text("max"),
        )
        .changed();
    ui.separator();

    let reset = ui
        .add_enabled(!filters.is_default(), egui::Button::new("Reset filters"))
        .clicked();
    if reset {
        page.reset_filters();
    } else if changed {
        page.refilter();
    }
}

/// A selector with an "All" entry standing for no restriction.
fn choice(ui: &mut Ui, label: &str, id: &str, current: &mut Option<String>, options: &[&str]) -> bool {
    let mut changed = false;
    ui.label(label);
    let selected = current.clone().unwrap_or_else(|| "All".to_string());
    egui::ComboBox::from_id_salt(id)
        .selected_text(selected)
        .show_ui(ui, |ui: &mut Ui| {
            changed |= ui.selectable_value(current, None, "All").changed();
            for option in options {
                changed |= ui
                    .selectable_value(current, Some(option.to_string()), *option)
                    .changed();
            }
        });
    changed
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

/// Offer the rows as a CSV download. Returns a status line on failure.
pub fn download_button(ui: &mut Ui, label: &str, file_name: &str, rows: &RowSet) -> Option<String> {
    let clicked = ui
        .add_enabled(!rows.is_empty(), egui::Button::new(label))
        .on_disabled_hover_text("Nothing selected")
        .clicked();
    if !clicked {
        return None;
    }
    let path: PathBuf = rfd::FileDialog::new()
        .set_title("Save filtered data")
        .set_file_name(file_name)
        .add_filter("CSV", &["csv"])
        .save_file()?;

    match export::export_to_path(rows, &path) {
        Ok(()) => None,
        Err(e) => {
            log::error!("Failed to save {}: {e}", path.display());
            Some(format!("Error: {e}"))
        }
    }
}
