mod app;
mod state;
mod ui;

use anyhow::{anyhow, Context};
use app::RustyDashApp;
use eframe::egui;
use rusty_dash::color;
use rusty_dash::config::DashboardConfig;
use state::AppState;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = DashboardConfig::discover().context("loading dashboard config")?;
    let themes = color::load_presets().context("validating theme presets")?;
    let theme = config
        .theme
        .theme()
        .context("resolving configured theme")?;
    log::info!(
        "Starting with theme {}, data {} and {}",
        config.theme,
        config.coffee_csv.display(),
        config.student_csv.display()
    );
    let state = AppState::new(config, themes, theme);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty Dash",
        options,
        Box::new(|_cc| Ok(Box::new(RustyDashApp::new(state)))),
    )
    .map_err(|e| anyhow!("running the dashboard: {e}"))
}
