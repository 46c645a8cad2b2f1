use std::f32::consts::{FRAC_PI_2, TAU};

use chrono::{Datelike, NaiveDate};
use eframe::egui::{self, pos2, vec2, Align2, Color32, FontId, Rect, Sense, Shape, Stroke, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Line, LineStyle, Plot,
    PlotPoints, Points,
};
use rusty_dash::color::{ColorMap, SequentialScale};
use rusty_dash::data::aggregate::{label_strings, LinearFit, Matrix, Summary};
use rusty_dash::data::{RowSet, Value};
use rusty_dash::pages::Placeholder;

const PLOT_HEIGHT: f32 = 260.0;

/// Shown in place of a chart that could not be computed.
pub fn placeholder(ui: &mut Ui, placeholder: &Placeholder) {
    ui.group(|ui: &mut Ui| {
        ui.set_min_height(60.0);
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label(egui::RichText::new(&placeholder.message).color(Color32::from_rgb(200, 140, 0)));
        });
    });
}

/// Category labels on integer x positions, blank elsewhere.
fn category_formatter(labels: Vec<String>) -> impl Fn(GridMark, &std::ops::RangeInclusive<f64>) -> String {
    move |mark, _range| {
        let v = mark.value;
        if v < 0.0 || (v - v.round()).abs() > 1e-6 {
            return String::new();
        }
        labels.get(v.round() as usize).cloned().unwrap_or_default()
    }
}

fn static_plot(id: &str, x_label: &str, y_label: &str) -> Plot<'static> {
    Plot::new(id.to_owned())
        .height(PLOT_HEIGHT)
        .x_axis_label(x_label.to_owned())
        .y_axis_label(y_label.to_owned())
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .allow_boxed_zoom(false)
}

// ---------------------------------------------------------------------------
// Plot widgets
// ---------------------------------------------------------------------------

pub fn bar_chart(
    ui: &mut Ui,
    id: &str,
    bars: &[(String, f64)],
    color: Color32,
    x_label: &str,
    y_label: &str,
) {
    let chart = BarChart::new(
        bars.iter()
            .enumerate()
            .map(|(i, (name, value))| {
                Bar::new(i as f64, *value)
                    .name(name)
                    .fill(color)
                    .width(0.7)
            })
            .collect(),
    );
    let labels = bars.iter().map(|(name, _)| name.clone()).collect();
    static_plot(id, x_label, y_label)
        .x_axis_formatter(category_formatter(labels))
        .show(ui, |plot_ui| plot_ui.bar_chart(chart));
}

/// One bar per category, each in its own colour.
pub fn colored_bar_chart(
    ui: &mut Ui,
    id: &str,
    bars: &[(Value, f64)],
    colors: &ColorMap,
    x_label: &str,
    y_label: &str,
) {
    let chart = BarChart::new(
        bars.iter()
            .enumerate()
            .map(|(i, (key, value))| {
                Bar::new(i as f64, *value)
                    .name(key)
                    .fill(colors.color_for(key))
                    .width(0.7)
            })
            .collect(),
    );
    let labels = bars.iter().map(|(key, _)| key.to_string()).collect();
    static_plot(id, x_label, y_label)
        .x_axis_formatter(category_formatter(labels))
        .show(ui, |plot_ui| plot_ui.bar_chart(chart));
}

/// Daily series with dates on the x axis.
pub fn date_line(ui: &mut Ui, id: &str, series: &[(NaiveDate, f64)], color: Color32, y_label: &str) {
    let points: Vec<[f64; 2]> = series
        .iter()
        .map(|(date, v)| [f64::from(date.num_days_from_ce()), *v])
        .collect();
    static_plot(id, "Date", y_label)
        .x_axis_formatter(|mark, _range| {
            NaiveDate::from_num_days_from_ce_opt(mark.value.round() as i32)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(PlotPoints::from(points.clone())).color(color).width(1.5));
            plot_ui.points(Points::new(points).color(color).radius(2.5));
        });
}

/// Scatter with an optional dashed least-squares line.
pub fn scatter(
    ui: &mut Ui,
    id: &str,
    points: &[[f64; 2]],
    trend: Option<LinearFit>,
    colors: (Color32, Color32),
    labels: (&str, &str),
) {
    let (x_min, x_max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p[0]), hi.max(p[0]))
        });
    Plot::new(id.to_owned())
        .height(PLOT_HEIGHT + 60.0)
        .legend(Legend::default())
        .x_axis_label(labels.0.to_owned())
        .y_axis_label(labels.1.to_owned())
        .show(ui, |plot_ui| {
            plot_ui.points(
                Points::new(points.to_vec())
                    .name("Students")
                    .color(colors.0.gamma_multiply(0.7))
                    .radius(2.5),
            );
            if let Some(fit) = trend {
                let line = vec![[x_min, fit.at(x_min)], [x_max, fit.at(x_max)]];
                plot_ui.line(
                    Line::new(PlotPoints::from(line))
                        .name("Trend")
                        .color(colors.1)
                        .width(2.0)
                        .style(LineStyle::dashed_loose()),
                );
            }
        });
}

pub fn box_plot(ui: &mut Ui, id: &str, groups: &[(String, Summary)], color: Color32, labels: (&str, &str)) {
    let boxes = groups
        .iter()
        .enumerate()
        .map(|(i, (name, s))| {
            BoxElem::new(i as f64, BoxSpread::new(s.min, s.q1, s.median, s.q3, s.max))
                .name(name)
                .fill(color.gamma_multiply(0.4))
                .stroke(Stroke::new(1.5, color))
                .box_width(0.5)
        })
        .collect();
    let names = groups.iter().map(|(name, _)| name.clone()).collect();
    static_plot(id, labels.0, labels.1)
        .x_axis_formatter(category_formatter(names))
        .show(ui, |plot_ui| plot_ui.box_plot(BoxPlot::new(boxes)));
}

// ---------------------------------------------------------------------------
// Painter-drawn charts
// ---------------------------------------------------------------------------

/// Annotated matrix; cell colour scales with the value relative to the maximum.
pub fn heatmap(ui: &mut Ui, m: &Matrix, scale: SequentialScale, axes: (&str, &str), decimals: usize) {
    let (rows, cols) = m.shape();
    if rows == 0 || cols == 0 {
        return;
    }
    let row_names = label_strings(&m.row_labels);
    let col_names = label_strings(&m.col_labels);
    let max = m.max().unwrap_or(0.0);

    let label_w = 90.0;
    let cell_h = 26.0;
    let footer_h = 36.0;
    let cell_w = ((ui.available_width() - label_w) / cols as f32).max(24.0);
    let size = vec2(label_w + cell_w * cols as f32, cell_h * rows as f32 + footer_h);
    let (rect, _response) = ui.allocate_exact_size(size, Sense::hover());
    let painter = ui.painter_at(rect);
    let font = FontId::proportional(11.0);
    let text_color = ui.visuals().text_color();

    for (r, row_name) in row_names.iter().enumerate() {
        let y = rect.top() + r as f32 * cell_h;
        painter.text(
            pos2(rect.left() + label_w - 6.0, y + cell_h / 2.0),
            Align2::RIGHT_CENTER,
            row_name,
            font.clone(),
            text_color,
        );
        for c in 0..cols {
            let v = m.get(r, c);
            let t = if max > 0.0 && v.is_finite() {
                (v / max) as f32
            } else {
                0.0
            };
            let cell = Rect::from_min_size(
                pos2(rect.left() + label_w + c as f32 * cell_w, y),
                vec2(cell_w, cell_h),
            )
            .shrink(1.0);
            painter.rect_filled(cell, 2.0, scale.sample(t));
            painter.text(
                cell.center(),
                Align2::CENTER_CENTER,
                format!("{v:.decimals$}"),
                font.clone(),
                scale.text_on(t),
            );
        }
    }

    let bottom = rect.top() + rows as f32 * cell_h;
    for (c, col_name) in col_names.iter().enumerate() {
        painter.text(
            pos2(rect.left() + label_w + (c as f32 + 0.5) * cell_w, bottom + 3.0),
            Align2::CENTER_TOP,
            col_name,
            font.clone(),
            text_color,
        );
    }
    painter.text(
        pos2(rect.left() + label_w + cell_w * cols as f32 / 2.0, rect.bottom()),
        Align2::CENTER_BOTTOM,
        axes.0,
        font.clone(),
        text_color,
    );
    painter.text(
        pos2(rect.left(), rect.top()),
        Align2::LEFT_TOP,
        axes.1,
        font,
        text_color,
    );
}

/// Donut pie with percentage labels and a legend underneath.
pub fn pie(ui: &mut Ui, title: &str, counts: &[(Value, usize)], colors: &ColorMap) {
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    ui.vertical_centered(|ui: &mut Ui| {
        ui.strong(title);
    });
    if total == 0 {
        return;
    }

    let height = 170.0;
    let (rect, _response) = ui.allocate_exact_size(vec2(ui.available_width(), height), Sense::hover());
    let painter = ui.painter_at(rect);
    let center = rect.center();
    let outer = height * 0.45;
    let inner = outer * 0.3;
    let font = FontId::proportional(11.0);
    let at = |angle: f32, radius: f32| center + vec2(angle.cos(), angle.sin()) * radius;

    let mut start = -FRAC_PI_2;
    for (label, n) in counts {
        if *n == 0 {
            continue;
        }
        let share = *n as f32 / total as f32;
        let sweep = TAU * share;
        let color = colors.color_for(label);
        let steps = ((sweep / 0.05).ceil() as usize).max(1);
        for s in 0..steps {
            let a0 = start + sweep * s as f32 / steps as f32;
            let a1 = start + sweep * (s + 1) as f32 / steps as f32;
            painter.add(Shape::convex_polygon(
                vec![at(a0, inner), at(a0, outer), at(a1, outer), at(a1, inner)],
                color,
                Stroke::NONE,
            ));
        }
        let mid = start + sweep / 2.0;
        painter.text(
            at(mid, (inner + outer) / 2.0),
            Align2::CENTER_CENTER,
            format!("{:.1}%", share * 100.0),
            font.clone(),
            Color32::WHITE,
        );
        start += sweep;
    }

    ui.horizontal_wrapped(|ui: &mut Ui| {
        for (label, n) in counts {
            let (swatch, _) = ui.allocate_exact_size(vec2(10.0, 10.0), Sense::hover());
            ui.painter().rect_filled(swatch, 2.0, colors.color_for(label));
            ui.label(format!("{label} ({n})"));
        }
    });
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// First `limit` rows, raw source fields only.
pub fn data_preview(ui: &mut Ui, id: &str, rows: &RowSet, limit: usize) {
    let header = rows.source().header.clone();
    let shown = rows.len().min(limit);
    ui.label(format!("Showing {shown} of {} rows", rows.len()));
    ui.push_id(id, |ui: &mut Ui| {
        egui::ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .max_scroll_height(280.0)
                .columns(TableColumn::auto().at_least(60.0), header.len())
                .header(20.0, |mut head| {
                    for name in header.iter() {
                        head.col(|ui: &mut Ui| {
                            ui.strong(name);
                        });
                    }
                })
                .body(|body| {
                    body.rows(18.0, shown, |mut row| {
                        let Some(record) = rows.row(row.index()) else {
                            return;
                        };
                        for field in record.raw().iter() {
                            row.col(|ui: &mut Ui| {
                                ui.label(field);
                            });
                        }
                    });
                });
        });
    });
}
