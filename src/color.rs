use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::Value;

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("theme `{theme}`: `{value}` is not a hex color")]
    InvalidColor { theme: ThemePreset, value: String },
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

fn parse_hex(hex: &str) -> Option<Color32> {
    let rgb = Srgb::<u8>::from_str(hex).ok()?;
    Some(Color32::from_rgb(rgb.red, rgb.green, rgb.blue))
}

// ---------------------------------------------------------------------------
// Sequential scales (heatmaps)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequentialScale {
    Blues,
    YlOrRd,
    Greens,
    Purples,
    YlGnBu,
    Viridis,
    /// Cream to dark roast, used by the coffee heatmap.
    Coffee,
}

impl SequentialScale {
    fn stops(self) -> &'static [&'static str] {
        match self {
            SequentialScale::Blues => &[
                "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5",
                "#08519c", "#08306b",
            ],
            SequentialScale::YlOrRd => &[
                "#ffffcc", "#ffeda0", "#fed976", "#feb24c", "#fd8d3c", "#fc4e2a", "#e31a1c",
                "#bd0026", "#800026",
            ],
            SequentialScale::Greens => &[
                "#f7fcf5", "#e5f5e0", "#c7e9c0", "#a1d99b", "#74c476", "#41ab5d", "#238b45",
                "#006d2c", "#00441b",
            ],
            SequentialScale::Purples => &[
                "#fcfbfd", "#efedf5", "#dadaeb", "#bcbddc", "#9e9ac8", "#807dba", "#6a51a3",
                "#54278f", "#3f007d",
            ],
            SequentialScale::YlGnBu => &[
                "#ffffd9", "#edf8b1", "#c7e9b4", "#7fcdbb", "#41b6c4", "#1d91c0", "#225ea8",
                "#253494", "#081d58",
            ],
            SequentialScale::Viridis => &[
                "#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779",
                "#6ece58", "#b5de2b", "#fde725",
            ],
            SequentialScale::Coffee => &[
                "#F7F3EE", "#D2B48C", "#C19A6B", "#A47148", "#6F4E37", "#3B2F2F",
            ],
        }
    }

    /// Colour at `t` in `[0, 1]`, interpolated in linear RGB.
    pub fn sample(self, t: f32) -> Color32 {
        let stops = self.stops();
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let pos = t * (stops.len() - 1) as f32;
        let i = (pos.floor() as usize).min(stops.len() - 2);
        let frac = pos - i as f32;

        let linear = |hex: &str| -> LinSrgb {
            Srgb::<u8>::from_str(hex)
                .map(|c| c.into_format::<f32>().into_linear())
                .unwrap_or_else(|_| LinSrgb::new(0.5, 0.5, 0.5))
        };
        let mixed = linear(stops[i]).mix(linear(stops[i + 1]), frac);
        let rgb = Srgb::<f32>::from_linear(mixed).into_format::<u8>();
        Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
    }

    /// Text colour readable on top of `sample(t)`.
    pub fn text_on(self, t: f32) -> Color32 {
        let c = self.sample(t);
        let luma = 0.299 * c.r() as f32 + 0.587 * c.g() as f32 + 0.114 * c.b() as f32;
        if luma > 150.0 {
            Color32::BLACK
        } else {
            Color32::WHITE
        }
    }
}

// ---------------------------------------------------------------------------
// Theme presets
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ThemePreset {
    #[default]
    #[serde(rename = "Ocean Blue")]
    OceanBlue,
    #[serde(rename = "Sunset Warm")]
    SunsetWarm,
    #[serde(rename = "Forest Green")]
    ForestGreen,
    #[serde(rename = "Purple Haze")]
    PurpleHaze,
    #[serde(rename = "Teal Mint")]
    TealMint,
    Classic,
}

impl fmt::Display for ThemePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct PresetDef {
    primary: &'static str,
    secondary: &'static str,
    sequential: SequentialScale,
    /// High / Yes share a colour, as do Low / No.
    positive: &'static str,
    negative: &'static str,
    neutral: &'static str,
}

impl ThemePreset {
    pub const ALL: [ThemePreset; 6] = [
        ThemePreset::OceanBlue,
        ThemePreset::SunsetWarm,
        ThemePreset::ForestGreen,
        ThemePreset::PurpleHaze,
        ThemePreset::TealMint,
        ThemePreset::Classic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ThemePreset::OceanBlue => "Ocean Blue",
            ThemePreset::SunsetWarm => "Sunset Warm",
            ThemePreset::ForestGreen => "Forest Green",
            ThemePreset::PurpleHaze => "Purple Haze",
            ThemePreset::TealMint => "Teal Mint",
            ThemePreset::Classic => "Classic",
        }
    }

    fn def(self) -> PresetDef {
        let (primary, secondary, sequential, positive, negative, neutral) = match self {
            ThemePreset::OceanBlue => (
                "#1f77b4",
                "#ff7f0e",
                SequentialScale::Blues,
                "#2E86AB",
                "#A23B72",
                "#F18F01",
            ),
            ThemePreset::SunsetWarm => (
                "#e74c3c",
                "#f39c12",
                SequentialScale::YlOrRd,
                "#e67e22",
                "#c0392b",
                "#f39c12",
            ),
            ThemePreset::ForestGreen => (
                "#27ae60",
                "#16a085",
                SequentialScale::Greens,
                "#27ae60",
                "#e74c3c",
                "#f39c12",
            ),
            ThemePreset::PurpleHaze => (
                "#9b59b6",
                "#8e44ad",
                SequentialScale::Purples,
                "#9b59b6",
                "#e74c3c",
                "#f39c12",
            ),
            ThemePreset::TealMint => (
                "#16a085",
                "#1abc9c",
                SequentialScale::YlGnBu,
                "#1abc9c",
                "#e74c3c",
                "#f39c12",
            ),
            ThemePreset::Classic => (
                "#3498db",
                "#e74c3c",
                SequentialScale::Viridis,
                "#008000",
                "#ff0000",
                "#ffff00",
            ),
        };
        PresetDef {
            primary,
            secondary,
            sequential,
            positive,
            negative,
            neutral,
        }
    }

    /// Resolve the preset's colour strings into a [`Theme`].
    pub fn theme(self) -> Result<Theme, ThemeError> {
        let def = self.def();
        let color = |hex: &str| {
            parse_hex(hex).ok_or_else(|| ThemeError::InvalidColor {
                theme: self,
                value: hex.to_string(),
            })
        };
        let positive = color(def.positive)?;
        let negative = color(def.negative)?;
        let neutral = color(def.neutral)?;
        let categories = [
            ("Yes", positive),
            ("High", positive),
            ("No", negative),
            ("Low", negative),
            ("Medium", neutral),
        ]
        .into_iter()
        .map(|(label, c)| (label.to_string(), c))
        .collect();
        Ok(Theme {
            preset: self,
            primary: color(def.primary)?,
            secondary: color(def.secondary)?,
            sequential: def.sequential,
            categories,
        })
    }
}

/// Resolve every preset, failing on the first invalid colour. Run once at
/// startup so rendering never has to handle a bad theme.
pub fn load_presets() -> Result<BTreeMap<ThemePreset, Theme>, ThemeError> {
    ThemePreset::ALL
        .into_iter()
        .map(|p| p.theme().map(|t| (p, t)))
        .collect()
}

/// Resolved colours for one preset.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub preset: ThemePreset,
    pub primary: Color32,
    pub secondary: Color32,
    pub sequential: SequentialScale,
    categories: BTreeMap<String, Color32>,
}

impl Theme {
    pub fn category_color(&self, label: &str) -> Option<Color32> {
        self.categories.get(label).copied()
    }
}

// ---------------------------------------------------------------------------
// Color mapping: categorical value → Color32
// ---------------------------------------------------------------------------

/// Maps the labels of one categorical axis to colours: the theme's fixed
/// category colours first, generated hues for everything else.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<Value, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new(labels: &[Value], theme: &Theme) -> Self {
        let palette = generate_palette(labels.len());
        let mapping = labels
            .iter()
            .zip(palette)
            .map(|(v, generated)| {
                let themed = v.as_str().and_then(|s| theme.category_color(s));
                (v.clone(), themed.unwrap_or(generated))
            })
            .collect();
        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, value: &Value) -> Color32 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }
}
