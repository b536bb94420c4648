// Visualizer settings
// Loaded from a TOML file; every section falls back to its defaults.

use crate::animation::EasingType;
use crate::errors::ConfigError;
use crate::types::Color;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cell and block geometry of the table diagram, in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    /// Width of every header and body cell (`W`).
    pub cell_width: f32,
    /// Height of the header row (`H`).
    pub header_height: f32,
    /// Height of a body row (`R`).
    pub row_height: f32,
    /// Vertical gap between consecutive group blocks (`S`).
    pub group_spacing: f32,
    /// Gap between the header row and the first body row.
    pub body_margin: f32,
    /// Offset of the table below the title baseline area.
    pub table_top: f32,
    pub padding: Padding,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            cell_width: 100.0,
            header_height: 30.0,
            row_height: 30.0,
            group_spacing: 20.0,
            body_margin: 5.0,
            table_top: 30.0,
            padding: Padding::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Padding {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            top: 40.0,
            right: 20.0,
            bottom: 20.0,
            left: 20.0,
        }
    }
}

/// Durations and delays in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Duration of every row movement and fade (`T`).
    pub transition_ms: f64,
    /// Delay before rows slide into clusters on a grouping step.
    pub grouping_delay_ms: f64,
    /// Delay before rows collapse into aggregates after a grouping step.
    pub aggregation_delay_ms: f64,
    /// Length of each half of the grouping-column pulse.
    pub pulse_ms: f64,
    /// Start of the pulse's return half, counted from the start of the first half.
    pub pulse_return_delay_ms: f64,
    /// Autoplay interval between steps.
    pub autoplay_interval_ms: f64,
    pub caption_fade_ms: f64,
    pub caption_delay_ms: f64,
    pub easing: EasingType,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            transition_ms: 750.0,
            grouping_delay_ms: 500.0,
            aggregation_delay_ms: 250.0,
            pulse_ms: 400.0,
            pulse_return_delay_ms: 800.0,
            autoplay_interval_ms: 2500.0,
            caption_fade_ms: 500.0,
            caption_delay_ms: 250.0,
            easing: EasingType::EaseInOut,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub background: Color,
    pub header_fill: Color,
    pub header_text: Color,
    pub cell_fill: Color,
    pub cell_stroke: Color,
    pub cell_text: Color,
    /// Header fill at the peak of the grouping pulse.
    pub accent_header: Color,
    /// Cell fill at the peak of the grouping pulse.
    pub accent_cell: Color,
    pub title_text: Color,
    pub caption_text: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Color::rgb(0x0f, 0x17, 0x2a),
            header_fill: Color::rgb(0x33, 0x41, 0x55),
            header_text: Color::rgb(0x67, 0xe8, 0xf9),
            cell_fill: Color::rgb(0x1e, 0x29, 0x3b),
            cell_stroke: Color::rgb(0x33, 0x41, 0x55),
            cell_text: Color::rgb(0xe2, 0xe8, 0xf0),
            accent_header: Color::rgb(0x08, 0x91, 0xb2),
            accent_cell: Color::rgb(0x16, 0x4e, 0x63),
            title_text: Color::rgb(0xe2, 0xe8, 0xf0),
            caption_text: Color::rgb(0xcb, 0xd5, 0xe1),
        }
    }
}

/// Complete visualizer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    pub geometry: Geometry,
    pub timings: Timings,
    pub palette: Palette,
}

impl VisualizerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Loads settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
