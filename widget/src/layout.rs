//! The widget.json document model and the built-in layouts.
//!
//! Layouts are fixed tables: the weather layout shows the four weather cells,
//! the error layout shows a single status line. Cells refer to entries of the
//! document's `data` map through `data_ref`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key of the error layout's status text in `data`.
pub const STATUS_DATA_REF: &str = "status";

/// Key of the tap-through link in `data`.
pub const CONTENT_URL_DATA_REF: &str = "content_url";

/// A rendered widget.json document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetDocument {
    /// Display name.
    pub name: String,
    /// Display description.
    pub description: String,
    /// Values referenced by cells.
    pub data: BTreeMap<String, String>,
    /// Layouts keyed by layout name.
    pub layouts: BTreeMap<String, Layout>,
}

/// One layout of a widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Size class (e.g. "small").
    pub size: String,
    /// Named styles.
    pub styles: Styles,
    /// Layers painted bottom to top.
    pub layers: Vec<Layer>,
}

/// Style definitions for a layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Styles {
    /// Named colours.
    pub colors: BTreeMap<String, Color>,
}

/// A named colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Hex colour value.
    pub color: String,
}

/// A layer of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Rows from top to bottom.
    pub rows: Vec<Row>,
}

/// A row of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Row height in grid units.
    pub height: f64,
    /// Cells from left to right.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cells: Vec<Cell>,
}

/// A cell in a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Cell width in grid units.
    pub width: u32,
    /// Named background colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color_style: Option<String>,
    /// Inner padding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<f64>,
    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Text>,
    /// Link opened when the cell is tapped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
}

/// Text shown in a cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Text {
    /// Literal text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
    /// Key into the document's `data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_ref: Option<String>,
    /// Font size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    /// Named text colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_style: Option<String>,
    /// Font style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<String>,
    /// Font weight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    /// Horizontal alignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    /// Smallest scale the text may shrink to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_scale_factor: Option<f64>,
}

impl Layout {
    /// Iterates mutably over every cell of every layer.
    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.layers
            .iter_mut()
            .flat_map(|layer| layer.rows.iter_mut())
            .flat_map(|row| row.cells.iter_mut())
    }

    /// Iterates over every cell of every layer.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.layers
            .iter()
            .flat_map(|layer| layer.rows.iter())
            .flat_map(|row| row.cells.iter())
    }
}

impl Cell {
    /// Returns the `data_ref` of the cell's text, if any.
    #[must_use]
    pub fn data_ref(&self) -> Option<&str> {
        self.text.as_ref().and_then(|t| t.data_ref.as_deref())
    }
}

fn palette() -> Styles {
    let colors = [
        ("black", "#000000"),
        ("stone-100", "#f5f5f4"),
        ("stone-950", "#0c0a09"),
        ("blue-500", "#3b82f6"),
        ("green-500", "#84cc16"),
        ("yellow-500", "#facc15"),
        ("red-500", "#ef4444"),
    ]
    .into_iter()
    .map(|(name, hex)| {
        (
            name.to_string(),
            Color {
                color: hex.to_string(),
            },
        )
    })
    .collect();

    Styles { colors }
}

fn background() -> Layer {
    Layer {
        rows: vec![Row {
            height: 12.0,
            cells: vec![Cell {
                width: 12,
                background_color_style: Some("stone-950".to_string()),
                padding: None,
                text: None,
                link_url: None,
            }],
        }],
    }
}

fn spacer(height: f64) -> Row {
    Row {
        height,
        cells: Vec::new(),
    }
}

fn text_row(height: f64, data_ref: &str, size: f64, color: &str, bold: bool) -> Row {
    Row {
        height,
        cells: vec![Cell {
            width: 12,
            background_color_style: None,
            padding: Some(1.15),
            text: Some(Text {
                data_ref: Some(data_ref.to_string()),
                size: Some(size),
                color_style: Some(color.to_string()),
                weight: bold.then(|| "bold".to_string()),
                justification: Some("left".to_string()),
                ..Text::default()
            }),
            link_url: None,
        }],
    }
}

/// Layout used while data collection is failing.
#[must_use]
pub fn error_layout() -> BTreeMap<String, Layout> {
    let layout = Layout {
        size: "small".to_string(),
        styles: palette(),
        layers: vec![
            background(),
            Layer {
                rows: vec![
                    spacer(1.0),
                    text_row(2.75, STATUS_DATA_REF, 8.0, "yellow-500", true),
                ],
            },
        ],
    };
    BTreeMap::from([("error".to_string(), layout)])
}

/// Layout showing the latest weather readings.
#[must_use]
pub fn weather_layout() -> BTreeMap<String, Layout> {
    let layout = Layout {
        size: "small".to_string(),
        styles: palette(),
        layers: vec![
            background(),
            Layer {
                rows: vec![
                    spacer(1.0),
                    text_row(2.75, "temperature", 40.0, "green-500", true),
                    spacer(1.0),
                    text_row(2.25, "humidity", 18.0, "yellow-500", false),
                    text_row(1.75, "wind_gust", 14.0, "stone-100", false),
                    text_row(1.75, "rainfall", 12.0, "blue-500", false),
                    spacer(0.75),
                ],
            },
        ],
    };
    BTreeMap::from([("weather_small".to_string(), layout)])
}
