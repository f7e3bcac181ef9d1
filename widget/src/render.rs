//! Rendering of widget documents from samples and status.

use crate::layout::{
    error_layout, weather_layout, WidgetDocument, CONTENT_URL_DATA_REF, STATUS_DATA_REF,
};
use shared::config::{Levels, WidgetConfig};
use shared::health::Status;
use std::collections::{BTreeMap, HashMap};

/// Renders `widget` for the current `status`.
///
/// While the status is ok the weather layout is filled from `samples`;
/// otherwise the error layout carries the status message.
#[must_use]
pub fn render(
    widget: &WidgetConfig,
    samples: &HashMap<String, f64>,
    status: &Status,
) -> WidgetDocument {
    let mut document = WidgetDocument {
        name: widget.name.clone(),
        description: widget.description.clone(),
        data: BTreeMap::from([(CONTENT_URL_DATA_REF.to_string(), widget.widget_url.clone())]),
        layouts: BTreeMap::new(),
    };

    if status.ok {
        document.layouts = weather_layout();
        add_data_from_samples(&mut document, widget, samples);
        adjust_colors_from_thresholds(&mut document, widget, samples);
    } else {
        document.layouts = error_layout();
        document
            .data
            .insert(STATUS_DATA_REF.to_string(), status.message.clone());
    }

    document
}

fn sample(samples: &HashMap<String, f64>, metric: &str) -> f64 {
    samples.get(metric).copied().unwrap_or(0.0)
}

fn add_data_from_samples(
    document: &mut WidgetDocument,
    widget: &WidgetConfig,
    samples: &HashMap<String, f64>,
) {
    for (name, metric) in &widget.metrics {
        let value = sample(samples, name);
        if value.is_nan() {
            tracing::warn!(metric = %name, "Sample is NaN, rendering -1");
        }
        document.data.insert(
            name.clone(),
            format!("{}{}", format_value(value), metric.display_unit),
        );
    }
}

fn adjust_colors_from_thresholds(
    document: &mut WidgetDocument,
    widget: &WidgetConfig,
    samples: &HashMap<String, f64>,
) {
    for (name, metric) in &widget.metrics {
        let Some(levels) = &metric.levels else {
            continue;
        };
        let color = color_for_value(sample(samples, name), levels);

        for layout in document.layouts.values_mut() {
            for cell in layout.cells_mut() {
                if cell.data_ref() != Some(name.as_str()) {
                    continue;
                }
                if let Some(text) = cell.text.as_mut() {
                    text.color_style = Some(color.to_string());
                }
            }
        }
    }
}

/// Formats a value for display.
///
/// NaN renders as `-1`. Values with more than one decimal place are truncated
/// (not rounded) to one, and a trailing `.0` is dropped.
///
/// # Examples
///
/// ```
/// use widget::render::format_value;
///
/// assert_eq!(format_value(10.0), "10");
/// assert_eq!(format_value(10.45), "10.4");
/// assert_eq!(format_value(f64::NAN), "-1");
/// ```
#[must_use]
#[allow(clippy::float_cmp)]
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        return "-1".to_string();
    }
    // normalises -0.0
    let value = if value == 0.0 { 0.0 } else { value };

    let mut formatted = value.to_string();
    if let Some(dot) = formatted.find('.') {
        formatted.truncate((dot + 2).min(formatted.len()));
        if formatted.ends_with(".0") {
            formatted.truncate(dot);
        }
    }
    // small negatives truncate to zero
    if formatted == "-0" {
        return "0".to_string();
    }
    formatted
}

/// Picks the text colour for `value` given the metric's thresholds.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn color_for_value(value: f64, levels: &Levels) -> &'static str {
    if value >= levels.high as f64 {
        "red-500"
    } else if value >= levels.medium as f64 {
        "yellow-500"
    } else if value >= levels.low as f64 {
        "green-500"
    } else {
        "blue-500"
    }
}
