// Chart specification handed to a chart renderer
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder shown in tooltips for absent readings.
pub const TOOLTIP_PLACEHOLDER: &str = "N/A";

/// The two chart positions of a device-log record view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartSlot {
    Primary,
    Secondary,
}

impl ChartSlot {
    pub const ALL: [ChartSlot; 2] = [ChartSlot::Primary, ChartSlot::Secondary];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartSlot::Primary => "primary",
            ChartSlot::Secondary => "secondary",
        }
    }
}

impl fmt::Display for ChartSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" | "main" => Ok(ChartSlot::Primary),
            "secondary" | "second" => Ok(ChartSlot::Secondary),
            other => Err(format!("unknown chart slot '{}'", other)),
        }
    }
}

/// One plotted line. `values` may contain gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLine {
    pub name: String,
    pub values: Vec<Option<f64>>,
    pub is_average_line: bool,
}

impl ChartLine {
    pub fn readings(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
            is_average_line: false,
        }
    }

    /// Flat reference line at `average`, one point per label.
    pub fn average(variable_name: &str, unit: &str, average: f64, points: usize) -> Self {
        Self {
            name: format!("Average {} ({:.2} {})", variable_name, average, unit),
            values: vec![Some(average); points],
            is_average_line: true,
        }
    }

    /// Average lines are drawn dashed.
    pub fn is_dashed(&self) -> bool {
        self.is_average_line
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub labels: Vec<String>,
    pub series: Vec<ChartLine>,
    pub y_axis_min: f64,
    pub y_axis_max: f64,
    pub unit: String,
}

impl ChartSpec {
    /// Tooltip text for a value on this chart.
    pub fn tooltip(&self, value: Option<f64>) -> String {
        format_tooltip(value, &self.unit)
    }
}

/// The charts built for one record. Either slot may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartPair {
    pub primary: Option<ChartSpec>,
    pub secondary: Option<ChartSpec>,
}

impl ChartPair {
    pub fn get(&self, slot: ChartSlot) -> Option<&ChartSpec> {
        match slot {
            ChartSlot::Primary => self.primary.as_ref(),
            ChartSlot::Secondary => self.secondary.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, slot: ChartSlot) -> &mut Option<ChartSpec> {
        match slot {
            ChartSlot::Primary => &mut self.primary,
            ChartSlot::Secondary => &mut self.secondary,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.secondary.is_none()
    }
}

pub fn format_tooltip(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2} {}", v, unit),
        _ => TOOLTIP_PLACEHOLDER.to_string(),
    }
}

pub fn single_title(variable_name: &str, unit: &str) -> String {
    format!("{} [{}]", variable_name, unit)
}

pub fn dual_title(first: (&str, &str), second: (&str, &str)) -> String {
    format!(
        "{} & {}",
        single_title(first.0, first.1),
        single_title(second.0, second.1)
    )
}
