// Sensor series domain models
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Label format used for the X axis categories.
pub const LABEL_FORMAT: &str = "%H:%M";

/// One monitored variable's readings for a single device-log record.
///
/// `readings` keeps absent entries in place so that a plotted series shows
/// gaps instead of compressing the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSeries {
    #[serde(rename = "var")]
    pub variable_name: String,
    #[serde(rename = "uom", default)]
    pub unit_of_measure: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub readings: Vec<Option<f64>>,
}

impl SensorSeries {
    pub fn new(
        variable_name: impl Into<String>,
        unit_of_measure: impl Into<String>,
        labels: Vec<String>,
        readings: Vec<Option<f64>>,
    ) -> Self {
        Self {
            variable_name: variable_name.into(),
            unit_of_measure: unit_of_measure.into(),
            labels,
            readings,
        }
    }
}

/// A child row of a device-log record.
#[derive(Debug, Clone, Deserialize)]
pub struct LogItem {
    pub sensor_var: String,
    #[serde(default)]
    pub uom: Option<String>,
    #[serde(deserialize_with = "deserialize_log_date")]
    pub data_date: NaiveDateTime,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl LogItem {
    /// Numeric reading of this row, or `None` when missing or not a number.
    pub fn reading(&self) -> Option<f64> {
        match self.value.as_ref()? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| v.is_finite())
    }
}

fn deserialize_log_date<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&raw, fmt).ok())
        .ok_or_else(|| serde::de::Error::custom(format!("invalid data_date '{}'", raw)))
}

/// Group log rows into one series per sensor variable.
///
/// Series are ordered by the first appearance of their variable, which is the
/// priority order the backend assigns (index 0 is the primary sensor).
pub fn series_from_log_items(items: &[LogItem]) -> Vec<SensorSeries> {
    let mut series: Vec<SensorSeries> = Vec::new();

    for item in items {
        let idx = match series.iter().position(|s| s.variable_name == item.sensor_var) {
            Some(idx) => idx,
            None => {
                series.push(SensorSeries::new(
                    item.sensor_var.clone(),
                    item.uom.clone().unwrap_or_default(),
                    Vec::new(),
                    Vec::new(),
                ));
                series.len() - 1
            }
        };

        let entry = &mut series[idx];
        entry.labels.push(item.data_date.format(LABEL_FORMAT).to_string());
        entry.readings.push(item.reading());
    }

    series
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(var: &str, date: &str, value: serde_json::Value) -> LogItem {
        serde_json::from_value(serde_json::json!({
            "sensor_var": var,
            "uom": "C",
            "data_date": date,
            "value": value,
        }))
        .unwrap()
    }

    #[test]
    fn test_deserialize_wire_names() {
        let raw = r#"{"var":"Temp","uom":"C","labels":["t1","t2"],"readings":[1.5,null]}"#;
        let series: SensorSeries = serde_json::from_str(raw).unwrap();
        assert_eq!(series.variable_name, "Temp");
        assert_eq!(series.unit_of_measure, "C");
        assert_eq!(series.readings, vec![Some(1.5), None]);
    }

    #[test]
    fn test_group_in_first_appearance_order() {
        let items = vec![
            item("Hum", "2024-05-01 10:00:00.000000", serde_json::json!(40)),
            item("Temp", "2024-05-01 10:00:00.000000", serde_json::json!("21.5")),
            item("Hum", "2024-05-01 10:05:00.000000", serde_json::json!(42)),
        ];

        let series = series_from_log_items(&items);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].variable_name, "Hum");
        assert_eq!(series[0].labels, vec!["10:00", "10:05"]);
        assert_eq!(series[0].readings, vec![Some(40.0), Some(42.0)]);
        assert_eq!(series[1].readings, vec![Some(21.5)]);
    }

    #[test]
    fn test_non_numeric_value_is_absent() {
        let items = vec![
            item("Temp", "2024-05-01 10:00:00", serde_json::json!("n/a")),
            item("Temp", "2024-05-01 10:01:00", serde_json::Value::Null),
            item("Temp", "2024-05-01 10:02:00", serde_json::json!(3)),
        ];

        let series = series_from_log_items(&items);
        assert_eq!(series[0].readings, vec![None, None, Some(3.0)]);
        assert_eq!(series[0].labels.len(), 3);
    }
}
