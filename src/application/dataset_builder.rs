// Chart dataset builder - Turns sensor series into chart specifications
use crate::domain::chart::{ChartLine, ChartPair, ChartSpec, dual_title, single_title};
use crate::domain::sensor::SensorSeries;
use crate::domain::statistics::{AxisScaling, sanitize, summarize};

pub const DEFAULT_MAX_SENSORS: usize = 3;

#[derive(Debug, Clone)]
pub struct ChartDatasetBuilder {
    max_sensors: usize,
    scaling: AxisScaling,
}

impl Default for ChartDatasetBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SENSORS, AxisScaling::default())
    }
}

impl ChartDatasetBuilder {
    pub fn new(max_sensors: usize, scaling: AxisScaling) -> Self {
        Self {
            max_sensors,
            scaling,
        }
    }

    pub fn build(&self, sensors: &[SensorSeries]) -> ChartPair {
        let sensors = &sensors[..sensors.len().min(self.max_sensors)];

        ChartPair {
            primary: sensors.first().and_then(|s| self.build_primary(s)),
            secondary: sensors
                .get(1)
                .and_then(|s| self.build_secondary(s, sensors.get(2))),
        }
    }

    fn build_primary(&self, sensor: &SensorSeries) -> Option<ChartSpec> {
        let valid = sanitize(&sensor.readings);
        if valid.is_empty() {
            tracing::debug!("No valid readings for primary sensor {}", sensor.variable_name);
            return None;
        }

        let summary = summarize(&[valid], self.scaling);
        let average = summary.average()?;

        Some(ChartSpec {
            title: single_title(&sensor.variable_name, &sensor.unit_of_measure),
            labels: sensor.labels.clone(),
            series: reading_lines(sensor, average),
            y_axis_min: 0.0,
            y_axis_max: summary.display_max,
            unit: sensor.unit_of_measure.clone(),
        })
    }

    fn build_secondary(
        &self,
        first: &SensorSeries,
        second: Option<&SensorSeries>,
    ) -> Option<ChartSpec> {
        let valid_first = sanitize(&first.readings);
        if valid_first.is_empty() {
            tracing::debug!("No valid readings for secondary sensor {}", first.variable_name);
            return None;
        }

        // The second sensor only joins when it shares the exact label axis
        let companion = second.and_then(|s| {
            if s.labels != first.labels {
                tracing::debug!(
                    "Dropping sensor {} from secondary chart - labels differ from {}",
                    s.variable_name,
                    first.variable_name
                );
                return None;
            }
            let valid = sanitize(&s.readings);
            (!valid.is_empty()).then_some((s, valid))
        });

        let mut contributing = vec![valid_first];
        if let Some((_, valid)) = &companion {
            contributing.push(valid.clone());
        }
        let summary = summarize(&contributing, self.scaling);

        let mut series = reading_lines(first, summary.averages[0]?);
        let title = match &companion {
            Some((s, _)) => {
                series.extend(reading_lines(s, summary.averages[1]?));
                dual_title(
                    (&first.variable_name, &first.unit_of_measure),
                    (&s.variable_name, &s.unit_of_measure),
                )
            }
            None => single_title(&first.variable_name, &first.unit_of_measure),
        };

        Some(ChartSpec {
            title,
            labels: first.labels.clone(),
            series,
            y_axis_min: 0.0,
            y_axis_max: summary.display_max,
            unit: first.unit_of_measure.clone(),
        })
    }
}

/// Raw readings (gaps kept) followed by their average line.
fn reading_lines(sensor: &SensorSeries, average: f64) -> Vec<ChartLine> {
    vec![
        ChartLine::readings(sensor.variable_name.clone(), sensor.readings.clone()),
        ChartLine::average(
            &sensor.variable_name,
            &sensor.unit_of_measure,
            average,
            sensor.labels.len(),
        ),
    ]
}
