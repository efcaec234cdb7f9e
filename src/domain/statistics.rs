// Summary statistics for sanitized sensor readings
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StatsError {
    #[error("cannot average an empty series")]
    DivisionByEmptySeries,
}

/// Headroom and fallback used when sizing the Y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisScaling {
    pub headroom: f64,
    pub fallback_ceiling: f64,
}

impl Default for AxisScaling {
    fn default() -> Self {
        Self {
            headroom: 1.1,
            fallback_ceiling: 100.0,
        }
    }
}

/// Averages of each contributing series plus the shared axis ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub averages: Vec<Option<f64>>,
    pub display_max: f64,
}

impl Summary {
    /// Average of the first contributing series.
    pub fn average(&self) -> Option<f64> {
        self.averages.first().copied().flatten()
    }
}

/// Drop absent readings, keeping the order of the present ones.
pub fn sanitize(readings: &[Option<f64>]) -> Vec<f64> {
    readings.iter().filter_map(|r| *r).collect()
}

/// Round to two decimal places for presentation.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn average(series: &[f64]) -> Result<f64, StatsError> {
    if series.is_empty() {
        return Err(StatsError::DivisionByEmptySeries);
    }
    let sum: f64 = series.iter().sum();
    Ok(round2(sum / series.len() as f64))
}

/// Axis ceiling over every plotted value and average.
///
/// Missing averages count as 0. An empty value set, or a ceiling that comes
/// out as 0 or non-finite, falls back to `scaling.fallback_ceiling`.
pub fn display_max(values: &[f64], averages: &[Option<f64>], scaling: AxisScaling) -> f64 {
    if values.is_empty() {
        return scaling.fallback_ceiling;
    }

    let peak = values
        .iter()
        .copied()
        .chain(averages.iter().map(|a| a.unwrap_or(0.0)))
        .fold(f64::NEG_INFINITY, f64::max);

    let ceiling = peak * scaling.headroom;
    if ceiling == 0.0 || !ceiling.is_finite() {
        scaling.fallback_ceiling
    } else {
        ceiling
    }
}

/// Summarize sanitized series that share one Y axis.
pub fn summarize(series_list: &[Vec<f64>], scaling: AxisScaling) -> Summary {
    let averages: Vec<Option<f64>> = series_list.iter().map(|s| average(s).ok()).collect();
    let values: Vec<f64> = series_list.iter().flatten().copied().collect();
    let display_max = display_max(&values, &averages, scaling);

    Summary {
        averages,
        display_max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_drops_absent() {
        let raw = vec![Some(10.0), None, Some(30.0)];
        assert_eq!(sanitize(&raw), vec![10.0, 30.0]);
        assert_eq!(raw.len(), 3);
    }

    #[test]
    fn test_sanitize_all_absent() {
        assert!(sanitize(&[None, None]).is_empty());
        assert!(sanitize(&[]).is_empty());
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let once = sanitize(&[Some(1.0), None, Some(2.5)]);
        let wrapped: Vec<Option<f64>> = once.iter().copied().map(Some).collect();
        assert_eq!(sanitize(&wrapped), once);
    }

    #[test]
    fn test_average_rounds_to_two_decimals() {
        assert_eq!(average(&[10.0, 20.0, 30.0]), Ok(20.0));
        assert_eq!(average(&[1.0, 2.0, 2.0]), Ok(1.67));
        assert_eq!(average(&[]), Err(StatsError::DivisionByEmptySeries));
    }

    #[test]
    fn test_display_max_with_headroom() {
        let max = display_max(&[10.0, 20.0, 30.0], &[Some(20.0)], AxisScaling::default());
        assert!((max - 33.0).abs() < 1e-9);
    }

    #[test]
    fn test_display_max_fallbacks() {
        let scaling = AxisScaling::default();
        assert_eq!(display_max(&[], &[None], scaling), 100.0);
        assert_eq!(display_max(&[0.0, 0.0], &[Some(0.0)], scaling), 100.0);
    }

    #[test]
    fn test_display_max_covers_every_value() {
        let values = [3.2, -1.0, 7.75, 0.5];
        let max = display_max(&values, &[Some(2.61)], AxisScaling::default());
        for v in values {
            assert!(max >= v * 1.1);
        }
    }

    #[test]
    fn test_summarize_missing_average_counts_as_zero() {
        let summary = summarize(&[vec![5.0, 15.0], vec![]], AxisScaling::default());
        assert_eq!(summary.averages, vec![Some(10.0), None]);
        assert_eq!(summary.average(), Some(10.0));
        assert!((summary.display_max - 16.5).abs() < 1e-9);
    }
}
