//! Descriptive statistics over a measurement set

use serde::{Deserialize, Serialize};

/// Summary statistics for one measurement set
///
/// `std_dev` is the population standard deviation (divides by N, not N-1).
/// `measurements` echoes the valid inputs in their original order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub measurements: Vec<f64>,
}

impl DescriptiveStats {
    /// Number of valid measurements the stats were computed from
    pub fn count(&self) -> usize {
        self.measurements.len()
    }

    /// True when no valid measurement was supplied
    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }
}

/// Returns true for values the aggregator accepts
pub(crate) fn is_valid(value: f64) -> bool {
    value.is_finite()
}

/// Compute mean, standard deviation, min and max of the valid values
///
/// NaN and infinite entries are dropped. If nothing valid remains, the
/// all-zero record with an empty `measurements` list is returned.
pub fn calculate_stats(values: &[f64]) -> DescriptiveStats {
    let valid: Vec<f64> = values.iter().copied().filter(|v| is_valid(*v)).collect();

    if valid.is_empty() {
        return DescriptiveStats::default();
    }

    let n = valid.len() as f64;
    let mean = valid.iter().sum::<f64>() / n;
    let variance = valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    let mut min = valid[0];
    let mut max = valid[0];
    for &v in &valid[1..] {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }

    DescriptiveStats {
        mean,
        std_dev: variance.sqrt(),
        min,
        max,
        measurements: valid,
    }
}

/// Parse a typed reading such as `"2.3815"`
///
/// Blank, unparsable and non-finite input yields `None`.
pub fn parse_measurement(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| is_valid(*v))
}
