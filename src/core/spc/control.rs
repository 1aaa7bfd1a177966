//! Individuals control chart with ±3σ limits

use serde::{Deserialize, Serialize};

use super::stats::calculate_stats;

/// Center line and control limits
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlLimits {
    pub center: f64,
    pub ucl: f64,
    pub lcl: f64,
}

impl ControlLimits {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lcl && value <= self.ucl
    }
}

/// A plotted reading, numbered from 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub index: usize,
    pub value: f64,
    pub out_of_control: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlChart {
    pub points: Vec<ControlPoint>,
    pub limits: ControlLimits,
    pub std_dev: f64,
}

impl ControlChart {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn violations(&self) -> impl Iterator<Item = &ControlPoint> {
        self.points.iter().filter(|p| p.out_of_control)
    }
}

/// Build the chart from raw readings; invalid entries are skipped before numbering
pub fn build_control_chart(values: &[f64]) -> ControlChart {
    let stats = calculate_stats(values);
    if stats.is_empty() {
        return ControlChart::default();
    }

    let limits = ControlLimits {
        center: stats.mean,
        ucl: stats.mean + 3.0 * stats.std_dev,
        lcl: stats.mean - 3.0 * stats.std_dev,
    };

    let points = stats
        .measurements
        .iter()
        .enumerate()
        .map(|(i, &value)| ControlPoint {
            index: i + 1,
            value,
            out_of_control: !limits.contains(value),
        })
        .collect();

    ControlChart {
        points,
        limits,
        std_dev: stats.std_dev,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert!(build_control_chart(&[]).is_empty());
    }

    #[test]
    fn test_limits_are_three_sigma() {
        let chart = build_control_chart(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(chart.limits.center, 5.0);
        assert!((chart.limits.ucl - 11.0).abs() < 1e-9);
        assert!((chart.limits.lcl + 1.0).abs() < 1e-9);
        assert_eq!(chart.violations().count(), 0);
    }

    #[test]
    fn test_points_numbered_after_filtering() {
        let chart = build_control_chart(&[1.0, f64::NAN, 2.0]);
        let indexes: Vec<usize> = chart.points.iter().map(|p| p.index).collect();
        assert_eq!(indexes, vec![1, 2]);
        assert_eq!(chart.points[1].value, 2.0);
    }

    #[test]
    fn test_outlier_flagged() {
        let mut values = vec![10.0; 20];
        values.push(11.0);
        let chart = build_control_chart(&values);
        let flagged: Vec<usize> = chart.violations().map(|p| p.index).collect();
        assert_eq!(flagged, vec![21]);
    }
}
