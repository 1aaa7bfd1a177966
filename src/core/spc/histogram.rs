//! Equal-width histogram of a measurement set

use serde::{Deserialize, Serialize};

use super::classify::SpecLimits;
use super::stats::is_valid;
use super::WARNING_BAND;

/// Default number of bins
pub const DEFAULT_BINS: usize = 20;

/// Upper bound on the bin count; larger requests are clamped
pub const MAX_BINS: usize = 1000;

/// One histogram bucket covering `[bin_start, bin_end)`
///
/// The last bucket also includes its upper edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub bin_start: f64,
    pub bin_end: f64,
    pub count: usize,
}

impl HistogramBin {
    /// Display label, e.g. `2.3750-2.3755`, or `1.0000` for a zero-width bin
    pub fn range_label(&self) -> String {
        if self.bin_start == self.bin_end {
            format!("{:.4}", self.bin_start)
        } else {
            format!("{:.4}-{:.4}", self.bin_start, self.bin_end)
        }
    }

    pub fn center(&self) -> f64 {
        (self.bin_start + self.bin_end) / 2.0
    }
}

/// Histogram output
///
/// An empty `bins` list is the "no data" sentinel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
    /// Plotted range after widening for spec limits
    pub range_min: f64,
    pub range_max: f64,
}

impl Histogram {
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }

    pub fn max_count(&self) -> usize {
        self.bins.iter().map(|b| b.count).max().unwrap_or(0)
    }
}

/// Bucket the valid values into `bins` equal-width bins
///
/// When a spec is supplied the plotted range is widened so that
/// `lsl - 0.0005` and `usl + 0.0005` fall inside it. If every value is the
/// same, a single zero-width bin holding all of them is returned. The bin
/// count is clamped to `1..=MAX_BINS`.
pub fn build_histogram(values: &[f64], spec: Option<&SpecLimits>, bins: usize) -> Histogram {
    let valid: Vec<f64> = values.iter().copied().filter(|v| is_valid(*v)).collect();
    let Some(&first) = valid.first() else {
        return Histogram::default();
    };

    let (min, max) = valid
        .iter()
        .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    if min == max {
        return Histogram {
            bins: vec![HistogramBin {
                bin_start: min,
                bin_end: min,
                count: valid.len(),
            }],
            range_min: min,
            range_max: max,
        };
    }

    let (range_min, range_max) = match spec {
        Some(spec) => (
            min.min(spec.lsl - WARNING_BAND),
            max.max(spec.usl + WARNING_BAND),
        ),
        None => (min, max),
    };

    let bins = bins.clamp(1, MAX_BINS);
    let width = (range_max - range_min) / bins as f64;

    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            bin_start: range_min + i as f64 * width,
            bin_end: range_min + (i + 1) as f64 * width,
            count: 0,
        })
        .collect();

    for v in valid {
        let idx = (((v - range_min) / width).floor() as usize).min(bins - 1);
        out[idx].count += 1;
    }

    Histogram {
        bins: out,
        range_min,
        range_max,
    }
}
