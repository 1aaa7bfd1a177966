//! Process capability indices (Cp, Cpk)
//!
//! Both limits are required. A limit of exactly `0.0` is treated the same as
//! a missing one, since unset limits are stored as zero in product documents.

use serde::{Deserialize, Serialize};

use super::stats::DescriptiveStats;

/// Capability indices for one measurement set
///
/// Every field is `None` when the indices are undefined (zero spread or a
/// missing limit). Values are not rounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityIndices {
    /// (USL - LSL) / 6σ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cp: Option<f64>,
    /// min(Cpu, Cpl)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpk: Option<f64>,
    /// (USL - mean) / 3σ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    /// (mean - LSL) / 3σ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpl: Option<f64>,
}

impl CapabilityIndices {
    /// True when the indices could not be computed
    pub fn is_undefined(&self) -> bool {
        self.cp.is_none() && self.cpk.is_none()
    }

    /// Compute indices from a stats record
    pub fn from_stats(stats: &DescriptiveStats, usl: Option<f64>, lsl: Option<f64>) -> Self {
        calculate_capability_indices(stats.mean, stats.std_dev, usl, lsl)
    }
}

fn configured(limit: Option<f64>) -> Option<f64> {
    limit.filter(|l| *l != 0.0 && l.is_finite())
}

/// Compute Cp and Cpk (with the one-sided Cpu/Cpl they derive from)
pub fn calculate_capability_indices(
    mean: f64,
    std_dev: f64,
    usl: Option<f64>,
    lsl: Option<f64>,
) -> CapabilityIndices {
    let (Some(usl), Some(lsl)) = (configured(usl), configured(lsl)) else {
        return CapabilityIndices::default();
    };
    if std_dev == 0.0 || !std_dev.is_finite() {
        return CapabilityIndices::default();
    }

    let cp = (usl - lsl) / (6.0 * std_dev);
    let cpu = (usl - mean) / (3.0 * std_dev);
    let cpl = (mean - lsl) / (3.0 * std_dev);

    CapabilityIndices {
        cp: Some(cp),
        cpk: Some(cpu.min(cpl)),
        cpu: Some(cpu),
        cpl: Some(cpl),
    }
}
