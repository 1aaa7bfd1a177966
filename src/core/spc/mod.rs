//! Statistical process control
//!
//! Stateless computations over in-memory measurement sets. Only
//! [`analyze_sku`] reads from a store, and it takes the store as an argument.

pub mod analysis;
pub mod capability;
pub mod classify;
pub mod control;
pub mod histogram;
pub mod stats;

pub use analysis::{analyze_sku, CoilSummary, QcAnalysis};
pub use capability::{calculate_capability_indices, CapabilityIndices};
pub use classify::{classify_with_band, is_within_spec, SpecLimits, SpecStatus};
pub use control::{build_control_chart, ControlChart, ControlLimits, ControlPoint};
pub use histogram::{build_histogram, Histogram, HistogramBin, DEFAULT_BINS, MAX_BINS};
pub use stats::{calculate_stats, parse_measurement, DescriptiveStats};

/// Absolute distance (inches) from a spec limit inside which a reading is
/// flagged as a warning. Also the padding applied around spec limits when
/// sizing histograms.
pub const WARNING_BAND: f64 = 0.0005;
