//! Per-SKU quality analysis over stored measurement records

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::spc::{calculate_stats, CapabilityIndices, DescriptiveStats, SpecLimits};
use crate::core::store::{MeasurementQuery, Store, StoreResult};
use crate::entities::MeasurementRecord;

/// Statistics for one side of the coil pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoilSummary {
    pub stats: DescriptiveStats,
    /// Only present when the product has processed-height limits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<CapabilityIndices>,
}

impl CoilSummary {
    fn from_values(values: &[f64], spec: Option<&SpecLimits>) -> Self {
        let stats = calculate_stats(values);
        let capability = spec.map(|s| CapabilityIndices::from_stats(&stats, Some(s.usl), Some(s.lsl)));
        Self { stats, capability }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcAnalysis {
    pub sku: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,

    /// Number of measurement records analysed
    pub total_measurements: usize,

    pub top_coil: CoilSummary,

    pub bottom_coil: CoilSummary,

    /// Fraction of records that passed, 0 when there are none
    pub pass_rate: f64,

    /// Distinct batches among the records
    pub batch_count: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specifications: Option<SpecLimits>,
}

impl QcAnalysis {
    /// Analyse the records belonging to `sku` (and `batch`, when given)
    ///
    /// Records for other SKUs or batches are ignored, so callers may pass an
    /// unfiltered slice.
    pub fn from_records(
        sku: &str,
        batch: Option<&str>,
        records: &[MeasurementRecord],
        spec: Option<SpecLimits>,
    ) -> Self {
        let selected: Vec<&MeasurementRecord> = records
            .iter()
            .filter(|r| r.sku == sku)
            .filter(|r| batch.map_or(true, |b| r.batch == b))
            .collect();

        let top: Vec<f64> = selected.iter().flat_map(|r| r.top_heights()).collect();
        let bottom: Vec<f64> = selected.iter().flat_map(|r| r.bottom_heights()).collect();

        let passed = selected.iter().filter(|r| r.passed()).count();
        let pass_rate = if selected.is_empty() {
            0.0
        } else {
            passed as f64 / selected.len() as f64
        };

        let batch_count = selected
            .iter()
            .map(|r| r.batch.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        Self {
            sku: sku.to_string(),
            batch: batch.map(str::to_string),
            total_measurements: selected.len(),
            top_coil: CoilSummary::from_values(&top, spec.as_ref()),
            bottom_coil: CoilSummary::from_values(&bottom, spec.as_ref()),
            pass_rate,
            batch_count,
            specifications: spec,
        }
    }

    /// Every valid height from both coil sides, top first
    pub fn all_heights(&self) -> Vec<f64> {
        let mut values = self.top_coil.stats.measurements.clone();
        values.extend_from_slice(&self.bottom_coil.stats.measurements);
        values
    }
}

/// Load the processed-height spec and matching records, then analyse them
///
/// An unknown SKU is an error; a SKU without configured limits is analysed
/// without capability indices.
pub fn analyze_sku<S: Store + ?Sized>(
    store: &S,
    sku: &str,
    batch: Option<&str>,
) -> StoreResult<QcAnalysis> {
    let product = store.require_product(sku)?;
    let query = MeasurementQuery {
        sku: Some(sku.to_string()),
        batch: batch.map(str::to_string),
        test_type: None,
    };
    let records = store.measurements(&query)?;
    Ok(QcAnalysis::from_records(
        sku,
        batch,
        &records,
        product.processed_height(),
    ))
}
