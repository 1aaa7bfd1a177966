//! Measurement entity - one test sheet taken during a batch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Document;

/// Prefix of measurement document keys
pub const MEASUREMENT_PREFIX: &str = "MEAS";

/// Kind of test sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    /// First-off test; completes the initial test step
    Initial,
    /// In-process check between the initial and final tests
    Regular,
    /// Last-off test; completes the final test step
    Final,
}

impl std::fmt::Display for TestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestType::Initial => write!(f, "initial"),
            TestType::Regular => write!(f, "regular"),
            TestType::Final => write!(f, "final"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    Pass,
    Fail,
}

impl std::fmt::Display for TestResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestResult::Pass => write!(f, "pass"),
            TestResult::Fail => write!(f, "fail"),
        }
    }
}

/// Microscope checks recorded on the initial test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroscopeChecks {
    #[serde(default)]
    pub tooth_profile: bool,
    #[serde(default)]
    pub index_tooth: bool,
}

impl MicroscopeChecks {
    pub fn passed(&self) -> bool {
        self.tooth_profile && self.index_tooth
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// `MEAS-<ULID>`
    pub id: String,

    pub batch: String,

    pub machine: String,

    pub sku: String,

    pub operator: String,

    pub test_type: TestType,

    pub result: TestResult,

    /// Actual heights per position on the top coil; `None` where the
    /// reading was missing
    #[serde(default)]
    pub top_coil: Vec<Option<f64>>,

    #[serde(default)]
    pub bottom_coil: Vec<Option<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microscope_checks: Option<MicroscopeChecks>,

    pub created: DateTime<Utc>,
}

impl MeasurementRecord {
    /// Generate a new measurement key
    pub fn new_id() -> String {
        format!("{}-{}", MEASUREMENT_PREFIX, ulid::Ulid::new())
    }

    /// Valid top coil heights, in position order
    pub fn top_heights(&self) -> impl Iterator<Item = f64> + '_ {
        self.top_coil.iter().flatten().copied().filter(|h| h.is_finite())
    }

    pub fn bottom_heights(&self) -> impl Iterator<Item = f64> + '_ {
        self.bottom_coil
            .iter()
            .flatten()
            .copied()
            .filter(|h| h.is_finite())
    }

    pub fn passed(&self) -> bool {
        self.result == TestResult::Pass
    }
}

impl Document for MeasurementRecord {
    const COLLECTION: &'static str = "measurements";
    const KIND: &'static str = "measurement";

    fn key(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> MeasurementRecord {
        MeasurementRecord {
            id: MeasurementRecord::new_id(),
            batch: "B1".to_string(),
            machine: "Dakin-1".to_string(),
            sku: "SKU-1".to_string(),
            operator: "Sam".to_string(),
            test_type: TestType::Initial,
            result: TestResult::Pass,
            top_coil: vec![Some(2.38), None, Some(f64::NAN)],
            bottom_coil: vec![Some(2.381), Some(2.379), Some(2.380)],
            microscope_checks: Some(MicroscopeChecks {
                tooth_profile: true,
                index_tooth: true,
            }),
            created: Utc::now(),
        }
    }

    #[test]
    fn test_new_id_has_prefix() {
        let id = MeasurementRecord::new_id();
        assert!(id.starts_with("MEAS-"));
        assert_eq!(id.len(), 5 + 26);
    }

    #[test]
    fn test_heights_skip_missing_and_invalid() {
        let r = record();
        assert_eq!(r.top_heights().collect::<Vec<_>>(), vec![2.38]);
        assert_eq!(r.bottom_heights().count(), 3);
    }

    #[test]
    fn test_missing_readings_serialize_as_null() {
        let mut r = record();
        r.top_coil = vec![Some(2.38), None];
        let yaml = serde_yml::to_string(&r).unwrap();
        let back: MeasurementRecord = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(back.top_coil, vec![Some(2.38), None]);
    }
}
