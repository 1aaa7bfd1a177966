//! Batch entity - one production run of coil material through a machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Document;
use crate::core::progress::BatchProgress;
use crate::entities::checklist::Checklist;

/// One incoming coil on the loading sheet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoilSample {
    pub height: f64,
    pub gauge: f64,
}

/// Parses `height:gauge`, e.g. `2.381:0.028`
impl std::str::FromStr for CoilSample {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (height, gauge) = s
            .split_once(':')
            .ok_or_else(|| format!("expected 'height:gauge' but got '{}'", s))?;
        let parse = |part: &str, what: &str| {
            crate::core::spc::parse_measurement(part)
                .ok_or_else(|| format!("{} '{}' is not a number", what, part.trim()))
        };
        Ok(Self {
            height: parse(height, "height")?,
            gauge: parse(gauge, "gauge")?,
        })
    }
}

/// Incoming material record filled in before forming starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadingSheet {
    pub operator: String,

    #[serde(default)]
    pub coils: Vec<CoilSample>,

    /// Spread between the tallest and shortest coil (needs two or more coils)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height_difference: Option<f64>,

    pub created: DateTime<Utc>,
}

impl LoadingSheet {
    pub fn new(operator: impl Into<String>, coils: Vec<CoilSample>) -> Self {
        let max_height_difference = max_height_difference(&coils);
        Self {
            operator: operator.into(),
            coils,
            max_height_difference,
            created: Utc::now(),
        }
    }
}

/// Tallest minus shortest coil height, `None` with fewer than two valid heights
pub fn max_height_difference(coils: &[CoilSample]) -> Option<f64> {
    let heights: Vec<f64> = coils
        .iter()
        .map(|c| c.height)
        .filter(|h| h.is_finite())
        .collect();
    if heights.len() < 2 {
        return None;
    }
    let max = heights.iter().copied().fold(f64::MIN, f64::max);
    let min = heights.iter().copied().fold(f64::MAX, f64::min);
    Some(max - min)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// Batch number, also the document key
    pub batch_number: String,

    pub sku: String,

    /// Machine the batch runs on
    pub machine: String,

    /// Started from the preload queue
    #[serde(default)]
    pub pre: bool,

    #[serde(default)]
    pub is_active: bool,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loading_sheet: Option<LoadingSheet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preflight_checklist: Option<Checklist>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_checklist: Option<Checklist>,

    /// Completed steps; kept after the batch finishes as a record
    #[serde(default)]
    pub progress: BatchProgress,
}

impl Batch {
    pub fn new(
        batch_number: impl Into<String>,
        sku: impl Into<String>,
        machine: impl Into<String>,
        pre: bool,
    ) -> Self {
        Self {
            batch_number: batch_number.into(),
            sku: sku.into(),
            machine: machine.into(),
            pre,
            is_active: true,
            started_at: Utc::now(),
            completed_at: None,
            loading_sheet: None,
            preflight_checklist: None,
            final_checklist: None,
            progress: BatchProgress::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Short state word for listings
    pub fn state(&self) -> &'static str {
        if self.is_active {
            "active"
        } else if self.is_completed() {
            "completed"
        } else {
            "cleared"
        }
    }
}

impl Document for Batch {
    const COLLECTION: &'static str = "batches";
    const KIND: &'static str = "batch";

    fn key(&self) -> &str {
        &self.batch_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coil_sample() {
        let coil: CoilSample = "2.381:0.028".parse().unwrap();
        assert_eq!(coil.height, 2.381);
        assert_eq!(coil.gauge, 0.028);
        assert!("2.381".parse::<CoilSample>().is_err());
        assert!("x:0.028".parse::<CoilSample>().is_err());
    }

    #[test]
    fn test_max_height_difference() {
        let coils = vec![
            CoilSample { height: 2.381, gauge: 0.028 },
            CoilSample { height: 2.379, gauge: 0.028 },
            CoilSample { height: 2.3835, gauge: 0.028 },
        ];
        let diff = max_height_difference(&coils).unwrap();
        assert!((diff - 0.0045).abs() < 1e-12);
        assert_eq!(max_height_difference(&coils[..1]), None);
    }

    #[test]
    fn test_batch_state() {
        let mut batch = Batch::new("B1", "SKU-1", "Dakin-1", false);
        assert_eq!(batch.state(), "active");
        batch.is_active = false;
        assert_eq!(batch.state(), "cleared");
        batch.completed_at = Some(Utc::now());
        assert_eq!(batch.state(), "completed");
    }
}
