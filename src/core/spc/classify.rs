//! Per-reading classification against specification limits

use serde::{Deserialize, Serialize};

use super::WARNING_BAND;

/// Upper limit, target and lower limit for one dimension
///
/// `lsl <= target <= usl` is expected but not checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecLimits {
    pub usl: f64,
    pub target: f64,
    pub lsl: f64,
}

impl SpecLimits {
    pub fn new(usl: f64, target: f64, lsl: f64) -> Self {
        Self { usl, target, lsl }
    }

    /// Both limits set (a zero limit means the spec was left blank)
    pub fn is_configured(&self) -> bool {
        self.usl.is_finite() && self.lsl.is_finite() && self.usl != 0.0 && self.lsl != 0.0
    }

    /// Total tolerance width
    pub fn tolerance(&self) -> f64 {
        self.usl - self.lsl
    }

    /// Whether any value can classify as good with the given warning band
    ///
    /// With an absolute band, a tolerance of `2 * band` or less leaves no
    /// good zone at all.
    pub fn good_zone_reachable(&self, band: f64) -> bool {
        (self.usl - band) - (self.lsl + band) > 1e-12
    }
}

impl std::fmt::Display for SpecLimits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "LSL {:.4} / target {:.4} / USL {:.4}",
            self.lsl, self.target, self.usl
        )
    }
}

/// Parses `usl,target,lsl`
impl std::str::FromStr for SpecLimits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(format!(
                "expected 'usl,target,lsl' but got {} value(s)",
                parts.len()
            ));
        }
        let mut values = [0.0; 3];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("'{}' is not a finite number", part))?;
        }
        Ok(Self::new(values[0], values[1], values[2]))
    }
}

/// Classification tier for a single reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecStatus {
    Good,
    Warning,
    Error,
}

impl SpecStatus {
    pub fn message(&self) -> &'static str {
        match self {
            SpecStatus::Good => "Within specification",
            SpecStatus::Warning => "Near specification limit",
            SpecStatus::Error => "Outside specification",
        }
    }
}

impl std::fmt::Display for SpecStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpecStatus::Good => write!(f, "good"),
            SpecStatus::Warning => write!(f, "warning"),
            SpecStatus::Error => write!(f, "error"),
        }
    }
}

/// Classify a reading using the standard 0.0005" warning band
pub fn is_within_spec(value: f64, spec: &SpecLimits) -> SpecStatus {
    classify_with_band(value, spec, WARNING_BAND)
}

/// Classify a reading with an explicit warning band
///
/// Limits are inclusive: a reading exactly at USL is a warning, not an error.
pub fn classify_with_band(value: f64, spec: &SpecLimits, band: f64) -> SpecStatus {
    if value.is_nan() || value > spec.usl || value < spec.lsl {
        return SpecStatus::Error;
    }
    if value >= spec.usl - band || value <= spec.lsl + band {
        return SpecStatus::Warning;
    }
    SpecStatus::Good
}
