//! Layered configuration
//!
//! Later layers override earlier ones:
//! 1. user config (`<config dir>/coilqc/config.yaml`)
//! 2. project config (`.coilqc/config.yaml`)
//! 3. environment (`COILQC_OPERATOR`)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::project::Project;
use crate::core::spc::{DEFAULT_BINS, MAX_BINS, WARNING_BAND};
use crate::core::workflow::DEFAULT_POSITIONS;

/// Environment variable naming the default operator
pub const OPERATOR_ENV: &str = "COILQC_OPERATOR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Operator recorded on steps when none is given
    pub operator: Option<String>,

    /// Absolute warning distance from each spec limit (inches)
    pub warning_band: Option<f64>,

    pub histogram_bins: Option<usize>,

    pub coil_positions: Option<usize>,
}

impl Config {
    /// Load the merged configuration for the current directory
    ///
    /// Missing or unreadable files are skipped.
    pub fn load() -> Self {
        let user = user_config_path();
        let project = Project::discover().ok().map(|p| p.config_path());
        let mut config = Self::load_from(user.as_deref(), project.as_deref());
        config.apply_env(std::env::var(OPERATOR_ENV).ok());
        config
    }

    /// Merge the given files, skipping any that are absent or invalid
    pub fn load_from(user: Option<&Path>, project: Option<&Path>) -> Self {
        let mut config = Self::default();
        for path in [user, project].into_iter().flatten() {
            if let Some(layer) = Self::read(path) {
                config.merge(layer);
            }
        }
        config
    }

    fn read(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read config");
                return None;
            }
        };
        match serde_yml::from_str::<Self>(&content) {
            Ok(layer) => {
                debug!(path = %path.display(), "loaded config layer");
                Some(layer)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring invalid config");
                None
            }
        }
    }

    fn merge(&mut self, other: Self) {
        if other.operator.is_some() {
            self.operator = other.operator;
        }
        if other.warning_band.is_some() {
            self.warning_band = other.warning_band;
        }
        if other.histogram_bins.is_some() {
            self.histogram_bins = other.histogram_bins;
        }
        if other.coil_positions.is_some() {
            self.coil_positions = other.coil_positions;
        }
    }

    fn apply_env(&mut self, operator: Option<String>) {
        if let Some(op) = operator.filter(|o| !o.trim().is_empty()) {
            self.operator = Some(op.trim().to_string());
        }
    }

    pub fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    pub fn warning_band(&self) -> f64 {
        self.warning_band
            .filter(|b| b.is_finite() && *b >= 0.0)
            .unwrap_or(WARNING_BAND)
    }

    pub fn histogram_bins(&self) -> usize {
        self.histogram_bins
            .filter(|b| *b > 0)
            .map_or(DEFAULT_BINS, |b| b.min(MAX_BINS))
    }

    pub fn coil_positions(&self) -> usize {
        self.coil_positions
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_POSITIONS)
    }
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "coilqc").map(|d| d.config_dir().join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.operator(), None);
        assert_eq!(config.warning_band(), 0.0005);
        assert_eq!(config.histogram_bins(), 20);
        assert_eq!(config.coil_positions(), 3);
    }

    #[test]
    fn test_project_overrides_user() {
        let tmp = tempfile::tempdir().unwrap();
        let user = tmp.path().join("user.yaml");
        let project = tmp.path().join("project.yaml");
        std::fs::write(&user, "operator: Alex\nhistogram_bins: 10\n").unwrap();
        std::fs::write(&project, "operator: Sam\n").unwrap();

        let config = Config::load_from(Some(&user), Some(&project));
        assert_eq!(config.operator(), Some("Sam"));
        assert_eq!(config.histogram_bins(), 10);
    }

    #[test]
    fn test_invalid_file_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = tmp.path().join("bad.yaml");
        std::fs::write(&bad, "histogram_bins: [oops").unwrap();
        let config = Config::load_from(Some(&bad), None);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_env_operator_wins() {
        let mut config = Config {
            operator: Some("Sam".to_string()),
            ..Default::default()
        };
        config.apply_env(Some("  Jo ".to_string()));
        assert_eq!(config.operator(), Some("Jo"));
        config.apply_env(Some(String::new()));
        assert_eq!(config.operator(), Some("Jo"));
    }

    #[test]
    fn test_nonsense_values_fall_back() {
        let config = Config {
            warning_band: Some(-1.0),
            histogram_bins: Some(0),
            coil_positions: Some(0),
            ..Default::default()
        };
        assert_eq!(config.warning_band(), 0.0005);
        assert_eq!(config.histogram_bins(), 20);
        assert_eq!(config.coil_positions(), 3);

        let config = Config {
            histogram_bins: Some(usize::MAX),
            ..Default::default()
        };
        assert_eq!(config.histogram_bins(), MAX_BINS);
    }
}
