//! Filter enums shared by list commands

use clap::ValueEnum;

use crate::entities::{Batch, TestType};

/// Batch state filter for `batch list`
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum BatchStateFilter {
    /// Running on a machine
    Active,
    /// Final checklist signed off
    Completed,
    /// Abandoned with `batch clear`
    Cleared,
    /// Completed or cleared
    Closed,
    #[default]
    All,
}

impl BatchStateFilter {
    pub fn matches(&self, batch: &Batch) -> bool {
        match self {
            BatchStateFilter::Active => batch.is_active,
            BatchStateFilter::Completed => batch.is_completed(),
            BatchStateFilter::Cleared => !batch.is_active && !batch.is_completed(),
            BatchStateFilter::Closed => !batch.is_active,
            BatchStateFilter::All => true,
        }
    }
}

impl std::fmt::Display for BatchStateFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchStateFilter::Active => write!(f, "active"),
            BatchStateFilter::Completed => write!(f, "completed"),
            BatchStateFilter::Cleared => write!(f, "cleared"),
            BatchStateFilter::Closed => write!(f, "closed"),
            BatchStateFilter::All => write!(f, "all"),
        }
    }
}

/// CLI-friendly test type
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CliTestType {
    Initial,
    Regular,
    Final,
}

impl From<CliTestType> for TestType {
    fn from(cli: CliTestType) -> Self {
        match cli {
            CliTestType::Initial => TestType::Initial,
            CliTestType::Regular => TestType::Regular,
            CliTestType::Final => TestType::Final,
        }
    }
}

/// Which coil readings a chart or table covers
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum CoilSide {
    Top,
    Bottom,
    #[default]
    Both,
}

impl std::fmt::Display for CoilSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoilSide::Top => write!(f, "top"),
            CoilSide::Bottom => write!(f, "bottom"),
            CoilSide::Both => write!(f, "both"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_batch_state_filter() {
        let mut batch = Batch::new("B1", "SKU-1", "Dakin-1", false);
        assert!(BatchStateFilter::Active.matches(&batch));
        assert!(!BatchStateFilter::Closed.matches(&batch));

        batch.is_active = false;
        assert!(BatchStateFilter::Cleared.matches(&batch));
        assert!(!BatchStateFilter::Completed.matches(&batch));

        batch.completed_at = Some(Utc::now());
        assert!(BatchStateFilter::Completed.matches(&batch));
        assert!(!BatchStateFilter::Cleared.matches(&batch));
        assert!(BatchStateFilter::Closed.matches(&batch));
        assert!(BatchStateFilter::All.matches(&batch));
    }
}
