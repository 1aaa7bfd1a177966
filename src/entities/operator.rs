//! Operator roster

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A person allowed to sign off batch steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub name: String,
    pub added: DateTime<Utc>,
}

impl Operator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            added: Utc::now(),
        }
    }

    /// Case-insensitive name match
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}
