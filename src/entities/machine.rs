//! Machine entity - a coil-forming machine and the batch running on it

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Document;
use crate::core::progress::BatchProgress;

/// Machine activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    #[default]
    Idle,
    Active,
}

impl std::fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MachineStatus::Idle => write!(f, "idle"),
            MachineStatus::Active => write!(f, "active"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    /// Machine name, also the document key
    pub name: String,

    #[serde(default)]
    pub status: MachineStatus,

    /// Batch currently running, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_batch: Option<String>,

    /// Whether the current batch was started from the preload queue
    #[serde(default)]
    pub pre: bool,

    /// Progress of the current batch
    #[serde(default)]
    pub progress: BatchProgress,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Machine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: MachineStatus::Idle,
            current_batch: None,
            pre: false,
            progress: BatchProgress::new(),
            last_updated: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == MachineStatus::Idle
    }

    /// Attach a freshly started batch
    pub fn assign(&mut self, batch_number: &str, pre: bool, progress: BatchProgress) {
        self.status = MachineStatus::Active;
        self.current_batch = Some(batch_number.to_string());
        self.pre = pre;
        self.progress = progress;
        self.touch();
    }

    /// Return to idle with progress reset
    ///
    /// All fields change together so the machine is written in one update.
    pub fn clear(&mut self) {
        self.status = MachineStatus::Idle;
        self.current_batch = None;
        self.pre = false;
        self.progress.clear();
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_updated = Some(Utc::now());
    }
}

impl Document for Machine {
    const COLLECTION: &'static str = "machines";
    const KIND: &'static str = "machine";

    fn key(&self) -> &str {
        &self.name
    }
}
