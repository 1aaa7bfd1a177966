//! Preloaded batch entity - loading sheet filled in ahead of a machine run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Document;
use crate::entities::batch::{CoilSample, LoadingSheet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    #[default]
    Pending,
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueStatus::Pending => write!(f, "pending"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedBatch {
    /// Batch number, also the document key
    pub batch_number: String,

    pub sku: String,

    pub operator: String,

    #[serde(default)]
    pub coils: Vec<CoilSample>,

    /// Machine the batch is lined up for, if assigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,

    #[serde(default)]
    pub status: QueueStatus,

    pub created: DateTime<Utc>,
}

impl QueuedBatch {
    pub fn new(
        batch_number: impl Into<String>,
        sku: impl Into<String>,
        operator: impl Into<String>,
        coils: Vec<CoilSample>,
    ) -> Self {
        Self {
            batch_number: batch_number.into(),
            sku: sku.into(),
            operator: operator.into(),
            coils,
            machine: None,
            status: QueueStatus::Pending,
            created: Utc::now(),
        }
    }

    /// Loading sheet to attach when the batch starts
    pub fn loading_sheet(&self) -> LoadingSheet {
        let mut sheet = LoadingSheet::new(self.operator.clone(), self.coils.clone());
        sheet.created = self.created;
        sheet
    }

    /// Whether the entry can be started on `machine`
    pub fn available_for(&self, machine: &str) -> bool {
        self.machine.as_deref().map_or(true, |m| m == machine)
    }
}

impl Document for QueuedBatch {
    const COLLECTION: &'static str = "queue";
    const KIND: &'static str = "queued batch";

    fn key(&self) -> &str {
        &self.batch_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_for() {
        let mut queued = QueuedBatch::new("B1", "SKU-1", "Sam", vec![]);
        assert!(queued.available_for("Dakin-1"));
        queued.machine = Some("Dakin-2".to_string());
        assert!(!queued.available_for("Dakin-1"));
        assert!(queued.available_for("Dakin-2"));
    }

    #[test]
    fn test_loading_sheet_keeps_coils() {
        let coils = vec![
            CoilSample { height: 2.38, gauge: 0.028 },
            CoilSample { height: 2.382, gauge: 0.028 },
        ];
        let queued = QueuedBatch::new("B1", "SKU-1", "Sam", coils);
        let sheet = queued.loading_sheet();
        assert_eq!(sheet.operator, "Sam");
        assert_eq!(sheet.coils.len(), 2);
        assert!(sheet.max_height_difference.is_some());
        assert_eq!(sheet.created, queued.created);
    }
}
