//! Checklists signed off before and after a batch run

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl ChecklistItem {
    fn required(id: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            checked: false,
            required: true,
        }
    }
}

/// Which checklist a set of items belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecklistKind {
    Preflight,
    Final,
}

impl std::fmt::Display for ChecklistKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecklistKind::Preflight => write!(f, "preflight"),
            ChecklistKind::Final => write!(f, "final"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checklist {
    pub items: Vec<ChecklistItem>,
}

impl Checklist {
    pub fn for_kind(kind: ChecklistKind) -> Self {
        match kind {
            ChecklistKind::Preflight => Self::preflight(),
            ChecklistKind::Final => Self::final_checklist(),
        }
    }

    /// Machine setup checks done before the first coil is formed
    pub fn preflight() -> Self {
        Self {
            items: vec![
                ChecklistItem::required("batch_sheet", "COMPLETE BATCH SHEET"),
                ChecklistItem::required("check_angle", "CHECK ANGLE (PASSED IM)"),
                ChecklistItem::required("index_set", "INDEX SET (PASSED IM)"),
                ChecklistItem::required("complete_process", "COMPLETE PROCESS SHEET"),
                ChecklistItem::required("tooth_profile", "TOOTH PROFILE SAVED TO M/SCOPE"),
                ChecklistItem::required("check_travel", "CHECK TRAVEL"),
                ChecklistItem::required("speed_set", "SPEED SET"),
                ChecklistItem::required("alarms_set", "ALARMS SET"),
            ],
        }
    }

    /// Sign-off checks that close out a batch
    pub fn final_checklist() -> Self {
        Self {
            items: vec![
                ChecklistItem::required("labels", "LABELS ATTACHED TO COILS"),
                ChecklistItem::required("quality", "FINAL QUALITY CHECK COMPLETED"),
                ChecklistItem::required("documentation", "ALL DOCUMENTATION COMPLETED"),
                ChecklistItem::required("packaging", "PACKAGING REQUIREMENTS MET"),
                ChecklistItem::required("storage", "MOVED TO CORRECT STORAGE LOCATION"),
            ],
        }
    }

    /// Tick an item by id. Returns false if no such item exists.
    pub fn check(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                item.checked = true;
                true
            }
            None => false,
        }
    }

    pub fn check_all(&mut self) {
        for item in &mut self.items {
            item.checked = true;
        }
    }

    /// Ids of required items still unchecked
    pub fn missing_required(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| i.required && !i.checked)
            .map(|i| i.id.clone())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.items.iter().all(|i| !i.required || i.checked)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_start_unchecked() {
        let preflight = Checklist::preflight();
        assert_eq!(preflight.items.len(), 8);
        assert!(!preflight.is_complete());
        assert_eq!(Checklist::final_checklist().missing_required().len(), 5);
    }

    #[test]
    fn test_check_items() {
        let mut list = Checklist::final_checklist();
        assert!(list.check("labels"));
        assert!(!list.check("nope"));
        assert_eq!(
            list.missing_required(),
            vec!["quality", "documentation", "packaging", "storage"]
        );
        list.check_all();
        assert!(list.is_complete());
    }

    #[test]
    fn test_optional_items_do_not_block() {
        let mut list = Checklist {
            items: vec![ChecklistItem {
                id: "coffee".to_string(),
                text: "Coffee".to_string(),
                checked: false,
                required: false,
            }],
        };
        assert!(list.is_complete());
        list.items[0].required = true;
        assert!(!list.is_complete());
    }
}
