//! Batch progress state machine
//!
//! A batch moves through five steps in a fixed order. Progress is kept as a
//! single pointer to the last completed step, so a state such as "final test
//! done but initial test not done" cannot be represented. On disk it is
//! still written as one boolean per step.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Workflow steps in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    LoadingSheet,
    PreflightChecklist,
    InitialTest,
    FinalTest,
    FinalChecklist,
}

impl WorkflowStep {
    /// All steps, in order
    pub const ALL: [WorkflowStep; 5] = [
        WorkflowStep::LoadingSheet,
        WorkflowStep::PreflightChecklist,
        WorkflowStep::InitialTest,
        WorkflowStep::FinalTest,
        WorkflowStep::FinalChecklist,
    ];

    fn position(self) -> usize {
        self as usize
    }

    /// The step that follows this one, if any
    pub fn next(self) -> Option<WorkflowStep> {
        Self::ALL.get(self.position() + 1).copied()
    }

    /// Human-readable name for prompts and tables
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowStep::LoadingSheet => "Loading sheet",
            WorkflowStep::PreflightChecklist => "Preflight checklist",
            WorkflowStep::InitialTest => "Initial test",
            WorkflowStep::FinalTest => "Final test",
            WorkflowStep::FinalChecklist => "Final checklist",
        }
    }

    /// The `coilqc batch` subcommand that performs this step
    pub fn command(&self) -> &'static str {
        match self {
            WorkflowStep::LoadingSheet => "batch loading-sheet",
            WorkflowStep::PreflightChecklist => "batch checklist",
            WorkflowStep::InitialTest => "batch test --type initial",
            WorkflowStep::FinalTest => "batch test --type final",
            WorkflowStep::FinalChecklist => "batch final-checklist",
        }
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowStep::LoadingSheet => write!(f, "loading_sheet"),
            WorkflowStep::PreflightChecklist => write!(f, "preflight_checklist"),
            WorkflowStep::InitialTest => write!(f, "initial_test"),
            WorkflowStep::FinalTest => write!(f, "final_test"),
            WorkflowStep::FinalChecklist => write!(f, "final_checklist"),
        }
    }
}

#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum ProgressError {
    #[error("Cannot complete {step} yet: {expected} must be completed first")]
    #[diagnostic(
        code(coilqc::progress::out_of_order),
        help("Run 'coilqc batch next <machine>' to see the pending step")
    )]
    OutOfOrder {
        step: WorkflowStep,
        expected: WorkflowStep,
    },
}

/// On-disk form: one flag per step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressFlags {
    pub loading_sheet: bool,
    pub preflight_checklist: bool,
    pub initial_test: bool,
    pub final_test: bool,
    pub final_checklist: bool,
}

impl ProgressFlags {
    fn as_array(&self) -> [bool; 5] {
        [
            self.loading_sheet,
            self.preflight_checklist,
            self.initial_test,
            self.final_test,
            self.final_checklist,
        ]
    }
}

/// Progress of one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ProgressFlags", into = "ProgressFlags")]
pub struct BatchProgress {
    completed_through: Option<WorkflowStep>,
}

impl BatchProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress with every step up to and including `step` completed
    pub fn completed_through(step: WorkflowStep) -> Self {
        Self {
            completed_through: Some(step),
        }
    }

    pub fn is_done(&self, step: WorkflowStep) -> bool {
        self.completed_through.is_some_and(|last| step <= last)
    }

    /// The first step not yet completed, `None` once everything is done
    pub fn next_step(&self) -> Option<WorkflowStep> {
        match self.completed_through {
            None => Some(WorkflowStep::LoadingSheet),
            Some(last) => last.next(),
        }
    }

    pub fn last_completed(&self) -> Option<WorkflowStep> {
        self.completed_through
    }

    pub fn is_finished(&self) -> bool {
        self.next_step().is_none()
    }

    /// Mark a step complete
    ///
    /// Returns `Ok(true)` when progress advanced and `Ok(false)` when the
    /// step was already done. Completing a step whose predecessor is still
    /// open is an error.
    pub fn complete(&mut self, step: WorkflowStep) -> Result<bool, ProgressError> {
        if self.is_done(step) {
            return Ok(false);
        }
        match self.next_step() {
            Some(expected) if expected == step => {
                self.completed_through = Some(step);
                Ok(true)
            }
            Some(expected) => Err(ProgressError::OutOfOrder { step, expected }),
            None => Ok(false),
        }
    }

    /// Reset every step
    pub fn clear(&mut self) {
        self.completed_through = None;
    }

    pub fn flags(&self) -> ProgressFlags {
        let done = |s| self.is_done(s);
        ProgressFlags {
            loading_sheet: done(WorkflowStep::LoadingSheet),
            preflight_checklist: done(WorkflowStep::PreflightChecklist),
            initial_test: done(WorkflowStep::InitialTest),
            final_test: done(WorkflowStep::FinalTest),
            final_checklist: done(WorkflowStep::FinalChecklist),
        }
    }
}

impl From<ProgressFlags> for BatchProgress {
    fn from(flags: ProgressFlags) -> Self {
        let set = flags.as_array();
        let prefix = set.iter().take_while(|done| **done).count();
        let trailing = set[prefix..].iter().filter(|done| **done).count();
        if trailing > 0 {
            tracing::warn!(
                ?flags,
                "progress flags are out of order; keeping the first {} completed step(s)",
                prefix
            );
        }
        Self {
            completed_through: prefix.checked_sub(1).map(|i| WorkflowStep::ALL[i]),
        }
    }
}

impl From<BatchProgress> for ProgressFlags {
    fn from(progress: BatchProgress) -> Self {
        progress.flags()
    }
}
