//! Batch workflow engine
//!
//! Drives a batch through its steps on a machine, keeping the batch and
//! machine documents in step with each other. Also owns the preload queue
//! and the operator roster, since both feed batch starts.

use chrono::Utc;
use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::progress::{BatchProgress, ProgressError, WorkflowStep};
use crate::core::spc::{classify_with_band, SpecLimits, SpecStatus, WARNING_BAND};
use crate::core::store::{Store, StoreError};
use crate::entities::{
    Batch, Checklist, CoilSample, LoadingSheet, Machine, MeasurementRecord, MicroscopeChecks,
    Operator, Product, QueuedBatch, TestResult, TestType,
};

/// Readings per coil unless configured otherwise
pub const DEFAULT_POSITIONS: usize = 3;

#[derive(Debug, Error, Diagnostic)]
pub enum WorkflowError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Progress(#[from] ProgressError),

    #[error("Machine '{machine}' is running batch {batch}")]
    #[diagnostic(
        code(coilqc::workflow::machine_busy),
        help("Finish the batch or run 'coilqc batch clear {machine}'")
    )]
    MachineBusy { machine: String, batch: String },

    #[error("Machine '{machine}' has no active batch")]
    #[diagnostic(
        code(coilqc::workflow::no_batch),
        help("Start one with 'coilqc batch start'")
    )]
    NoActiveBatch { machine: String },

    #[error("Batch {batch} already exists")]
    #[diagnostic(code(coilqc::workflow::batch_exists))]
    BatchExists { batch: String },

    #[error("Batch {batch} is in the preload queue")]
    #[diagnostic(
        code(coilqc::workflow::batch_queued),
        help("Start it with 'coilqc batch start {batch} --from-queue --machine <machine>'")
    )]
    BatchQueued { batch: String },

    #[error("Queued batch {batch} is assigned to machine '{assigned}'")]
    #[diagnostic(
        code(coilqc::workflow::queued_elsewhere),
        help("Transfer it first with 'coilqc queue transfer {batch} <machine>'")
    )]
    QueuedElsewhere { batch: String, assigned: String },

    #[error("{step} is already complete for batch {batch}")]
    #[diagnostic(code(coilqc::workflow::step_done))]
    StepAlreadyDone { step: WorkflowStep, batch: String },

    #[error("A {test_type} test is not allowed now; {reason}")]
    #[diagnostic(code(coilqc::workflow::test_sequence))]
    TestOutOfSequence {
        test_type: TestType,
        reason: &'static str,
    },

    #[error("{kind} checklist is incomplete; unchecked: {missing}")]
    #[diagnostic(code(coilqc::workflow::checklist_incomplete))]
    ChecklistIncomplete { kind: &'static str, missing: String },

    #[error("Product '{sku}' has no processed height limits")]
    #[diagnostic(
        code(coilqc::workflow::missing_spec),
        help("Set them with 'coilqc product new {sku} --processed-height usl,target,lsl --force'")
    )]
    MissingSpec { sku: String },

    #[error("Expected {expected} readings for the {coil} coil, got {actual}")]
    #[diagnostic(code(coilqc::workflow::reading_count))]
    ReadingCount {
        coil: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Operator '{name}' is not on the roster")]
    #[diagnostic(
        code(coilqc::workflow::unknown_operator),
        help("Add them with 'coilqc operator add' or pick one from 'coilqc operator list'")
    )]
    UnknownOperator { name: String },

    #[error("Operator '{name}' already exists")]
    #[diagnostic(code(coilqc::workflow::operator_exists))]
    OperatorExists { name: String },

    #[error("{0}")]
    #[diagnostic(code(coilqc::workflow::invalid_input))]
    InvalidInput(String),
}

pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;

/// Readings entered on a test sheet
///
/// Values are dial-indicator differences from the product's reference
/// block, one per coil position. `None` marks a missing reading.
#[derive(Debug, Clone)]
pub struct TestInput {
    pub test_type: TestType,
    pub operator: String,
    pub top_diffs: Vec<Option<f64>>,
    pub bottom_diffs: Vec<Option<f64>>,
    /// Required for initial tests, ignored otherwise
    pub microscope: Option<MicroscopeChecks>,
}

/// Result of recording a test sheet
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub record: MeasurementRecord,
    pub spec: SpecLimits,
    pub top_status: Vec<Option<SpecStatus>>,
    pub bottom_status: Vec<Option<SpecStatus>>,
    /// Step completed by this test, if any
    pub completed: Option<WorkflowStep>,
}

/// Batch, queue and operator operations over a [`Store`]
pub struct BatchWorkflow<'a, S: Store + ?Sized> {
    store: &'a mut S,
    warning_band: f64,
    positions: usize,
}

impl<'a, S: Store + ?Sized> BatchWorkflow<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self {
            store,
            warning_band: WARNING_BAND,
            positions: DEFAULT_POSITIONS,
        }
    }

    pub fn with_warning_band(mut self, band: f64) -> Self {
        self.warning_band = band;
        self
    }

    pub fn with_coil_positions(mut self, positions: usize) -> Self {
        self.positions = positions.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &*self.store
    }

    // ---------------------------------------------------------------------
    // Batch lifecycle
    // ---------------------------------------------------------------------

    /// Start a new batch on an idle machine
    pub fn start_batch(
        &mut self,
        batch_number: &str,
        sku: &str,
        machine: &str,
        pre: bool,
    ) -> WorkflowResult<Batch> {
        let mut machine_doc = self.idle_machine(machine)?;
        self.store.require_product(sku)?;
        self.ensure_new_batch(batch_number)?;
        if self.store.queued(batch_number)?.is_some() {
            return Err(WorkflowError::BatchQueued {
                batch: batch_number.to_string(),
            });
        }

        let batch = Batch::new(batch_number, sku, machine, pre);
        self.store.save_batch(&batch)?;
        machine_doc.assign(batch_number, pre, batch.progress);
        self.store.save_machine(&machine_doc)?;

        info!(batch = batch_number, sku, machine, "batch started");
        Ok(batch)
    }

    /// Start a preloaded batch, carrying over its loading sheet
    pub fn start_from_queue(&mut self, batch_number: &str, machine: &str) -> WorkflowResult<Batch> {
        let queued = self
            .store
            .queued(batch_number)?
            .ok_or_else(|| StoreError::NotFound {
                kind: "queued batch",
                key: batch_number.to_string(),
            })?;
        if !queued.available_for(machine) {
            return Err(WorkflowError::QueuedElsewhere {
                batch: batch_number.to_string(),
                assigned: queued.machine.clone().unwrap_or_default(),
            });
        }

        let mut machine_doc = self.idle_machine(machine)?;
        self.store.require_product(&queued.sku)?;
        self.ensure_new_batch(batch_number)?;

        let mut batch = Batch::new(batch_number, &queued.sku, machine, true);
        batch.loading_sheet = Some(queued.loading_sheet());
        batch.progress.complete(WorkflowStep::LoadingSheet)?;

        self.store.save_batch(&batch)?;
        machine_doc.assign(batch_number, true, batch.progress);
        self.store.save_machine(&machine_doc)?;
        self.store.remove_queued(batch_number)?;

        info!(batch = batch_number, machine, "batch started from preload queue");
        Ok(batch)
    }

    /// Record the loading sheet for the machine's active batch
    pub fn save_loading_sheet(
        &mut self,
        machine: &str,
        operator: &str,
        coils: Vec<CoilSample>,
    ) -> WorkflowResult<LoadingSheet> {
        let (mut machine_doc, mut batch) = self.active(machine)?;
        let operator = self.resolve_operator(operator)?;
        validate_coils(&coils)?;
        self.ensure_pending(&batch, WorkflowStep::LoadingSheet)?;

        let sheet = LoadingSheet::new(operator, coils);
        batch.loading_sheet = Some(sheet.clone());
        self.advance(&mut machine_doc, &mut batch, WorkflowStep::LoadingSheet)?;
        Ok(sheet)
    }

    /// Sign off the preflight checklist
    pub fn complete_preflight(&mut self, machine: &str, checklist: Checklist) -> WorkflowResult<()> {
        let (mut machine_doc, mut batch) = self.active(machine)?;
        self.ensure_pending(&batch, WorkflowStep::PreflightChecklist)?;
        ensure_checklist_complete("Preflight", &checklist)?;

        batch.preflight_checklist = Some(checklist);
        self.advance(&mut machine_doc, &mut batch, WorkflowStep::PreflightChecklist)
    }

    /// Record a test sheet against the machine's active batch
    ///
    /// Differences are converted to actual heights using the product's
    /// reference block. The test passes only if every reading is present and
    /// classified good; an initial test also needs both microscope checks.
    /// Initial and final tests complete their step whatever the result.
    pub fn record_test(&mut self, machine: &str, input: TestInput) -> WorkflowResult<TestOutcome> {
        let (mut machine_doc, mut batch) = self.active(machine)?;
        let operator = self.resolve_operator(&input.operator)?;

        let step = match input.test_type {
            TestType::Initial => Some(WorkflowStep::InitialTest),
            TestType::Final => Some(WorkflowStep::FinalTest),
            TestType::Regular => None,
        };
        match step {
            Some(step) => self.ensure_pending(&batch, step)?,
            None => ensure_regular_allowed(&batch.progress)?,
        }

        for (coil, diffs) in [("top", &input.top_diffs), ("bottom", &input.bottom_diffs)] {
            if diffs.len() != self.positions {
                return Err(WorkflowError::ReadingCount {
                    coil,
                    expected: self.positions,
                    actual: diffs.len(),
                });
            }
        }

        let product = self.store.require_product(&batch.sku)?;
        let spec = product
            .processed_height()
            .ok_or_else(|| WorkflowError::MissingSpec {
                sku: batch.sku.clone(),
            })?;

        let top_coil = actual_heights(&product, &input.top_diffs);
        let bottom_coil = actual_heights(&product, &input.bottom_diffs);
        let top_status = self.classify_all(&top_coil, &spec);
        let bottom_status = self.classify_all(&bottom_coil, &spec);

        let readings_good = top_status
            .iter()
            .chain(bottom_status.iter())
            .all(|s| *s == Some(SpecStatus::Good));

        let microscope_checks = match input.test_type {
            TestType::Initial => Some(input.microscope.unwrap_or_default()),
            _ => None,
        };
        let microscope_ok = microscope_checks.map_or(true, |m| m.passed());

        let result = if readings_good && microscope_ok {
            TestResult::Pass
        } else {
            TestResult::Fail
        };

        let record = MeasurementRecord {
            id: MeasurementRecord::new_id(),
            batch: batch.batch_number.clone(),
            machine: machine.to_string(),
            sku: batch.sku.clone(),
            operator,
            test_type: input.test_type,
            result,
            top_coil,
            bottom_coil,
            microscope_checks,
            created: Utc::now(),
        };
        self.store.add_measurement(&record)?;
        info!(
            batch = %record.batch,
            test = %record.test_type,
            result = %record.result,
            id = %record.id,
            "test recorded"
        );

        if let Some(step) = step {
            self.advance(&mut machine_doc, &mut batch, step)?;
        }

        Ok(TestOutcome {
            record,
            spec,
            top_status,
            bottom_status,
            completed: step,
        })
    }

    /// Sign off the final checklist, completing the batch and freeing the machine
    pub fn complete_final_checklist(
        &mut self,
        machine: &str,
        checklist: Checklist,
    ) -> WorkflowResult<Batch> {
        let (mut machine_doc, mut batch) = self.active(machine)?;
        self.ensure_pending(&batch, WorkflowStep::FinalChecklist)?;
        ensure_checklist_complete("Final", &checklist)?;

        batch.progress.complete(WorkflowStep::FinalChecklist)?;
        batch.final_checklist = Some(checklist);
        batch.is_active = false;
        batch.completed_at = Some(Utc::now());
        self.store.save_batch(&batch)?;

        machine_doc.clear();
        self.store.save_machine(&machine_doc)?;

        info!(batch = %batch.batch_number, machine, "batch completed");
        Ok(batch)
    }

    /// Abandon the machine's batch, if any, and return the machine to idle
    ///
    /// The batch keeps its recorded data but is no longer active. Returns the
    /// abandoned batch number.
    pub fn clear_machine(&mut self, machine: &str) -> WorkflowResult<Option<String>> {
        let mut machine_doc = self.store.require_machine(machine)?;
        let abandoned = machine_doc.current_batch.clone();

        if let Some(number) = &abandoned {
            if let Some(mut batch) = self.store.batch(number)? {
                if batch.is_active {
                    batch.is_active = false;
                    self.store.save_batch(&batch)?;
                }
            }
        }

        machine_doc.clear();
        self.store.save_machine(&machine_doc)?;
        info!(machine, batch = ?abandoned, "machine cleared");
        Ok(abandoned)
    }

    /// The batch currently running on `machine`
    pub fn active_batch(&self, machine: &str) -> WorkflowResult<Option<Batch>> {
        let machine_doc = self.store.require_machine(machine)?;
        match machine_doc.current_batch {
            Some(number) => Ok(self.store.batch(&number)?),
            None => Ok(None),
        }
    }

    /// The next pending step on `machine`, `None` when the machine is idle
    pub fn next_step(&self, machine: &str) -> WorkflowResult<Option<WorkflowStep>> {
        Ok(self.active_batch(machine)?.and_then(|b| b.progress.next_step()))
    }

    // ---------------------------------------------------------------------
    // Preload queue
    // ---------------------------------------------------------------------

    /// Add a batch to the preload queue
    pub fn queue_batch(&mut self, mut entry: QueuedBatch) -> WorkflowResult<QueuedBatch> {
        self.ensure_new_batch(&entry.batch_number)?;
        if self.store.queued(&entry.batch_number)?.is_some() {
            return Err(WorkflowError::BatchQueued {
                batch: entry.batch_number.clone(),
            });
        }
        self.store.require_product(&entry.sku)?;
        if let Some(machine) = &entry.machine {
            self.store.require_machine(machine)?;
        }
        entry.operator = self.resolve_operator(&entry.operator)?;
        validate_coils(&entry.coils)?;

        self.store.save_queued(&entry)?;
        info!(batch = %entry.batch_number, sku = %entry.sku, "batch queued");
        Ok(entry)
    }

    /// Queue entries, optionally only those that can run on `machine`
    pub fn queue(&self, machine: Option<&str>) -> WorkflowResult<Vec<QueuedBatch>> {
        let mut entries = self.store.queue()?;
        if let Some(machine) = machine {
            entries.retain(|q| q.available_for(machine));
        }
        entries.sort_by_key(|q| q.created);
        Ok(entries)
    }

    /// Assign a queued batch to a machine
    pub fn transfer(&mut self, batch_number: &str, machine: &str) -> WorkflowResult<QueuedBatch> {
        self.store.require_machine(machine)?;
        let mut entry = self
            .store
            .queued(batch_number)?
            .ok_or_else(|| StoreError::NotFound {
                kind: "queued batch",
                key: batch_number.to_string(),
            })?;
        entry.machine = Some(machine.to_string());
        self.store.save_queued(&entry)?;
        info!(batch = batch_number, machine, "queued batch transferred");
        Ok(entry)
    }

    pub fn remove_queued(&mut self, batch_number: &str) -> WorkflowResult<()> {
        if !self.store.remove_queued(batch_number)? {
            return Err(StoreError::NotFound {
                kind: "queued batch",
                key: batch_number.to_string(),
            }
            .into());
        }
        info!(batch = batch_number, "queued batch removed");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Operators
    // ---------------------------------------------------------------------

    /// Roster sorted by name
    pub fn operators(&self) -> WorkflowResult<Vec<Operator>> {
        let mut operators = self.store.operators()?;
        operators.sort_by_key(|o| o.name.to_lowercase());
        Ok(operators)
    }

    pub fn add_operator(&mut self, name: &str) -> WorkflowResult<Operator> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "Operator name cannot be empty".to_string(),
            ));
        }
        let mut operators = self.operators()?;
        if operators.iter().any(|o| o.matches(name)) {
            return Err(WorkflowError::OperatorExists {
                name: name.to_string(),
            });
        }
        let operator = Operator::new(name);
        operators.push(operator.clone());
        operators.sort_by_key(|o| o.name.to_lowercase());
        self.store.save_operators(&operators)?;
        info!(operator = name, "operator added");
        Ok(operator)
    }

    pub fn remove_operator(&mut self, name: &str) -> WorkflowResult<Operator> {
        let mut operators = self.operators()?;
        let Some(pos) = operators.iter().position(|o| o.matches(name)) else {
            return Err(WorkflowError::UnknownOperator {
                name: name.to_string(),
            });
        };
        let removed = operators.remove(pos);
        self.store.save_operators(&operators)?;
        info!(operator = %removed.name, "operator removed");
        Ok(removed)
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn idle_machine(&self, machine: &str) -> WorkflowResult<Machine> {
        let machine_doc = self.store.require_machine(machine)?;
        if let Some(batch) = &machine_doc.current_batch {
            return Err(WorkflowError::MachineBusy {
                machine: machine.to_string(),
                batch: batch.clone(),
            });
        }
        Ok(machine_doc)
    }

    fn ensure_new_batch(&self, batch_number: &str) -> WorkflowResult<()> {
        if self.store.batch(batch_number)?.is_some() {
            return Err(WorkflowError::BatchExists {
                batch: batch_number.to_string(),
            });
        }
        Ok(())
    }

    fn active(&self, machine: &str) -> WorkflowResult<(Machine, Batch)> {
        let machine_doc = self.store.require_machine(machine)?;
        let Some(number) = machine_doc.current_batch.clone() else {
            return Err(WorkflowError::NoActiveBatch {
                machine: machine.to_string(),
            });
        };
        let batch = self.store.require_batch(&number)?;
        Ok((machine_doc, batch))
    }

    fn ensure_pending(&self, batch: &Batch, step: WorkflowStep) -> WorkflowResult<()> {
        if batch.progress.is_done(step) {
            return Err(WorkflowError::StepAlreadyDone {
                step,
                batch: batch.batch_number.clone(),
            });
        }
        // Surfaces OutOfOrder without touching the stored progress
        let mut pending = batch.progress;
        pending.complete(step)?;
        Ok(())
    }

    /// Complete `step` on the batch and mirror the progress onto the machine
    fn advance(
        &mut self,
        machine: &mut Machine,
        batch: &mut Batch,
        step: WorkflowStep,
    ) -> WorkflowResult<()> {
        batch.progress.complete(step)?;
        self.store.save_batch(batch)?;
        machine.progress = batch.progress;
        machine.touch();
        self.store.save_machine(machine)?;
        info!(batch = %batch.batch_number, machine = %machine.name, %step, "step completed");
        Ok(())
    }

    /// Match against the roster, returning the roster spelling
    ///
    /// An empty roster accepts any non-empty name.
    fn resolve_operator(&self, name: &str) -> WorkflowResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "An operator is required".to_string(),
            ));
        }
        let roster = self.store.operators()?;
        if roster.is_empty() {
            return Ok(name.to_string());
        }
        roster
            .into_iter()
            .find(|o| o.matches(name))
            .map(|o| o.name)
            .ok_or_else(|| WorkflowError::UnknownOperator {
                name: name.to_string(),
            })
    }

    fn classify_all(&self, values: &[Option<f64>], spec: &SpecLimits) -> Vec<Option<SpecStatus>> {
        values
            .iter()
            .map(|v| v.map(|h| classify_with_band(h, spec, self.warning_band)))
            .collect()
    }
}

fn actual_heights(product: &Product, diffs: &[Option<f64>]) -> Vec<Option<f64>> {
    let heights: Vec<Option<f64>> = diffs
        .iter()
        .map(|d| d.and_then(|diff| product.actual_height(diff)))
        .collect();
    if product.reference_block == 0.0 {
        debug!(sku = %product.sku, "reference block not set; readings recorded as missing");
    }
    heights
}

fn ensure_regular_allowed(progress: &BatchProgress) -> WorkflowResult<()> {
    if !progress.is_done(WorkflowStep::InitialTest) {
        return Err(WorkflowError::TestOutOfSequence {
            test_type: TestType::Regular,
            reason: "the initial test has not been recorded",
        });
    }
    if progress.is_done(WorkflowStep::FinalTest) {
        return Err(WorkflowError::TestOutOfSequence {
            test_type: TestType::Regular,
            reason: "the final test has already been recorded",
        });
    }
    Ok(())
}

fn ensure_checklist_complete(kind: &'static str, checklist: &Checklist) -> WorkflowResult<()> {
    let missing = checklist.missing_required();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::ChecklistIncomplete {
            kind,
            missing: missing.join(", "),
        })
    }
}

fn validate_coils(coils: &[CoilSample]) -> WorkflowResult<()> {
    if coils.is_empty() {
        return Err(WorkflowError::InvalidInput(
            "At least one coil measurement is required".to_string(),
        ));
    }
    if let Some(pos) = coils
        .iter()
        .position(|c| !c.height.is_finite() || !c.gauge.is_finite())
    {
        return Err(WorkflowError::InvalidInput(format!(
            "Coil {} is missing its height or gauge",
            pos + 1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{MeasurementQuery, MemoryStore};
    use crate::entities::MachineStatus;

    fn setup() -> MemoryStore {
        let mut store = MemoryStore::new();
        let mut product = Product::new("SKU-1");
        product.reference_block = 2.38;
        product.processed_material.height = SpecLimits::new(2.385, 2.380, 2.375);
        store.save_product(&product).unwrap();
        store.save_machine(&Machine::new("Dakin-1")).unwrap();
        store.save_machine(&Machine::new("Dakin-2")).unwrap();
        store
    }

    fn coils() -> Vec<CoilSample> {
        vec![
            CoilSample { height: 2.381, gauge: 0.028 },
            CoilSample { height: 2.379, gauge: 0.028 },
        ]
    }

    fn checked(mut checklist: Checklist) -> Checklist {
        checklist.check_all();
        checklist
    }

    fn test_input(test_type: TestType, diff: f64) -> TestInput {
        TestInput {
            test_type,
            operator: "Sam".to_string(),
            top_diffs: vec![Some(diff); 3],
            bottom_diffs: vec![Some(diff); 3],
            microscope: Some(MicroscopeChecks {
                tooth_profile: true,
                index_tooth: true,
            }),
        }
    }

    /// Start a batch and run it up to the initial test
    fn through_preflight(wf: &mut BatchWorkflow<'_, MemoryStore>) {
        wf.start_batch("B1", "SKU-1", "Dakin-1", false).unwrap();
        wf.save_loading_sheet("Dakin-1", "Sam", coils()).unwrap();
        wf.complete_preflight("Dakin-1", checked(Checklist::preflight()))
            .unwrap();
    }

    #[test]
    fn test_full_batch_lifecycle() {
        let mut store = setup();
        let mut wf = BatchWorkflow::new(&mut store);
        through_preflight(&mut wf);

        let initial = wf.record_test("Dakin-1", test_input(TestType::Initial, 0.0)).unwrap();
        assert_eq!(initial.record.result, TestResult::Pass);
        assert_eq!(initial.completed, Some(WorkflowStep::InitialTest));

        let regular = wf.record_test("Dakin-1", test_input(TestType::Regular, 0.001)).unwrap();
        assert_eq!(regular.completed, None);

        wf.record_test("Dakin-1", test_input(TestType::Final, 0.0)).unwrap();
        assert_eq!(wf.next_step("Dakin-1").unwrap(), Some(WorkflowStep::FinalChecklist));

        let batch = wf
            .complete_final_checklist("Dakin-1", checked(Checklist::final_checklist()))
            .unwrap();
        assert!(!batch.is_active);
        assert!(batch.completed_at.is_some());
        assert!(batch.progress.is_finished());

        let machine = store.machine("Dakin-1").unwrap().unwrap();
        assert_eq!(machine.status, MachineStatus::Idle);
        assert!(machine.current_batch.is_none());
        assert_eq!(machine.progress, BatchProgress::new());
        assert_eq!(store.measurements(&MeasurementQuery::for_batch("B1")).unwrap().len(), 3);
    }

    #[test]
    fn test_start_requires_idle_machine() {
        let mut store = setup();
        let mut wf = BatchWorkflow::new(&mut store);
        wf.start_batch("B1", "SKU-1", "Dakin-1", false).unwrap();
        let err = wf.start_batch("B2", "SKU-1", "Dakin-1", false).unwrap_err();
        assert!(matches!(err, WorkflowError::MachineBusy { .. }));

        let err = wf.start_batch("B1", "SKU-1", "Dakin-2", false).unwrap_err();
        assert!(matches!(err, WorkflowError::BatchExists { .. }));

        let err = wf.start_batch("B3", "SKU-404", "Dakin-2", false).unwrap_err();
        assert!(matches!(err, WorkflowError::Store(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_steps_must_run_in_order() {
        let mut store = setup();
        let mut wf = BatchWorkflow::new(&mut store);
        wf.start_batch("B1", "SKU-1", "Dakin-1", false).unwrap();

        let err = wf
            .complete_preflight("Dakin-1", checked(Checklist::preflight()))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Progress(ProgressError::OutOfOrder { .. })));

        wf.save_loading_sheet("Dakin-1", "Sam", coils()).unwrap();
        let err = wf.save_loading_sheet("Dakin-1", "Sam", coils()).unwrap_err();
        assert!(matches!(err, WorkflowError::StepAlreadyDone { .. }));
    }

    #[test]
    fn test_incomplete_checklist_rejected() {
        let mut store = setup();
        let mut wf = BatchWorkflow::new(&mut store);
        wf.start_batch("B1", "SKU-1", "Dakin-1", false).unwrap();
        wf.save_loading_sheet("Dakin-1", "Sam", coils()).unwrap();

        let mut checklist = Checklist::preflight();
        checklist.check("batch_sheet");
        let err = wf.complete_preflight("Dakin-1", checklist).unwrap_err();
        match err {
            WorkflowError::ChecklistIncomplete { missing, .. } => {
                assert!(missing.contains("check_angle"));
                assert!(!missing.contains("batch_sheet"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_initial_test_fails_without_microscope_checks() {
        let mut store = setup();
        let mut wf = BatchWorkflow::new(&mut store);
        through_preflight(&mut wf);

        let mut input = test_input(TestType::Initial, 0.0);
        input.microscope = Some(MicroscopeChecks {
            tooth_profile: true,
            index_tooth: false,
        });
        let outcome = wf.record_test("Dakin-1", input).unwrap();
        assert_eq!(outcome.record.result, TestResult::Fail);
        // a failed initial test still completes the step
        assert_eq!(wf.next_step("Dakin-1").unwrap(), Some(WorkflowStep::FinalTest));
    }

    #[test]
    fn test_warning_reading_fails_test() {
        let mut store = setup();
        let mut wf = BatchWorkflow::new(&mut store);
        through_preflight(&mut wf);

        let mut input = test_input(TestType::Initial, 0.0);
        // 2.38 + 0.0048 = 2.3848, inside the warning band below USL
        input.top_diffs[2] = Some(0.0048);
        let outcome = wf.record_test("Dakin-1", input).unwrap();
        assert_eq!(outcome.top_status[2], Some(SpecStatus::Warning));
        assert_eq!(outcome.record.result, TestResult::Fail);
    }

    #[test]
    fn test_missing_reading_fails_test() {
        let mut store = setup();
        let mut wf = BatchWorkflow::new(&mut store);
        through_preflight(&mut wf);

        let mut input = test_input(TestType::Initial, 0.0);
        input.bottom_diffs[0] = None;
        let outcome = wf.record_test("Dakin-1", input).unwrap();
        assert_eq!(outcome.record.bottom_coil[0], None);
        assert_eq!(outcome.record.result, TestResult::Fail);
    }

    #[test]
    fn test_regular_test_sequence() {
        let mut store = setup();
        let mut wf = BatchWorkflow::new(&mut store);
        through_preflight(&mut wf);

        let err = wf
            .record_test("Dakin-1", test_input(TestType::Regular, 0.0))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::TestOutOfSequence { .. }));

        wf.record_test("Dakin-1", test_input(TestType::Initial, 0.0)).unwrap();
        wf.record_test("Dakin-1", test_input(TestType::Final, 0.0)).unwrap();
        let err = wf
            .record_test("Dakin-1", test_input(TestType::Regular, 0.0))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::TestOutOfSequence { .. }));
    }

    #[test]
    fn test_reading_count_checked() {
        let mut store = setup();
        let mut wf = BatchWorkflow::new(&mut store);
        through_preflight(&mut wf);

        let mut input = test_input(TestType::Initial, 0.0);
        input.top_diffs.pop();
        let err = wf.record_test("Dakin-1", input).unwrap_err();
        assert!(matches!(err, WorkflowError::ReadingCount { actual: 2, .. }));
    }

    #[test]
    fn test_clear_machine_abandons_batch() {
        let mut store = setup();
        let mut wf = BatchWorkflow::new(&mut store);
        wf.start_batch("B1", "SKU-1", "Dakin-1", false).unwrap();
        wf.save_loading_sheet("Dakin-1", "Sam", coils()).unwrap();

        assert_eq!(wf.clear_machine("Dakin-1").unwrap().as_deref(), Some("B1"));
        assert_eq!(wf.clear_machine("Dakin-1").unwrap(), None);

        let batch = store.batch("B1").unwrap().unwrap();
        assert!(!batch.is_active);
        assert!(batch.completed_at.is_none());
        assert_eq!(batch.state(), "cleared");
        assert!(store.machine("Dakin-1").unwrap().unwrap().is_idle());
    }

    #[test]
    fn test_queue_start_carries_loading_sheet() {
        let mut store = setup();
        let mut wf = BatchWorkflow::new(&mut store);
        wf.queue_batch(QueuedBatch::new("B7", "SKU-1", "Sam", coils()))
            .unwrap();
        wf.transfer("B7", "Dakin-2").unwrap();

        let err = wf.start_from_queue("B7", "Dakin-1").unwrap_err();
        assert!(matches!(err, WorkflowError::QueuedElsewhere { .. }));

        let batch = wf.start_from_queue("B7", "Dakin-2").unwrap();
        assert!(batch.pre);
        assert!(batch.loading_sheet.is_some());
        assert_eq!(batch.progress.next_step(), Some(WorkflowStep::PreflightChecklist));
        assert!(wf.queue(None).unwrap().is_empty());

        let machine = store.machine("Dakin-2").unwrap().unwrap();
        assert!(machine.pre);
        assert!(machine.progress.is_done(WorkflowStep::LoadingSheet));
    }

    #[test]
    fn test_queue_rejects_bad_entries() {
        let mut store = setup();
        let mut wf = BatchWorkflow::new(&mut store);

        let err = wf
            .queue_batch(QueuedBatch::new("B8", "SKU-1", "Sam", vec![]))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidInput(_)));

        wf.queue_batch(QueuedBatch::new("B8", "SKU-1", "Sam", coils()))
            .unwrap();
        let err = wf
            .queue_batch(QueuedBatch::new("B8", "SKU-1", "Sam", coils()))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::BatchQueued { .. }));

        let err = wf.start_batch("B8", "SKU-1", "Dakin-1", false).unwrap_err();
        assert!(matches!(err, WorkflowError::BatchQueued { .. }));

        wf.remove_queued("B8").unwrap();
        assert!(wf.remove_queued("B8").is_err());
    }

    #[test]
    fn test_operator_roster() {
        let mut store = setup();
        let mut wf = BatchWorkflow::new(&mut store);
        wf.add_operator("Sam").unwrap();
        wf.add_operator("alex").unwrap();
        assert!(matches!(
            wf.add_operator(" sam "),
            Err(WorkflowError::OperatorExists { .. })
        ));

        let names: Vec<String> = wf.operators().unwrap().into_iter().map(|o| o.name).collect();
        assert_eq!(names, vec!["alex", "Sam"]);

        wf.start_batch("B1", "SKU-1", "Dakin-1", false).unwrap();
        let err = wf.save_loading_sheet("Dakin-1", "Jo", coils()).unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownOperator { .. }));
        let sheet = wf.save_loading_sheet("Dakin-1", "SAM", coils()).unwrap();
        assert_eq!(sheet.operator, "Sam");

        wf.remove_operator("ALEX").unwrap();
        assert_eq!(wf.operators().unwrap().len(), 1);
    }
}
