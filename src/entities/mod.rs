//! Entity type definitions

pub mod batch;
pub mod checklist;
pub mod machine;
pub mod measurement;
pub mod operator;
pub mod product;
pub mod queue;

pub use batch::{Batch, CoilSample, LoadingSheet};
pub use checklist::{Checklist, ChecklistItem, ChecklistKind};
pub use machine::{Machine, MachineStatus};
pub use measurement::{MeasurementRecord, MicroscopeChecks, TestResult, TestType};
pub use operator::Operator;
pub use product::{Dimension, MaterialSpecs, MaterialStage, Product};
pub use queue::{QueueStatus, QueuedBatch};
