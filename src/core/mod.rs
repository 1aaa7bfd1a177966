//! Core module - domain logic, persistence and configuration

pub mod config;
pub mod entity;
pub mod progress;
pub mod project;
pub mod spc;
pub mod store;
pub mod workflow;

pub use config::Config;
pub use entity::Document;
pub use progress::{BatchProgress, ProgressError, WorkflowStep};
pub use project::{Project, ProjectError};
pub use store::{MeasurementQuery, MemoryStore, Store, StoreError, YamlStore};
pub use workflow::{BatchWorkflow, TestInput, TestOutcome, WorkflowError};
