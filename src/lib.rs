//! coilqc: batch workflow and statistical quality control for coil forming
//!
//! Operators walk each production batch through loading sheet, preflight
//! checklist, initial test, final test and final checklist. Measurements are
//! kept as plain YAML documents and analysed with descriptive statistics,
//! capability indices, histograms and control charts.

pub mod cli;
pub mod core;
pub mod entities;
pub mod yaml;
