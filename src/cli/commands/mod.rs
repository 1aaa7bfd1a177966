//! CLI command implementations

pub mod batch;
pub mod completions;
pub mod init;
pub mod machine;
pub mod operator;
pub mod product;
pub mod qc;
pub mod queue;
pub mod utils;
