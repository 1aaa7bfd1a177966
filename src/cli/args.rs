//! Command-line argument definitions

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::batch::BatchCommands;
use crate::cli::commands::completions::CompletionsArgs;
use crate::cli::commands::init::InitArgs;
use crate::cli::commands::machine::MachineCommands;
use crate::cli::commands::operator::OperatorCommands;
use crate::cli::commands::product::ProductCommands;
use crate::cli::commands::qc::QcCommands;
use crate::cli::commands::queue::QueueCommands;
use crate::cli::commands::test::TestCommands;

#[derive(Parser, Debug)]
#[command(
    name = "coilqc",
    version,
    about = "Batch workflow and quality control for coil-forming machines",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options accepted by every subcommand
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "auto")]
    pub output: OutputFormat,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl GlobalOpts {
    /// Log filter directive implied by `-v`/`-q`, if any
    ///
    /// `None` leaves the choice to `RUST_LOG`.
    pub fn log_directive(&self) -> Option<&'static str> {
        if self.quiet {
            return Some("error");
        }
        match self.verbose {
            0 => None,
            1 => Some("coilqc=info"),
            2 => Some("coilqc=debug"),
            _ => Some("coilqc=trace"),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table for lists, YAML for single documents
    #[default]
    Auto,
    /// Tab-aligned columns
    Tsv,
    Json,
    Yaml,
    Csv,
    /// Boxed table
    Table,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a coilqc project in the current directory
    Init(InitArgs),

    /// Products (SKU specifications)
    #[command(subcommand)]
    Product(ProductCommands),

    /// Coil-forming machines
    #[command(subcommand)]
    Machine(MachineCommands),

    /// Run a batch through its workflow steps
    #[command(subcommand)]
    Batch(BatchCommands),

    /// Preloaded batches waiting for a machine
    #[command(subcommand)]
    Queue(QueueCommands),

    /// Operator roster
    #[command(subcommand)]
    Operator(OperatorCommands),

    /// Recorded test sheets
    #[command(subcommand)]
    Test(TestCommands),

    /// Quality control analysis
    #[command(subcommand)]
    Qc(QcCommands),

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_directive() {
        let cli = Cli::parse_from(["coilqc", "-vv", "machine", "list"]);
        assert_eq!(cli.global.log_directive(), Some("coilqc=debug"));

        let cli = Cli::parse_from(["coilqc", "machine", "list", "-q"]);
        assert_eq!(cli.global.log_directive(), Some("error"));

        let cli = Cli::parse_from(["coilqc", "machine", "list"]);
        assert_eq!(cli.global.log_directive(), None);
    }
}
