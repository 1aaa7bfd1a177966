//! CLI module - argument parsing and command dispatch

pub mod args;
pub mod commands;
pub mod filters;
pub mod helpers;
pub mod output;
pub mod table;
pub mod viz;

pub use args::{Cli, Commands, GlobalOpts, OutputFormat};
pub use filters::{BatchStateFilter, CliTestType, CoilSide};

use miette::Result;

/// Dispatch a parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let global = cli.global;
    match cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Product(cmd) => commands::product::run(cmd, &global),
        Commands::Machine(cmd) => commands::machine::run(cmd, &global),
        Commands::Batch(cmd) => commands::batch::run(cmd, &global),
        Commands::Queue(cmd) => commands::queue::run(cmd, &global),
        Commands::Operator(cmd) => commands::operator::run(cmd, &global),
        Commands::Test(cmd) => commands::test::run(cmd, &global),
        Commands::Qc(cmd) => commands::qc::run(cmd, &global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}
