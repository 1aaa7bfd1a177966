//! `coilqc operator` command - the operator roster

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::utils::open_workspace;
use crate::cli::output::{effective_format, print_serialized};
use crate::cli::GlobalOpts;
use crate::core::workflow::BatchWorkflow;

#[derive(Subcommand, Debug)]
pub enum OperatorCommands {
    /// Add an operator to the roster
    Add {
        /// Operator name
        name: String,
    },

    /// List operators
    List,

    /// Remove an operator from the roster
    Remove {
        /// Operator name (case-insensitive)
        name: String,
    },
}

pub fn run(cmd: OperatorCommands, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace()?;
    let mut wf = BatchWorkflow::new(&mut ws.store);

    match cmd {
        OperatorCommands::Add { name } => {
            let operator = wf.add_operator(&name)?;
            println!(
                "{} Added operator {}",
                style("✓").green(),
                style(&operator.name).cyan()
            );
        }
        OperatorCommands::List => {
            let operators = wf.operators()?;
            let format = effective_format(global.output, true);
            if print_serialized(&operators, format)? {
                return Ok(());
            }
            if operators.is_empty() {
                println!("No operators on the roster; any name is accepted.");
                return Ok(());
            }
            for op in &operators {
                println!("{}", op.name);
            }
        }
        OperatorCommands::Remove { name } => {
            let removed = wf.remove_operator(&name)?;
            println!(
                "{} Removed operator {}",
                style("✓").green(),
                style(&removed.name).cyan()
            );
        }
    }
    Ok(())
}
