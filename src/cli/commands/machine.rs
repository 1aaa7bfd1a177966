//! `coilqc machine` command - coil-forming machines

use clap::Subcommand;
use console::style;
use miette::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::commands::utils::open_workspace;
use crate::cli::output::{effective_format, print_csv, print_serialized};
use crate::cli::{table, GlobalOpts, OutputFormat};
use crate::core::entity::validate_key;
use crate::core::progress::WorkflowStep;
use crate::core::store::Store;
use crate::entities::{Machine, MachineStatus};

#[derive(Subcommand, Debug)]
pub enum MachineCommands {
    /// Register a machine
    Add(AddArgs),

    /// List machines and what they are running
    List(ListArgs),

    /// Show a machine with its batch progress
    Show(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Machine name, e.g. Dakin-1
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show only machines with an active batch
    #[arg(long)]
    pub active: bool,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    pub name: String,
}

pub fn run(cmd: MachineCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        MachineCommands::Add(args) => run_add(args),
        MachineCommands::List(args) => run_list(args, global),
        MachineCommands::Show(args) => run_show(args, global),
    }
}

fn run_add(args: AddArgs) -> Result<()> {
    let mut ws = open_workspace()?;
    validate_key(&args.name).map_err(|e| miette::miette!("Invalid machine name: {}", e))?;

    if ws.store.machine(&args.name)?.is_some() {
        return Err(miette::miette!("Machine '{}' already exists", args.name));
    }
    ws.store.save_machine(&Machine::new(&args.name))?;

    println!(
        "{} Added machine {}",
        style("✓").green(),
        style(&args.name).cyan()
    );
    Ok(())
}

#[derive(Serialize, Tabled)]
struct MachineRow {
    #[tabled(rename = "MACHINE")]
    name: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "BATCH")]
    batch: String,
    #[tabled(rename = "NEXT STEP")]
    next_step: String,
}

impl From<&Machine> for MachineRow {
    fn from(m: &Machine) -> Self {
        let next_step = match (&m.current_batch, m.progress.next_step()) {
            (None, _) => String::new(),
            (Some(_), Some(step)) => step.to_string(),
            (Some(_), None) => "done".to_string(),
        };
        Self {
            name: m.name.clone(),
            status: m.status.to_string(),
            batch: m.current_batch.clone().unwrap_or_default(),
            next_step,
        }
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = open_workspace()?;
    let machines: Vec<Machine> = ws
        .store
        .machines()?
        .into_iter()
        .filter(|m| !args.active || m.status == MachineStatus::Active)
        .collect();

    if args.count {
        println!("{}", machines.len());
        return Ok(());
    }

    let format = effective_format(global.output, true);
    if print_serialized(&machines, format)? {
        return Ok(());
    }
    if machines.is_empty() {
        println!("No machines found.");
        return Ok(());
    }

    let rows: Vec<MachineRow> = machines.iter().map(MachineRow::from).collect();
    match format {
        OutputFormat::Csv => print_csv(&rows)?,
        OutputFormat::Table => println!("{}", table::render(&rows)),
        _ => {
            println!(
                "{:<16} {:<8} {:<16} {:<20}",
                style("MACHINE").bold(),
                style("STATUS").bold(),
                style("BATCH").bold(),
                style("NEXT STEP").bold()
            );
            println!("{}", "-".repeat(62));
            for (row, machine) in rows.iter().zip(&machines) {
                let status = match machine.status {
                    MachineStatus::Idle => style(row.status.clone()).dim(),
                    MachineStatus::Active => style(row.status.clone()).green(),
                };
                println!(
                    "{:<16} {:<8} {:<16} {:<20}",
                    row.name, status, row.batch, row.next_step
                );
            }
            println!();
            println!("{} machine(s) found.", style(rows.len()).cyan());
        }
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ws = open_workspace()?;
    let machine = ws.store.require_machine(&args.name)?;

    let format = effective_format(global.output, false);
    if print_serialized(&machine, format)? {
        return Ok(());
    }

    println!("{}", style(format!("Machine {}", machine.name)).bold());
    println!("Status: {}", machine.status);
    match &machine.current_batch {
        Some(batch) => {
            println!(
                "Batch:  {}{}",
                style(batch).cyan(),
                if machine.pre { " (preloaded)" } else { "" }
            );
            println!();
            print_progress(&machine);
        }
        None => println!("Batch:  -"),
    }
    if let Some(updated) = machine.last_updated {
        println!();
        println!("Last updated {}", updated.format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

/// Checklist-style view of the five workflow steps
pub fn print_progress(machine: &Machine) {
    let next = machine.progress.next_step();
    for step in WorkflowStep::ALL {
        let marker = if machine.progress.is_done(step) {
            style("✓").green()
        } else if Some(step) == next {
            style("→").blue()
        } else {
            style("·").dim()
        };
        println!("  {} {}", marker, step.label());
    }
}
