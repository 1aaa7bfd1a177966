//! `coilqc queue` command - batches preloaded ahead of a machine run

use clap::Subcommand;
use console::style;
use miette::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::commands::utils::open_workspace;
use crate::cli::helpers::{confirm, operator_or_default};
use crate::cli::output::{effective_format, print_csv, print_serialized};
use crate::cli::{table, GlobalOpts, OutputFormat};
use crate::core::workflow::BatchWorkflow;
use crate::entities::{CoilSample, QueuedBatch};

#[derive(Subcommand, Debug)]
pub enum QueueCommands {
    /// Preload a batch with its loading sheet
    Add(AddArgs),

    /// List queued batches
    List(ListArgs),

    /// Remove a batch from the queue
    Remove(RemoveArgs),

    /// Line up a queued batch for a different machine
    Transfer(TransferArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Batch number
    pub batch_number: String,

    /// Product SKU
    #[arg(long, short = 's')]
    pub sku: String,

    /// Operator filling in the loading sheet (defaults to config)
    #[arg(long, short = 'O')]
    pub operator: Option<String>,

    /// Coil reading as height:gauge; repeat for each coil
    #[arg(long = "coil", short = 'c', value_name = "HEIGHT:GAUGE", required = true)]
    pub coils: Vec<CoilSample>,

    /// Machine the batch is meant for
    #[arg(long, short = 'm')]
    pub machine: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only batches that can start on this machine
    #[arg(long, short = 'm')]
    pub machine: Option<String>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    pub batch_number: String,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct TransferArgs {
    pub batch_number: String,

    /// Machine to line the batch up for
    pub machine: String,
}

pub fn run(cmd: QueueCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        QueueCommands::Add(args) => run_add(args),
        QueueCommands::List(args) => run_list(args, global),
        QueueCommands::Remove(args) => run_remove(args),
        QueueCommands::Transfer(args) => run_transfer(args),
    }
}

fn run_add(args: AddArgs) -> Result<()> {
    let mut ws = open_workspace()?;
    let operator = operator_or_default(args.operator, &ws.config)?;

    let mut entry = QueuedBatch::new(&args.batch_number, &args.sku, operator, args.coils);
    entry.machine = args.machine;

    let entry = BatchWorkflow::new(&mut ws.store).queue_batch(entry)?;

    println!(
        "{} Queued batch {} ({}, {} coil(s)){}",
        style("✓").green(),
        style(&entry.batch_number).cyan(),
        entry.sku,
        entry.coils.len(),
        entry
            .machine
            .as_deref()
            .map(|m| format!(" for {}", m))
            .unwrap_or_default()
    );
    println!(
        "   Start it with {}",
        style(format!(
            "coilqc batch start {} --machine <MACHINE> --from-queue",
            entry.batch_number
        ))
        .cyan()
    );
    Ok(())
}

#[derive(Serialize, Tabled)]
struct QueueRow {
    #[tabled(rename = "BATCH")]
    batch_number: String,
    #[tabled(rename = "SKU")]
    sku: String,
    #[tabled(rename = "MACHINE")]
    machine: String,
    #[tabled(rename = "OPERATOR")]
    operator: String,
    #[tabled(rename = "COILS")]
    coils: usize,
    #[tabled(rename = "QUEUED")]
    created: String,
}

impl From<&QueuedBatch> for QueueRow {
    fn from(q: &QueuedBatch) -> Self {
        Self {
            batch_number: q.batch_number.clone(),
            sku: q.sku.clone(),
            machine: q.machine.clone().unwrap_or_else(|| "any".to_string()),
            operator: q.operator.clone(),
            coils: q.coils.len(),
            created: q.created.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let mut ws = open_workspace()?;
    let entries = BatchWorkflow::new(&mut ws.store).queue(args.machine.as_deref())?;

    if args.count {
        println!("{}", entries.len());
        return Ok(());
    }

    let format = effective_format(global.output, true);
    if print_serialized(&entries, format)? {
        return Ok(());
    }
    if entries.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }

    let rows: Vec<QueueRow> = entries.iter().map(QueueRow::from).collect();
    match format {
        OutputFormat::Csv => print_csv(&rows)?,
        OutputFormat::Table => println!("{}", table::render(&rows)),
        _ => {
            println!(
                "{:<14} {:<14} {:<12} {:<14} {:<6} {:<16}",
                style("BATCH").bold(),
                style("SKU").bold(),
                style("MACHINE").bold(),
                style("OPERATOR").bold(),
                style("COILS").bold(),
                style("QUEUED").bold()
            );
            println!("{}", "-".repeat(80));
            for r in &rows {
                println!(
                    "{:<14} {:<14} {:<12} {:<14} {:<6} {:<16}",
                    r.batch_number, r.sku, r.machine, r.operator, r.coils, r.created
                );
            }
            println!();
            println!("{} queued batch(es).", style(rows.len()).cyan());
        }
    }
    Ok(())
}

fn run_remove(args: RemoveArgs) -> Result<()> {
    let mut ws = open_workspace()?;
    if !args.yes && !confirm(&format!("Remove batch {} from the queue?", args.batch_number))? {
        println!("Cancelled.");
        return Ok(());
    }

    BatchWorkflow::new(&mut ws.store).remove_queued(&args.batch_number)?;
    println!(
        "{} Removed batch {} from the queue",
        style("✓").green(),
        style(&args.batch_number).cyan()
    );
    Ok(())
}

fn run_transfer(args: TransferArgs) -> Result<()> {
    let mut ws = open_workspace()?;
    let entry = BatchWorkflow::new(&mut ws.store).transfer(&args.batch_number, &args.machine)?;
    println!(
        "{} Batch {} is now lined up for {}",
        style("✓").green(),
        style(&entry.batch_number).cyan(),
        style(&args.machine).cyan()
    );
    Ok(())
}
