//! `coilqc batch` command - walk a batch through its workflow steps

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::commands::machine::print_progress;
use crate::cli::commands::utils::{open_workspace, Workspace};
use crate::cli::helpers::{confirm, is_interactive, operator_or_default, parse_readings};
use crate::cli::output::{effective_format, fmt_opt, print_csv, print_serialized};
use crate::cli::{table, BatchStateFilter, CliTestType, GlobalOpts, OutputFormat};
use crate::core::spc::SpecStatus;
use crate::core::store::{MeasurementQuery, Store};
use crate::core::workflow::{BatchWorkflow, TestInput, TestOutcome};
use crate::core::{WorkflowStep, YamlStore};
use crate::entities::{Batch, Checklist, ChecklistKind, CoilSample, MicroscopeChecks, TestType};

#[derive(Subcommand, Debug)]
pub enum BatchCommands {
    /// Start a batch on an idle machine
    Start(StartArgs),

    /// Record the loading sheet (coil heights and gauges)
    LoadingSheet(LoadingSheetArgs),

    /// Sign off the preflight checklist
    Checklist(ChecklistArgs),

    /// Record an initial, regular or final test sheet
    Test(TestArgs),

    /// Sign off the final checklist and complete the batch
    FinalChecklist(ChecklistArgs),

    /// Abandon the machine's batch and return it to idle
    Clear(ClearArgs),

    /// Show the next step for a machine
    Next(NextArgs),

    /// List batches
    List(ListArgs),

    /// Show a batch with its progress and test results
    Show(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct StartArgs {
    /// Batch number
    pub batch_number: String,

    /// Machine to run the batch on
    #[arg(long, short = 'm')]
    pub machine: String,

    /// Product SKU
    #[arg(long, short = 's', required_unless_present = "from_queue")]
    pub sku: Option<String>,

    /// Start a preloaded batch from the queue
    #[arg(long, conflicts_with = "sku")]
    pub from_queue: bool,
}

#[derive(clap::Args, Debug)]
pub struct LoadingSheetArgs {
    /// Machine running the batch
    pub machine: String,

    /// Operator filling in the sheet (defaults to config)
    #[arg(long, short = 'O')]
    pub operator: Option<String>,

    /// Coil reading as height:gauge; repeat for each coil
    #[arg(long = "coil", short = 'c', value_name = "HEIGHT:GAUGE", required = true)]
    pub coils: Vec<CoilSample>,
}

#[derive(clap::Args, Debug)]
pub struct ChecklistArgs {
    /// Machine running the batch
    pub machine: String,

    /// Item ids to tick (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub check: Vec<String>,

    /// Tick every item
    #[arg(long, conflicts_with = "check")]
    pub all: bool,
}

#[derive(clap::Args, Debug)]
pub struct TestArgs {
    /// Machine running the batch
    pub machine: String,

    /// Test sheet type
    #[arg(long = "type", short = 't')]
    pub test_type: CliTestType,

    /// Operator taking the readings (defaults to config)
    #[arg(long, short = 'O')]
    pub operator: Option<String>,

    /// Top coil differences from the reference block, comma-separated;
    /// leave a position empty for a missing reading
    #[arg(long, value_name = "D1,D2,D3", allow_hyphen_values = true)]
    pub top: Option<String>,

    /// Bottom coil differences from the reference block
    #[arg(long, value_name = "D1,D2,D3", allow_hyphen_values = true)]
    pub bottom: Option<String>,

    /// Tooth profile looked good under the microscope (initial test)
    #[arg(long)]
    pub tooth_profile: bool,

    /// Index tooth looked good under the microscope (initial test)
    #[arg(long)]
    pub index_tooth: bool,
}

#[derive(clap::Args, Debug)]
pub struct ClearArgs {
    pub machine: String,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct NextArgs {
    pub machine: String,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by batch state
    #[arg(long, default_value = "all")]
    pub state: BatchStateFilter,

    /// Filter by SKU
    #[arg(long)]
    pub sku: Option<String>,

    /// Filter by machine
    #[arg(long, short = 'm')]
    pub machine: Option<String>,

    /// Limit number of results (newest first)
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    pub batch_number: String,
}

pub fn run(cmd: BatchCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        BatchCommands::Start(args) => run_start(args),
        BatchCommands::LoadingSheet(args) => run_loading_sheet(args),
        BatchCommands::Checklist(args) => run_checklist(args, ChecklistKind::Preflight),
        BatchCommands::Test(args) => run_test(args),
        BatchCommands::FinalChecklist(args) => run_checklist(args, ChecklistKind::Final),
        BatchCommands::Clear(args) => run_clear(args),
        BatchCommands::Next(args) => run_next(args),
        BatchCommands::List(args) => run_list(args, global),
        BatchCommands::Show(args) => run_show(args, global),
    }
}

fn workflow<'a>(ws: &'a mut Workspace) -> BatchWorkflow<'a, YamlStore> {
    let band = ws.config.warning_band();
    let positions = ws.config.coil_positions();
    BatchWorkflow::new(&mut ws.store)
        .with_warning_band(band)
        .with_coil_positions(positions)
}

fn print_next_hint(machine: &str, next: Option<WorkflowStep>) {
    if let Some(step) = next {
        println!(
            "   Next: {} ({})",
            step.label(),
            style(format!("coilqc {} {}", step.command(), machine)).cyan()
        );
    }
}

fn run_start(args: StartArgs) -> Result<()> {
    let mut ws = open_workspace()?;
    let mut wf = workflow(&mut ws);

    let batch = match args.sku {
        Some(sku) if !args.from_queue => {
            wf.start_batch(&args.batch_number, &sku, &args.machine, false)?
        }
        _ => wf.start_from_queue(&args.batch_number, &args.machine)?,
    };

    println!(
        "{} Started batch {} ({}) on {}{}",
        style("✓").green(),
        style(&batch.batch_number).cyan(),
        batch.sku,
        style(&batch.machine).cyan(),
        if batch.pre { " from the preload queue" } else { "" }
    );
    print_next_hint(&args.machine, batch.progress.next_step());
    Ok(())
}

fn run_loading_sheet(args: LoadingSheetArgs) -> Result<()> {
    let mut ws = open_workspace()?;
    let operator = operator_or_default(args.operator, &ws.config)?;
    let mut wf = workflow(&mut ws);

    let sheet = wf.save_loading_sheet(&args.machine, &operator, args.coils)?;

    println!(
        "{} Loading sheet saved ({} coil(s), operator {})",
        style("✓").green(),
        sheet.coils.len(),
        sheet.operator
    );
    if let Some(diff) = sheet.max_height_difference {
        println!("   Max height difference: {:.4}", diff);
    }
    print_next_hint(&args.machine, wf.next_step(&args.machine)?);
    Ok(())
}

/// Build a checklist from flags, or prompt when attached to a terminal
fn fill_checklist(kind: ChecklistKind, check: &[String], all: bool) -> Result<Checklist> {
    let mut checklist = Checklist::for_kind(kind);

    if all {
        checklist.check_all();
        return Ok(checklist);
    }

    if !check.is_empty() {
        for id in check {
            if !checklist.check(id.trim()) {
                return Err(miette::miette!(
                    help = format!("Valid items: {}", checklist.ids().join(", ")),
                    "Unknown {} checklist item '{}'",
                    kind,
                    id
                ));
            }
        }
        return Ok(checklist);
    }

    if !is_interactive() {
        return Err(miette::miette!(
            help = format!(
                "Pass --all or --check with any of: {}",
                checklist.ids().join(", ")
            ),
            "No {} checklist items given",
            kind
        ));
    }

    let labels: Vec<String> = checklist.items.iter().map(|i| i.text.clone()).collect();
    let picked = dialoguer::MultiSelect::new()
        .with_prompt(format!("{} checklist (space to tick, enter to confirm)", kind))
        .items(&labels)
        .interact()
        .into_diagnostic()?;
    for idx in picked {
        checklist.items[idx].checked = true;
    }
    Ok(checklist)
}

fn run_checklist(args: ChecklistArgs, kind: ChecklistKind) -> Result<()> {
    let mut ws = open_workspace()?;
    let checklist = fill_checklist(kind, &args.check, args.all)?;
    let mut wf = workflow(&mut ws);

    match kind {
        ChecklistKind::Preflight => {
            wf.complete_preflight(&args.machine, checklist)?;
            println!("{} Preflight checklist complete", style("✓").green());
            print_next_hint(&args.machine, wf.next_step(&args.machine)?);
        }
        ChecklistKind::Final => {
            let batch = wf.complete_final_checklist(&args.machine, checklist)?;
            println!(
                "{} Batch {} completed; {} is idle",
                style("✓").green(),
                style(&batch.batch_number).cyan(),
                style(&args.machine).cyan()
            );
        }
    }
    Ok(())
}

fn status_cell(height: Option<f64>, status: Option<SpecStatus>) -> String {
    let text = fmt_opt(height, 4);
    match status {
        Some(SpecStatus::Good) => style(text).green().to_string(),
        Some(SpecStatus::Warning) => style(text).yellow().to_string(),
        Some(SpecStatus::Error) => style(text).red().to_string(),
        None => style(text).dim().to_string(),
    }
}

fn print_outcome(outcome: &TestOutcome) {
    let record = &outcome.record;
    println!(
        "{} {} test recorded for batch {} ({})",
        style("✓").green(),
        record.test_type,
        style(&record.batch).cyan(),
        record.id
    );
    println!("   Spec: {}", outcome.spec);
    for (label, heights, statuses) in [
        ("Top   ", &record.top_coil, &outcome.top_status),
        ("Bottom", &record.bottom_coil, &outcome.bottom_status),
    ] {
        let cells: Vec<String> = heights
            .iter()
            .zip(statuses)
            .map(|(h, s)| status_cell(*h, *s))
            .collect();
        println!("   {}  {}", label, cells.join("  "));
    }
    if let Some(checks) = record.microscope_checks {
        println!(
            "   Microscope: tooth profile {}, index tooth {}",
            if checks.tooth_profile { "ok" } else { "not ok" },
            if checks.index_tooth { "ok" } else { "not ok" }
        );
    }
    let result = if record.passed() {
        style("PASS").green().bold()
    } else {
        style("FAIL").red().bold()
    };
    println!("   Result: {}", result);
}

fn run_test(args: TestArgs) -> Result<()> {
    let mut ws = open_workspace()?;
    let operator = operator_or_default(args.operator, &ws.config)?;
    let test_type: TestType = args.test_type.into();

    let microscope = (test_type == TestType::Initial).then_some(MicroscopeChecks {
        tooth_profile: args.tooth_profile,
        index_tooth: args.index_tooth,
    });

    let readings = |raw: Option<String>, side: &str| -> Result<Vec<Option<f64>>> {
        match raw {
            Some(raw) => parse_readings(&raw)
                .map_err(|e| miette::miette!("Invalid {} coil readings: {}", side, e)),
            None => Ok(Vec::new()),
        }
    };

    let input = TestInput {
        test_type,
        operator,
        top_diffs: readings(args.top, "top")?,
        bottom_diffs: readings(args.bottom, "bottom")?,
        microscope,
    };

    let mut wf = workflow(&mut ws);
    let outcome = wf.record_test(&args.machine, input)?;
    print_outcome(&outcome);

    if wf
        .store()
        .product(&outcome.record.sku)?
        .is_some_and(|p| p.reference_block == 0.0)
    {
        println!(
            "{} Product {} has no reference block; readings were recorded as missing",
            style("!").yellow(),
            outcome.record.sku
        );
    }
    if outcome.completed.is_some() {
        print_next_hint(&args.machine, wf.next_step(&args.machine)?);
    }
    Ok(())
}

fn run_clear(args: ClearArgs) -> Result<()> {
    let mut ws = open_workspace()?;
    let machine = ws.store.require_machine(&args.machine)?;

    if let Some(batch) = &machine.current_batch {
        if !args.yes
            && !confirm(&format!(
                "Abandon batch {} on {}? Recorded data is kept",
                batch, args.machine
            ))?
        {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let mut wf = workflow(&mut ws);
    match wf.clear_machine(&args.machine)? {
        Some(batch) => println!(
            "{} Cleared batch {} from {}",
            style("✓").green(),
            style(batch).cyan(),
            style(&args.machine).cyan()
        ),
        None => println!("{} {} was already idle", style("✓").green(), args.machine),
    }
    Ok(())
}

fn run_next(args: NextArgs) -> Result<()> {
    let mut ws = open_workspace()?;
    let machine = ws.store.require_machine(&args.machine)?;
    let wf = workflow(&mut ws);

    match wf.active_batch(&args.machine)? {
        None => {
            println!("{} is idle.", args.machine);
            println!(
                "   Start a batch with {}",
                style(format!("coilqc batch start <BATCH> --machine {} --sku <SKU>", args.machine)).cyan()
            );
        }
        Some(batch) => {
            println!(
                "Batch {} ({}) on {}",
                style(&batch.batch_number).cyan(),
                batch.sku,
                args.machine
            );
            print_progress(&machine);
            match batch.progress.next_step() {
                Some(step) => print_next_hint(&args.machine, Some(step)),
                None => println!("   All steps complete."),
            }
        }
    }
    Ok(())
}

#[derive(Serialize, Tabled)]
struct BatchRow {
    #[tabled(rename = "BATCH")]
    batch_number: String,
    #[tabled(rename = "SKU")]
    sku: String,
    #[tabled(rename = "MACHINE")]
    machine: String,
    #[tabled(rename = "STATE")]
    state: String,
    #[tabled(rename = "NEXT STEP")]
    next_step: String,
    #[tabled(rename = "STARTED")]
    started: String,
}

impl From<&Batch> for BatchRow {
    fn from(b: &Batch) -> Self {
        Self {
            batch_number: b.batch_number.clone(),
            sku: b.sku.clone(),
            machine: b.machine.clone(),
            state: b.state().to_string(),
            next_step: if b.is_active {
                b.progress
                    .next_step()
                    .map(|s| s.to_string())
                    .unwrap_or_default()
            } else {
                String::new()
            },
            started: b.started_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = open_workspace()?;
    let mut batches: Vec<Batch> = ws
        .store
        .batches()?
        .into_iter()
        .filter(|b| args.state.matches(b))
        .filter(|b| args.sku.as_ref().map_or(true, |s| &b.sku == s))
        .filter(|b| args.machine.as_ref().map_or(true, |m| &b.machine == m))
        .collect();

    batches.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    if let Some(limit) = args.limit {
        batches.truncate(limit);
    }

    if args.count {
        println!("{}", batches.len());
        return Ok(());
    }

    let format = effective_format(global.output, true);
    if print_serialized(&batches, format)? {
        return Ok(());
    }
    if batches.is_empty() {
        println!("No batches found.");
        return Ok(());
    }

    let rows: Vec<BatchRow> = batches.iter().map(BatchRow::from).collect();
    match format {
        OutputFormat::Csv => print_csv(&rows)?,
        OutputFormat::Table => println!("{}", table::render(&rows)),
        _ => {
            println!(
                "{:<14} {:<14} {:<12} {:<10} {:<20} {:<16}",
                style("BATCH").bold(),
                style("SKU").bold(),
                style("MACHINE").bold(),
                style("STATE").bold(),
                style("NEXT STEP").bold(),
                style("STARTED").bold()
            );
            println!("{}", "-".repeat(90));
            for row in &rows {
                let state = match row.state.as_str() {
                    "active" => style(row.state.clone()).green(),
                    "completed" => style(row.state.clone()).cyan(),
                    _ => style(row.state.clone()).yellow(),
                };
                println!(
                    "{:<14} {:<14} {:<12} {:<10} {:<20} {:<16}",
                    row.batch_number, row.sku, row.machine, state, row.next_step, row.started
                );
            }
            println!();
            println!("{} batch(es) found.", style(rows.len()).cyan());
        }
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ws = open_workspace()?;
    let batch = ws.store.require_batch(&args.batch_number)?;

    let format = effective_format(global.output, false);
    if print_serialized(&batch, format)? {
        return Ok(());
    }

    println!("{}", style(format!("Batch {}", batch.batch_number)).bold());
    println!("SKU:     {}", batch.sku);
    println!("Machine: {}", batch.machine);
    println!("State:   {}", batch.state());
    println!("Started: {}", batch.started_at.format("%Y-%m-%d %H:%M"));
    if let Some(done) = batch.completed_at {
        println!("Done:    {}", done.format("%Y-%m-%d %H:%M"));
    }

    if let Some(sheet) = &batch.loading_sheet {
        println!();
        println!(
            "{} ({} coil(s), operator {})",
            style("Loading sheet").bold(),
            sheet.coils.len(),
            sheet.operator
        );
        for (i, coil) in sheet.coils.iter().enumerate() {
            println!(
                "  Coil {:<3} height {:.4}  gauge {:.4}",
                i + 1,
                coil.height,
                coil.gauge
            );
        }
        if let Some(diff) = sheet.max_height_difference {
            println!("  Max height difference {:.4}", diff);
        }
    }

    println!();
    println!("{}", style("Progress").bold());
    for step in WorkflowStep::ALL {
        let marker = if batch.progress.is_done(step) {
            style("✓").green()
        } else {
            style("·").dim()
        };
        println!("  {} {}", marker, step.label());
    }

    let tests = ws
        .store
        .measurements(&MeasurementQuery::for_batch(&batch.batch_number))?;
    if !tests.is_empty() {
        println!();
        println!("{}", style("Tests").bold());
        for t in &tests {
            let result = if t.passed() {
                style("pass").green()
            } else {
                style("fail").red()
            };
            println!(
                "  {:<8} {:<5} {}  {}",
                t.test_type.to_string(),
                result,
                t.created.format("%Y-%m-%d %H:%M"),
                t.operator
            );
        }
    }
    Ok(())
}
