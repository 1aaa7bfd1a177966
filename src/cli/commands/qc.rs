//! `coilqc qc` command - statistical process control for a SKU

use clap::Subcommand;
use console::style;
use miette::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::commands::utils::open_workspace;
use crate::cli::output::{effective_format, fmt_opt, print_csv, print_serialized};
use crate::cli::viz::{render_control_chart, render_histogram, render_range_bar, CHART_HEIGHT, CHART_WIDTH};
use crate::cli::{table, CoilSide, GlobalOpts, OutputFormat};
use crate::core::spc::{
    analyze_sku, build_control_chart, build_histogram, classify_with_band, CoilSummary,
    QcAnalysis, SpecStatus, MAX_BINS,
};
use crate::core::store::Store;

#[derive(Subcommand, Debug)]
pub enum QcCommands {
    /// Descriptive statistics and capability indices
    Stats(StatsArgs),

    /// Height distribution against the spec limits
    Histogram(HistogramArgs),

    /// Individuals control chart with ±3σ limits
    Control(ControlArgs),

    /// Classify ad-hoc height readings against a SKU's spec
    Check(CheckArgs),
}

#[derive(clap::Args, Debug)]
pub struct StatsArgs {
    /// Product SKU
    pub sku: String,

    /// Restrict to one batch
    #[arg(long, short = 'b')]
    pub batch: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct HistogramArgs {
    /// Product SKU
    pub sku: String,

    /// Restrict to one batch
    #[arg(long, short = 'b')]
    pub batch: Option<String>,

    /// Number of bins (defaults to config, then 20)
    #[arg(
        long,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..=MAX_BINS as u64)
    )]
    pub bins: Option<usize>,

    /// Which coil readings to include
    #[arg(long, default_value = "both")]
    pub coil: CoilSide,
}

#[derive(clap::Args, Debug)]
pub struct ControlArgs {
    /// Product SKU
    pub sku: String,

    /// Restrict to one batch
    #[arg(long, short = 'b')]
    pub batch: Option<String>,

    /// Which coil readings to include
    #[arg(long, default_value = "both")]
    pub coil: CoilSide,

    /// Chart width in braille pixels
    #[arg(long, default_value_t = CHART_WIDTH)]
    pub width: u32,

    /// Chart height in braille pixels
    #[arg(long, default_value_t = CHART_HEIGHT)]
    pub height: u32,
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Product SKU
    pub sku: String,

    /// Heights to classify
    #[arg(required = true, allow_hyphen_values = true)]
    pub values: Vec<f64>,
}

pub fn run(cmd: QcCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        QcCommands::Stats(args) => run_stats(args, global),
        QcCommands::Histogram(args) => run_histogram(args, global),
        QcCommands::Control(args) => run_control(args, global),
        QcCommands::Check(args) => run_check(args, global),
    }
}

fn coil_values(analysis: &QcAnalysis, side: CoilSide) -> Vec<f64> {
    match side {
        CoilSide::Top => analysis.top_coil.stats.measurements.clone(),
        CoilSide::Bottom => analysis.bottom_coil.stats.measurements.clone(),
        CoilSide::Both => analysis.all_heights(),
    }
}

fn scope_label(analysis: &QcAnalysis) -> String {
    match &analysis.batch {
        Some(batch) => format!("{} batch {}", analysis.sku, batch),
        None => analysis.sku.clone(),
    }
}

#[derive(Serialize, Tabled)]
struct StatsRow {
    #[tabled(rename = "COIL")]
    coil: String,
    #[tabled(rename = "N")]
    n: usize,
    #[tabled(rename = "MEAN")]
    mean: String,
    #[tabled(rename = "STD DEV")]
    std_dev: String,
    #[tabled(rename = "MIN")]
    min: String,
    #[tabled(rename = "MAX")]
    max: String,
    #[tabled(rename = "CP")]
    cp: String,
    #[tabled(rename = "CPK")]
    cpk: String,
}

impl StatsRow {
    fn new(coil: &str, summary: &CoilSummary) -> Self {
        let s = &summary.stats;
        Self {
            coil: coil.to_string(),
            n: s.count(),
            mean: format!("{:.4}", s.mean),
            std_dev: format!("{:.5}", s.std_dev),
            min: format!("{:.4}", s.min),
            max: format!("{:.4}", s.max),
            cp: fmt_opt(summary.capability.and_then(|c| c.cp), 2),
            cpk: fmt_opt(summary.capability.and_then(|c| c.cpk), 2),
        }
    }
}

fn cpk_style(cpk: Option<f64>) -> String {
    match cpk {
        Some(v) if v >= 1.33 => style(format!("{:.2}", v)).green().to_string(),
        Some(v) if v >= 1.0 => style(format!("{:.2}", v)).yellow().to_string(),
        Some(v) => style(format!("{:.2}", v)).red().to_string(),
        None => style("-".to_string()).dim().to_string(),
    }
}

fn run_stats(args: StatsArgs, global: &GlobalOpts) -> Result<()> {
    let ws = open_workspace()?;
    let analysis = analyze_sku(&ws.store, &args.sku, args.batch.as_deref())?;

    let format = effective_format(global.output, true);
    if print_serialized(&analysis, format)? {
        return Ok(());
    }

    let rows = vec![
        StatsRow::new("top", &analysis.top_coil),
        StatsRow::new("bottom", &analysis.bottom_coil),
    ];
    match format {
        OutputFormat::Csv => return print_csv(&rows),
        OutputFormat::Table => {
            println!("{}", table::render(&rows));
            return Ok(());
        }
        _ => {}
    }

    println!(
        "{}",
        style(format!("QC summary for {}", scope_label(&analysis))).bold()
    );
    println!(
        "Records: {} from {} batch(es), pass rate {:.1}%",
        analysis.total_measurements,
        analysis.batch_count,
        analysis.pass_rate * 100.0
    );
    match &analysis.specifications {
        Some(spec) => println!("Spec:    {}", spec),
        None => println!(
            "Spec:    {} (capability not computed)",
            style("no processed-height limits").yellow()
        ),
    }

    if analysis.total_measurements == 0 {
        println!();
        println!("No measurements recorded.");
        return Ok(());
    }

    println!();
    println!(
        "{:<8} {:<5} {:<10} {:<10} {:<10} {:<10} {:<6} {:<6}",
        style("COIL").bold(),
        style("N").bold(),
        style("MEAN").bold(),
        style("STD DEV").bold(),
        style("MIN").bold(),
        style("MAX").bold(),
        style("CP").bold(),
        style("CPK").bold()
    );
    for (row, summary) in rows.iter().zip([&analysis.top_coil, &analysis.bottom_coil]) {
        println!(
            "{:<8} {:<5} {:<10} {:<10} {:<10} {:<10} {:<6} {}",
            row.coil,
            row.n,
            row.mean,
            row.std_dev,
            row.min,
            row.max,
            row.cp,
            cpk_style(summary.capability.and_then(|c| c.cpk))
        );
    }

    let all = analysis.all_heights();
    if let (Some(spec), false) = (&analysis.specifications, all.is_empty()) {
        let min = all.iter().copied().fold(f64::INFINITY, f64::min);
        let max = all.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        println!();
        println!("{}", render_range_bar(min, max, spec.lsl, spec.usl));
    }
    Ok(())
}

#[derive(Serialize)]
struct BinRow {
    bin_start: f64,
    bin_end: f64,
    count: usize,
}

fn run_histogram(args: HistogramArgs, global: &GlobalOpts) -> Result<()> {
    let ws = open_workspace()?;
    let analysis = analyze_sku(&ws.store, &args.sku, args.batch.as_deref())?;
    let bins = args.bins.unwrap_or_else(|| ws.config.histogram_bins());

    let values = coil_values(&analysis, args.coil);
    let spec = analysis.specifications;
    let histogram = build_histogram(&values, spec.as_ref(), bins);

    let format = effective_format(global.output, true);
    if print_serialized(&histogram, format)? {
        return Ok(());
    }
    if format == OutputFormat::Csv {
        let rows: Vec<BinRow> = histogram
            .bins
            .iter()
            .map(|b| BinRow {
                bin_start: b.bin_start,
                bin_end: b.bin_end,
                count: b.count,
            })
            .collect();
        return print_csv(&rows);
    }

    println!(
        "{}",
        style(format!(
            "Height distribution for {} ({} coil, n={})",
            scope_label(&analysis),
            args.coil,
            histogram.total()
        ))
        .bold()
    );
    println!();
    println!("{}", render_histogram(&histogram, spec.as_ref()));
    Ok(())
}

fn run_control(args: ControlArgs, global: &GlobalOpts) -> Result<()> {
    let ws = open_workspace()?;
    let analysis = analyze_sku(&ws.store, &args.sku, args.batch.as_deref())?;
    let chart = build_control_chart(&coil_values(&analysis, args.coil));

    let format = effective_format(global.output, true);
    if print_serialized(&chart, format)? {
        return Ok(());
    }
    if format == OutputFormat::Csv {
        return print_csv(&chart.points);
    }

    println!(
        "{}",
        style(format!(
            "Control chart for {} ({} coil)",
            scope_label(&analysis),
            args.coil
        ))
        .bold()
    );
    println!();
    println!("{}", render_control_chart(&chart, args.width, args.height));

    let violations: Vec<_> = chart.violations().collect();
    if !violations.is_empty() {
        println!();
        println!(
            "{} {} point(s) outside control limits:",
            style("!").yellow(),
            violations.len()
        );
        for p in violations {
            println!("   #{:<4} {:.4}", p.index, p.value);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct CheckResult {
    value: f64,
    status: SpecStatus,
}

fn run_check(args: CheckArgs, global: &GlobalOpts) -> Result<()> {
    let ws = open_workspace()?;
    let product = ws.store.require_product(&args.sku)?;
    let Some(spec) = product.processed_height() else {
        return Err(miette::miette!(
            help = format!(
                "Set limits with: coilqc product new {} --force --processed-height USL,TARGET,LSL",
                args.sku
            ),
            "Product '{}' has no processed-height limits",
            args.sku
        ));
    };
    let band = ws.config.warning_band();

    let results: Vec<CheckResult> = args
        .values
        .iter()
        .map(|&value| CheckResult {
            value,
            status: classify_with_band(value, &spec, band),
        })
        .collect();

    let format = effective_format(global.output, true);
    if print_serialized(&results, format)? {
        return Ok(());
    }
    if format == OutputFormat::Csv {
        return print_csv(&results);
    }

    for r in &results {
        let status = match r.status {
            SpecStatus::Good => style(r.status.to_string()).green(),
            SpecStatus::Warning => style(r.status.to_string()).yellow(),
            SpecStatus::Error => style(r.status.to_string()).red(),
        };
        println!("{:.4}\t{:<8}\t{}", r.value, status, r.status.message());
    }
    Ok(())
}
