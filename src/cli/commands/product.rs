//! `coilqc product` command - SKU specification documents

use clap::Subcommand;
use console::style;
use miette::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::commands::utils::open_workspace;
use crate::cli::helpers::parse_finite;
use crate::cli::output::{effective_format, print_csv, print_serialized};
use crate::cli::{table, GlobalOpts, OutputFormat};
use crate::core::spc::SpecLimits;
use crate::core::store::Store;
use crate::entities::Product;

#[derive(Subcommand, Debug)]
pub enum ProductCommands {
    /// Create or update a product
    New(NewArgs),

    /// List products
    List(ListArgs),

    /// Show a product's specifications
    Show(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Product SKU
    pub sku: String,

    /// Nominal height of the reference block (inches)
    #[arg(long, short = 'r', value_parser = parse_finite)]
    pub reference_block: Option<f64>,

    /// Reference block name or serial
    #[arg(long)]
    pub block_name: Option<String>,

    /// Raw material height limits as usl,target,lsl
    #[arg(long, value_name = "USL,TARGET,LSL")]
    pub raw_height: Option<SpecLimits>,

    /// Raw material gauge limits as usl,target,lsl
    #[arg(long, value_name = "USL,TARGET,LSL")]
    pub raw_gauge: Option<SpecLimits>,

    /// Processed height limits as usl,target,lsl (used for test results)
    #[arg(long, value_name = "USL,TARGET,LSL")]
    pub processed_height: Option<SpecLimits>,

    /// Processed gauge limits as usl,target,lsl
    #[arg(long, value_name = "USL,TARGET,LSL")]
    pub processed_gauge: Option<SpecLimits>,

    /// Update an existing product; unspecified fields are kept
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Product SKU
    pub sku: String,
}

pub fn run(cmd: ProductCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ProductCommands::New(args) => run_new(args),
        ProductCommands::List(args) => run_list(args, global),
        ProductCommands::Show(args) => run_show(args, global),
    }
}

fn run_new(args: NewArgs) -> Result<()> {
    let mut ws = open_workspace()?;

    let existing = ws.store.product(&args.sku)?;
    if existing.is_some() && !args.force {
        return Err(miette::miette!(
            help = "Pass --force to update it",
            "Product '{}' already exists",
            args.sku
        ));
    }
    let is_update = existing.is_some();
    let mut product = existing.unwrap_or_else(|| Product::new(&args.sku));

    if let Some(r) = args.reference_block {
        product.reference_block = r;
    }
    if args.block_name.is_some() {
        product.block_name = args.block_name;
    }
    if let Some(s) = args.raw_height {
        product.raw_material.height = s;
    }
    if let Some(s) = args.raw_gauge {
        product.raw_material.gauge = s;
    }
    if let Some(s) = args.processed_height {
        product.processed_material.height = s;
    }
    if let Some(s) = args.processed_gauge {
        product.processed_material.gauge = s;
    }

    ws.store.save_product(&product)?;

    println!(
        "{} {} product {}",
        style("✓").green(),
        if is_update { "Updated" } else { "Created" },
        style(&product.sku).cyan()
    );

    let band = ws.config.warning_band();
    for (stage, dimension, spec) in product.configured_specs() {
        if !spec.good_zone_reachable(band) {
            println!(
                "{} {} {} tolerance {:.4} leaves no good zone inside the ±{} warning band",
                style("!").yellow(),
                stage,
                dimension,
                spec.tolerance(),
                band
            );
        }
    }
    if product.reference_block == 0.0 {
        println!(
            "{} No reference block set; test readings cannot be converted to heights",
            style("!").yellow()
        );
    }
    Ok(())
}

#[derive(Serialize, Tabled)]
struct ProductRow {
    #[tabled(rename = "SKU")]
    sku: String,
    #[tabled(rename = "REF BLOCK")]
    reference_block: f64,
    #[tabled(rename = "HEIGHT USL")]
    usl: f64,
    #[tabled(rename = "TARGET")]
    target: f64,
    #[tabled(rename = "HEIGHT LSL")]
    lsl: f64,
}

impl From<&Product> for ProductRow {
    fn from(p: &Product) -> Self {
        let h = p.processed_material.height;
        Self {
            sku: p.sku.clone(),
            reference_block: p.reference_block,
            usl: h.usl,
            target: h.target,
            lsl: h.lsl,
        }
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = open_workspace()?;
    let products = ws.store.products()?;

    if args.count {
        println!("{}", products.len());
        return Ok(());
    }

    let format = effective_format(global.output, true);
    if print_serialized(&products, format)? {
        return Ok(());
    }
    if products.is_empty() {
        println!("No products found.");
        return Ok(());
    }

    let rows: Vec<ProductRow> = products.iter().map(ProductRow::from).collect();
    match format {
        OutputFormat::Csv => print_csv(&rows)?,
        OutputFormat::Table => println!("{}", table::render(&rows)),
        _ => {
            println!(
                "{:<20} {:<10} {:<10} {:<10} {:<10}",
                style("SKU").bold(),
                style("REF").bold(),
                style("USL").bold(),
                style("TARGET").bold(),
                style("LSL").bold()
            );
            println!("{}", "-".repeat(64));
            for r in &rows {
                println!(
                    "{:<20} {:<10.4} {:<10.4} {:<10.4} {:<10.4}",
                    r.sku, r.reference_block, r.usl, r.target, r.lsl
                );
            }
            println!();
            println!("{} product(s) found.", style(rows.len()).cyan());
        }
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ws = open_workspace()?;
    let product = ws.store.require_product(&args.sku)?;

    let format = effective_format(global.output, false);
    if print_serialized(&product, format)? {
        return Ok(());
    }

    println!("{}", style(format!("Product {}", product.sku)).bold());
    println!(
        "Reference block: {:.4}{}",
        product.reference_block,
        product
            .block_name
            .as_deref()
            .map(|n| format!(" ({})", n))
            .unwrap_or_default()
    );
    println!();

    let specs = product.configured_specs();
    if specs.is_empty() {
        println!("No specification limits configured.");
        return Ok(());
    }
    println!(
        "{:<10} {:<10} {:<10} {:<10} {:<10}",
        style("STAGE").bold(),
        style("DIM").bold(),
        style("USL").bold(),
        style("TARGET").bold(),
        style("LSL").bold()
    );
    for (stage, dimension, spec) in specs {
        println!(
            "{:<10} {:<10} {:<10.4} {:<10.4} {:<10.4}",
            stage.to_string(),
            dimension.to_string(),
            spec.usl,
            spec.target,
            spec.lsl
        );
    }
    Ok(())
}
