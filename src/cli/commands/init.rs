//! `coilqc init` command - create a project

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::core::project::{Project, PROJECT_DIR};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (defaults to the current directory)
    pub path: Option<PathBuf>,

    /// Re-initialize an existing project, keeping its documents
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let root = match args.path {
        Some(p) => p,
        None => std::env::current_dir().into_diagnostic()?,
    };
    std::fs::create_dir_all(&root).into_diagnostic()?;

    let project = Project::init(&root, args.force)?;

    println!(
        "{} Initialized coilqc project at {}",
        style("✓").green(),
        style(project.root().display()).cyan()
    );
    println!(
        "   Config: {}/{}",
        PROJECT_DIR,
        crate::core::project::CONFIG_FILE
    );
    println!();
    println!("Next steps:");
    println!(
        "  {}  define a product",
        style("coilqc product new <SKU> --reference-block <in> --processed-height usl,target,lsl").cyan()
    );
    println!("  {}  register a machine", style("coilqc machine add <NAME>").cyan());
    Ok(())
}
