mod args;
mod logging;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use syncset::{Assembler, AssemblyReport};

use args::Args;

fn run(args: Args) -> Result<AssemblyReport> {
    let config = args.into_config();
    let destination = config.destination.clone();

    info!(
        "Generating template for {} from {}",
        config.repo_name,
        config.manifest_dir.display()
    );

    Assembler::new(config)
        .run()
        .with_context(|| format!("failed to generate {}", destination.display()))
}

fn print_report(report: &AssemblyReport) {
    for bundle in &report.bundles {
        println!(
            "{}: {} resources, {} patches, {} skipped",
            bundle.name, bundle.resources, bundle.patches, bundle.skipped
        );
    }
    println!(
        "Generated {} bundles ({} resources, {} patches)",
        report.bundles.len(),
        report.total_resources(),
        report.total_patches()
    );
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args) {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("[ERROR] {:#}", e);
            ExitCode::FAILURE
        }
    }
}
