//! Shadepack CLI - package a plugin with shaded library namespaces

use anyhow::{anyhow, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    };

    if let Err(e) = run(cli) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("shadepack=debug")
    } else {
        EnvFilter::new("shadepack=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let opts = cli
        .to_options()
        .map_err(|e| anyhow!("{}\n\n{}", e, Cli::command().render_usage()))?;

    let report = shadepack::ops::pack(&opts)?;
    tracing::info!(
        "Packaged {} declarations from {} files ({} dropped, {} shading rules, prefix {})",
        report.items_written,
        report.files_parsed,
        report.files_dropped,
        report.rules_applied,
        report.target_prefix
    );
    Ok(())
}
