//! cluster-border CLI entry point

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

use cluster_border::cli::{Cli, Commands};
use cluster_border::{
    find_edge_inside_region_with, find_edge_with, fix_paths, run_both, Config, ConsoleProgress,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config =
        Config::load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;
    let progress = ConsoleProgress::new(cli.verbose, cli.json);

    match &cli.command {
        Commands::Edge(args) => {
            let options = args.search.apply(config.search_options());
            let summary = find_edge_with(&args.input, &args.output, &options, &progress)
                .with_context(|| format!("Failed to process {}", args.input.display()))?;
            emit(cli.json, &summary)?;
        }
        Commands::EdgeInRegion(args) => {
            let options = args.search.apply(config.search_options());
            let summary =
                find_edge_inside_region_with(&args.input, &args.output, &options, &progress)
                    .with_context(|| format!("Failed to process {}", args.input.display()))?;
            emit(cli.json, &summary)?;
        }
        Commands::Run(args) => {
            let options = args.search.apply(config.search_options());
            let summary = run_both(
                &args.input,
                &args.intermediate,
                &args.output,
                &options,
                &progress,
            )
            .with_context(|| format!("Failed to process {}", args.input.display()))?;
            emit(cli.json, &summary)?;
        }
        Commands::FixPaths(args) => {
            let report = fix_paths(&args.root)
                .with_context(|| format!("Failed to fix paths under {}", args.root.display()))?;
            if !cli.json {
                eprintln!("✔ Fixed {} file(s)", report.total());
            }
            emit(cli.json, &report)?;
        }
    }

    Ok(())
}

fn emit<T: Serialize>(json: bool, value: &T) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}
