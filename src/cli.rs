//! Command-line interface definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::border::SearchOptions;

/// Distances from survey clusters to the nearest cluster of the other before/after group
#[derive(Debug, Parser)]
#[command(name = "cluster-border")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (default: <config dir>/cluster-border/config.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the run summary as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Nearest opposite-group distance (5-column input → 6-column output)
    Edge(PassArgs),

    /// Nearest opposite-group distance within region (6-column input → 7-column output)
    EdgeInRegion(PassArgs),

    /// Both passes, chained through an intermediate file
    Run(RunArgs),

    /// Rewrite embedded paths in DHS .DO/.DCT files under a directory
    FixPaths(FixPathsArgs),
}

/// Search tuning flags shared by all passes
#[derive(Debug, Clone, Default, Args)]
pub struct SearchArgs {
    /// Search reference rows in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Worker threads for parallel search (implies --parallel)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Distance written when no candidate exists (km, at least the antipodal distance)
    #[arg(long)]
    pub sentinel_km: Option<f64>,
}

impl SearchArgs {
    /// Apply CLI overrides on top of `base`
    pub fn apply(&self, base: SearchOptions) -> SearchOptions {
        let mut builder = SearchOptions::builder()
            .sentinel_km(base.sentinel_km)
            .parallel(base.parallel || self.parallel || self.threads.is_some());
        if let Some(threads) = self.threads.or(base.threads) {
            builder = builder.threads(threads);
        }
        if let Some(km) = self.sentinel_km {
            builder = builder.sentinel_km(km);
        }
        builder.build()
    }
}

#[derive(Debug, Args)]
pub struct PassArgs {
    /// Input CSV
    pub input: PathBuf,

    /// Output CSV
    pub output: PathBuf,

    #[command(flatten)]
    pub search: SearchArgs,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Input CSV (LATNUM, LONGNUM, group, cluster id, region)
    pub input: PathBuf,

    /// Intermediate CSV written by the first pass
    pub intermediate: PathBuf,

    /// Final CSV
    pub output: PathBuf,

    #[command(flatten)]
    pub search: SearchArgs,
}

#[derive(Debug, Args)]
pub struct FixPathsArgs {
    /// Root directory of the DHS download
    pub root: PathBuf,
}
