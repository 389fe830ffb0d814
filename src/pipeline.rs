//! File-level passes
//!
//! Each pass reads one CSV, runs one finder and writes one CSV. The two
//! passes chain through files: the unrestricted pass's output is the
//! within-region pass's input.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::border::{
    count_sentinel, read_records, write_records, BorderError, LocatedRecord,
    NearestOppositeGroupFinder, NearestOppositeGroupWithinRegionFinder, Result, SearchOptions,
    TableLayout,
};
use crate::progress::{ProgressCallback, SilentProgress};

/// Which finder a pass runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    /// Nearest opposite-group cluster anywhere
    Edge,
    /// Nearest opposite-group cluster in the same region
    EdgeInRegion,
}

impl Pass {
    fn input_layout(&self) -> TableLayout {
        match self {
            Pass::Edge => TableLayout::Located,
            Pass::EdgeInRegion => TableLayout::Edge,
        }
    }

    fn output_layout(&self) -> TableLayout {
        match self {
            Pass::Edge => TableLayout::Edge,
            Pass::EdgeInRegion => TableLayout::EdgeInRegion,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Pass::Edge => "Nearest opposite-group distance",
            Pass::EdgeInRegion => "Nearest opposite-group distance within region",
        }
    }

    fn computed(&self, record: &LocatedRecord) -> Option<f64> {
        match self {
            Pass::Edge => record.distance_to_opposite_group,
            Pass::EdgeInRegion => record.distance_to_opposite_group_within_region,
        }
    }
}

/// Result of one file-level pass
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub pass: Pass,
    pub input: PathBuf,
    pub output: PathBuf,
    /// Rows processed
    pub rows: usize,
    /// Rows with no valid candidate (sentinel emitted)
    pub sentinel_rows: usize,
    /// Sentinel value used for those rows (km)
    pub sentinel_km: f64,
    pub elapsed_seconds: f64,
}

/// Result of both passes
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub edge: PassSummary,
    pub edge_in_region: PassSummary,
}

/// Unrestricted pass with default options
pub fn find_edge(input: &Path, output: &Path) -> Result<PassSummary> {
    find_edge_with(input, output, &SearchOptions::default(), &SilentProgress)
}

/// Within-region pass with default options
pub fn find_edge_inside_region(input: &Path, output: &Path) -> Result<PassSummary> {
    find_edge_inside_region_with(input, output, &SearchOptions::default(), &SilentProgress)
}

/// Unrestricted pass
pub fn find_edge_with<P: ProgressCallback + ?Sized>(
    input: &Path,
    output: &Path,
    options: &SearchOptions,
    progress: &P,
) -> Result<PassSummary> {
    run_pass(Pass::Edge, input, output, options, progress)
}

/// Within-region pass
pub fn find_edge_inside_region_with<P: ProgressCallback + ?Sized>(
    input: &Path,
    output: &Path,
    options: &SearchOptions,
    progress: &P,
) -> Result<PassSummary> {
    run_pass(Pass::EdgeInRegion, input, output, options, progress)
}

/// Both passes, chained through `intermediate`
pub fn run_both<P: ProgressCallback + ?Sized>(
    input: &Path,
    intermediate: &Path,
    output: &Path,
    options: &SearchOptions,
    progress: &P,
) -> Result<RunSummary> {
    let edge = find_edge_with(input, intermediate, options, progress)?;
    let edge_in_region = find_edge_inside_region_with(intermediate, output, options, progress)?;
    Ok(RunSummary {
        edge,
        edge_in_region,
    })
}

fn run_pass<P: ProgressCallback + ?Sized>(
    pass: Pass,
    input: &Path,
    output: &Path,
    options: &SearchOptions,
    progress: &P,
) -> Result<PassSummary> {
    let start_time = Instant::now();

    if !input.exists() {
        return Err(BorderError::InputNotFound(input.to_path_buf()));
    }

    progress.on_step_start(&format!("{}: {}", pass.label(), input.display()));
    let records = read_records(input, pass.input_layout())?;
    let rows = records.len();
    progress.on_debug(&format!("{} rows loaded", rows));

    let enriched = match pass {
        Pass::Edge => NearestOppositeGroupFinder::compute(records, options, progress)?,
        Pass::EdgeInRegion => {
            NearestOppositeGroupWithinRegionFinder::compute(records, options, progress)?
        }
    };

    let sentinel_rows = count_sentinel(
        enriched.iter().filter_map(|r| pass.computed(r)),
        options.sentinel_km,
    );
    if sentinel_rows > 0 {
        tracing::warn!(
            pass = ?pass,
            sentinel_rows,
            sentinel_km = options.sentinel_km,
            "rows without an opposite-group candidate received the sentinel distance"
        );
    }

    write_records(output, pass.output_layout(), &enriched)?;

    let elapsed = start_time.elapsed().as_secs_f64();
    progress.on_step_complete(
        pass.label(),
        &format!("{} rows ({} without candidate) → {}", rows, sentinel_rows, output.display()),
    );

    Ok(PassSummary {
        pass,
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        rows,
        sentinel_rows,
        sentinel_km: options.sentinel_km,
        elapsed_seconds: elapsed,
    })
}
