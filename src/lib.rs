//! # cluster-border
//!
//! Distances from geolocated survey clusters to the nearest cluster of the
//! opposite before/after group, for spatial discontinuity analysis around
//! a reference date.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::path::Path;
//!
//! // LATNUM, LONGNUM, group, cluster id, region → + distanceToBorders
//! cluster_border::find_edge(Path::new("clusters.csv"), Path::new("edge.csv"))?;
//! // + distanceToBordersInsideState
//! cluster_border::find_edge_inside_region(Path::new("edge.csv"), Path::new("region.csv"))?;
//! # Ok::<(), cluster_border::BorderError>(())
//! ```
//!
//! ## Modules
//!
//! - [`border`]: record model, nearest-opposite-group search, CSV tables
//! - [`geo`]: great-circle distance
//! - [`pipeline`]: file-level passes and run summaries
//! - [`progress`]: progress observers
//! - [`config`]: TOML configuration
//! - [`dhs_paths`]: DHS `.DO`/`.DCT` path fixer
//! - [`cli`]: command-line definitions

pub mod border;
pub mod cli;
pub mod config;
pub mod dhs_paths;
pub mod geo;
pub mod pipeline;
pub mod progress;

// Re-exports for convenience
pub use border::{
    BorderError, GroupLabel, LocatedRecord, NearestOppositeGroupFinder,
    NearestOppositeGroupWithinRegionFinder, SearchOptions, TableLayout, DEFAULT_SENTINEL_KM,
};
pub use config::Config;
pub use dhs_paths::{fix_paths, DhsPathError, FixReport};
pub use geo::{great_circle_km, GeoPoint, EARTH_RADIUS_KM};
pub use pipeline::{
    find_edge, find_edge_inside_region, find_edge_inside_region_with, find_edge_with, run_both,
    PassSummary, RunSummary,
};
pub use progress::{ConsoleProgress, LogProgress, ProgressCallback, SilentProgress};
