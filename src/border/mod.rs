//! Border distance module
//!
//! Computes, for every survey cluster, the great-circle distance to the
//! nearest cluster of the opposite before/after group, optionally limited
//! to clusters in the same region.
//!
//! Both passes run the same brute-force search with a different candidate
//! predicate:
//!
//! - [`NearestOppositeGroupFinder`]: any cluster with a different group
//! - [`NearestOppositeGroupWithinRegionFinder`]: different group, same region

mod search;
mod table;
mod types;

// Re-export public API
pub use search::{
    count_sentinel, find_nearest_opposite, find_nearest_opposite_in_region,
    is_opposite_group, is_opposite_group_in_region, nearest_matching, region_matches,
    NearestOppositeGroupFinder, NearestOppositeGroupWithinRegionFinder,
};
pub use table::{
    format_float, read_records, write_records, write_records_to, TableLayout, TableWriteError,
    EDGE_HEADERS, EDGE_IN_REGION_HEADERS, LOCATED_HEADERS,
};
pub use types::{
    BorderError, GroupLabel, LocatedRecord, Result, SearchOptions, SearchOptionsBuilder,
    DEFAULT_SENTINEL_KM, MIN_SENTINEL_KM, MIN_THREADS,
};
