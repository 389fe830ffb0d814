//! Border module core types
//!
//! Contains the located record model, error types and search options
//! shared by both nearest-opposite-group passes.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::geo::{GeoPoint, MAX_GREAT_CIRCLE_KM};

// ============================================================
// Constants
// ============================================================

/// Distance emitted when a record has no valid candidate (km)
pub const DEFAULT_SENTINEL_KM: f64 = 100_000.0;

/// Smallest accepted sentinel; anything lower could collide with a real distance
pub const MIN_SENTINEL_KM: f64 = MAX_GREAT_CIRCLE_KM;

/// Minimum worker thread clamp value
pub const MIN_THREADS: usize = 1;

// ============================================================
// Error Types
// ============================================================

/// Border distance error types
#[derive(Debug, Error)]
pub enum BorderError {
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("{path}: expected {expected} columns, found {found}")]
    ColumnCount {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("{path}: row {row}: {reason}")]
    MalformedRow {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    #[error("Record {row} has no value for column {column}")]
    MissingField { row: usize, column: &'static str },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Config error in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BorderError>;

// ============================================================
// Core Data Structures
// ============================================================

/// Temporal group of a survey cluster relative to the reference date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupLabel {
    /// Surveyed before the reference date (`0`)
    Before,
    /// Surveyed after the reference date (`1`)
    After,
}

impl GroupLabel {
    /// Column value as written to disk
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupLabel::Before => "0",
            GroupLabel::After => "1",
        }
    }

    /// The other group
    pub fn opposite(&self) -> Self {
        match self {
            GroupLabel::Before => GroupLabel::After,
            GroupLabel::After => GroupLabel::Before,
        }
    }
}

impl fmt::Display for GroupLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupLabel {
    type Err = String;

    /// Accepts `0`/`1` as well as float spellings such as `1.0`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| format!("group label '{}' is not numeric", s))?;
        if value == 0.0 {
            Ok(GroupLabel::Before)
        } else if value == 1.0 {
            Ok(GroupLabel::After)
        } else {
            Err(format!("group label '{}' is neither 0 nor 1", s))
        }
    }
}

/// One surveyed cluster
///
/// Distances are appended by the search passes and never rewritten by a
/// later pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedRecord {
    /// Latitude (degrees)
    pub latitude: f64,
    /// Longitude (degrees)
    pub longitude: f64,
    /// Before/after group
    pub group: GroupLabel,
    /// Cluster identifier, carried through verbatim
    pub cluster_id: String,
    /// Administrative region, carried through verbatim
    pub region: String,
    /// Distance to the nearest opposite-group cluster (km)
    pub distance_to_opposite_group: Option<f64>,
    /// Distance to the nearest opposite-group cluster in the same region (km)
    pub distance_to_opposite_group_within_region: Option<f64>,
}

impl LocatedRecord {
    /// Create a record with no computed distances
    pub fn new(
        latitude: f64,
        longitude: f64,
        group: GroupLabel,
        cluster_id: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            group,
            cluster_id: cluster_id.into(),
            region: region.into(),
            distance_to_opposite_group: None,
            distance_to_opposite_group_within_region: None,
        }
    }

    /// Set the unrestricted distance
    #[must_use]
    pub fn with_distance_to_opposite_group(mut self, km: f64) -> Self {
        self.distance_to_opposite_group = Some(km);
        self
    }

    /// Location of the cluster
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

// ============================================================
// Options
// ============================================================

/// Nearest-neighbor search options
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Distance emitted when no candidate matches (km)
    pub sentinel_km: f64,
    /// Split reference rows across a worker pool
    pub parallel: bool,
    /// Worker pool size (None = rayon global pool)
    pub threads: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            sentinel_km: DEFAULT_SENTINEL_KM,
            parallel: false,
            threads: None,
        }
    }
}

impl SearchOptions {
    /// Create a new options builder
    pub fn builder() -> SearchOptionsBuilder {
        SearchOptionsBuilder::default()
    }

    /// Parallel search on every available core
    pub fn parallel() -> Self {
        Self {
            parallel: true,
            threads: Some(num_cpus::get()),
            ..Default::default()
        }
    }
}

/// Builder for SearchOptions
#[derive(Debug, Default)]
pub struct SearchOptionsBuilder {
    options: SearchOptions,
}

impl SearchOptionsBuilder {
    /// Set the no-candidate sentinel (clamped to at least the antipodal distance)
    #[must_use]
    pub fn sentinel_km(mut self, km: f64) -> Self {
        if !km.is_nan() {
            self.options.sentinel_km = km.max(MIN_SENTINEL_KM);
        }
        self
    }

    /// Enable or disable parallel search
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.options.parallel = parallel;
        self
    }

    /// Set worker pool size (at least 1)
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.options.threads = Some(threads.max(MIN_THREADS));
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> SearchOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_options_default() {
        let opts = SearchOptions::default();
        assert_eq!(opts.sentinel_km, 100_000.0);
        assert!(!opts.parallel);
        assert_eq!(opts.threads, None);
    }

    #[test]
    fn test_search_options_parallel() {
        let opts = SearchOptions::parallel();
        assert!(opts.parallel);
        assert!(opts.threads.unwrap_or(0) >= 1);
        assert_eq!(opts.sentinel_km, DEFAULT_SENTINEL_KM);
    }

    #[test]
    fn test_search_options_builder() {
        let opts = SearchOptions::builder()
            .sentinel_km(50_000.0)
            .parallel(true)
            .threads(4)
            .build();
        assert_eq!(opts.sentinel_km, 50_000.0);
        assert!(opts.parallel);
        assert_eq!(opts.threads, Some(4));
    }

    #[test]
    fn test_builder_clamping() {
        // Sentinel below the antipodal maximum is raised
        let opts = SearchOptions::builder().sentinel_km(10.0).build();
        assert_eq!(opts.sentinel_km, MIN_SENTINEL_KM);

        // NaN is ignored
        let opts = SearchOptions::builder().sentinel_km(f64::NAN).build();
        assert_eq!(opts.sentinel_km, DEFAULT_SENTINEL_KM);

        // Infinity is a valid sentinel
        let opts = SearchOptions::builder().sentinel_km(f64::INFINITY).build();
        assert!(opts.sentinel_km.is_infinite());

        let opts = SearchOptions::builder().threads(0).build();
        assert_eq!(opts.threads, Some(1));
    }

    #[test]
    fn test_group_label_parse() {
        assert_eq!("0".parse::<GroupLabel>(), Ok(GroupLabel::Before));
        assert_eq!("1".parse::<GroupLabel>(), Ok(GroupLabel::After));
        assert_eq!(" 1.0 ".parse::<GroupLabel>(), Ok(GroupLabel::After));
        assert!("2".parse::<GroupLabel>().is_err());
        assert!("after".parse::<GroupLabel>().is_err());
        assert!("".parse::<GroupLabel>().is_err());
    }

    #[test]
    fn test_group_label_opposite() {
        assert_eq!(GroupLabel::Before.opposite(), GroupLabel::After);
        assert_eq!(GroupLabel::After.opposite(), GroupLabel::Before);
        assert_eq!(GroupLabel::After.to_string(), "1");
    }

    #[test]
    fn test_located_record_new() {
        let rec = LocatedRecord::new(6.5, 3.4, GroupLabel::Before, "17", "lagos");
        assert_eq!(rec.cluster_id, "17");
        assert_eq!(rec.region, "lagos");
        assert!(rec.distance_to_opposite_group.is_none());
        assert!(rec.distance_to_opposite_group_within_region.is_none());
        assert_eq!(rec.position(), GeoPoint::new(6.5, 3.4));

        let rec = rec.with_distance_to_opposite_group(12.5);
        assert_eq!(rec.distance_to_opposite_group, Some(12.5));
    }

    #[test]
    fn test_error_types() {
        let _err1 = BorderError::InputNotFound(PathBuf::from("/test/path"));
        let _err2 = BorderError::ColumnCount {
            path: PathBuf::from("in.csv"),
            expected: 5,
            found: 3,
        };
        let err3 = BorderError::MalformedRow {
            path: PathBuf::from("in.csv"),
            row: 4,
            reason: "bad".to_string(),
        };
        assert_eq!(err3.to_string(), "in.csv: row 4: bad");
        let _err4: BorderError = std::io::Error::other("test").into();
    }
}
