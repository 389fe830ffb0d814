//! Nearest Opposite-Group Search
//!
//! Brute-force all-pairs search shared by the unrestricted and the
//! within-region passes. Each pass is the same loop with a different
//! candidate predicate.

use super::types::{BorderError, LocatedRecord, Result, SearchOptions};
use crate::progress::ProgressCallback;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================
// Candidate Predicates
// ============================================================

/// Candidate is in the other temporal group
///
/// A record never differs from itself in group, so this also excludes
/// self-comparison without skipping any index.
pub fn is_opposite_group(reference: &LocatedRecord, candidate: &LocatedRecord) -> bool {
    candidate.group != reference.group
}

/// Candidate is in the other temporal group and the same region
pub fn is_opposite_group_in_region(reference: &LocatedRecord, candidate: &LocatedRecord) -> bool {
    is_opposite_group(reference, candidate) && region_matches(&reference.region, &candidate.region)
}

/// Region codes are equal
///
/// A blank region is missing and matches nothing, itself included.
/// Codes that both read as numbers compare by value, so `24` and `24.0`
/// name the same region.
pub fn region_matches(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() {
        return false;
    }
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) if !x.is_nan() && !y.is_nan() => x == y,
        _ => a == b,
    }
}

// ============================================================
// Generic Search
// ============================================================

/// Distance from every record to its nearest candidate matching `predicate`
///
/// Returns one distance per record in input order. Records without any
/// matching candidate get `options.sentinel_km`. Progress is reported once
/// per finished reference row.
pub fn nearest_matching<F, P>(
    records: &[LocatedRecord],
    predicate: F,
    options: &SearchOptions,
    progress: &P,
) -> Result<Vec<f64>>
where
    F: Fn(&LocatedRecord, &LocatedRecord) -> bool + Sync,
    P: ProgressCallback + ?Sized,
{
    let total = records.len();
    let sentinel = options.sentinel_km;

    let search_row = |reference: &LocatedRecord| -> f64 {
        let origin = reference.position();
        let mut min_distance = sentinel;
        for candidate in records {
            if predicate(reference, candidate) {
                let distance = origin.great_circle_km(&candidate.position());
                if distance < min_distance {
                    min_distance = distance;
                }
            }
        }
        min_distance
    };

    if !options.parallel {
        let distances: Vec<f64> = records
            .iter()
            .enumerate()
            .map(|(i, reference)| {
                let distance = search_row(reference);
                progress.on_step_progress(i + 1, total);
                distance
            })
            .collect();
        return Ok(distances);
    }

    let finished = AtomicUsize::new(0);
    let run = || -> Vec<f64> {
        records
            .par_iter()
            .map(|reference| {
                let distance = search_row(reference);
                let done = finished.fetch_add(1, Ordering::Relaxed) + 1;
                progress.on_step_progress(done, total);
                distance
            })
            .collect()
    };

    match options.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| BorderError::ThreadPool(e.to_string()))?;
            Ok(pool.install(run))
        }
        None => Ok(run()),
    }
}

/// Number of distances equal to the no-candidate sentinel
pub fn count_sentinel(distances: impl IntoIterator<Item = f64>, sentinel_km: f64) -> usize {
    distances.into_iter().filter(|d| *d >= sentinel_km).count()
}

// ============================================================
// Finders
// ============================================================

/// Nearest cluster of the opposite temporal group, anywhere
pub struct NearestOppositeGroupFinder;

impl NearestOppositeGroupFinder {
    /// Fill `distance_to_opposite_group` for every record, preserving order
    pub fn compute<P: ProgressCallback + ?Sized>(
        mut records: Vec<LocatedRecord>,
        options: &SearchOptions,
        progress: &P,
    ) -> Result<Vec<LocatedRecord>> {
        let distances = nearest_matching(&records, is_opposite_group, options, progress)?;
        for (record, distance) in records.iter_mut().zip(distances) {
            record.distance_to_opposite_group = Some(distance);
        }
        Ok(records)
    }
}

/// Nearest cluster of the opposite temporal group within the same region
pub struct NearestOppositeGroupWithinRegionFinder;

impl NearestOppositeGroupWithinRegionFinder {
    /// Fill `distance_to_opposite_group_within_region` for every record,
    /// leaving the unrestricted distance untouched
    pub fn compute<P: ProgressCallback + ?Sized>(
        mut records: Vec<LocatedRecord>,
        options: &SearchOptions,
        progress: &P,
    ) -> Result<Vec<LocatedRecord>> {
        let distances =
            nearest_matching(&records, is_opposite_group_in_region, options, progress)?;
        for (record, distance) in records.iter_mut().zip(distances) {
            record.distance_to_opposite_group_within_region = Some(distance);
        }
        Ok(records)
    }
}

/// Convenience wrapper: unrestricted pass with default options and no progress
pub fn find_nearest_opposite(records: Vec<LocatedRecord>) -> Result<Vec<LocatedRecord>> {
    NearestOppositeGroupFinder::compute(records, &SearchOptions::default(), &crate::SilentProgress)
}

/// Convenience wrapper: within-region pass with default options and no progress
pub fn find_nearest_opposite_in_region(records: Vec<LocatedRecord>) -> Result<Vec<LocatedRecord>> {
    NearestOppositeGroupWithinRegionFinder::compute(
        records,
        &SearchOptions::default(),
        &crate::SilentProgress,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::border::types::{GroupLabel, DEFAULT_SENTINEL_KM};
    use crate::geo::{great_circle_km, GeoPoint};
    use approx::assert_relative_eq;
    use std::sync::Mutex;

    fn rec(lat: f64, lon: f64, group: GroupLabel, id: &str, region: &str) -> LocatedRecord {
        LocatedRecord::new(lat, lon, group, id, region)
    }

    /// Deterministic scatter of clusters over a few regions
    fn scatter(n: usize) -> Vec<LocatedRecord> {
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 10_000) as f64 / 10_000.0
        };
        (0..n)
            .map(|i| {
                let lat = 4.0 + next() * 9.0;
                let lon = 3.0 + next() * 11.0;
                let group = if next() < 0.5 {
                    GroupLabel::Before
                } else {
                    GroupLabel::After
                };
                let region = format!("{}", (next() * 4.0) as u32);
                rec(lat, lon, group, &i.to_string(), &region)
            })
            .collect()
    }

    struct Recorder {
        events: Mutex<Vec<(usize, usize)>>,
    }

    impl ProgressCallback for Recorder {
        fn on_step_progress(&self, current: usize, total: usize) {
            self.events.lock().unwrap().push((current, total));
        }
    }

    #[test]
    fn test_region_matches() {
        assert!(region_matches("24", "24"));
        assert!(region_matches("24", "24.0"));
        assert!(region_matches("Oromia", "Oromia"));
        assert!(!region_matches("24", "25"));
        assert!(!region_matches("Oromia", "oromia"));
        assert!(!region_matches("", ""));
        assert!(!region_matches("  ", "24"));
        assert!(!region_matches("nan", "nan"));
    }

    #[test]
    fn test_numeric_region_spellings_share_a_region() {
        let records = vec![
            rec(0.0, 0.0, GroupLabel::Before, "1", "24"),
            rec(0.0, 1.0, GroupLabel::After, "2", "24.0"),
        ];
        let out = find_nearest_opposite_in_region(find_nearest_opposite(records).unwrap()).unwrap();
        for r in &out {
            assert_relative_eq!(
                r.distance_to_opposite_group_within_region.unwrap(),
                111.195,
                epsilon = 1e-3
            );
        }
    }

    #[test]
    fn test_blank_regions_do_not_match_each_other() {
        let records = vec![
            rec(0.0, 0.0, GroupLabel::Before, "1", ""),
            rec(0.0, 1.0, GroupLabel::After, "2", ""),
        ];
        let out = find_nearest_opposite_in_region(find_nearest_opposite(records).unwrap()).unwrap();
        for r in &out {
            assert_relative_eq!(r.distance_to_opposite_group.unwrap(), 111.195, epsilon = 1e-3);
            assert_eq!(r.distance_to_opposite_group_within_region, Some(DEFAULT_SENTINEL_KM));
        }
    }

    #[test]
    fn test_two_points_same_region() {
        let records = vec![
            rec(0.0, 0.0, GroupLabel::Before, "1", "r"),
            rec(0.0, 1.0, GroupLabel::After, "2", "r"),
        ];
        let out = find_nearest_opposite(records).unwrap();
        let out = find_nearest_opposite_in_region(out).unwrap();
        for r in &out {
            assert_relative_eq!(r.distance_to_opposite_group.unwrap(), 111.195, epsilon = 1e-3);
            assert_relative_eq!(
                r.distance_to_opposite_group_within_region.unwrap(),
                111.195,
                epsilon = 1e-3
            );
        }
    }

    #[test]
    fn test_closer_cross_region_point_only_counts_unrestricted() {
        // ~50 km east in the same region, ~40 km west in another region
        let records = vec![
            rec(0.0, 0.0, GroupLabel::Before, "1", "north"),
            rec(0.0, 0.449_658, GroupLabel::After, "2", "north"),
            rec(0.0, -0.359_727, GroupLabel::After, "3", "south"),
        ];
        let origin = GeoPoint::new(0.0, 0.0);
        let same_region = great_circle_km(&origin, &GeoPoint::new(0.0, 0.449_658));
        let other_region = great_circle_km(&origin, &GeoPoint::new(0.0, -0.359_727));
        assert_relative_eq!(same_region, 50.0, epsilon = 1e-2);
        assert_relative_eq!(other_region, 40.0, epsilon = 1e-2);

        let out = find_nearest_opposite(records).unwrap();
        let out = find_nearest_opposite_in_region(out).unwrap();

        assert_relative_eq!(out[0].distance_to_opposite_group.unwrap(), other_region);
        assert_relative_eq!(
            out[0].distance_to_opposite_group_within_region.unwrap(),
            same_region
        );
        // The lone southern cluster has no opposite-group peer in its region
        assert_eq!(
            out[2].distance_to_opposite_group_within_region,
            Some(DEFAULT_SENTINEL_KM)
        );
    }

    #[test]
    fn test_single_group_yields_sentinel() {
        let records = vec![
            rec(1.0, 1.0, GroupLabel::After, "1", "a"),
            rec(1.0, 1.0, GroupLabel::After, "2", "a"),
            rec(2.0, 3.0, GroupLabel::After, "3", "b"),
        ];
        let out = find_nearest_opposite(records).unwrap();
        assert!(out
            .iter()
            .all(|r| r.distance_to_opposite_group == Some(DEFAULT_SENTINEL_KM)));
    }

    #[test]
    fn test_lone_record_is_not_its_own_neighbor() {
        let out = find_nearest_opposite(vec![rec(5.0, 5.0, GroupLabel::Before, "1", "a")]).unwrap();
        assert_eq!(out[0].distance_to_opposite_group, Some(DEFAULT_SENTINEL_KM));
    }

    #[test]
    fn test_coincident_opposite_points_are_zero() {
        let records = vec![
            rec(7.0, 7.0, GroupLabel::Before, "1", "a"),
            rec(7.0, 7.0, GroupLabel::After, "2", "a"),
        ];
        let out = find_nearest_opposite(records).unwrap();
        assert_eq!(out[0].distance_to_opposite_group, Some(0.0));
        assert_eq!(out[1].distance_to_opposite_group, Some(0.0));
    }

    #[test]
    fn test_empty_input() {
        let out = find_nearest_opposite(Vec::new()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_order_and_fields_preserved() {
        let records = scatter(40);
        let out = find_nearest_opposite(records.clone()).unwrap();
        let out = find_nearest_opposite_in_region(out).unwrap();
        assert_eq!(out.len(), records.len());
        for (before, after) in records.iter().zip(&out) {
            assert_eq!(before.cluster_id, after.cluster_id);
            assert_eq!(before.region, after.region);
            assert_eq!(before.group, after.group);
            assert_eq!(before.latitude, after.latitude);
            assert_eq!(before.longitude, after.longitude);
        }
    }

    #[test]
    fn test_within_region_never_beats_unrestricted() {
        let out = find_nearest_opposite(scatter(120)).unwrap();
        let out = find_nearest_opposite_in_region(out).unwrap();
        for r in &out {
            let all = r.distance_to_opposite_group.unwrap();
            let within = r.distance_to_opposite_group_within_region.unwrap();
            assert!(within >= all, "{} < {}", within, all);
        }
    }

    #[test]
    fn test_within_region_pass_keeps_prior_distance() {
        let records = vec![
            rec(0.0, 0.0, GroupLabel::Before, "1", "a").with_distance_to_opposite_group(3.25),
            rec(0.0, 1.0, GroupLabel::After, "2", "a").with_distance_to_opposite_group(9.5),
        ];
        let out = find_nearest_opposite_in_region(records).unwrap();
        assert_eq!(out[0].distance_to_opposite_group, Some(3.25));
        assert_eq!(out[1].distance_to_opposite_group, Some(9.5));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let records = scatter(200);
        let sequential = nearest_matching(
            &records,
            is_opposite_group_in_region,
            &SearchOptions::default(),
            &crate::SilentProgress,
        )
        .unwrap();
        let parallel = nearest_matching(
            &records,
            is_opposite_group_in_region,
            &SearchOptions::builder().parallel(true).threads(3).build(),
            &crate::SilentProgress,
        )
        .unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_custom_sentinel() {
        let options = SearchOptions::builder().sentinel_km(f64::INFINITY).build();
        let records = vec![rec(0.0, 0.0, GroupLabel::Before, "1", "a")];
        let out =
            NearestOppositeGroupFinder::compute(records, &options, &crate::SilentProgress).unwrap();
        assert_eq!(out[0].distance_to_opposite_group, Some(f64::INFINITY));
    }

    #[test]
    fn test_progress_reported_once_per_row() {
        let recorder = Recorder {
            events: Mutex::new(Vec::new()),
        };
        let records = scatter(10);
        nearest_matching(&records, is_opposite_group, &SearchOptions::default(), &recorder).unwrap();
        let events = recorder.events.lock().unwrap();
        let expected: Vec<(usize, usize)> = (1..=10).map(|i| (i, 10)).collect();
        assert_eq!(*events, expected);
    }

    #[test]
    fn test_progress_reported_in_parallel() {
        let recorder = Recorder {
            events: Mutex::new(Vec::new()),
        };
        let records = scatter(25);
        let options = SearchOptions::builder().parallel(true).threads(4).build();
        nearest_matching(&records, is_opposite_group, &options, &recorder).unwrap();
        let mut done: Vec<usize> = recorder.events.lock().unwrap().iter().map(|e| e.0).collect();
        done.sort_unstable();
        assert_eq!(done, (1..=25).collect::<Vec<_>>());
    }

    #[test]
    fn test_count_sentinel() {
        let distances = vec![1.0, DEFAULT_SENTINEL_KM, 3.0, DEFAULT_SENTINEL_KM];
        assert_eq!(count_sentinel(distances, DEFAULT_SENTINEL_KM), 2);
        assert_eq!(count_sentinel(Vec::new(), DEFAULT_SENTINEL_KM), 0);
    }
}
