//! Segment matching: finding candidate points near a gate, collapsing bursts of
//! candidates into virtual points, and pairing virtual starts with stops.
//!
//! Everything here is a pure function over slices so each stage can be tested
//! on its own.

use time::Duration;

use crate::geometry::distance;
use crate::models::TrackPoint;

/// Which end of a segment a virtual point stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Start,
    Stop,
}

/// A track point close to one segment endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedTrackPoint<'a> {
    pub track_point: &'a TrackPoint,
    /// Truncated planar distance to the endpoint, in semicircles
    pub dist_to_segment: i64,
    /// Index in the sequence the candidate was found in
    pub index_in_track: usize,
    /// Set once the point has been selected as a virtual point
    pub category: Option<Category>,
}

/// Every point of `points` with a GPS fix closer than `threshold` to `reference`.
///
/// An empty result means the endpoint was never approached.
pub fn find_candidates(
    points: &[TrackPoint],
    reference: (i32, i32),
    threshold: f64,
) -> Vec<MatchedTrackPoint<'_>> {
    points
        .iter()
        .enumerate()
        .filter_map(|(idx, point)| {
            let dist = distance(point.position()?, reference);
            (dist < threshold).then_some(MatchedTrackPoint {
                track_point: point,
                dist_to_segment: dist as i64,
                index_in_track: idx,
                category: None,
            })
        })
        .collect()
}

/// Sort candidates by time and split them into maximal runs where consecutive
/// timestamps are strictly less than `max_gap` apart.
pub fn cluster_by_time<'a>(
    candidates: &[MatchedTrackPoint<'a>],
    max_gap: Duration,
) -> Vec<Vec<MatchedTrackPoint<'a>>> {
    let mut sorted = candidates.to_vec();
    sorted.sort_by_key(|c| c.track_point.timestamp);

    let mut clusters: Vec<Vec<MatchedTrackPoint<'a>>> = Vec::new();
    for candidate in sorted {
        let new_cluster = clusters.last().and_then(|c| c.last()).is_none_or(|last| {
            candidate.track_point.timestamp - last.track_point.timestamp >= max_gap
        });
        if new_cluster {
            clusters.push(vec![candidate]);
        } else if let Some(current) = clusters.last_mut() {
            current.push(candidate);
        }
    }

    tracing::debug!("Track points form {} group(s)", clusters.len());
    clusters
}

/// One representative per cluster: the candidate closest to the endpoint, the
/// earliest one on ties. Selected points are tagged with `category`.
pub fn select_virtual_points<'a>(
    candidates: &[MatchedTrackPoint<'a>],
    category: Category,
    max_gap: Duration,
) -> Vec<MatchedTrackPoint<'a>> {
    cluster_by_time(candidates, max_gap)
        .into_iter()
        .filter_map(|cluster| {
            let closest = cluster.into_iter().min_by_key(|c| c.dist_to_segment)?;
            tracing::debug!(
                "Closest distance is {}, at {}",
                closest.dist_to_segment,
                closest.track_point.timestamp
            );
            Some(MatchedTrackPoint {
                category: Some(category),
                ..closest
            })
        })
        .collect()
}

/// Pair virtual starts with virtual stops.
///
/// Starts and stops are merged in time order (stable, starts first on equal
/// timestamps) and only immediately consecutive start-then-stop pairs count.
/// Unmatched starts and stray stops are dropped.
pub fn get_challenges<'a>(
    start_candidates: &[MatchedTrackPoint<'a>],
    stop_candidates: &[MatchedTrackPoint<'a>],
    max_gap: Duration,
) -> Vec<(MatchedTrackPoint<'a>, MatchedTrackPoint<'a>)> {
    let mut ordered = select_virtual_points(start_candidates, Category::Start, max_gap);
    ordered.extend(select_virtual_points(stop_candidates, Category::Stop, max_gap));
    ordered.sort_by_key(|c| c.track_point.timestamp);

    ordered
        .windows(2)
        .filter(|pair| {
            pair[0].category == Some(Category::Start) && pair[1].category == Some(Category::Stop)
        })
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect()
}
