//! Generated recordings run through the decoder, the matcher and the update
//! driver.

use std::path::PathBuf;

use fitseg::file_parsers::decode_bytes;
use fitseg::{Config, JsonStore, Repository, SegmentDefinition, SegmentMatcher, TraceWriters};
use test_data::prelude::*;

/// About 1.1 km due north, a waypoint every ~111 m.
fn straight_route() -> Vec<Waypoint> {
    (0..=10)
        .map(|i| Waypoint::new(45.0 + f64::from(i) * 0.001, 5.7, 300.0))
        .collect()
}

fn steady() -> ProceduralGenerator {
    ProceduralGenerator::new().with_gps_jitter(0.0)
}

fn attempts_on(track: &fitseg::Track, definition: &SegmentDefinition) -> usize {
    SegmentMatcher::default()
        .match_track(track, [definition], &mut TraceWriters::disabled())
        .unwrap()
        .len()
}

#[test]
fn test_generated_gpx_decodes_back() {
    let mut rng = StdRng::seed_from_u64(1);
    let track = steady()
        .generate("morning", &straight_route(), &CyclistProfile::default(), &mut rng)
        .unwrap();

    let decoded = decode_bytes("morning", &generate_gpx(&track)).unwrap();

    assert_eq!(decoded.points().len(), track.points().len());
    assert_eq!(decoded.start_time(), track.start_time());
    assert_eq!(decoded.duration(), track.duration());
    assert!(decoded.gps_available());
    let last = decoded.points().last().and_then(|p| p.distance).unwrap();
    assert!((last - 1112.0).abs() < 5.0);
}

#[test]
fn test_out_and_back_twice_gives_two_attempts() {
    let route = straight_route();
    let definition = SegmentGenerator::new().between("Out", &route[2], &route[8]);
    let mut rng = StdRng::seed_from_u64(2);
    let track = steady()
        .generate("laps", &out_and_back(&route, 2), &CyclistProfile::default(), &mut rng)
        .unwrap();

    assert_eq!(attempts_on(&track, &definition), 2);
}

#[test]
fn test_gps_dropout_inside_segment_still_matches() {
    let route = straight_route();
    let definition = SegmentGenerator::new().between("Tunnel", &route[1], &route[9]);
    let mut rng = StdRng::seed_from_u64(3);
    let track = steady()
        .with_gps_dropout(0.4, 0.6)
        .generate("tunnel", &route, &RunnerProfile::default(), &mut rng)
        .unwrap();
    assert!(track.points().iter().any(|p| p.position().is_none()));

    let attempts = SegmentMatcher::default()
        .match_track(&track, [&definition], &mut TraceWriters::disabled())
        .unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].heart_rate.is_some());
}

#[test]
fn test_route_ending_before_stop_gate_gives_nothing() {
    let route = straight_route();
    let beyond = Waypoint::new(45.03, 5.7, 300.0);
    let definition = SegmentGenerator::new().between("Too far", &route[2], &beyond);
    let mut rng = StdRng::seed_from_u64(4);
    let track = steady()
        .generate("short", &route, &CyclistProfile::default(), &mut rng)
        .unwrap();

    assert_eq!(attempts_on(&track, &definition), 0);
}

#[test]
fn test_seeded_dataset_through_update() {
    let data = tempfile::tempdir().unwrap();
    let traces = tempfile::tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(12345);

    let region = Region::CHARTREUSE;
    let generator = ProceduralGenerator::new();
    let route = generator.generate_route(region.center(), 4000.0, 25.0, &region, &mut rng);
    let definition = SegmentGenerator::new()
        .extract_from_route("Seeded", &route, 0.2, 0.5)
        .unwrap();
    JsonStore::new(data.path())
        .save_segment_definitions(std::slice::from_ref(&definition))
        .unwrap();

    let mut paths: Vec<PathBuf> = Vec::new();
    for i in 0..3 {
        let name = format!("ride-{i}");
        let track = ProceduralGenerator::new()
            .with_start_time(TrackConfig::default().start_time + time::Duration::days(i))
            .generate(&name, &route, &CyclistProfile::default(), &mut rng)
            .unwrap();
        let path = data.path().join(format!("{name}.gpx"));
        std::fs::write(&path, generate_gpx(&track)).unwrap();
        paths.push(path);
    }

    let config = Config {
        data_dir: data.path().to_path_buf(),
        trace_dir: traces.path().to_path_buf(),
        ..Config::default()
    };
    let summary = fitseg::run_update(&config, &paths).unwrap();
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failed, 0);
    assert!(summary.attempts_found >= 3);

    let store = JsonStore::new(data.path());
    let activities = store.load_activities().unwrap();
    assert_eq!(activities.len(), 3);
    assert!(
        activities
            .iter()
            .all(|a| a.matched_against_segments.contains(definition.uid()))
    );

    let rerun = fitseg::run_update(&config, &paths).unwrap();
    assert_eq!(rerun.processed, 0);
    assert_eq!(rerun.skipped, 3);
}
