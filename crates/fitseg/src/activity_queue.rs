//! Batch driver: decides which tracks need (re)processing, matches them, and
//! checkpoints the collections.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::config::Config;
use crate::errors::Result;
use crate::file_parsers::{TrackDecoder, activity_name};
use crate::matcher::SegmentMatcher;
use crate::models::{Activity, Attempt, SegmentDefinition};
use crate::storage::Repository;
use crate::traces::TraceWriters;

/// Counters for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Tracks decoded and matched
    pub processed: usize,
    /// Tracks skipped without decoding
    pub skipped: usize,
    /// Tracks whose decoding failed
    pub failed: usize,
    pub attempts_found: usize,
    pub stale_attempts_pruned: usize,
    pub checkpoints: usize,
}

/// A track that needs work, and the definitions it still has to be searched
/// for (indices into the loaded definitions).
#[derive(Debug)]
struct Plan<'p> {
    path: &'p Path,
    name: String,
    residual: Vec<usize>,
}

pub struct ActivityQueue<R, D> {
    repo: R,
    decoder: D,
    matcher: SegmentMatcher,
    checkpoint_every: usize,
    definitions: Vec<SegmentDefinition>,
    activities: Vec<Activity>,
    attempts: Vec<Attempt>,
}

impl<R: Repository, D: TrackDecoder> ActivityQueue<R, D> {
    /// Load the three collections from `repo`.
    pub fn load(repo: R, decoder: D, config: &Config) -> Result<Self> {
        let definitions = repo.load_segment_definitions()?;
        let activities = repo.load_activities()?;
        let attempts = repo.load_attempts()?;
        tracing::info!(
            "Loaded {} segment definition(s), {} activities, {} attempt(s)",
            definitions.len(),
            activities.len(),
            attempts.len()
        );

        Ok(Self {
            repo,
            decoder,
            matcher: SegmentMatcher::new(config.matching),
            checkpoint_every: config.checkpoint_every.max(1),
            definitions,
            activities,
            attempts,
        })
    }

    pub fn definitions(&self) -> &[SegmentDefinition] {
        &self.definitions
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    /// Drop attempts referencing a definition that no longer exists (deleted,
    /// or moved and therefore given a new uid). Returns how many were dropped.
    pub fn prune_stale_attempts(&mut self) -> usize {
        let current: HashSet<&str> = self.definitions.iter().map(|d| d.uid()).collect();
        let before = self.attempts.len();
        self.attempts
            .retain(|a| current.contains(a.segment_uid.as_str()));
        let pruned = before - self.attempts.len();
        if pruned > 0 {
            tracing::info!("Pruned {pruned} attempt(s) of removed segment definitions");
        }
        pruned
    }

    /// Process `paths` in order, then write the collections back.
    ///
    /// Decoding failures are logged and the file skipped. Storage and trace
    /// errors abort the batch; whatever was checkpointed before stays on disk.
    pub fn process(
        &mut self,
        paths: &[PathBuf],
        traces: &mut TraceWriters,
    ) -> Result<BatchSummary> {
        let mut summary = BatchSummary {
            stale_attempts_pruned: self.prune_stale_attempts(),
            ..BatchSummary::default()
        };

        let plans = self.plan(paths, &mut summary);
        tracing::info!(
            "{} track(s) to process, {} skipped",
            plans.len(),
            summary.skipped
        );

        let mut chunks = plans.chunks(self.checkpoint_every).peekable();
        while let Some(chunk) = chunks.next() {
            let decoder = &self.decoder;
            let decoded: Vec<_> = chunk
                .par_iter()
                .map(|plan| decoder.decode(plan.path))
                .collect();

            for (plan, track) in chunk.iter().zip(decoded) {
                let track = match track {
                    Ok(track) => track,
                    Err(e) => {
                        tracing::error!("Failed to decode {}: {e}", plan.path.display());
                        summary.failed += 1;
                        continue;
                    }
                };
                tracing::info!("Processing {}", plan.name);

                let found = self.matcher.match_track(
                    &track,
                    plan.residual.iter().map(|&i| &self.definitions[i]),
                    traces,
                )?;
                summary.attempts_found += found.len();
                summary.processed += 1;

                // The record always lists every current definition, even
                // though only the residual ones were searched this time.
                let searched: BTreeSet<String> =
                    self.definitions.iter().map(|d| d.uid().to_string()).collect();
                self.activities.retain(|a| a.name != plan.name);
                self.activities.push(Activity::from_track(&track, searched));
                self.attempts.extend(found);
            }

            if chunks.peek().is_some() {
                self.checkpoint(traces)?;
                summary.checkpoints += 1;
            }
        }

        self.checkpoint(traces)?;
        summary.checkpoints += 1;
        Ok(summary)
    }

    /// Persist activities and attempts and flush the trace files.
    pub fn checkpoint(&self, traces: &mut TraceWriters) -> Result<()> {
        self.repo.save_activities(&self.activities)?;
        self.repo.save_attempts(&self.attempts)?;
        traces.flush()?;
        tracing::info!(
            "Checkpoint: {} activities, {} attempt(s) saved",
            self.activities.len(),
            self.attempts.len()
        );
        Ok(())
    }

    fn plan<'p>(&self, paths: &'p [PathBuf], summary: &mut BatchSummary) -> Vec<Plan<'p>> {
        let mut seen = HashSet::new();
        let mut plans = Vec::new();

        for path in paths {
            let name = activity_name(path);
            if !seen.insert(name.clone()) {
                tracing::debug!("{} listed more than once", path.display());
                continue;
            }

            let residual: Vec<usize> = match self.activities.iter().find(|a| a.name == name) {
                Some(activity) if !activity.gps_available => {
                    tracing::debug!("{name}: no GPS data, skipping");
                    summary.skipped += 1;
                    continue;
                }
                Some(activity) => self
                    .definitions
                    .iter()
                    .enumerate()
                    .filter(|(_, d)| !activity.matched_against_segments.contains(d.uid()))
                    .map(|(i, _)| i)
                    .collect(),
                None => (0..self.definitions.len()).collect(),
            };

            if residual.is_empty() {
                tracing::debug!("{name}: already searched for every segment");
                summary.skipped += 1;
                continue;
            }
            plans.push(Plan {
                path,
                name,
                residual,
            });
        }
        plans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ParseError, StorageError};
    use crate::models::{DefinitionPoint, Track, TrackPoint};
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::Duration;
    use time::macros::datetime;

    #[derive(Default)]
    struct MemoryRepo {
        definitions: Vec<SegmentDefinition>,
        activities: RefCell<Vec<Activity>>,
        attempts: RefCell<Vec<Attempt>>,
        saves: Cell<usize>,
    }

    impl Repository for MemoryRepo {
        fn load_segment_definitions(&self) -> Result<Vec<SegmentDefinition>, StorageError> {
            Ok(self.definitions.clone())
        }

        fn load_activities(&self) -> Result<Vec<Activity>, StorageError> {
            Ok(self.activities.borrow().clone())
        }

        fn load_attempts(&self) -> Result<Vec<Attempt>, StorageError> {
            Ok(self.attempts.borrow().clone())
        }

        fn save_segment_definitions(
            &self,
            _definitions: &[SegmentDefinition],
        ) -> Result<(), StorageError> {
            Ok(())
        }

        fn save_activities(&self, activities: &[Activity]) -> Result<(), StorageError> {
            self.saves.set(self.saves.get() + 1);
            *self.activities.borrow_mut() = activities.to_vec();
            Ok(())
        }

        fn save_attempts(&self, attempts: &[Attempt]) -> Result<(), StorageError> {
            *self.attempts.borrow_mut() = attempts.to_vec();
            Ok(())
        }
    }

    /// Serves tracks by activity name and counts decode calls.
    #[derive(Default)]
    struct FakeDecoder {
        tracks: HashMap<String, Track>,
        calls: AtomicUsize,
    }

    impl TrackDecoder for FakeDecoder {
        fn decode(&self, path: &Path) -> Result<Track, ParseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tracks
                .get(&activity_name(path))
                .cloned()
                .ok_or(ParseError::UnsupportedFormat)
        }
    }

    fn gate(lat: i32) -> DefinitionPoint {
        DefinitionPoint {
            latitude: lat,
            longitude: 0,
            altitude: 0.0,
            tolerance: 0.0,
        }
    }

    fn first() -> SegmentDefinition {
        SegmentDefinition::new("First", gate(0), gate(1_000_000), false)
    }

    fn second() -> SegmentDefinition {
        SegmentDefinition::new("Second", gate(2_000_000), gate(3_000_000), false)
    }

    /// Rides through both segments, one minute between gates.
    fn ride(name: &str) -> Track {
        let t0 = datetime!(2020-05-21 08:00:00 UTC);
        let points = [0, 1_000_000, 2_000_000, 3_000_000]
            .iter()
            .enumerate()
            .map(|(i, &lat)| {
                TrackPoint::at(t0 + Duration::minutes(i as i64))
                    .with_position(lat, 0)
                    .with_heart_rate(130.0)
            })
            .collect();
        Track::new(name, points).unwrap()
    }

    fn decoder(names: &[&str]) -> FakeDecoder {
        FakeDecoder {
            tracks: names.iter().map(|n| (n.to_string(), ride(n))).collect(),
            ..FakeDecoder::default()
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("{n}.fit"))).collect()
    }

    fn known_activity(name: &str, uids: &[&str], gps_available: bool) -> Activity {
        Activity {
            name: name.to_string(),
            year: 2020,
            start_time: datetime!(2020-05-21 08:00:00 UTC),
            duration: Duration::minutes(3),
            gps_available,
            matched_against_segments: uids.iter().map(|u| u.to_string()).collect(),
        }
    }

    fn all_uids() -> BTreeSet<String> {
        [first(), second()]
            .iter()
            .map(|d| d.uid().to_string())
            .collect()
    }

    #[test]
    fn test_new_track_searched_for_every_definition() {
        let repo = MemoryRepo {
            definitions: vec![first(), second()],
            ..MemoryRepo::default()
        };
        let mut queue = ActivityQueue::load(repo, decoder(&["a"]), &Config::default()).unwrap();

        let summary = queue
            .process(&paths(&["a"]), &mut TraceWriters::disabled())
            .unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.attempts_found, 2);

        let saved = queue.repo.activities.borrow();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].matched_against_segments, all_uids());
        assert_eq!(queue.repo.attempts.borrow().len(), 2);
    }

    #[test]
    fn test_fully_searched_track_is_not_decoded() {
        let uids: Vec<String> = all_uids().into_iter().collect();
        let uid_refs: Vec<&str> = uids.iter().map(String::as_str).collect();
        let repo = MemoryRepo {
            definitions: vec![first(), second()],
            activities: RefCell::new(vec![known_activity("a", &uid_refs, true)]),
            ..MemoryRepo::default()
        };
        let mut queue = ActivityQueue::load(repo, decoder(&["a"]), &Config::default()).unwrap();

        let summary = queue
            .process(&paths(&["a"]), &mut TraceWriters::disabled())
            .unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(queue.decoder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(queue.activities().len(), 1);
    }

    #[test]
    fn test_only_residual_definitions_are_searched() {
        let old = first();
        let previous_attempt = Attempt {
            segment_uid: old.uid().to_string(),
            segment_name: old.name.clone(),
            activity_name: "a".to_string(),
            start_time: datetime!(2020-05-21 08:00:00 UTC),
            duration: Duration::minutes(1),
            distance_km: 0.0,
            heart_rate: None,
            cadence: None,
            speed: None,
            temperature: None,
        };
        let repo = MemoryRepo {
            definitions: vec![first(), second()],
            activities: RefCell::new(vec![known_activity("a", &[old.uid()], true)]),
            attempts: RefCell::new(vec![previous_attempt]),
            ..MemoryRepo::default()
        };
        let mut queue = ActivityQueue::load(repo, decoder(&["a"]), &Config::default()).unwrap();

        let summary = queue
            .process(&paths(&["a"]), &mut TraceWriters::disabled())
            .unwrap();
        assert_eq!(summary.attempts_found, 1);

        let names: Vec<_> = queue
            .attempts()
            .iter()
            .map(|a| a.segment_name.as_str())
            .collect();
        assert_eq!(names, vec!["First", "Second"]);
        assert_eq!(queue.activities().len(), 1);
        assert_eq!(queue.activities()[0].matched_against_segments, all_uids());
    }

    #[test]
    fn test_track_without_gps_is_skipped() {
        let repo = MemoryRepo {
            definitions: vec![first(), second()],
            activities: RefCell::new(vec![known_activity("indoor", &[], false)]),
            ..MemoryRepo::default()
        };
        let mut queue =
            ActivityQueue::load(repo, decoder(&["indoor"]), &Config::default()).unwrap();

        let summary = queue
            .process(&paths(&["indoor"]), &mut TraceWriters::disabled())
            .unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(queue.decoder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stale_attempts_are_pruned() {
        let stale = Attempt {
            segment_uid: "deleted".to_string(),
            segment_name: "Gone".to_string(),
            activity_name: "a".to_string(),
            start_time: datetime!(2019-01-01 00:00:00 UTC),
            duration: Duration::minutes(5),
            distance_km: 1.0,
            heart_rate: None,
            cadence: None,
            speed: None,
            temperature: None,
        };
        let repo = MemoryRepo {
            definitions: vec![first()],
            attempts: RefCell::new(vec![stale]),
            ..MemoryRepo::default()
        };
        let mut queue = ActivityQueue::load(repo, decoder(&[]), &Config::default()).unwrap();

        let summary = queue.process(&[], &mut TraceWriters::disabled()).unwrap();
        assert_eq!(summary.stale_attempts_pruned, 1);
        assert_eq!(summary.checkpoints, 1);
        assert!(queue.repo.attempts.borrow().is_empty());
    }

    #[test]
    fn test_decode_failure_skips_file() {
        let repo = MemoryRepo {
            definitions: vec![first()],
            ..MemoryRepo::default()
        };
        let mut queue = ActivityQueue::load(repo, decoder(&["b"]), &Config::default()).unwrap();

        let summary = queue
            .process(&paths(&["broken", "b"]), &mut TraceWriters::disabled())
            .unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.processed, 1);
        let names: Vec<_> = queue.activities().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn test_checkpoints_every_n_tracks() {
        let names: Vec<String> = (0..25).map(|i| format!("ride-{i:02}")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let repo = MemoryRepo {
            definitions: vec![first()],
            ..MemoryRepo::default()
        };
        let config = Config {
            checkpoint_every: 10,
            ..Config::default()
        };
        let mut queue = ActivityQueue::load(repo, decoder(&name_refs), &config).unwrap();

        let summary = queue
            .process(&paths(&name_refs), &mut TraceWriters::disabled())
            .unwrap();
        assert_eq!(summary.processed, 25);
        assert_eq!(summary.checkpoints, 3);
        assert_eq!(queue.repo.saves.get(), 3);

        // Results keep the input order despite the parallel decode
        let saved: Vec<_> = queue
            .repo
            .activities
            .borrow()
            .iter()
            .map(|a| a.name.clone())
            .collect();
        assert_eq!(saved, names);
    }

    #[test]
    fn test_duplicate_paths_processed_once() {
        let repo = MemoryRepo {
            definitions: vec![first()],
            ..MemoryRepo::default()
        };
        let mut queue = ActivityQueue::load(repo, decoder(&["a"]), &Config::default()).unwrap();

        let mut input = paths(&["a"]);
        input.push(PathBuf::from("elsewhere/a.fit"));
        let summary = queue.process(&input, &mut TraceWriters::disabled()).unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(queue.decoder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(queue.attempts().len(), 1);
    }
}
