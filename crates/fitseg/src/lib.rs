pub mod activity_queue;
pub mod config;
pub mod errors;
pub mod file_parsers;
pub mod geometry;
pub mod matcher;
pub mod models;
pub mod scoring;
pub mod segment_matching;
pub mod storage;
pub mod traces;

use std::path::PathBuf;

pub use crate::{
    activity_queue::{ActivityQueue, BatchSummary},
    config::{Config, MatchConfig},
    errors::{AppError, MetricError, ParseError, Result, StorageError},
    file_parsers::{FileDecoder, TrackDecoder},
    matcher::SegmentMatcher,
    models::{Activity, Attempt, DefinitionPoint, Metric, SegmentDefinition, Track, TrackPoint},
    storage::{JsonStore, Repository},
    traces::TraceWriters,
};

/// Process `paths` against the collections in `config.data_dir`, writing
/// traces to `config.trace_dir`.
pub fn run_update(config: &Config, paths: &[PathBuf]) -> Result<BatchSummary> {
    let store = JsonStore::new(&config.data_dir);
    let mut queue = ActivityQueue::load(store, FileDecoder, config)?;

    std::fs::create_dir_all(&config.trace_dir)?;
    let mut traces =
        TraceWriters::new(&config.trace_dir).with_distance_dump(config.dump_distances);

    queue.process(paths, &mut traces)
}
