//! Runtime configuration, read from the environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use time::Duration;

/// Parameters of the segment matcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchConfig {
    /// Candidate radius around a gate, in semicircles (5000 is roughly 45 m)
    pub threshold: f64,
    /// Candidates closer in time than this belong to the same crossing
    pub cluster_gap: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 5000.0,
            cluster_gap: Duration::seconds(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding segment_definitions.json, activities.json and segments.json
    pub data_dir: PathBuf,
    /// Directory receiving the per-segment timing and debug traces
    pub trace_dir: PathBuf,
    /// Flush collections to disk every N processed tracks
    pub checkpoint_every: usize,
    /// Write the per-point distance dumps
    pub dump_distances: bool,
    pub matching: MatchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            trace_dir: PathBuf::from("."),
            checkpoint_every: 10,
            dump_distances: false,
            matching: MatchConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let data_dir = env::var("FITSEG_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let trace_dir = env::var("FITSEG_TRACE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.trace_dir);

        let checkpoint_every =
            parse_var("FITSEG_CHECKPOINT_EVERY", defaults.checkpoint_every).max(1);
        let threshold = parse_var("FITSEG_THRESHOLD", defaults.matching.threshold);
        let gap_secs = parse_var(
            "FITSEG_CLUSTER_GAP_SECS",
            defaults.matching.cluster_gap.whole_seconds(),
        );

        Self {
            data_dir,
            trace_dir,
            checkpoint_every,
            dump_distances: defaults.dump_distances,
            matching: MatchConfig {
                threshold,
                cluster_gap: Duration::seconds(gap_secs),
            },
        }
    }
}

fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {key}={raw}, using {default}");
            default
        }),
        Err(_) => default,
    }
}
