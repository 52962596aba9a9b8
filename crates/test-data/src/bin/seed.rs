//! Seed script - writes a reproducible demo dataset
//!
//! Run with:
//! ```
//! cargo run -p test-data --bin seed
//! fitseg --data-dir ./demo ./demo/recordings/*.gpx
//! ```

use std::path::Path;

use anyhow::{Context, bail};
use fitseg::{JsonStore, Repository};
use test_data::prelude::*;
use time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = seed_config()?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let generator = ProceduralGenerator::new();
    let route = generator.generate_route(
        config.region.center(),
        6000.0,
        25.0,
        &config.region,
        &mut rng,
    );

    let segments = SegmentGenerator::new().with_tolerance(0.0005);
    let span = 0.8 / config.segment_count.max(1) as f64;
    let mut definitions = Vec::new();
    for k in 0..config.segment_count {
        let from = 0.1 + k as f64 * span;
        let name = format!("Segment {}", k + 1);
        match segments.extract_from_route(&name, &route, from, from + span * 0.8) {
            Some(definition) => definitions.push(definition),
            None => tracing::warn!("{name}: route portion too short or too long, skipped"),
        }
    }
    definitions.extend(segments.extract_climbs(&route));
    if definitions.is_empty() {
        bail!("no segment could be placed on the generated route");
    }

    let recordings = config.output_dir.join("recordings");
    std::fs::create_dir_all(&recordings)
        .with_context(|| format!("creating {}", recordings.display()))?;

    let start = TrackConfig::default().start_time;
    let cyclist = CyclistProfile::default();
    let runner = RunnerProfile::default();
    let mut written = 0;
    for i in 0..config.ride_count + config.run_count {
        let (kind, profile): (&str, &dyn AthleteProfile) = if i < config.ride_count {
            ("ride", &cyclist)
        } else {
            ("run", &runner)
        };
        let name = format!("{kind}-{:02}", i + 1);
        let generator = ProceduralGenerator::new()
            .with_start_time(start + Duration::days(i as i64) + Duration::minutes(17 * i as i64))
            .with_pauses(0.002, 20, 90);
        let Some(track) = generator.generate(&name, &route, profile, &mut rng) else {
            tracing::warn!("{name}: nothing generated");
            continue;
        };
        write_recording(&recordings, &name, &track)?;
        written += 1;
    }

    JsonStore::new(&config.output_dir).save_segment_definitions(&definitions)?;
    let settings = config.output_dir.join("seed_config.json");
    std::fs::write(&settings, serde_json::to_string_pretty(&config)?)
        .with_context(|| format!("writing {}", settings.display()))?;

    tracing::info!("Seed completed!");
    tracing::info!("  Output: {}", config.output_dir.display());
    tracing::info!("  Segments: {}", definitions.len());
    tracing::info!("  Recordings: {written}");

    Ok(())
}

fn write_recording(dir: &Path, name: &str, track: &fitseg::Track) -> anyhow::Result<()> {
    let path = dir.join(format!("{name}.gpx"));
    std::fs::write(&path, generate_gpx(track))
        .with_context(|| format!("writing {}", path.display()))
}

/// Defaults overridden by `SEED_OUTPUT_DIR`, `SEED`, `SEED_RIDES`, `SEED_RUNS`
/// and `SEED_SEGMENTS`.
fn seed_config() -> anyhow::Result<SeedConfig> {
    let mut config = SeedConfig::default();
    if let Ok(dir) = std::env::var("SEED_OUTPUT_DIR") {
        config.output_dir = dir.into();
    }
    if let Some(seed) = env_number("SEED")? {
        config.seed = seed;
    }
    if let Some(count) = env_number("SEED_RIDES")? {
        config.ride_count = count;
    }
    if let Some(count) = env_number("SEED_RUNS")? {
        config.run_count = count;
    }
    if let Some(count) = env_number("SEED_SEGMENTS")? {
        config.segment_count = count;
    }
    Ok(config)
}

fn env_number<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .with_context(|| format!("{key}={value} is not a number")),
        Err(_) => Ok(None),
    }
}
