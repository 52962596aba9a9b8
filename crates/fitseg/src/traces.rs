//! Per-segment CSV side output.
//!
//! * `<tag>_timings.csv`: `<track>,<km>,<minutes>` for every attempt.
//! * `<tag>_debug_start.csv`: for definitions with `debug` set, the two gate
//!   positions followed by the matched start/stop positions of every attempt,
//!   as `<lon>,<lat>,<label>` in degrees. Loads straight into a map viewer.
//! * `csv/distances.<track>.<tag>.csv`: optional per-point distance dump.
//!
//! Files are opened lazily, once per definition, in append mode. Lines are not
//! de-duplicated: reprocessing the same track twice writes its lines twice.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};
use time::Duration;
use time::format_description::well_known::Rfc3339;

use crate::geometry::{distance, semicircles_to_degrees};
use crate::models::{SegmentDefinition, TrackPoint};

pub struct TraceWriters {
    dir: Option<PathBuf>,
    dump_distances: bool,
    timings: HashMap<String, Writer<File>>,
    debug: HashMap<String, Writer<File>>,
}

impl TraceWriters {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            dump_distances: false,
            timings: HashMap::new(),
            debug: HashMap::new(),
        }
    }

    /// Writers that drop everything.
    pub fn disabled() -> Self {
        Self {
            dir: None,
            dump_distances: false,
            timings: HashMap::new(),
            debug: HashMap::new(),
        }
    }

    pub fn with_distance_dump(mut self, enabled: bool) -> Self {
        self.dump_distances = enabled;
        self
    }

    pub fn record_timing(
        &mut self,
        definition: &SegmentDefinition,
        track_name: &str,
        distance_km: f64,
        duration: Duration,
    ) -> io::Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let writer = match self.timings.entry(definition.uid().to_string()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let path = dir.join(format!("{}_timings.csv", definition.tag()));
                e.insert(csv_writer(open_append(&path)?))
            }
        };
        let minutes = duration.as_seconds_f64() / 60.0;
        writer.write_record([
            track_name,
            format!("{distance_km:.2}").as_str(),
            format!("{minutes:.2}").as_str(),
        ])?;
        Ok(())
    }

    /// Append the matched start and stop positions of one attempt.
    ///
    /// Both points come from the GPS-filtered sequence; a point without a fix
    /// is skipped rather than written as garbage.
    pub fn record_debug(
        &mut self,
        definition: &SegmentDefinition,
        track_name: &str,
        start: &TrackPoint,
        stop: &TrackPoint,
    ) -> io::Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let writer = match self.debug.entry(definition.uid().to_string()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let path = dir.join(format!("{}_debug_start.csv", definition.tag()));
                e.insert(open_debug(&path, definition)?)
            }
        };
        for point in [start, stop] {
            if let Some((lat, lon)) = point.position() {
                writer.write_record([
                    semicircles_to_degrees(lon).to_string().as_str(),
                    semicircles_to_degrees(lat).to_string().as_str(),
                    track_name,
                ])?;
            }
        }
        Ok(())
    }

    /// Write `index,timestamp,dist_to_start,dist_to_stop` for every point of
    /// `points`, replacing any previous dump for this track and definition.
    pub fn dump_distances(
        &self,
        track_name: &str,
        definition: &SegmentDefinition,
        points: &[TrackPoint],
    ) -> io::Result<()> {
        let Some(dir) = self.dir.as_ref().filter(|_| self.dump_distances) else {
            return Ok(());
        };
        if points.is_empty() {
            return Ok(());
        }

        let csv_dir = dir.join("csv");
        fs::create_dir_all(&csv_dir)?;
        let track_tag: String = track_name.chars().filter(char::is_ascii_digit).collect();
        let path = csv_dir.join(format!("distances.{}.{}.csv", track_tag, definition.tag()));

        let mut out = csv_writer(File::create(path)?);
        for (idx, point) in points.iter().enumerate() {
            let Some(position) = point.position() else {
                continue;
            };
            let timestamp = point
                .timestamp
                .format(&Rfc3339)
                .unwrap_or_else(|_| point.timestamp.to_string());
            out.write_record([
                idx.to_string(),
                timestamp,
                (distance(position, definition.start().position()) as i64).to_string(),
                (distance(position, definition.stop().position()) as i64).to_string(),
            ])?;
        }
        out.flush()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        for writer in self.timings.values_mut().chain(self.debug.values_mut()) {
            writer.flush()?;
        }
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Headerless, so appending to an existing file stays valid.
fn csv_writer(file: File) -> Writer<File> {
    WriterBuilder::new().has_headers(false).from_writer(file)
}

/// A new debug file starts with the gate positions themselves.
fn open_debug(path: &Path, definition: &SegmentDefinition) -> io::Result<Writer<File>> {
    let existed = path.exists();
    let mut writer = csv_writer(open_append(path)?);
    if !existed {
        for (gate, suffix) in [(definition.start(), "start"), (definition.stop(), "stop")] {
            let (lon, lat) = gate.lon_lat_degrees();
            writer.write_record([
                lon.to_string(),
                lat.to_string(),
                format!("{}-{suffix}", definition.name),
            ])?;
        }
    }
    Ok(writer)
}
