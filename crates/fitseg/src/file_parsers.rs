//! Activity file decoders for FIT and GPX recordings.
//!
//! Both formats decode into a [`Track`] whose positions are in semicircles.
//! FIT records already carry semicircles and the full set of sensor channels;
//! GPX points are converted from degrees and carry position, time and a
//! cumulative distance computed along the way.

use std::fs;
use std::path::Path;

use fitparser::profile::field_types::MesgNum;
use geo::{Distance, Haversine, Point};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::errors::ParseError;
use crate::geometry::degrees_to_semicircles;
use crate::models::{Track, TrackPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Fit,
    Gpx,
    Other,
}

impl FileType {
    /// Sniff the format from the leading bytes of a file.
    pub fn detect_from_bytes(bytes: &[u8]) -> Self {
        // FIT: header size byte, then ".FIT" at offset 8
        if bytes.len() >= 12 && &bytes[8..12] == b".FIT" {
            return FileType::Fit;
        }

        let head = &bytes[..bytes.len().min(1024)];
        let head = String::from_utf8_lossy(head);
        if head.contains("<gpx") {
            FileType::Gpx
        } else {
            FileType::Other
        }
    }
}

/// Turns a recording on disk into a [`Track`].
pub trait TrackDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Track, ParseError>;
}

/// Reads FIT and GPX files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDecoder;

impl TrackDecoder for FileDecoder {
    fn decode(&self, path: &Path) -> Result<Track, ParseError> {
        let bytes = fs::read(path)?;
        decode_bytes(activity_name(path), &bytes)
    }
}

/// Activities are named after the file stem of their recording.
pub fn activity_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Decode a recording held in memory, detecting its format.
pub fn decode_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Track, ParseError> {
    let points = match FileType::detect_from_bytes(bytes) {
        FileType::Fit => parse_fit(bytes)?,
        FileType::Gpx => parse_gpx(bytes)?,
        FileType::Other => return Err(ParseError::UnsupportedFormat),
    };
    Track::new(name, points).ok_or(ParseError::Empty)
}

/// Parse a GPX file. Track points from every track and segment are
/// concatenated in file order.
pub fn parse_gpx(bytes: &[u8]) -> Result<Vec<TrackPoint>, ParseError> {
    let gpx = gpx::read(bytes).map_err(|e| ParseError::GpxError(e.to_string()))?;

    let mut points = Vec::new();
    let mut previous: Option<Point<f64>> = None;
    let mut cumulative = 0.0;

    for track in &gpx.tracks {
        for seg in &track.segments {
            for pt in &seg.points {
                let position = pt.point();
                let timestamp = pt
                    .time
                    .as_ref()
                    .and_then(|t| t.format().ok())
                    .and_then(|s| OffsetDateTime::parse(&s, &Rfc3339).ok())
                    .ok_or(ParseError::MissingField("time"))?;

                if let Some(prev) = previous {
                    cumulative += Haversine.distance(prev, position);
                }
                previous = Some(position);

                points.push(
                    TrackPoint::at(timestamp)
                        .with_position(
                            degrees_to_semicircles(position.y()),
                            degrees_to_semicircles(position.x()),
                        )
                        .with_distance(cumulative),
                );
            }
        }
    }

    Ok(points)
}

/// Parse a FIT file, keeping its `record` messages.
pub fn parse_fit(bytes: &[u8]) -> Result<Vec<TrackPoint>, ParseError> {
    let fit_data = fitparser::from_bytes(bytes).map_err(|e| ParseError::FitError(e.to_string()))?;

    let mut points = Vec::new();
    for record in fit_data {
        if record.kind() != MesgNum::Record {
            continue;
        }

        let mut timestamp: Option<OffsetDateTime> = None;
        let mut lat: Option<i32> = None;
        let mut lon: Option<i32> = None;
        let mut distance: Option<f64> = None;
        let mut speed: Option<f64> = None;
        let mut enhanced_speed: Option<f64> = None;
        let mut heart_rate: Option<f64> = None;
        let mut cadence: Option<f64> = None;
        let mut temperature: Option<f64> = None;

        for field in record.fields() {
            match field.name() {
                "timestamp" => {
                    if let fitparser::Value::Timestamp(t) = field.value() {
                        timestamp = chrono_to_offset_datetime(t);
                    }
                }
                "position_lat" => lat = extract_fit_i32(field.value()),
                "position_long" => lon = extract_fit_i32(field.value()),
                "distance" => distance = extract_fit_f64(field.value()),
                "speed" => speed = extract_fit_f64(field.value()),
                "enhanced_speed" => enhanced_speed = extract_fit_f64(field.value()),
                "heart_rate" => heart_rate = extract_fit_f64(field.value()),
                "cadence" => cadence = extract_fit_f64(field.value()),
                "temperature" => temperature = extract_fit_f64(field.value()),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(ParseError::MissingField("timestamp"))?;
        points.push(TrackPoint {
            latitude: lat,
            longitude: lon,
            distance,
            timestamp,
            heart_rate,
            cadence,
            speed: enhanced_speed.or(speed),
            temperature,
        });
    }

    Ok(points)
}

fn chrono_to_offset_datetime<Tz: chrono::TimeZone>(
    dt: &chrono::DateTime<Tz>,
) -> Option<OffsetDateTime> {
    let odt = OffsetDateTime::from_unix_timestamp(dt.timestamp()).ok()?;
    odt.replace_nanosecond(dt.timestamp_subsec_nanos()).ok()
}

/// Extract i32 from the integer FIT value types
fn extract_fit_i32(value: &fitparser::Value) -> Option<i32> {
    match value {
        fitparser::Value::SInt8(v) => Some(*v as i32),
        fitparser::Value::UInt8(v) => Some(*v as i32),
        fitparser::Value::SInt16(v) => Some(*v as i32),
        fitparser::Value::UInt16(v) => Some(*v as i32),
        fitparser::Value::SInt32(v) => Some(*v),
        fitparser::Value::UInt32(v) => i32::try_from(*v).ok(),
        _ => None,
    }
}

/// Extract f64 from various FIT value types
fn extract_fit_f64(value: &fitparser::Value) -> Option<f64> {
    match value {
        fitparser::Value::Float32(v) => Some(*v as f64),
        fitparser::Value::Float64(v) => Some(*v),
        fitparser::Value::SInt8(v) => Some(*v as f64),
        fitparser::Value::UInt8(v) => Some(*v as f64),
        fitparser::Value::SInt16(v) => Some(*v as f64),
        fitparser::Value::UInt16(v) => Some(*v as f64),
        fitparser::Value::SInt32(v) => Some(*v as f64),
        fitparser::Value::UInt32(v) => Some(*v as f64),
        _ => None,
    }
}
