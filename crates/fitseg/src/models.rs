use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::geometry::{degrees_to_semicircles, semicircles_to_degrees};

/// One sampled instant of a recording.
///
/// Positions are in semicircles. Every sensor channel may be missing on any
/// given sample.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub latitude: Option<i32>,
    pub longitude: Option<i32>,
    /// Cumulative distance in meters
    pub distance: Option<f64>,
    pub timestamp: OffsetDateTime,
    /// Beats per minute
    pub heart_rate: Option<f64>,
    /// Revolutions or steps per minute
    pub cadence: Option<f64>,
    /// Meters per second
    pub speed: Option<f64>,
    /// Degrees Celsius
    pub temperature: Option<f64>,
}

impl TrackPoint {
    /// A sample with a timestamp and nothing else.
    pub fn at(timestamp: OffsetDateTime) -> Self {
        Self {
            latitude: None,
            longitude: None,
            distance: None,
            timestamp,
            heart_rate: None,
            cadence: None,
            speed: None,
            temperature: None,
        }
    }

    pub fn with_position(mut self, latitude: i32, longitude: i32) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_distance(mut self, meters: f64) -> Self {
        self.distance = Some(meters);
        self
    }

    pub fn with_heart_rate(mut self, bpm: f64) -> Self {
        self.heart_rate = Some(bpm);
        self
    }

    pub fn with_cadence(mut self, rpm: f64) -> Self {
        self.cadence = Some(rpm);
        self
    }

    pub fn with_speed(mut self, mps: f64) -> Self {
        self.speed = Some(mps);
        self
    }

    pub fn with_temperature(mut self, celsius: f64) -> Self {
        self.temperature = Some(celsius);
        self
    }

    /// `(latitude, longitude)` when the sample has a GPS fix.
    pub fn position(&self) -> Option<(i32, i32)> {
        Some((self.latitude?, self.longitude?))
    }
}

/// A decoded recording. Points are in time order.
#[derive(Debug, Clone)]
pub struct Track {
    name: String,
    points: Vec<TrackPoint>,
    gps_available: bool,
}

impl Track {
    /// Returns `None` for a recording without any sample.
    pub fn new(name: impl Into<String>, points: Vec<TrackPoint>) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let gps_available = points.iter().any(|p| p.position().is_some());
        Some(Self {
            name: name.into(),
            points,
            gps_available,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn gps_available(&self) -> bool {
        self.gps_available
    }

    pub fn start_time(&self) -> OffsetDateTime {
        self.points[0].timestamp
    }

    pub fn duration(&self) -> Duration {
        self.points[self.points.len() - 1].timestamp - self.start_time()
    }
}

/// One end of a segment definition, in semicircles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefinitionPoint {
    pub latitude: i32,
    pub longitude: i32,
    pub altitude: f64,
    pub tolerance: f64,
}

impl DefinitionPoint {
    pub fn from_degrees(latitude: f64, longitude: f64, altitude: f64, tolerance: f64) -> Self {
        Self {
            latitude: degrees_to_semicircles(latitude),
            longitude: degrees_to_semicircles(longitude),
            altitude,
            tolerance,
        }
    }

    pub fn position(&self) -> (i32, i32) {
        (self.latitude, self.longitude)
    }

    /// `(longitude, latitude)` in degrees, the order trace files use.
    pub fn lon_lat_degrees(&self) -> (f64, f64) {
        (
            semicircles_to_degrees(self.longitude),
            semicircles_to_degrees(self.latitude),
        )
    }
}

/// A start/stop gate to search for in every track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SegmentDefinitionRecord", into = "SegmentDefinitionRecord")]
pub struct SegmentDefinition {
    pub name: String,
    pub debug: bool,
    start: DefinitionPoint,
    stop: DefinitionPoint,
    uid: String,
}

impl SegmentDefinition {
    pub fn new(
        name: impl Into<String>,
        start: DefinitionPoint,
        stop: DefinitionPoint,
        debug: bool,
    ) -> Self {
        let uid = geometry_uid(&start, &stop);
        Self {
            name: name.into(),
            debug,
            start,
            stop,
            uid,
        }
    }

    pub fn start(&self) -> &DefinitionPoint {
        &self.start
    }

    pub fn stop(&self) -> &DefinitionPoint {
        &self.stop
    }

    /// Stable identity of the gate geometry. Attempts reference it.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// File-name friendly version of the name (word characters only).
    pub fn tag(&self) -> String {
        self.name
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_')
            .collect()
    }
}

/// SHA-256 over the encoded endpoints, name excluded: a rename keeps the
/// recorded attempts attached.
fn geometry_uid(start: &DefinitionPoint, stop: &DefinitionPoint) -> String {
    let mut canonical = String::new();
    for point in [start, stop] {
        let _ = write!(
            canonical,
            "{}:{}:{}:{};",
            point.latitude, point.longitude, point.altitude, point.tolerance
        );
    }

    let digest = Sha256::digest(canonical.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Endpoint as authored in `segment_definitions.json`, in degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AuthoredPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub tolerance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDefinitionRecord {
    #[serde(default)]
    pub debug: bool,
    pub name: String,
    pub start: AuthoredPoint,
    pub stop: AuthoredPoint,
}

impl From<AuthoredPoint> for DefinitionPoint {
    fn from(p: AuthoredPoint) -> Self {
        DefinitionPoint::from_degrees(p.latitude, p.longitude, p.altitude, p.tolerance)
    }
}

impl From<DefinitionPoint> for AuthoredPoint {
    fn from(p: DefinitionPoint) -> Self {
        AuthoredPoint {
            latitude: semicircles_to_degrees(p.latitude),
            longitude: semicircles_to_degrees(p.longitude),
            altitude: p.altitude,
            tolerance: p.tolerance,
        }
    }
}

impl From<SegmentDefinitionRecord> for SegmentDefinition {
    fn from(record: SegmentDefinitionRecord) -> Self {
        SegmentDefinition::new(
            record.name,
            record.start.into(),
            record.stop.into(),
            record.debug,
        )
    }
}

impl From<SegmentDefinition> for SegmentDefinitionRecord {
    fn from(definition: SegmentDefinition) -> Self {
        SegmentDefinitionRecord {
            debug: definition.debug,
            name: definition.name,
            start: definition.start.into(),
            stop: definition.stop.into(),
        }
    }
}

/// Summary statistics of one sensor channel over one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub avg: f64,
    pub lower: f64,
    pub upper: f64,
    pub stdev: f64,
}

/// One detected traversal of a segment definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub segment_uid: String,
    /// Name of the definition at match time, for display only
    #[serde(default)]
    pub segment_name: String,
    pub activity_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "seconds")]
    pub duration: Duration,
    /// Cumulative distance between the gates. 0 when either gate point
    /// carries no cumulative distance.
    #[serde(default)]
    pub distance_km: f64,
    pub heart_rate: Option<Metric>,
    pub cadence: Option<Metric>,
    pub speed: Option<Metric>,
    pub temperature: Option<Metric>,
}

/// One processed recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    pub year: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "seconds")]
    pub duration: Duration,
    #[serde(default = "default_gps_available")]
    pub gps_available: bool,
    /// Uids of every segment definition this activity has been searched for
    #[serde(default)]
    pub matched_against_segments: BTreeSet<String>,
}

fn default_gps_available() -> bool {
    true
}

impl Activity {
    pub fn from_track(track: &Track, matched_against_segments: BTreeSet<String>) -> Self {
        let start_time = track.start_time();
        Self {
            name: track.name().to_string(),
            year: start_time.year(),
            start_time,
            duration: track.duration(),
            gps_available: track.gps_available(),
            matched_against_segments,
        }
    }
}

/// Durations as a count of seconds. Any JSON number is accepted back.
mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(duration.whole_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::seconds(secs as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn gate(lat: f64, lon: f64) -> DefinitionPoint {
        DefinitionPoint::from_degrees(lat, lon, 300.0, 0.0005)
    }

    #[test]
    fn test_uid_survives_rename() {
        let a = SegmentDefinition::new("Col de la Croix", gate(45.1, 5.7), gate(45.2, 5.8), false);
        let b = SegmentDefinition::new("Croix (renamed)", gate(45.1, 5.7), gate(45.2, 5.8), true);
        assert_eq!(a.uid(), b.uid());
        assert_eq!(a.uid().len(), 64);
    }

    #[test]
    fn test_uid_rotates_with_geometry() {
        let a = SegmentDefinition::new("Climb", gate(45.1, 5.7), gate(45.2, 5.8), false);
        let moved = SegmentDefinition::new("Climb", gate(45.1, 5.7), gate(45.2, 5.81), false);
        let swapped = SegmentDefinition::new("Climb", gate(45.2, 5.8), gate(45.1, 5.7), false);
        assert_ne!(a.uid(), moved.uid());
        assert_ne!(a.uid(), swapped.uid());
    }

    #[test]
    fn test_definition_json_is_in_degrees() {
        let json = r#"{
            "debug": true,
            "name": "Côte de Sainte-Agnès",
            "start": {"latitude": 45.0, "longitude": 5.5, "altitude": 250.0, "tolerance": 0.0005},
            "stop": {"latitude": 45.01, "longitude": 5.52, "altitude": 600.0, "tolerance": 0.0005}
        }"#;
        let definition: SegmentDefinition = serde_json::from_str(json).unwrap();
        assert!(definition.debug);
        assert_eq!(definition.start().latitude, degrees_to_semicircles(45.0));
        assert_eq!(definition.stop().longitude, degrees_to_semicircles(5.52));
        assert_eq!(definition.tag(), "CôtedeSainteAgnès");

        let back = serde_json::to_value(&definition).unwrap();
        let lat = back["start"]["latitude"].as_f64().unwrap();
        assert!((lat - 45.0).abs() <= 1e-6);
        assert!(back.get("uid").is_none());
    }

    #[test]
    fn test_track_gps_available() {
        let t = datetime!(2020-05-21 08:11:47 UTC);
        let no_fix = Track::new("a", vec![TrackPoint::at(t)]).unwrap();
        assert!(!no_fix.gps_available());

        let half_fix = TrackPoint {
            latitude: Some(10),
            ..TrackPoint::at(t)
        };
        let still_no_fix = Track::new("b", vec![half_fix]).unwrap();
        assert!(!still_no_fix.gps_available());

        let fix = Track::new("c", vec![TrackPoint::at(t).with_position(10, 20)]).unwrap();
        assert!(fix.gps_available());

        assert!(Track::new("empty", Vec::new()).is_none());
    }

    #[test]
    fn test_activity_json_round_trip() {
        let t0 = datetime!(2020-05-24 10:42:18 UTC);
        let points = vec![
            TrackPoint::at(t0).with_position(1, 1),
            TrackPoint::at(t0 + Duration::seconds(3725)).with_position(2, 2),
        ];
        let track = Track::new("2020-05-24-10-42-18", points).unwrap();
        let activity = Activity::from_track(&track, BTreeSet::from(["abc".to_string()]));
        assert_eq!(activity.year, 2020);

        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["duration"], 3725);
        assert_eq!(json["start_time"], "2020-05-24T10:42:18Z");
        assert_eq!(json["matched_against_segments"][0], "abc");

        let back: Activity = serde_json::from_value(json).unwrap();
        assert_eq!(back, activity);
    }

    #[test]
    fn test_attempt_json_nulls_and_fractional_seconds() {
        let json = r#"{
            "segment_uid": "u",
            "activity_name": "2020-05-24-10-42-18",
            "start_time": "2020-05-24T11:02:00+02:00",
            "duration": 754.0,
            "heart_rate": {"avg": 150.0, "lower": 120.0, "upper": 171.0, "stdev": 9.5},
            "cadence": null,
            "speed": null,
            "temperature": null
        }"#;
        let attempt: Attempt = serde_json::from_str(json).unwrap();
        assert_eq!(attempt.duration, Duration::seconds(754));
        assert_eq!(attempt.heart_rate.unwrap().upper, 171.0);
        assert!(attempt.cadence.is_none());
        assert_eq!(attempt.distance_km, 0.0);

        let out = serde_json::to_value(&attempt).unwrap();
        assert!(out["speed"].is_null());
        assert_eq!(out["duration"], 754);
    }

    #[test]
    fn test_legacy_activity_defaults() {
        let json = r#"{
            "name": "old",
            "year": 2019,
            "start_time": "2019-06-01T07:00:00+00:00",
            "duration": 60
        }"#;
        let activity: Activity = serde_json::from_str(json).unwrap();
        assert!(activity.gps_available);
        assert!(activity.matched_against_segments.is_empty());
    }
}
