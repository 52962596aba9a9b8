//! Procedural track generation.
//!
//! A route is a list of [`Waypoint`]s in degrees. The generator rides it at a
//! profile's speed, one sample per interval, and produces a [`Track`] the
//! matcher can consume directly.

use fitseg::geometry::degrees_to_semicircles;
use fitseg::{Track, TrackPoint};
use geo::{Distance, Haversine, Point};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

use crate::config::BoundingBox;
use crate::profiles::{self, AthleteProfile};

/// A route vertex, in degrees, with its elevation in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
    pub elevation: f64,
}

impl Waypoint {
    pub const fn new(lat: f64, lon: f64, elevation: f64) -> Self {
        Self {
            lat,
            lon,
            elevation,
        }
    }

    fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// Configuration for procedural track generation.
#[derive(Debug, Clone)]
pub struct TrackConfig {
    /// Timestamp of the first sample.
    pub start_time: OffsetDateTime,
    /// Seconds between consecutive samples.
    pub sample_interval_s: i64,
    /// GPS position jitter standard deviation in meters.
    pub gps_jitter_m: f64,
    /// Record heart rate, cadence, speed and temperature.
    pub sensors: bool,
    /// Ambient temperature in degrees Celsius.
    pub temperature_c: f64,
    /// Portion of the samples (as fractions of the sample count) recorded
    /// without a GPS fix.
    pub gps_dropout: Option<(f64, f64)>,
    /// Probability of inserting a pause after a sample (0.0 - 1.0).
    pub pause_probability: f64,
    /// Duration range for pauses (min, max) in seconds.
    pub pause_duration_range: (i64, i64),
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            start_time: datetime!(2020-05-21 08:00:00 UTC),
            sample_interval_s: 1,
            gps_jitter_m: 3.0,
            sensors: true,
            temperature_c: 18.0,
            gps_dropout: None,
            pause_probability: 0.0,
            pause_duration_range: (30, 180),
        }
    }
}

/// Generates synthetic recordings with realistic characteristics.
#[derive(Debug, Clone, Default)]
pub struct ProceduralGenerator {
    config: TrackConfig,
}

impl ProceduralGenerator {
    /// Creates a new procedural generator with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timestamp of the first sample.
    pub fn with_start_time(mut self, start: OffsetDateTime) -> Self {
        self.config.start_time = start;
        self
    }

    /// Sets the sampling interval (at least one second).
    pub fn with_sample_interval(mut self, seconds: i64) -> Self {
        self.config.sample_interval_s = seconds.max(1);
        self
    }

    /// Sets GPS jitter amount.
    pub fn with_gps_jitter(mut self, meters: f64) -> Self {
        self.config.gps_jitter_m = meters;
        self
    }

    /// Sets the ambient temperature.
    pub fn with_temperature(mut self, celsius: f64) -> Self {
        self.config.temperature_c = celsius;
        self
    }

    /// Records position and time only.
    pub fn without_sensors(mut self) -> Self {
        self.config.sensors = false;
        self
    }

    /// Drops the GPS fix between two fractions of the recording.
    pub fn with_gps_dropout(mut self, from: f64, to: f64) -> Self {
        self.config.gps_dropout = Some((from, to));
        self
    }

    /// Sets pause parameters.
    pub fn with_pauses(mut self, probability: f64, min_sec: i64, max_sec: i64) -> Self {
        self.config.pause_probability = probability;
        self.config.pause_duration_range = (min_sec, max_sec.max(min_sec + 1));
        self
    }

    /// Rides `route` with `profile` and returns the recording.
    ///
    /// `None` when the route has fewer than two waypoints or the jitter is not
    /// a valid standard deviation.
    pub fn generate(
        &self,
        name: impl Into<String>,
        route: &[Waypoint],
        profile: &dyn AthleteProfile,
        rng: &mut impl Rng,
    ) -> Option<Track> {
        if route.len() < 2 {
            return None;
        }

        let jitter = Normal::new(0.0, self.config.gps_jitter_m / 111_000.0).ok()?;
        let hr_noise = Normal::new(0.0, 2.0).ok()?;
        let cadence_noise = Normal::new(0.0, 3.0).ok()?;
        let temp_noise = Normal::new(0.0, 0.3).ok()?;

        let variance = profiles::sample_variance(profile, rng);

        let samples = self.ride(route, profile, variance, rng);
        let count = samples.len();
        let mut points = Vec::with_capacity(count);
        for (idx, sample) in samples.into_iter().enumerate() {
            let mut point = TrackPoint::at(
                self.config.start_time + Duration::seconds(sample.elapsed_s),
            )
            .with_distance(sample.distance_m);

            if !self.in_dropout(idx, count) {
                point = point.with_position(
                    degrees_to_semicircles(sample.lat + jitter.sample(rng)),
                    degrees_to_semicircles(sample.lon + jitter.sample(rng)),
                );
            }

            if self.config.sensors {
                let hr = profiles::heart_rate_at_grade(profile, sample.grade) + hr_noise.sample(rng);
                let cadence =
                    profile.cadence_rpm() * (1.0 - sample.grade * 2.0) + cadence_noise.sample(rng);
                point = point
                    .with_heart_rate(hr.round())
                    .with_cadence(cadence.max(0.0).round())
                    .with_speed(sample.speed_mps)
                    .with_temperature(self.config.temperature_c + temp_noise.sample(rng));
            }
            points.push(point);
        }

        let track = Track::new(name, points)?;
        tracing::debug!(
            "Generated {} sample(s) over {}",
            count,
            track.duration()
        );
        Some(track)
    }

    /// Exact (unjittered) samples along the route.
    fn ride(
        &self,
        route: &[Waypoint],
        profile: &dyn AthleteProfile,
        variance: f64,
        rng: &mut impl Rng,
    ) -> Vec<Sample> {
        let interval = self.config.sample_interval_s;
        let mut elapsed_s = 0;
        let mut distance_m = 0.0;
        let mut samples = vec![Sample {
            lat: route[0].lat,
            lon: route[0].lon,
            elapsed_s,
            distance_m,
            grade: 0.0,
            speed_mps: 0.0,
        }];

        for leg in route.windows(2) {
            let (a, b) = (&leg[0], &leg[1]);
            let length = Haversine.distance(a.point(), b.point());
            if length <= 0.0 {
                continue;
            }
            let grade = (b.elevation - a.elevation) / length;
            let target = profiles::speed_at_grade(profile, grade, variance);

            // Whole samples per leg, so every sample lands on the interval
            let steps = (length / (target * interval as f64)).ceil().max(1.0) as usize;
            let step_m = length / steps as f64;
            let speed_mps = step_m / interval as f64;

            for k in 1..=steps {
                let frac = k as f64 / steps as f64;
                elapsed_s += interval;
                if rng.r#gen::<f64>() < self.config.pause_probability {
                    let (min, max) = self.config.pause_duration_range;
                    elapsed_s += rng.gen_range(min..max);
                }
                distance_m += step_m;
                samples.push(Sample {
                    lat: a.lat + (b.lat - a.lat) * frac,
                    lon: a.lon + (b.lon - a.lon) * frac,
                    elapsed_s,
                    distance_m,
                    grade,
                    speed_mps,
                });
            }
        }
        samples
    }

    fn in_dropout(&self, idx: usize, count: usize) -> bool {
        self.config.gps_dropout.is_some_and(|(from, to)| {
            let frac = idx as f64 / count as f64;
            frac >= from && frac < to
        })
    }

    /// Random walk route with some momentum, starting at `start` and staying
    /// inside `bounds`. Waypoints are about `spacing_m` apart.
    pub fn generate_route(
        &self,
        start: (f64, f64),
        distance_m: f64,
        spacing_m: f64,
        bounds: &BoundingBox,
        rng: &mut impl Rng,
    ) -> Vec<Waypoint> {
        let mut current = Waypoint::new(start.0, start.1, 300.0);
        let mut route = vec![current];
        let mut total_distance = 0.0;

        let mut heading = rng.gen_range(0.0..std::f64::consts::TAU);
        let mut grade: f64 = rng.gen_range(-0.03..0.06);

        while total_distance < distance_m {
            heading += rng.gen_range(-0.3..0.3);
            grade = (grade + rng.gen_range(-0.02..0.02)).clamp(-0.10, 0.12);

            let step = spacing_m * rng.gen_range(0.8..1.2);

            // 1 degree of latitude is roughly 111 km, longitude shrinks with latitude
            let lat_delta = (step * heading.cos()) / 111_000.0;
            let lon_delta = (step * heading.sin()) / (111_000.0 * current.lat.to_radians().cos());

            let (lat, lon, bounced_heading) =
                apply_bounds(bounds, current.lat + lat_delta, current.lon + lon_delta, heading);
            heading = bounced_heading;

            current = Waypoint::new(lat, lon, (current.elevation + grade * step).max(0.0));
            route.push(current);
            total_distance += step;
        }

        route
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    lat: f64,
    lon: f64,
    elapsed_s: i64,
    distance_m: f64,
    grade: f64,
    speed_mps: f64,
}

/// `route` ridden to its end and back, `repeats` times.
pub fn out_and_back(route: &[Waypoint], repeats: usize) -> Vec<Waypoint> {
    let mut out = Vec::new();
    for _ in 0..repeats {
        out.extend(route.iter().copied());
        out.extend(route.iter().rev().skip(1).copied());
    }
    out
}

/// Applies bounds checking with heading reversal.
fn apply_bounds(b: &BoundingBox, lat: f64, lon: f64, heading: f64) -> (f64, f64, f64) {
    let mut new_heading = heading;

    let lat = if lat < b.min_lat {
        new_heading = std::f64::consts::PI - heading;
        b.min_lat + (b.min_lat - lat).min(0.001)
    } else if lat > b.max_lat {
        new_heading = std::f64::consts::PI - heading;
        b.max_lat - (lat - b.max_lat).min(0.001)
    } else {
        lat
    };

    let lon = if lon < b.min_lon {
        new_heading = -heading;
        b.min_lon + (b.min_lon - lon).min(0.001)
    } else if lon > b.max_lon {
        new_heading = -heading;
        b.max_lon - (lon - b.max_lon).min(0.001)
    } else {
        lon
    };

    (lat, lon, new_heading)
}
