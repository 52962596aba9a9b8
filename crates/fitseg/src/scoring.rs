//! Time-weighted summary statistics over the sensor channels of an attempt.

use time::OffsetDateTime;

use crate::errors::MetricError;
use crate::models::{Metric, TrackPoint};

/// A sensor channel that can be summarised over an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    HeartRate,
    Cadence,
    /// Reported in km/h, recorded in m/s
    Speed,
    Temperature,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::HeartRate,
        Channel::Cadence,
        Channel::Speed,
        Channel::Temperature,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::HeartRate => "heart_rate",
            Channel::Cadence => "cadence",
            Channel::Speed => "speed",
            Channel::Temperature => "temperature",
        }
    }

    /// The channel value of a sample, in reporting units.
    pub fn sample(self, point: &TrackPoint) -> Option<f64> {
        match self {
            Channel::HeartRate => point.heart_rate,
            Channel::Cadence => point.cadence,
            Channel::Speed => point.speed.map(|mps| mps * 3.6),
            Channel::Temperature => point.temperature,
        }
    }
}

pub trait TrackMetric {
    type Score;
    fn next_point(&mut self, point: &TrackPoint);
    fn finish(&mut self) -> Self::Score;
}

/// Each sample is held until the next one: the later value of every pair of
/// consecutive points counts once per whole second between them.
///
/// Statistics are accumulated with weighted Welford updates, which gives the
/// same result as expanding the repeated samples.
#[derive(Debug, Clone)]
struct ChannelMetric {
    channel: Channel,
    last_timestamp: Option<OffsetDateTime>,
    count: u64,
    mean: f64,
    m2: f64,
    lower: f64,
    upper: f64,
}

impl ChannelMetric {
    fn new(channel: Channel) -> Self {
        Self {
            channel,
            last_timestamp: None,
            count: 0,
            mean: 0.0,
            m2: 0.0,
            lower: f64::INFINITY,
            upper: f64::NEG_INFINITY,
        }
    }

    fn push(&mut self, value: f64, weight: u64) {
        self.count += weight;
        let delta = value - self.mean;
        self.mean += weight as f64 * delta / self.count as f64;
        self.m2 += weight as f64 * delta * (value - self.mean);
        self.lower = self.lower.min(value);
        self.upper = self.upper.max(value);
    }
}

impl TrackMetric for ChannelMetric {
    type Score = Result<Metric, MetricError>;

    fn next_point(&mut self, point: &TrackPoint) {
        if let Some(prev) = self.last_timestamp {
            let weight = (point.timestamp - prev).whole_seconds();
            if weight > 0
                && let Some(value) = self.channel.sample(point)
            {
                self.push(value, weight as u64);
            }
        }
        self.last_timestamp = Some(point.timestamp);
    }

    fn finish(&mut self) -> Self::Score {
        if self.count < 2 {
            return Err(MetricError::NotEnoughSamples {
                samples: self.count as usize,
            });
        }
        let variance = (self.m2 / (self.count - 1) as f64).max(0.0);
        Ok(Metric {
            avg: self.mean,
            lower: self.lower,
            upper: self.upper,
            stdev: variance.sqrt(),
        })
    }
}

/// Summarise `channel` over `points`.
///
/// `Ok(None)` when any point lacks the channel: a partial metric is never
/// produced. Spans whose weighted population has fewer than two samples are
/// an error; callers guard against them.
pub fn compute_metric(
    channel: Channel,
    points: &[TrackPoint],
) -> Result<Option<Metric>, MetricError> {
    if points.iter().any(|p| channel.sample(p).is_none()) {
        return Ok(None);
    }

    let mut acc = ChannelMetric::new(channel);
    for point in points {
        acc.next_point(point);
    }
    acc.finish().map(Some)
}
