//! Segment definition extraction from routes.

use fitseg::{DefinitionPoint, SegmentDefinition};
use geo::{Distance, Haversine};

use crate::sources::Waypoint;

/// Configuration for segment extraction.
#[derive(Debug, Clone)]
pub struct SegmentExtractConfig {
    /// Minimum segment length in meters.
    pub min_length_m: f64,
    /// Maximum segment length in meters.
    pub max_length_m: f64,
    /// Minimum elevation gain to be considered a climb (meters).
    pub min_climb_gain_m: f64,
}

impl Default for SegmentExtractConfig {
    fn default() -> Self {
        Self {
            min_length_m: 200.0,
            max_length_m: 5000.0,
            min_climb_gain_m: 10.0,
        }
    }
}

/// Generates segment definitions whose gates sit on a route.
#[derive(Debug, Clone, Default)]
pub struct SegmentGenerator {
    config: SegmentExtractConfig,
    tolerance: f64,
    debug: bool,
}

impl SegmentGenerator {
    /// Creates a new segment generator with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator with custom configuration.
    pub fn with_config(config: SegmentExtractConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Tolerance stored on every generated gate.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Generated definitions request debug traces.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// A definition gated on two waypoints.
    pub fn between(
        &self,
        name: impl Into<String>,
        start: &Waypoint,
        stop: &Waypoint,
    ) -> SegmentDefinition {
        SegmentDefinition::new(name, self.gate(start), self.gate(stop), self.debug)
    }

    /// Extracts a segment from a portion of a route.
    ///
    /// # Arguments
    /// * `name` - Segment name
    /// * `route` - Full route
    /// * `start_fraction` - Start position as fraction of the waypoints (0.0 - 1.0)
    /// * `end_fraction` - End position as fraction of the waypoints (0.0 - 1.0)
    pub fn extract_from_route(
        &self,
        name: impl Into<String>,
        route: &[Waypoint],
        start_fraction: f64,
        end_fraction: f64,
    ) -> Option<SegmentDefinition> {
        if route.len() < 2 || start_fraction >= end_fraction {
            return None;
        }

        let start_idx = (start_fraction * route.len() as f64) as usize;
        let end_idx = ((end_fraction * route.len() as f64) as usize).min(route.len());

        if end_idx <= start_idx + 1 {
            return None;
        }

        self.from_waypoints(name, &route[start_idx..end_idx])
    }

    /// A definition from the first to the last waypoint, if the path between
    /// them has an acceptable length.
    pub fn from_waypoints(
        &self,
        name: impl Into<String>,
        waypoints: &[Waypoint],
    ) -> Option<SegmentDefinition> {
        let (first, last) = (waypoints.first()?, waypoints.last()?);
        let length = path_length(waypoints);
        if length < self.config.min_length_m || length > self.config.max_length_m {
            return None;
        }
        Some(self.between(name, first, last))
    }

    /// Automatically finds and extracts climb segments from a route.
    ///
    /// Identifies uphill sections that meet the minimum gain threshold.
    pub fn extract_climbs(&self, route: &[Waypoint]) -> Vec<SegmentDefinition> {
        if route.len() < 3 {
            return Vec::new();
        }

        let mut segments = Vec::new();
        let mut climb_start: Option<usize> = None;
        let mut current_gain = 0.0;
        let mut current_loss = 0.0;

        for i in 1..route.len() {
            let delta = route[i].elevation - route[i - 1].elevation;

            if delta > 0.0 {
                if climb_start.is_none() {
                    climb_start = Some(i - 1);
                    current_gain = 0.0;
                    current_loss = 0.0;
                }
                current_gain += delta;
            } else if delta < 0.0 {
                current_loss += -delta;

                // A significant loss of elevation ends the climb
                if current_loss > self.config.min_climb_gain_m / 2.0 {
                    if let Some(start) = climb_start
                        && current_gain >= self.config.min_climb_gain_m
                    {
                        let name = format!("Climb {}", segments.len() + 1);
                        if let Some(seg) = self.from_waypoints(name, &route[start..i]) {
                            segments.push(seg);
                        }
                    }
                    climb_start = None;
                    current_gain = 0.0;
                    current_loss = 0.0;
                }
            }
        }

        // Handle climb at end of route
        if let Some(start) = climb_start
            && current_gain >= self.config.min_climb_gain_m
        {
            let name = format!("Climb {}", segments.len() + 1);
            if let Some(seg) = self.from_waypoints(name, &route[start..]) {
                segments.push(seg);
            }
        }

        segments
    }

    fn gate(&self, waypoint: &Waypoint) -> DefinitionPoint {
        DefinitionPoint::from_degrees(
            waypoint.lat,
            waypoint.lon,
            waypoint.elevation,
            self.tolerance,
        )
    }
}

fn path_length(waypoints: &[Waypoint]) -> f64 {
    waypoints
        .windows(2)
        .map(|w| {
            Haversine.distance(
                geo::Point::new(w[0].lon, w[0].lat),
                geo::Point::new(w[1].lon, w[1].lat),
            )
        })
        .sum()
}
