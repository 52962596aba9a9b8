//! Configuration types for test data generation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Geographic bounding box defined by southwest and northeast corners.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum latitude (south)
    pub min_lat: f64,
    /// Minimum longitude (west)
    pub min_lon: f64,
    /// Maximum latitude (north)
    pub max_lat: f64,
    /// Maximum longitude (east)
    pub max_lon: f64,
}

impl BoundingBox {
    pub const fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Returns a random point within the bounding box.
    pub fn random_point(&self, rng: &mut impl rand::Rng) -> (f64, f64) {
        let lat = rng.gen_range(self.min_lat..self.max_lat);
        let lon = rng.gen_range(self.min_lon..self.max_lon);
        (lat, lon)
    }

    /// Returns the center of the bounding box.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// Pre-defined geographic regions for test data generation.
#[derive(Debug, Clone, Copy)]
pub struct Region;

impl Region {
    /// Chartreuse / Grenoble foothills - short steep climbs.
    pub const CHARTREUSE: BoundingBox = BoundingBox::new(45.15, 5.65, 45.40, 5.90);

    /// Boulder, CO area - popular fitness trails with varied terrain.
    pub const BOULDER: BoundingBox = BoundingBox::new(39.9, -105.5, 40.1, -105.2);
}

/// Configuration for the `seed` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Directory receiving segment_definitions.json and the GPX recordings.
    pub output_dir: PathBuf,

    /// Number of rides to generate.
    pub ride_count: usize,

    /// Number of runs to generate.
    pub run_count: usize,

    /// Number of segment definitions to place along the route.
    pub segment_count: usize,

    /// Region the route is drawn in.
    pub region: BoundingBox,

    /// RNG seed, for reproducible output.
    pub seed: u64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./demo"),
            ride_count: 6,
            run_count: 3,
            segment_count: 3,
            region: Region::CHARTREUSE,
            seed: 12345,
        }
    }
}
