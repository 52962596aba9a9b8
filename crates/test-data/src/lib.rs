//! Test data generation for fitseg.
//!
//! This crate draws synthetic routes, rides them with athlete profiles and
//! places segment definitions along them, so the matcher and the update
//! pipeline can be exercised without real recordings.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_data::prelude::*;
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let generator = ProceduralGenerator::new();
//! let route = generator.generate_route(Region::CHARTREUSE.center(), 4000.0, 25.0, &Region::CHARTREUSE, &mut rng);
//! let definition = SegmentGenerator::new().extract_from_route("Hill", &route, 0.2, 0.6);
//! let track = generator.generate("morning", &route, &CyclistProfile::default(), &mut rng);
//! ```

pub mod config;
pub mod generators;
pub mod gpx;
pub mod profiles;
pub mod sources;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::config::{BoundingBox, Region, SeedConfig};
    pub use crate::generators::{SegmentExtractConfig, SegmentGenerator};
    pub use crate::gpx::generate_gpx;
    pub use crate::profiles::{
        AthleteProfile, CyclistProfile, RunnerProfile, heart_rate_at_grade, sample_variance,
        speed_at_grade,
    };
    pub use crate::sources::{ProceduralGenerator, TrackConfig, Waypoint, out_and_back};
    pub use rand::SeedableRng;
    pub use rand::rngs::StdRng;
}
