//! Data acquisition sources for track generation.
//!
//! [`ProceduralGenerator`] rides synthetic routes and produces recordings
//! ready for the matcher.

mod procedural;

pub use procedural::{ProceduralGenerator, TrackConfig, Waypoint, out_and_back};
