//! Generators for segment definitions placed on synthetic routes.

mod segment;

pub use segment::{SegmentExtractConfig, SegmentGenerator};
