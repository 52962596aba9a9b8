//! Planar distance proxy and angular unit conversions.
//!
//! Positions are kept in the FIT fixed-point encoding ("semicircles"), where
//! 2^31 semicircles = 180 degrees. Matching never converts back to degrees.

const SEMICIRCLES_PER_HALF_TURN: f64 = 2_147_483_648.0;

/// Convert degrees to semicircles, truncating toward zero.
pub fn degrees_to_semicircles(degrees: f64) -> i32 {
    // Scale by the power of two first so semicircles -> degrees -> semicircles
    // is exact.
    (degrees * SEMICIRCLES_PER_HALF_TURN / 180.0) as i32
}

/// Convert FIT semicircles to degrees.
pub fn semicircles_to_degrees(semicircles: i32) -> f64 {
    semicircles as f64 * 180.0 / SEMICIRCLES_PER_HALF_TURN
}

/// Euclidean norm of the (longitude, latitude) delta, in semicircles.
///
/// Not a geodesic distance: one unit of longitude shrinks with latitude. It is
/// only used against a threshold that is large compared to GPS noise.
pub fn distance(position: (i32, i32), reference: (i32, i32)) -> f64 {
    let d_lat = position.0 as f64 - reference.0 as f64;
    let d_lon = position.1 as f64 - reference.1 as f64;
    (d_lat * d_lat + d_lon * d_lon).sqrt()
}
