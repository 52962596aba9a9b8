//! Athletic performance profiles.
//!
//! Profiles define realistic speeds, grade factors and sensor readings for
//! different activity types. They are used by the track generator to produce
//! realistic timestamps and sensor channels.

mod sports;

pub use sports::{CyclistProfile, GradeResponse, RunnerProfile};

/// Trait for athletic performance profiles.
///
/// Profiles determine realistic speeds based on activity type and terrain.
/// Implementations should provide:
/// - Base speed on flat terrain
/// - Grade factor (speed multiplier based on slope)
/// - Day-to-day variance
/// - Typical cadence
pub trait AthleteProfile: Send + Sync {
    /// Base speed on flat terrain in meters per second.
    fn base_speed_mps(&self) -> f64;

    /// Speed multiplier for a given grade (expressed as a fraction, e.g., 0.05 = 5% grade).
    ///
    /// Returns a value between 0 and 2+:
    /// - < 1.0 means slower than base (uphill)
    /// - > 1.0 means faster than base (downhill)
    fn grade_factor(&self, grade: f64) -> f64;

    /// Day-to-day performance variance as a coefficient of variation (0.0 - 1.0).
    ///
    /// A value of 0.1 means typical day-to-day variation of ±10%.
    fn variance(&self) -> f64;

    /// Cadence on flat terrain, in rpm (pedal or stride).
    fn cadence_rpm(&self) -> f64;

    /// Heart rate range (easy, maximal) in bpm.
    fn heart_rate_range(&self) -> (f64, f64) {
        (105.0, 185.0)
    }
}

/// Speed on a given grade once the day's variance factor is applied.
pub fn speed_at_grade(profile: &dyn AthleteProfile, grade: f64, variance_factor: f64) -> f64 {
    let base = profile.base_speed_mps();
    let factor = profile.grade_factor(grade);
    let target = base * factor;

    // Minimum 0.5 m/s to avoid division issues
    (target * variance_factor).max(0.5)
}

/// Heart rate for a given grade: climbing pushes toward the maximum,
/// descending back toward the easy end.
pub fn heart_rate_at_grade(profile: &dyn AthleteProfile, grade: f64) -> f64 {
    let (easy, max) = profile.heart_rate_range();
    let effort = (0.55 + grade * 4.0).clamp(0.3, 1.0);
    easy + (max - easy) * effort
}

/// Samples a variance factor from normal distribution.
/// Returns a multiplier around 1.0.
pub fn sample_variance(profile: &dyn AthleteProfile, rng: &mut impl rand::Rng) -> f64 {
    use rand_distr::{Distribution, Normal};

    match Normal::new(1.0, profile.variance()) {
        Ok(normal) if profile.variance() > 0.0 => normal.sample(rng).clamp(0.7, 1.4),
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heart_rate_follows_grade() {
        let profile = CyclistProfile::default();
        let flat = heart_rate_at_grade(&profile, 0.0);
        let climb = heart_rate_at_grade(&profile, 0.08);
        let descent = heart_rate_at_grade(&profile, -0.08);
        assert!(descent < flat && flat < climb);
        assert!(climb <= profile.heart_rate_range().1);
    }

    #[test]
    fn test_speed_floor() {
        let profile = RunnerProfile::default();
        assert_eq!(speed_at_grade(&profile, 0.5, 0.7), 0.5);
    }
}
