//! Cycling and running profiles.

use super::AthleteProfile;

/// Speed response to grade: linear on each side of flat, clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeResponse {
    /// Fraction of speed lost per unit of uphill grade.
    pub climb_penalty: f64,
    /// Fraction of speed gained per unit of downhill grade.
    pub descent_gain: f64,
    /// Lowest factor on steep climbs.
    pub floor: f64,
    /// Highest factor on steep descents.
    pub ceiling: f64,
}

impl GradeResponse {
    pub fn factor(&self, grade: f64) -> f64 {
        if grade >= 0.0 {
            (1.0 - grade * self.climb_penalty).max(self.floor)
        } else {
            (1.0 - grade * self.descent_gain).min(self.ceiling)
        }
    }
}

/// Gearing keeps descents fast, climbs hurt a lot.
const CYCLING: GradeResponse = GradeResponse {
    climb_penalty: 25.0,
    descent_gain: 15.0,
    floor: 0.15,
    ceiling: 2.5,
};

const RUNNING: GradeResponse = GradeResponse {
    climb_penalty: 15.0,
    descent_gain: 8.0,
    floor: 0.2,
    ceiling: 1.5,
};

/// A rider: ~28 km/h on the flat by default, 88 rpm.
#[derive(Debug, Clone)]
pub struct CyclistProfile {
    base_speed: f64,
    variance: f64,
    cadence: f64,
    response: GradeResponse,
}

impl Default for CyclistProfile {
    fn default() -> Self {
        Self {
            base_speed: 8.0,
            variance: 0.10,
            cadence: 88.0,
            response: CYCLING,
        }
    }
}

impl CyclistProfile {
    /// Flat speed given in km/h.
    pub fn with_speed(speed_kmh: f64) -> Self {
        Self {
            base_speed: speed_kmh / 3.6,
            ..Default::default()
        }
    }

    pub fn elite() -> Self {
        Self::with_speed(35.0)
    }

    pub fn recreational() -> Self {
        Self::with_speed(22.0)
    }

    /// Slow, irregular and low cadence.
    pub fn mountain_biker() -> Self {
        Self {
            base_speed: 5.0,
            variance: 0.15,
            cadence: 75.0,
            response: CYCLING,
        }
    }
}

impl AthleteProfile for CyclistProfile {
    fn base_speed_mps(&self) -> f64 {
        self.base_speed
    }

    fn grade_factor(&self, grade: f64) -> f64 {
        self.response.factor(grade)
    }

    fn variance(&self) -> f64 {
        self.variance
    }

    fn cadence_rpm(&self) -> f64 {
        self.cadence
    }
}

/// A runner: 5:00/km on the flat by default.
#[derive(Debug, Clone)]
pub struct RunnerProfile {
    base_speed: f64,
    variance: f64,
}

impl Default for RunnerProfile {
    fn default() -> Self {
        Self::with_pace(5.0)
    }
}

impl RunnerProfile {
    /// Flat pace given in minutes per kilometer.
    pub fn with_pace(pace_min_per_km: f64) -> Self {
        Self {
            base_speed: 1000.0 / (pace_min_per_km * 60.0),
            variance: 0.08,
        }
    }

    pub fn elite() -> Self {
        Self::with_pace(3.5)
    }

    pub fn recreational() -> Self {
        Self::with_pace(6.0)
    }
}

impl AthleteProfile for RunnerProfile {
    fn base_speed_mps(&self) -> f64 {
        self.base_speed
    }

    fn grade_factor(&self, grade: f64) -> f64 {
        RUNNING.factor(grade)
    }

    fn variance(&self) -> f64 {
        self.variance
    }

    /// Strides per minute, as FIT running dynamics report it (one foot).
    fn cadence_rpm(&self) -> f64 {
        86.0
    }

    fn heart_rate_range(&self) -> (f64, f64) {
        (120.0, 190.0)
    }
}
