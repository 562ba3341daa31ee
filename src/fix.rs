use std::fmt;

use serde::Serialize;

use crate::position::Position;

/// Seconds since the Unix epoch (UTC), with the sentence's fractional seconds.
pub type Timestamp = f64;

/// One snapshot of position/velocity. The same shape is used for what the
/// parser produces and what the filter publishes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Fix {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    /// knots
    pub speed: f64,
    /// degrees true, [0, 360)
    pub course: f64,
    #[serde(skip)]
    pub timestamp: Timestamp,
    #[serde(skip)]
    pub valid: bool,
}

pub type RawFix = Fix;
pub type FilteredFix = Fix;

impl Fix {
    pub fn new(latitude: f64, longitude: f64, speed: f64, course: f64, timestamp: Timestamp) -> Self {
        Self {
            latitude,
            longitude,
            speed,
            course,
            timestamp,
            valid: true,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude)
    }
}

impl fmt::Display for Fix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.valid {
            return write!(f, "no fix");
        }
        write!(
            f,
            "{} {:.2} kn @ {:.1}°",
            self.position(),
            self.speed,
            self.course
        )
    }
}
