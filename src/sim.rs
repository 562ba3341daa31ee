//! Synthetic receiver output.
//!
//! [`SimulatedBoat`] sails a track of fixed-course legs with a slowly
//! oscillating speed, and [`rmc_sentence`] renders each fix the way a
//! receiver would put it on the wire.

use chrono::{DateTime, Utc};

use crate::config::KNOTS_TO_MPS;
use crate::fix::{Fix, Timestamp};
use crate::nmea::checksum;
use crate::position::{Position, normalize_degrees};

/// `ddmm.mmmmmm` (or `dddmm.mmmmmm`) and hemisphere letter.
fn nmea_coordinate(value: f64, width: usize, positive: char, negative: char) -> (String, char) {
    let abs = value.abs();
    let mut degrees = abs.trunc();
    let mut minutes = ((abs - degrees) * 60.0 * 1e6).round() / 1e6;
    if minutes >= 60.0 {
        degrees += 1.0;
        minutes -= 60.0;
    }
    let hemisphere = if value < 0.0 { negative } else { positive };
    (
        format!("{:0width$}{:09.6}", degrees as u32, minutes, width = width),
        hemisphere,
    )
}

/// One complete RMC sentence, CR/LF terminated, with a correct checksum.
/// Invalid fixes render as a void (`V`) sentence with empty position fields.
pub fn rmc_sentence(fix: &Fix) -> String {
    let millis = (fix.timestamp * 1000.0).round() as i64;
    let (time, date) = DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| {
            (
                dt.format("%H%M%S%.3f").to_string(),
                dt.format("%d%m%y").to_string(),
            )
        })
        .unwrap_or_default();

    let body = if fix.valid {
        let (lat, ns) = nmea_coordinate(fix.latitude, 2, 'N', 'S');
        let (lon, ew) = nmea_coordinate(fix.longitude, 3, 'E', 'W');
        format!(
            "GPRMC,{},A,{},{},{},{},{:.2},{:.2},{},,,A",
            time, lat, ns, lon, ew, fix.speed, fix.course, date
        )
    } else {
        format!("GPRMC,{},V,,,,,,,{},,,N", time, date)
    };

    format!("${}*{:02X}\r\n", body, checksum(body.as_bytes()))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Leg {
    /// degrees true
    pub course: f64,
    /// seconds
    pub duration: f64,
}

impl Leg {
    pub const fn new(course: f64, duration: f64) -> Self {
        Self { course, duration }
    }
}

/// Endless fix generator. Legs repeat in order; speed swings between
/// `base_speed` and `base_speed + speed_swing` knots.
#[derive(Clone, Debug)]
pub struct SimulatedBoat {
    position: Position,
    timestamp: Timestamp,
    interval: f64,
    base_speed: f64,
    speed_swing: f64,
    legs: Vec<Leg>,
    leg: usize,
    leg_elapsed: f64,
    step: u64,
}

impl SimulatedBoat {
    pub fn new(start: Position, timestamp: Timestamp, legs: &[Leg]) -> Self {
        Self {
            position: start,
            timestamp,
            interval: 1.0,
            base_speed: 3.0,
            speed_swing: 3.0,
            legs: legs.to_vec(),
            leg: 0,
            leg_elapsed: 0.0,
            step: 0,
        }
    }

    /// A single reach on a fixed course.
    pub fn reaching(start: Position, timestamp: Timestamp, course: f64) -> Self {
        Self::new(start, timestamp, &[Leg::new(course, f64::INFINITY)])
    }

    /// Beating to windward against `wind`, close-hauled 45° off either side.
    pub fn beating(start: Position, timestamp: Timestamp, wind: f64, leg_duration: f64) -> Self {
        Self::new(
            start,
            timestamp,
            &[
                Leg::new(normalize_degrees(wind + 45.0), leg_duration),
                Leg::new(normalize_degrees(wind - 45.0), leg_duration),
            ],
        )
    }

    /// Seconds between fixes; 1 Hz unless set.
    pub fn with_interval(mut self, seconds: f64) -> Self {
        self.interval = seconds;
        self
    }

    pub fn with_speed(mut self, base: f64, swing: f64) -> Self {
        self.base_speed = base;
        self.speed_swing = swing;
        self
    }

    fn course(&self) -> f64 {
        self.legs.get(self.leg).map_or(0.0, |leg| leg.course)
    }

    fn speed(&self) -> f64 {
        let phase = self.step as f64 * 0.1;
        self.base_speed + (phase.sin() + 1.0) * 0.5 * self.speed_swing
    }
}

impl Iterator for SimulatedBoat {
    type Item = Fix;

    fn next(&mut self) -> Option<Fix> {
        let speed = self.speed();
        let course = self.course();
        let fix = Fix::new(
            self.position.latitude,
            self.position.longitude,
            speed,
            course,
            self.timestamp,
        );

        self.position = self
            .position
            .project(course, speed * KNOTS_TO_MPS * self.interval);
        self.timestamp += self.interval;
        self.step += 1;
        self.leg_elapsed += self.interval;
        if let Some(leg) = self.legs.get(self.leg) {
            if self.leg_elapsed >= leg.duration {
                self.leg = (self.leg + 1) % self.legs.len();
                self.leg_elapsed = 0.0;
            }
        }

        Some(fix)
    }
}
