//! Debounced port/starboard tack classification.
//!
//! Heading over ground is noisy at low speed and in chop, so a side change is
//! only confirmed when enough time has passed since the last tack, the heading
//! swung far enough since the previous sample, the boat covered some ground
//! since the last reference point, and the headings leading up to the change
//! were steady.

use std::fmt;

use tinyvec::ArrayVec;
use tracing::{debug, info};

use crate::config::{
    HEADING_STABILITY_DEG, HEADING_WINDOW, MIN_SPEED_FOR_TACK_KN, TACK_ANGLE_THRESHOLD_DEG,
    TACK_DEBOUNCE_S, TACK_MIN_DISTANCE_M, WIND_DIRECTION_DEG,
};
use crate::fix::Timestamp;
use crate::position::{Position, heading_difference, normalize_degrees};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TackSide {
    Port,
    Starboard,
}

impl fmt::Display for TackSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TackSide::Port => write!(f, "port"),
            TackSide::Starboard => write!(f, "starboard"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TackConfig {
    /// Assumed upwind direction, degrees true.
    pub wind_direction: f64,
    /// knots
    pub min_speed: f64,
    /// seconds
    pub debounce: f64,
    /// degrees
    pub angle_threshold: f64,
    /// meters
    pub min_distance: f64,
    /// degrees, max-min spread allowed across the heading window
    pub stability: f64,
}

impl Default for TackConfig {
    fn default() -> Self {
        Self {
            wind_direction: WIND_DIRECTION_DEG,
            min_speed: MIN_SPEED_FOR_TACK_KN,
            debounce: TACK_DEBOUNCE_S,
            angle_threshold: TACK_ANGLE_THRESHOLD_DEG,
            min_distance: TACK_MIN_DISTANCE_M,
            stability: HEADING_STABILITY_DEG,
        }
    }
}

/// A confirmed tack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tack {
    /// Heading sailed just before the change.
    pub heading: f64,
    pub side: TackSide,
    pub timestamp: Timestamp,
}

type HeadingWindow = ArrayVec<[f64; HEADING_WINDOW]>;

/// Spread of a set of headings, taking the shortest arc that contains them all.
fn heading_spread(headings: &[f64]) -> f64 {
    let mut sorted = HeadingWindow::new();
    for &h in headings.iter().take(HEADING_WINDOW) {
        sorted.push(h);
    }
    sorted.sort_by(f64::total_cmp);
    let (Some(&first), Some(&last)) = (sorted.first(), sorted.last()) else {
        return 0.0;
    };
    // The largest gap between neighbours (including the wrap from last back
    // to first) is the part of the circle not covered by the samples.
    let largest_gap = sorted
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(360.0 - last + first, f64::max);
    360.0 - largest_gap
}

pub struct TackDetector {
    config: TackConfig,
    last_tack: Option<Tack>,
    previous_heading: Option<f64>,
    side: Option<TackSide>,
    /// Debounce reference: time of the last confirmed tack, or of the first
    /// classified sample.
    last_tack_time: Option<Timestamp>,
    reference: Option<Position>,
    position: Option<Position>,
    window: HeadingWindow,
    tacks: usize,
}

impl Default for TackDetector {
    fn default() -> Self {
        Self::new(TackConfig::default())
    }
}

impl TackDetector {
    pub fn new(config: TackConfig) -> Self {
        Self {
            config,
            last_tack: None,
            previous_heading: None,
            side: None,
            last_tack_time: None,
            reference: None,
            position: None,
            window: HeadingWindow::new(),
            tacks: 0,
        }
    }

    pub fn config(&self) -> &TackConfig {
        &self.config
    }

    pub fn set_wind_direction(&mut self, direction: f64) {
        self.config.wind_direction = normalize_degrees(direction);
    }

    /// Heading before the most recent tack, `None` until one is confirmed.
    pub fn last_tack_heading(&self) -> Option<f64> {
        self.last_tack.map(|t| t.heading)
    }

    pub fn last_tack(&self) -> Option<Tack> {
        self.last_tack
    }

    pub fn side(&self) -> Option<TackSide> {
        self.side
    }

    pub fn tack_count(&self) -> usize {
        self.tacks
    }

    /// Starboard when the heading lies in the half circle starting at the wind
    /// direction and running 180° clockwise.
    pub fn classify(&self, heading: f64) -> TackSide {
        let start = self.config.wind_direction;
        let end = normalize_degrees(start + 180.0);
        let heading = normalize_degrees(heading);

        let starboard = if start < end {
            heading >= start && heading <= end
        } else {
            heading >= start || heading <= end
        };
        if starboard {
            TackSide::Starboard
        } else {
            TackSide::Port
        }
    }

    /// Record the boat's current position. Call before [`TackDetector::update`]
    /// each cycle.
    pub fn update_position(&mut self, lat: f64, lon: f64) {
        let position = Position::new(lat, lon);
        self.position = Some(position);
        if self.reference.is_none() {
            self.reference = Some(position);
        }
    }

    fn distance_since_reference(&self) -> f64 {
        match (self.reference, self.position) {
            (Some(reference), Some(position)) => reference.distance_to(&position),
            _ => 0.0,
        }
    }

    fn window_is_steady(&self) -> bool {
        self.window.len() == HEADING_WINDOW
            && heading_spread(self.window.as_slice()) <= self.config.stability
    }

    fn push_heading(&mut self, heading: f64) {
        if self.window.len() == HEADING_WINDOW {
            self.window.remove(0);
        }
        self.window.push(heading);
    }

    /// Feed one heading sample. Returns the tack if this sample confirmed one.
    pub fn update(&mut self, heading: f64, speed: f64, timestamp: Timestamp) -> Option<Tack> {
        if speed < self.config.min_speed {
            return None;
        }

        let heading = normalize_degrees(heading);
        let side = self.classify(heading);
        let mut confirmed = None;

        match (self.side, self.previous_heading) {
            (None, _) | (_, None) => {
                // First usable sample establishes the side and starts the debounce clock.
                self.side = Some(side);
                self.last_tack_time = Some(timestamp);
            }
            (Some(current), Some(previous)) if current != side => {
                let elapsed = self.last_tack_time.map_or(f64::INFINITY, |t| timestamp - t);
                let change = heading_difference(heading, previous);
                let distance = self.distance_since_reference();
                let steady = self.window_is_steady();

                if elapsed > self.config.debounce
                    && change > self.config.angle_threshold
                    && distance > self.config.min_distance
                    && steady
                {
                    let tack = Tack {
                        heading: previous,
                        side,
                        timestamp,
                    };
                    self.last_tack = Some(tack);
                    self.last_tack_time = Some(timestamp);
                    self.side = Some(side);
                    self.reference = self.position;
                    self.window.clear();
                    self.tacks += 1;
                    info!(
                        "tack to {} confirmed, heading before tack {:.1}°",
                        side, previous
                    );
                    confirmed = Some(tack);
                } else {
                    debug!(
                        "side change to {} rejected: elapsed {:.1}s, change {:.1}°, distance {:.1}m, steady {}",
                        side, elapsed, change, distance, steady
                    );
                }
            }
            _ => {}
        }

        self.push_heading(heading);
        self.previous_heading = Some(heading);
        confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: Timestamp = 1_700_000_000.0;
    // Roughly 5 kn, one sample per second.
    const STEP_M: f64 = 2.5;

    /// Drives a detector with a simulated boat moving along its heading.
    struct Boat {
        detector: TackDetector,
        position: Position,
        time: Timestamp,
    }

    impl Boat {
        fn new(config: TackConfig) -> Self {
            Self {
                detector: TackDetector::new(config),
                position: Position::new(37.78, -122.38),
                time: START,
            }
        }

        fn sail(&mut self, heading: f64, seconds: usize) -> usize {
            let mut tacks = 0;
            for _ in 0..seconds {
                self.position = self.position.project(heading, STEP_M);
                self.time += 1.0;
                self.detector
                    .update_position(self.position.latitude, self.position.longitude);
                if self.detector.update(heading, 5.0, self.time).is_some() {
                    tacks += 1;
                }
            }
            tacks
        }
    }

    #[test]
    fn test_classify_wraps() {
        // Wind from 270: starboard covers 270..360 and 0..90.
        let detector = TackDetector::default();
        assert_eq!(detector.classify(300.0), TackSide::Starboard);
        assert_eq!(detector.classify(10.0), TackSide::Starboard);
        assert_eq!(detector.classify(90.0), TackSide::Starboard);
        assert_eq!(detector.classify(180.0), TackSide::Port);
        assert_eq!(detector.classify(200.0), TackSide::Port);

        let mut north = TackDetector::default();
        north.set_wind_direction(0.0);
        assert_eq!(north.classify(45.0), TackSide::Starboard);
        assert_eq!(north.classify(315.0), TackSide::Port);
    }

    #[test]
    fn test_heading_spread() {
        assert_eq!(heading_spread(&[]), 0.0);
        assert!((heading_spread(&[10.0, 12.0, 15.0]) - 5.0).abs() < 1e-9);
        assert!((heading_spread(&[355.0, 2.0, 358.0, 4.0]) - 9.0).abs() < 1e-9);
        assert!((heading_spread(&[0.0, 90.0, 180.0]) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_tack_recorded() {
        let mut boat = Boat::new(TackConfig::default());
        // Close hauled on starboard (wind 270), then tack onto port.
        assert_eq!(boat.sail(315.0, 30), 0);
        assert_eq!(boat.detector.side(), Some(TackSide::Starboard));
        assert_eq!(boat.detector.last_tack_heading(), None);

        assert_eq!(boat.sail(225.0, 30), 1);
        assert_eq!(boat.detector.tack_count(), 1);
        assert_eq!(boat.detector.side(), Some(TackSide::Port));
        assert_eq!(boat.detector.last_tack_heading(), Some(315.0));
    }

    #[test]
    fn test_oscillation_within_debounce_ignored() {
        let mut boat = Boat::new(TackConfig::default());
        // Crossing the wind axis twice within a few seconds of starting.
        boat.sail(315.0, 3);
        boat.sail(225.0, 2);
        boat.sail(315.0, 3);
        assert_eq!(boat.detector.tack_count(), 0);
        assert_eq!(boat.detector.last_tack_heading(), None);
    }

    #[test]
    fn test_flip_back_inside_debounce_after_tack() {
        let mut boat = Boat::new(TackConfig::default());
        boat.sail(315.0, 30);
        assert_eq!(boat.sail(225.0, 1), 1);
        // Wave knocks the heading back across the axis right after the tack.
        boat.sail(225.0, 3);
        assert_eq!(boat.sail(315.0, 2), 0);
        assert_eq!(boat.sail(225.0, 2), 0);
        assert_eq!(boat.detector.tack_count(), 1);
    }

    #[test]
    fn test_unsteady_heading_blocks_tack() {
        let mut boat = Boat::new(TackConfig::default());
        // Wandering heading on starboard, never settled within 10°.
        for i in 0..30 {
            let heading = if i % 2 == 0 { 300.0 } else { 330.0 };
            boat.sail(heading, 1);
        }
        assert_eq!(boat.sail(225.0, 1), 0);
    }

    #[test]
    fn test_small_heading_change_blocks_tack() {
        let config = TackConfig {
            wind_direction: 0.0,
            ..TackConfig::default()
        };
        let mut boat = Boat::new(config);
        // 5° either side of the wind axis: a side change but not a tack.
        boat.sail(5.0, 30);
        assert_eq!(boat.sail(355.0, 30), 0);
    }

    #[test]
    fn test_short_distance_blocks_tack() {
        let config = TackConfig {
            min_distance: 1_000.0,
            ..TackConfig::default()
        };
        let mut boat = Boat::new(config);
        boat.sail(315.0, 30);
        assert_eq!(boat.sail(225.0, 30), 0);
    }

    #[test]
    fn test_slow_samples_ignored() {
        let mut detector = TackDetector::default();
        detector.update_position(37.78, -122.38);
        assert!(detector.update(315.0, 0.5, START).is_none());
        assert_eq!(detector.side(), None);
    }
}
