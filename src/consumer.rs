//! The navigation update loop.
//!
//! Each tick copies the published fixes out of [`SharedState`], works out
//! bearing, distance and VMG to the current mark, and feeds the tack detector.
//! No lock is held while any of that is computed.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::compass::{self, Direction};
use crate::fix::{FilteredFix, RawFix, Timestamp};
use crate::history::{HistoryEntry, SampleGate};
use crate::navigation::{self, Target};
use crate::shared::SharedState;
use crate::tack::{Tack, TackDetector, TackSide};

/// Everything a display or logger needs from one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NavReport {
    pub has_fix: bool,
    pub raw: RawFix,
    pub filtered: FilteredFix,
    pub target: Target,
    /// Degrees true from the filtered position to the target.
    pub bearing: Option<f64>,
    /// Meters.
    pub distance: Option<f64>,
    /// Knots, positive when closing on the target.
    pub vmg: Option<f64>,
    pub course_label: Option<Direction>,
    pub bearing_label: Option<Direction>,
    pub tack_side: Option<TackSide>,
    pub last_tack_heading: Option<f64>,
    /// Set only on the tick that confirmed a tack.
    pub tack: Option<Tack>,
}

impl fmt::Display for NavReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.filtered.valid {
            return write!(f, "waiting for fix, target {}", self.target.name);
        }
        write!(f, "{}", self.filtered)?;
        if !self.has_fix {
            write!(f, " (no fix, last known)")?;
        }
        if let (Some(bearing), Some(distance), Some(vmg)) = (self.bearing, self.distance, self.vmg) {
            write!(
                f,
                " | {} {:.0}° ({}) {:.0} m, VMG {:.2} kn",
                self.target.name,
                bearing,
                self.bearing_label.map_or("-", |d| d.abbreviation()),
                distance,
                vmg
            )?;
        }
        if let Some(side) = self.tack_side {
            write!(f, " | {}", side)?;
        }
        if let Some(heading) = self.last_tack_heading {
            write!(f, ", last tack from {:.0}°", heading)?;
        }
        Ok(())
    }
}

pub struct NavigationLoop {
    shared: Arc<SharedState>,
    detector: TackDetector,
    history: Option<SampleGate>,
    last_sample: Option<Timestamp>,
}

impl NavigationLoop {
    pub fn new(shared: Arc<SharedState>, detector: TackDetector) -> Self {
        Self {
            shared,
            detector,
            history: None,
            last_sample: None,
        }
    }

    /// Also drive history insertion, one entry per `gate` interval of fix time.
    pub fn with_history(mut self, gate: SampleGate) -> Self {
        self.history = Some(gate);
        self
    }

    pub fn detector(&self) -> &TackDetector {
        &self.detector
    }

    pub fn set_wind_direction(&mut self, direction: f64) {
        self.detector.set_wind_direction(direction);
    }

    pub fn tick(&mut self) -> NavReport {
        let has_fix = self.shared.has_fix();
        let raw = self.shared.raw_fix();
        let filtered = self.shared.filtered_fix();
        let target = self.shared.current_target();

        let mut report = NavReport {
            has_fix,
            raw,
            filtered,
            target,
            bearing: None,
            distance: None,
            vmg: None,
            course_label: None,
            bearing_label: None,
            tack_side: self.detector.side(),
            last_tack_heading: self.detector.last_tack_heading(),
            tack: None,
        };

        if !filtered.valid {
            return report;
        }

        let bearing = navigation::bearing(
            filtered.latitude,
            filtered.longitude,
            target.latitude,
            target.longitude,
        );
        report.bearing = Some(bearing);
        report.distance = Some(filtered.position().distance_to(&target.position()));
        report.vmg = Some(navigation::vmg(filtered.speed, filtered.course, bearing));
        report.course_label = Some(compass::direction(filtered.course));
        report.bearing_label = Some(compass::direction(bearing));

        // The loop runs faster than fixes arrive; each fix is seen once.
        let fresh = self.last_sample.is_none_or(|last| filtered.timestamp > last);
        if fresh && has_fix {
            self.last_sample = Some(filtered.timestamp);
            self.detector.update_position(filtered.latitude, filtered.longitude);
            if let Some(tack) = self.detector.update(filtered.course, filtered.speed, filtered.timestamp) {
                self.shared.publish_last_tack_heading(Some(tack.heading));
                report.tack = Some(tack);
            }
            report.tack_side = self.detector.side();
            report.last_tack_heading = self.detector.last_tack_heading();
        }

        if let Some(gate) = self.history.as_mut() {
            if raw.valid && gate.ready(raw.timestamp) {
                self.shared.record_history(HistoryEntry::new(raw, filtered));
            }
        }

        report
    }

    /// Tick every `period` until `stop` is set, handing each report to `on_report`.
    pub fn run<F>(&mut self, period: Duration, stop: &AtomicBool, mut on_report: F)
    where
        F: FnMut(&NavReport),
    {
        while !stop.load(Ordering::Relaxed) {
            let report = self.tick();
            on_report(&report);
            thread::sleep(period);
        }
    }
}
