//! Recursive position/velocity estimator.
//!
//! State is `[lat, lon, speed, cos(course), sin(course)]`. Course is carried as
//! a unit vector so that 359° and 1° blend to 0° instead of 180°; the angle is
//! recovered with `atan2` only when read.

use nalgebra::{SMatrix, SVector};
use tracing::{trace, warn};

use crate::config::{
    FILTER_ADAPTIVE_FACTOR, FILTER_INITIAL_COVARIANCE, FILTER_INNOVATION_THRESHOLD,
    FILTER_MEASUREMENT_NOISE, FILTER_PROCESS_NOISE, KNOTS_TO_MPS,
};
use crate::fix::{FilteredFix, Timestamp};
use crate::position::{Position, normalize_degrees, wrap_longitude};

type Scalar = f64;
const STATES: usize = 5;

type StateVector = SVector<Scalar, STATES>;
type Covariance = SMatrix<Scalar, STATES, STATES>;

const LAT: usize = 0;
const LON: usize = 1;
const SPEED: usize = 2;
const COURSE_X: usize = 3;
const COURSE_Y: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterStatus {
    Initialized,
    Updated,
    /// Innovation was large; process noise was inflated for this step.
    Adapted(Scalar),
    /// `P + R` was not invertible, the prior estimate stands.
    SingularMatrix,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterTuning {
    pub initial_covariance: Scalar,
    pub process_noise: [Scalar; STATES],
    pub measurement_noise: [Scalar; STATES],
    pub innovation_threshold: Scalar,
    pub adaptive_factor: Scalar,
}

impl Default for FilterTuning {
    fn default() -> Self {
        Self {
            initial_covariance: FILTER_INITIAL_COVARIANCE,
            process_noise: FILTER_PROCESS_NOISE,
            measurement_noise: FILTER_MEASUREMENT_NOISE,
            innovation_threshold: FILTER_INNOVATION_THRESHOLD,
            adaptive_factor: FILTER_ADAPTIVE_FACTOR,
        }
    }
}

pub struct PositionFilter {
    x: StateVector,
    p: Covariance,
    q: Covariance,
    r: Covariance,
    tuning: FilterTuning,
    initialized: bool,
}

impl Default for PositionFilter {
    fn default() -> Self {
        Self::new(FilterTuning::default())
    }
}

fn measurement(lat: Scalar, lon: Scalar, speed: Scalar, course: Scalar) -> StateVector {
    let course = course.to_radians();
    StateVector::from([lat, lon, speed, course.cos(), course.sin()])
}

impl PositionFilter {
    pub fn new(tuning: FilterTuning) -> Self {
        Self {
            x: StateVector::zeros(),
            p: Covariance::identity() * 100.0,
            q: Covariance::from_diagonal(&StateVector::from(tuning.process_noise)),
            r: Covariance::from_diagonal(&StateVector::from(tuning.measurement_noise)),
            tuning,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn covariance(&self) -> &SMatrix<Scalar, STATES, STATES> {
        &self.p
    }

    /// Fold one measurement (degrees, knots, degrees) into the estimate.
    /// The first measurement is taken as-is.
    pub fn update(&mut self, lat: Scalar, lon: Scalar, speed: Scalar, course: Scalar) -> FilterStatus {
        let z = measurement(lat, lon, speed, course);

        if !self.initialized {
            self.x = z;
            self.p = Covariance::identity() * self.tuning.initial_covariance;
            self.initialized = true;
            return FilterStatus::Initialized;
        }

        let innovation = z - self.x;

        let Some(s_inv) = (self.p + self.r).try_inverse() else {
            warn!("innovation covariance is singular, measurement skipped");
            return FilterStatus::SingularMatrix;
        };

        let mut status = FilterStatus::Updated;
        let nis = (innovation.transpose() * s_inv * innovation)[(0, 0)];
        if nis > self.tuning.innovation_threshold {
            trace!("normalized innovation {:.3}, inflating process noise", nis);
            // Inflated Q only grows P for this step; self.q is left untouched.
            self.p += self.q * self.tuning.adaptive_factor;
            status = FilterStatus::Adapted(nis);
        }

        let Some(s_inv) = (self.p + self.r).try_inverse() else {
            warn!("innovation covariance is singular, measurement skipped");
            return FilterStatus::SingularMatrix;
        };
        let k = self.p * s_inv;

        self.x += k * innovation;
        self.p = (Covariance::identity() - k) * self.p;
        self.p = (self.p + self.p.transpose()) * 0.5;

        status
    }

    /// Dead-reckon `dt` seconds along the current course at the current speed.
    /// Speed and course are unchanged; covariance grows by the process noise.
    pub fn predict(&mut self, dt: Scalar) {
        if !self.initialized || dt <= 0.0 {
            return;
        }

        let distance = self.speed() * KNOTS_TO_MPS * dt;
        let next = Position::new(self.x[LAT], self.x[LON]).project(self.course(), distance);
        self.x[LAT] = next.latitude;
        self.x[LON] = next.longitude;

        self.p += self.q;
    }

    pub fn latitude(&self) -> Scalar {
        self.x[LAT].clamp(-90.0, 90.0)
    }

    pub fn longitude(&self) -> Scalar {
        wrap_longitude(self.x[LON])
    }

    pub fn speed(&self) -> Scalar {
        self.x[SPEED].max(0.0)
    }

    pub fn course(&self) -> Scalar {
        normalize_degrees(self.x[COURSE_Y].atan2(self.x[COURSE_X]).to_degrees())
    }

    /// The published view of the estimate, stamped with the time of the
    /// measurement that produced it. `None` until the first update.
    pub fn estimate(&self, timestamp: Timestamp) -> Option<FilteredFix> {
        self.initialized.then(|| {
            FilteredFix::new(
                self.latitude(),
                self.longitude(),
                self.speed(),
                self.course(),
                timestamp,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn test_first_update_initializes() {
        let mut filter = PositionFilter::default();
        assert!(!filter.is_initialized());
        assert!(filter.estimate(0.0).is_none());

        let status = filter.update(37.78, -122.38, 5.0, 45.0);
        assert_eq!(status, FilterStatus::Initialized);
        assert!((filter.latitude() - 37.78).abs() < EPS);
        assert!((filter.longitude() - -122.38).abs() < EPS);
        assert!((filter.speed() - 5.0).abs() < EPS);
        assert!((filter.course() - 45.0).abs() < EPS);
        assert!((filter.covariance()[(0, 0)] - FILTER_INITIAL_COVARIANCE).abs() < EPS);

        let fix = filter.estimate(12.0).unwrap();
        assert!(fix.valid);
        assert_eq!(fix.timestamp, 12.0);
    }

    #[test]
    fn test_repeated_measurement_converges_and_trust_grows() {
        let mut filter = PositionFilter::default();
        filter.update(37.0, -122.0, 4.0, 10.0);
        // Move the estimate away, then feed one fixed measurement repeatedly.
        filter.update(37.001, -122.001, 6.0, 30.0);

        let mut last_trace = filter.covariance().trace();
        for _ in 0..50 {
            let status = filter.update(37.001, -122.001, 6.0, 30.0);
            assert!(!matches!(status, FilterStatus::Adapted(_)));
            let trace = filter.covariance().trace();
            assert!(trace < last_trace, "covariance must shrink: {} !< {}", trace, last_trace);
            last_trace = trace;
        }

        assert!((filter.latitude() - 37.001).abs() < 1e-4);
        assert!((filter.longitude() - -122.001).abs() < 1e-4);
        assert!((filter.speed() - 6.0).abs() < 0.05);
        assert!((filter.course() - 30.0).abs() < 0.5);
    }

    #[test]
    fn test_course_blends_across_north() {
        let mut filter = PositionFilter::default();
        filter.update(0.0, 0.0, 5.0, 359.0);
        for _ in 0..10 {
            filter.update(0.0, 0.0, 5.0, 1.0);
            filter.update(0.0, 0.0, 5.0, 359.0);
        }
        let course = filter.course();
        assert!(course > 355.0 || course < 5.0, "course {} should stay near north", course);
    }

    #[test]
    fn test_large_innovation_adapts() {
        let mut filter = PositionFilter::default();
        filter.update(37.0, -122.0, 2.0, 0.0);
        for _ in 0..10 {
            filter.update(37.0, -122.0, 2.0, 0.0);
        }
        // Sudden bear-away to 90° at higher speed.
        let status = filter.update(37.0, -122.0, 7.0, 90.0);
        assert!(matches!(status, FilterStatus::Adapted(nis) if nis > FILTER_INNOVATION_THRESHOLD));
    }

    #[test]
    fn test_singular_covariance_is_skipped() {
        let tuning = FilterTuning {
            initial_covariance: 0.0,
            measurement_noise: [0.0; STATES],
            process_noise: [0.0; STATES],
            ..FilterTuning::default()
        };
        let mut filter = PositionFilter::new(tuning);
        filter.update(10.0, 20.0, 3.0, 90.0);
        assert_eq!(filter.update(11.0, 21.0, 3.0, 90.0), FilterStatus::SingularMatrix);
        assert!((filter.latitude() - 10.0).abs() < EPS);
    }

    #[test]
    fn test_predict_moves_along_course() {
        let mut filter = PositionFilter::default();
        filter.update(0.0, 0.0, 10.0, 90.0);
        let before = filter.covariance().trace();

        filter.predict(60.0);

        // 10 kn for a minute due east is ~308.7 m
        let travelled = Position::new(0.0, 0.0)
            .distance_to(&Position::new(filter.latitude(), filter.longitude()));
        assert!((travelled - 10.0 * KNOTS_TO_MPS * 60.0).abs() < 0.01);
        assert!(filter.longitude() > 0.0);
        assert!(filter.latitude().abs() < 1e-9);
        assert!((filter.speed() - 10.0).abs() < EPS);
        assert!((filter.course() - 90.0).abs() < EPS);
        assert!(filter.covariance().trace() > before);
    }

    #[test]
    fn test_predict_before_init_is_noop() {
        let mut filter = PositionFilter::default();
        filter.predict(1.0);
        assert!(!filter.is_initialized());
    }
}
