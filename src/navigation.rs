use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{NavError, Result};
use crate::position::Position;

/// Initial great-circle bearing from point 1 to point 2, degrees in [0, 360).
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Position::new(lat1, lon1).bearing_to(&Position::new(lat2, lon2))
}

/// Velocity made good toward a mark on `target_bearing`. Positive when
/// closing, negative when opening. Same unit as `speed`.
pub fn vmg(speed: f64, course: f64, target_bearing: f64) -> f64 {
    speed * (course - target_bearing).to_radians().cos()
}

/// A named waypoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

impl Target {
    pub const fn new(name: &'static str, latitude: f64, longitude: f64) -> Self {
        Self {
            name,
            latitude,
            longitude,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.position())
    }
}

/// Fixed list of marks with exactly one selected. Selection can be changed
/// from any thread.
pub struct Targets {
    marks: Vec<Target>,
    current: AtomicUsize,
}

impl Targets {
    pub fn new(marks: &[Target]) -> Result<Self> {
        if marks.is_empty() {
            return Err(NavError::NoTargets);
        }
        Ok(Self {
            marks: marks.to_vec(),
            current: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn all(&self) -> &[Target] {
        &self.marks
    }

    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    pub fn current(&self) -> Target {
        self.marks[self.current_index()]
    }

    /// Advance to the next mark, wrapping past the last one. Returns the new mark.
    pub fn cycle(&self) -> Target {
        let len = self.marks.len();
        let previous = self
            .current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % len))
            .unwrap_or_else(|i| i);
        self.marks[(previous + 1) % len]
    }

    pub fn select(&self, index: usize) -> Result<Target> {
        let len = self.marks.len();
        if index >= len {
            return Err(NavError::TargetOutOfRange { index, len });
        }
        self.current.store(index, Ordering::Release);
        Ok(self.marks[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MARKS;

    #[test]
    fn test_bearing_same_point_is_zero() {
        assert_eq!(bearing(37.78, -122.38, 37.78, -122.38), 0.0);
    }

    #[test]
    fn test_bearing_range() {
        let points = [
            (37.77797371, -122.3852661),
            (37.801, -122.3477333),
            (-33.86, 151.21),
            (51.5, -0.12),
            (0.0, 179.9),
            (0.0, -179.9),
        ];
        for &(lat1, lon1) in &points {
            for &(lat2, lon2) in &points {
                let b = bearing(lat1, lon1, lat2, lon2);
                assert!((0.0..360.0).contains(&b), "bearing {} out of range", b);
            }
        }
    }

    #[test]
    fn test_bearing_between_marks() {
        // SBYC to YB is roughly north-east.
        let b = bearing(37.77797371, -122.3852661, 37.79951667, -122.3605167);
        assert!(b > 35.0 && b < 55.0, "bearing {}", b);
    }

    #[test]
    fn test_vmg() {
        assert!((vmg(6.0, 90.0, 90.0) - 6.0).abs() < 1e-9);
        assert!(vmg(6.0, 90.0, 180.0).abs() < 1e-9);
        assert!((vmg(6.0, 270.0, 90.0) - -6.0).abs() < 1e-9);
        // 45° off the mark either side of north
        assert!((vmg(4.0, 315.0, 0.0) - 4.0 * 45f64.to_radians().cos()).abs() < 1e-9);
        assert!((vmg(4.0, 10.0, 350.0) - vmg(4.0, 350.0, 10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_cycle_wraps() -> Result<()> {
        let targets = Targets::new(&MARKS)?;
        assert_eq!(targets.current().name, "SBYC");
        assert_eq!(targets.cycle().name, "SC1");
        for _ in 0..MARKS.len() - 1 {
            targets.cycle();
        }
        assert_eq!(targets.current().name, "SBYC");
        Ok(())
    }

    #[test]
    fn test_select() -> Result<()> {
        let targets = Targets::new(&MARKS)?;
        assert_eq!(targets.select(4)?.name, "YB");
        assert_eq!(targets.current_index(), 4);
        assert!(matches!(
            targets.select(8),
            Err(NavError::TargetOutOfRange { index: 8, len: 8 })
        ));
        assert_eq!(targets.current_index(), 4);
        Ok(())
    }

    #[test]
    fn test_empty_list_rejected() {
        assert!(matches!(Targets::new(&[]), Err(NavError::NoTargets)));
    }
}
