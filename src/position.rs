use std::fmt;

use crate::config::EARTH_RADIUS_M;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}°, {:.6}°)", self.latitude, self.longitude)
    }
}

/// Wrap any angle into [0, 360).
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Absolute difference between two headings, in [0, 180].
pub fn heading_difference(a: f64, b: f64) -> f64 {
    let diff = (normalize_degrees(a) - normalize_degrees(b)).abs();
    if diff > 180.0 { 360.0 - diff } else { diff }
}

/// Wrap a longitude into [-180, 180].
pub fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

impl Position {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Initial great-circle bearing from this position to `other`, in [0, 360).
    /// Identical points give 0.
    pub fn bearing_to(&self, other: &Position) -> f64 {
        let lat_from = self.latitude.to_radians();
        let lat_to = other.latitude.to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let y = delta_lon.sin() * lat_to.cos();
        let x = lat_from.cos() * lat_to.sin() - lat_from.sin() * lat_to.cos() * delta_lon.cos();

        normalize_degrees(y.atan2(x).to_degrees())
    }

    /// Haversine distance in meters.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let lat_from = self.latitude.to_radians();
        let lat_to = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat_from.cos() * lat_to.cos() * (delta_lon / 2.0).sin().powi(2);

        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Position reached after travelling `distance` meters along `heading` (degrees)
    /// on a great circle.
    pub fn project(&self, heading: f64, distance: f64) -> Position {
        let lat1 = self.latitude.to_radians();
        let lon1 = self.longitude.to_radians();
        let brng = heading.to_radians();
        let delta = distance / EARTH_RADIUS_M;

        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * brng.cos()).asin();
        let lon2 = lon1
            + (brng.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

        Position::new(lat2.to_degrees(), wrap_longitude(lon2.to_degrees()))
    }
}
