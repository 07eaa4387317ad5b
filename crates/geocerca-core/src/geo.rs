//! Geographic primitives.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A validated WGS84 point. Latitude in `[-90, 90]`, longitude in `[-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Builds a coordinate, rejecting non-finite or out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCoordinate`] when either component is NaN,
    /// infinite, or outside its range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoreError> {
        let invalid = |reason: &str| CoreError::InvalidCoordinate {
            lat: latitude,
            lng: longitude,
            reason: reason.to_string(),
        };
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(invalid("components must be finite"));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(invalid("latitude must be within [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(invalid("longitude must be within [-180, 180]"));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Returns this point shifted by the given degree deltas.
    ///
    /// Latitude saturates at the poles and longitude wraps across the
    /// antimeridian, so the result is always a valid coordinate.
    #[must_use]
    pub fn offset(self, d_lat: f64, d_lng: f64) -> Self {
        let latitude = (self.latitude + d_lat).clamp(-90.0, 90.0);
        let mut longitude = self.longitude + d_lng;
        if longitude > 180.0 {
            longitude -= 360.0;
        } else if longitude < -180.0 {
            longitude += 360.0;
        }
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_santo_domingo() {
        let c = Coordinate::new(18.4861, -69.9312).unwrap();
        assert_eq!(c.to_string(), "18.486100,-69.931200");
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        assert!(Coordinate::new(90.5, 0.0).is_err());
        assert!(Coordinate::new(-91.0, 0.0).is_err());
    }

    #[test]
    fn rejects_out_of_range_longitude() {
        assert!(Coordinate::new(0.0, 180.01).is_err());
    }

    #[test]
    fn rejects_nan() {
        let err = Coordinate::new(f64::NAN, 0.0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidCoordinate { .. }));
    }

    #[test]
    fn offset_clamps_at_pole() {
        let c = Coordinate::new(89.999, 10.0).unwrap().offset(0.01, 0.0);
        assert!((c.latitude - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn offset_wraps_antimeridian() {
        let c = Coordinate::new(0.0, 179.999).unwrap().offset(0.0, 0.002);
        assert!(c.longitude < -179.0);
        assert!(Coordinate::new(c.latitude, c.longitude).is_ok());
    }
}
