use std::cmp::Ordering;
use std::fmt;

use crate::error::{Error, Result};

/// Numeric identifier assigned to a location by storage.
///
/// `0` means the location has not been persisted yet (grid output,
/// hand-built values in tests).
pub type LocationId = i64;

const LATITUDE_MIN: f64 = -90.0;
const LATITUDE_MAX: f64 = 90.0;
const LONGITUDE_MIN: f64 = -180.0;
const LONGITUDE_MAX: f64 = 180.0;

/// A validated (latitude, longitude) pair with a storage identity.
///
/// Two locations at the same physical point but with different ids are
/// distinct entities: the id participates in equality. Values are
/// immutable after construction.
#[derive(Debug, Clone, Copy)]
pub struct Location {
    latitude: f64,
    longitude: f64,
    id: LocationId,
}

impl Location {
    /// Construct a location, validating the coordinate ranges.
    pub fn new(latitude: f64, longitude: f64, id: LocationId) -> Result<Self> {
        if !(LATITUDE_MIN..=LATITUDE_MAX).contains(&latitude) {
            return Err(Error::CoordinateRange {
                axis: "latitude",
                value: latitude,
                min: LATITUDE_MIN,
                max: LATITUDE_MAX,
            });
        }
        if !(LONGITUDE_MIN..=LONGITUDE_MAX).contains(&longitude) {
            return Err(Error::CoordinateRange {
                axis: "longitude",
                value: longitude,
                min: LONGITUDE_MIN,
                max: LONGITUDE_MAX,
            });
        }
        Ok(Self {
            latitude,
            longitude,
            id,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn id(&self) -> LocationId {
        self.id
    }

    /// Squared planar Euclidean distance to another location.
    ///
    /// This is a ranking metric for candidate pre-filtering, not a true
    /// distance: no spherical correction and no square root. True
    /// distance comes from the directions provider afterwards.
    pub fn squared_distance_to(&self, other: &Self) -> f64 {
        let dlat = self.latitude - other.latitude;
        let dlon = self.longitude - other.longitude;
        dlat * dlat + dlon * dlon
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Location {}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    /// Order by latitude, then longitude, then id.
    ///
    /// Coordinates are finite by construction, so `total_cmp` agrees
    /// with the usual numeric ordering here.
    fn cmp(&self, other: &Self) -> Ordering {
        self.latitude
            .total_cmp(&other.latitude)
            .then_with(|| self.longitude.total_cmp(&other.longitude))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) [id {}]", self.latitude, self.longitude, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(lat: f64, lon: f64, id: i64) -> Location {
        Location::new(lat, lon, id).unwrap()
    }

    #[test]
    fn accepts_boundary_coordinates() {
        assert!(Location::new(90.0, 180.0, 0).is_ok());
        assert!(Location::new(-90.0, -180.0, 0).is_ok());
    }

    #[test]
    fn rejects_latitude_out_of_range() {
        let err = Location::new(90.5, 0.0, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::CoordinateRange {
                axis: "latitude",
                ..
            }
        ));
    }

    #[test]
    fn rejects_longitude_out_of_range() {
        let err = Location::new(0.0, -180.01, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::CoordinateRange {
                axis: "longitude",
                ..
            }
        ));
    }

    #[test]
    fn equality_includes_identity() {
        assert_eq!(loc(1.0, 2.0, 7), loc(1.0, 2.0, 7));
        assert_ne!(loc(1.0, 2.0, 7), loc(1.0, 2.0, 8));
    }

    #[test]
    fn ordering_is_latitude_then_longitude_then_id() {
        let mut points = vec![loc(2.0, 0.0, 1), loc(1.0, 5.0, 9), loc(1.0, 5.0, 3), loc(1.0, 4.0, 9)];
        points.sort();
        assert_eq!(
            points,
            vec![loc(1.0, 4.0, 9), loc(1.0, 5.0, 3), loc(1.0, 5.0, 9), loc(2.0, 0.0, 1)]
        );
    }

    #[test]
    fn squared_distance_is_planar() {
        let a = loc(0.0, 0.0, 1);
        let b = loc(3.0, 4.0, 2);
        assert_eq!(a.squared_distance_to(&b), 25.0);
    }
}
