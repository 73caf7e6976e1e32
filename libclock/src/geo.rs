//! Geographic positions and geofences
use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Mean radius of the earth in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check that the position is a finite point on the globe
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::InvalidCoordinates(format!(
                "latitude {} is out of range",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::InvalidCoordinates(format!(
                "longitude {} is out of range",
                self.longitude
            )));
        }
        Ok(())
    }

    /// Great-circle distance to another position in meters
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        distance_meters(self, other)
    }
}

/// Calculates the great-circle distance between two positions using the
/// haversine formula
pub fn distance_meters(a: &Coordinates, b: &Coordinates) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let dphi = (b.latitude - a.latitude).to_radians();
    let dlambda = (b.longitude - a.longitude).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_METERS * c
}

/// A circular area around a center point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    pub center: Coordinates,
    pub radius_meters: u32,
}

impl Geofence {
    pub fn new(center: Coordinates, radius_meters: u32) -> Self {
        Self {
            center,
            radius_meters,
        }
    }

    pub fn distance_from_center(&self, point: &Coordinates) -> f64 {
        self.center.distance_to(point)
    }

    /// Whether the point lies inside the fence. Points exactly on the boundary
    /// are considered inside.
    pub fn contains(&self, point: &Coordinates) -> bool {
        self.distance_from_center(point) <= f64::from(self.radius_meters)
    }
}
