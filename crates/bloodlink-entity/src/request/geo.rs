//! Geographic point.

use serde::{Deserialize, Serialize};

use bloodlink_core::AppError;

/// A WGS84 point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude, -90..=90.
    pub lat: f64,
    /// Longitude, -180..=180.
    pub lng: f64,
}

impl Coordinates {
    /// Build a point, rejecting out-of-range or non-finite values.
    pub fn new(lat: f64, lng: f64) -> Result<Self, AppError> {
        let point = Self { lat, lng };
        point.validate()?;
        Ok(point)
    }

    /// Check both components are finite and in range.
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(AppError::validation(format!("Invalid latitude {}", self.lat)));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(AppError::validation(format!("Invalid longitude {}", self.lng)));
        }
        Ok(())
    }
}

/// Axis-aligned latitude/longitude rectangle used as a cheap pre-filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lng: f64,
    /// Eastern edge.
    pub max_lng: f64,
}

impl BoundingBox {
    /// Whether the point lies inside or on the edge of the box.
    pub fn contains(&self, point: &Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lng..=self.max_lng).contains(&point.lng)
    }
}
