//! Geolocation captured when an audit is started on site.

use serde::{Deserialize, Serialize};

use crate::error::FsaError;

/// WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, `[-90, 90]`.
    pub lat: f64,
    /// Longitude in degrees, `[-180, 180]`.
    pub lng: f64,
}

impl GeoPoint {
    /// Validated constructor.
    pub fn new(lat: f64, lng: f64) -> Result<Self, FsaError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(FsaError::InvalidCoordinates(format!("latitude {lat} out of range")));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(FsaError::InvalidCoordinates(format!("longitude {lng} out of range")));
        }
        Ok(Self { lat, lng })
    }
}
