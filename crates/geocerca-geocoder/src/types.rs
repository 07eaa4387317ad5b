//! Provider-neutral geocoding results.

use geocerca_core::Coordinate;
use serde::{Deserialize, Serialize};

/// Address components for a point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReverseGeocode {
    pub display_name: String,
    pub country: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    /// Sector-level name (suburb, neighbourhood or quarter).
    pub suburb: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardGeocode {
    pub coordinate: Coordinate,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyPlace {
    pub name: String,
    pub categories: Vec<String>,
    /// Distance from the query point in meters.
    pub distance_m: f64,
    pub coordinate: Option<Coordinate>,
}
