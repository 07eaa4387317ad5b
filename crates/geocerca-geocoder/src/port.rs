use std::future::Future;

use geocerca_core::Coordinate;

use crate::error::GeocodeError;
use crate::types::{ForwardGeocode, NearbyPlace, ReverseGeocode};

/// Reverse/forward geocoding and nearby-places lookups.
///
/// Implementations are network-bound and fallible. Callers must not retry
/// automatically; each method is invoked at most once per request.
pub trait GeocodingPort: Send + Sync {
    /// Address components for `at`.
    fn reverse_geocode(
        &self,
        at: Coordinate,
    ) -> impl Future<Output = Result<ReverseGeocode, GeocodeError>> + Send;

    /// Best coordinate match for free-text `address`.
    fn forward_geocode(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<ForwardGeocode, GeocodeError>> + Send;

    /// Points of interest within `radius_m` meters of `at`, nearest first.
    fn nearby_places(
        &self,
        at: Coordinate,
        radius_m: u32,
    ) -> impl Future<Output = Result<Vec<NearbyPlace>, GeocodeError>> + Send;
}
