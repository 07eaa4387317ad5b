//! Geocoding port and HTTP adapter.
//!
//! [`GeocodingPort`] is the only way the resolution pipeline talks to a
//! geocoding provider. [`HttpGeocoder`] implements it against the Nominatim
//! reverse/search API and a Foursquare-style places search API.

pub mod client;
pub mod error;
pub mod port;
pub mod types;

mod wire;

pub use client::{HttpGeocoder, HttpGeocoderConfig};
pub use error::GeocodeError;
pub use port::GeocodingPort;
pub use types::{ForwardGeocode, NearbyPlace, ReverseGeocode};
