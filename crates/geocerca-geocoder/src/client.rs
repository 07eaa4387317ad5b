//! HTTP adapter for the geocoding port.
//!
//! Reverse and forward lookups go to a Nominatim-compatible endpoint; nearby
//! places go to a Foursquare-style `places/search` endpoint and are only
//! available when an API key is configured.

use std::time::Duration;

use geocerca_core::{AppConfig, Coordinate};
use reqwest::{Client, Url};

use crate::error::GeocodeError;
use crate::port::GeocodingPort;
use crate::types::{ForwardGeocode, NearbyPlace, ReverseGeocode};
use crate::wire::{NominatimPlace, NominatimReverse, PlacesSearchResponse};

const NEARBY_LIMIT: &str = "10";

/// Connection settings for [`HttpGeocoder`].
#[derive(Clone)]
pub struct HttpGeocoderConfig {
    pub geocoder_base_url: String,
    pub places_base_url: String,
    pub places_api_key: Option<String>,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl HttpGeocoderConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            geocoder_base_url: config.geocoder_base_url.clone(),
            places_base_url: config.places_base_url.clone(),
            places_api_key: config.places_api_key.clone(),
            user_agent: config.user_agent.clone(),
            timeout_secs: config.request_timeout_secs,
        }
    }
}

impl std::fmt::Debug for HttpGeocoderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGeocoderConfig")
            .field("geocoder_base_url", &self.geocoder_base_url)
            .field("places_base_url", &self.places_base_url)
            .field(
                "places_api_key",
                &self.places_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// [`GeocodingPort`] backed by HTTP providers.
pub struct HttpGeocoder {
    client: Client,
    geocoder_base: Url,
    places_base: Url,
    places_api_key: Option<String>,
}

impl HttpGeocoder {
    /// Builds the adapter.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`GeocodeError::InvalidBaseUrl`] if either
    /// base URL does not parse.
    pub fn new(config: &HttpGeocoderConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            geocoder_base: parse_base_url(&config.geocoder_base_url)?,
            places_base: parse_base_url(&config.places_base_url)?,
            places_api_key: config.places_api_key.clone(),
        })
    }

    fn endpoint(base: &Url, path: &str, params: &[(&str, &str)]) -> Url {
        let mut url = base.clone();
        url.set_path(&format!("{}{path}", base.path()));
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        url
    }

    /// Sends a GET, asserts a 2xx status and returns the raw body text.
    async fn get_text(
        &self,
        url: &Url,
        authorization: Option<&str>,
    ) -> Result<String, GeocodeError> {
        let mut request = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(key) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, key);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(GeocodeError::UnexpectedStatus {
                status: response.status().as_u16(),
                url: redact(url),
            });
        }
        Ok(response.text().await?)
    }
}

/// Ensures the base URL ends with exactly one slash so endpoint paths append
/// rather than replace the last segment.
fn parse_base_url(raw: &str) -> Result<Url, GeocodeError> {
    let normalised = format!("{}/", raw.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| GeocodeError::InvalidBaseUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })
}

fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}

fn decode<T: serde::de::DeserializeOwned>(body: &str, context: &str) -> Result<T, GeocodeError> {
    serde_json::from_str(body).map_err(|e| GeocodeError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

fn parse_degrees(raw: &str, context: &str) -> Result<f64, GeocodeError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| GeocodeError::NotFound {
            query: format!("{context} (unparseable coordinate '{raw}')"),
        })
}

impl GeocodingPort for HttpGeocoder {
    async fn reverse_geocode(&self, at: Coordinate) -> Result<ReverseGeocode, GeocodeError> {
        let lat = at.latitude.to_string();
        let lon = at.longitude.to_string();
        let url = Self::endpoint(
            &self.geocoder_base,
            "reverse",
            &[
                ("format", "jsonv2"),
                ("lat", &lat),
                ("lon", &lon),
                ("zoom", "18"),
                ("addressdetails", "1"),
            ],
        );
        let context = format!("reverse({at})");
        let body = self.get_text(&url, None).await?;
        let parsed: NominatimReverse = decode(&body, &context)?;

        if let Some(error) = parsed.error {
            tracing::debug!(%at, error, "reverse geocode returned no match");
            return Err(GeocodeError::NotFound { query: context });
        }

        let address = parsed.address.unwrap_or_default();
        Ok(ReverseGeocode {
            display_name: parsed.display_name.unwrap_or_default(),
            country: address.country.clone().filter(|s| !s.trim().is_empty()),
            province: address.province(),
            city: address.city(),
            suburb: address.sector(),
        })
    }

    async fn forward_geocode(&self, address: &str) -> Result<ForwardGeocode, GeocodeError> {
        let url = Self::endpoint(
            &self.geocoder_base,
            "search",
            &[("format", "jsonv2"), ("limit", "1"), ("q", address)],
        );
        let context = format!("search({address})");
        let body = self.get_text(&url, None).await?;
        let places: Vec<NominatimPlace> = decode(&body, &context)?;

        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NotFound {
                query: context.clone(),
            })?;
        let lat = parse_degrees(&place.lat, &context)?;
        let lng = parse_degrees(&place.lon, &context)?;
        let coordinate = Coordinate::new(lat, lng).map_err(|e| GeocodeError::NotFound {
            query: format!("{context} ({e})"),
        })?;

        Ok(ForwardGeocode {
            coordinate,
            display_name: place.display_name,
        })
    }

    async fn nearby_places(
        &self,
        at: Coordinate,
        radius_m: u32,
    ) -> Result<Vec<NearbyPlace>, GeocodeError> {
        let key = self
            .places_api_key
            .as_deref()
            .ok_or(GeocodeError::NotConfigured("places API key"))?;

        let ll = format!("{},{}", at.latitude, at.longitude);
        let radius = radius_m.to_string();
        let url = Self::endpoint(
            &self.places_base,
            "places/search",
            &[
                ("ll", &ll),
                ("radius", &radius),
                ("limit", NEARBY_LIMIT),
                ("sort", "DISTANCE"),
            ],
        );
        let context = format!("places/search({at})");
        let body = self.get_text(&url, Some(key)).await?;
        let parsed: PlacesSearchResponse = decode(&body, &context)?;

        let mut places: Vec<NearbyPlace> = parsed
            .results
            .into_iter()
            .filter(|r| !r.name.trim().is_empty())
            .map(|r| NearbyPlace {
                name: r.name,
                categories: r.categories.into_iter().map(|c| c.name).collect(),
                distance_m: r.distance.unwrap_or(f64::from(radius_m)),
                coordinate: r
                    .geocodes
                    .and_then(|g| g.main)
                    .and_then(|p| Coordinate::new(p.latitude, p.longitude).ok()),
            })
            .collect();
        places.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        Ok(places)
    }
}
