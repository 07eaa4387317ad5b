//! Raw provider response shapes.

use serde::Deserialize;

/// Nominatim `/reverse?format=jsonv2` body. Failures come back as 200 with
/// only an `error` field.
#[derive(Debug, Deserialize)]
pub(crate) struct NominatimReverse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NominatimAddress {
    pub suburb: Option<String>,
    pub neighbourhood: Option<String>,
    pub quarter: Option<String>,
    pub city_district: Option<String>,
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub state: Option<String>,
    pub province: Option<String>,
    pub county: Option<String>,
    pub country: Option<String>,
}

fn first_present(candidates: [&Option<String>; 4]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_owned)
}

impl NominatimAddress {
    pub fn sector(&self) -> Option<String> {
        first_present([
            &self.suburb,
            &self.neighbourhood,
            &self.quarter,
            &self.city_district,
        ])
    }

    pub fn province(&self) -> Option<String> {
        first_present([&self.state, &self.province, &self.county, &None])
    }

    pub fn city(&self) -> Option<String> {
        first_present([&self.city, &self.town, &self.village, &None])
    }
}

/// One element of the Nominatim `/search?format=jsonv2` array. Coordinates
/// are sent as strings.
#[derive(Debug, Deserialize)]
pub(crate) struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlacesSearchResponse {
    #[serde(default)]
    pub results: Vec<PlacesResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlacesResult {
    pub name: String,
    #[serde(default)]
    pub categories: Vec<PlacesCategory>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub geocodes: Option<PlacesGeocodes>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlacesCategory {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlacesGeocodes {
    pub main: Option<PlacesPoint>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlacesPoint {
    pub latitude: f64,
    pub longitude: f64,
}
