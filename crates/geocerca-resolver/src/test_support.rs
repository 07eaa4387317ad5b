//! Scripted geocoder and fixtures shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use geocerca_core::{parse_hierarchy, Coordinate, HierarchyTable};
use geocerca_geocoder::{
    ForwardGeocode, GeocodeError, GeocodingPort, NearbyPlace, ReverseGeocode,
};

use crate::consensus::search_points;
use crate::mapper::HierarchyMapper;

pub(crate) const OFFSET: f64 = 0.0018;

pub(crate) const TABLE: &str = r"
countries:
  - id: 1
    name: República Dominicana
    fallback_province: 101
    fallback_sector: 14
    provinces:
      - id: 101
        name: Distrito Nacional
        sectors:
          - { id: 2, name: Naco }
          - { id: 5, name: Gazcue }
          - { id: 9, name: Piantini }
          - { id: 14, name: Por Definir }
      - id: 103
        name: Santiago
        aliases: [Provincia de Santiago]
        sectors:
          - { id: 30, name: Los Jardines Metropolitanos }
";

pub(crate) fn santo_domingo() -> Coordinate {
    Coordinate::new(18.4861, -69.9312).unwrap()
}

pub(crate) fn santiago() -> Coordinate {
    Coordinate::new(19.4517, -70.6970).unwrap()
}

pub(crate) fn sample_table() -> Arc<HierarchyTable> {
    Arc::new(parse_hierarchy(TABLE).unwrap())
}

pub(crate) fn sample_mapper() -> HierarchyMapper {
    HierarchyMapper::new(sample_table(), "republica-dominicana").unwrap()
}

/// Answers for the seven points around one center.
pub(crate) struct Script {
    center: Coordinate,
    votes: [Option<&'static str>; 7],
    province: Option<&'static str>,
    delay: Duration,
    slow: Vec<(usize, Duration)>,
}

impl Script {
    pub(crate) fn new(center: Coordinate, votes: [Option<&'static str>; 7]) -> Self {
        Self {
            center,
            votes,
            province: Some("Distrito Nacional"),
            delay: Duration::ZERO,
            slow: Vec::new(),
        }
    }

    /// Every lookup for this center waits `delay` before answering.
    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn slow_point(mut self, index: usize, delay: Duration) -> Self {
        self.slow.push((index, delay));
        self
    }

    pub(crate) fn in_province(mut self, province: Option<&'static str>) -> Self {
        self.province = province;
        self
    }
}

pub(crate) struct ScriptedGeocoder {
    scripts: Vec<Script>,
    forward: Vec<(&'static str, Coordinate)>,
    nearby: Option<Vec<NearbyPlace>>,
    reverse_calls: AtomicUsize,
    nearby_calls: AtomicUsize,
}

impl ScriptedGeocoder {
    pub(crate) fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts,
            forward: Vec::new(),
            nearby: None,
            reverse_calls: AtomicUsize::new(0),
            nearby_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_forward(mut self, address: &'static str, at: Coordinate) -> Self {
        self.forward.push((address, at));
        self
    }

    pub(crate) fn with_nearby(mut self, places: Vec<NearbyPlace>) -> Self {
        self.nearby = Some(places);
        self
    }

    pub(crate) fn reverse_calls(&self) -> usize {
        self.reverse_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn nearby_calls(&self) -> usize {
        self.nearby_calls.load(Ordering::SeqCst)
    }
}

fn same_point(a: Coordinate, b: Coordinate) -> bool {
    (a.latitude - b.latitude).abs() < 1e-9 && (a.longitude - b.longitude).abs() < 1e-9
}

impl GeocodingPort for ScriptedGeocoder {
    async fn reverse_geocode(&self, at: Coordinate) -> Result<ReverseGeocode, GeocodeError> {
        self.reverse_calls.fetch_add(1, Ordering::SeqCst);

        for script in &self.scripts {
            let points = search_points(script.center, OFFSET);
            let Some(index) = points.iter().position(|p| same_point(p.coordinate, at)) else {
                continue;
            };

            let mut wait = script.delay;
            if let Some((_, extra)) = script.slow.iter().find(|(i, _)| *i == index) {
                wait += *extra;
            }
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }

            return match script.votes[index] {
                Some(name) => Ok(ReverseGeocode {
                    display_name: format!("Calle 1, {name}, {}", script.province.unwrap_or("")),
                    country: Some("República Dominicana".to_owned()),
                    province: script.province.map(str::to_owned),
                    city: Some("Santo Domingo de Guzmán".to_owned()),
                    suburb: Some(name.to_owned()),
                }),
                None => Err(GeocodeError::NotFound {
                    query: at.to_string(),
                }),
            };
        }

        Err(GeocodeError::NotFound {
            query: at.to_string(),
        })
    }

    async fn forward_geocode(&self, address: &str) -> Result<ForwardGeocode, GeocodeError> {
        self.forward
            .iter()
            .find(|(known, _)| *known == address)
            .map(|(known, at)| ForwardGeocode {
                coordinate: *at,
                display_name: (*known).to_owned(),
            })
            .ok_or_else(|| GeocodeError::NotFound {
                query: address.to_owned(),
            })
    }

    async fn nearby_places(
        &self,
        _at: Coordinate,
        _radius_m: u32,
    ) -> Result<Vec<NearbyPlace>, GeocodeError> {
        self.nearby_calls.fetch_add(1, Ordering::SeqCst);
        self.nearby
            .clone()
            .ok_or(GeocodeError::NotConfigured("places API key"))
    }
}
