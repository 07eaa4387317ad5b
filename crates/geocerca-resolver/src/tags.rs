//! Informational micro-location tags attached to each update.

use geocerca_core::{is_generic, normalize, MicroLocationTag, TagKind};
use geocerca_geocoder::{NearbyPlace, ReverseGeocode};

use crate::consensus::ConsensusResult;

const MAX_AREA_TAGS: usize = 3;

/// Tags for one resolved interaction: the consensus winner, the center
/// point's own neighborhood, and up to three nearby places.
///
/// Names are deduplicated by normalized key; generic names are skipped.
#[must_use]
pub fn micro_location_tags(
    consensus: &ConsensusResult,
    center: &ReverseGeocode,
    nearby: &[NearbyPlace],
    radius_m: u32,
) -> Vec<MicroLocationTag> {
    let mut tags = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    if let (Some(key), Some(display)) = (&consensus.winner, &consensus.winner_display) {
        tags.push(MicroLocationTag {
            name: display.clone(),
            kind: TagKind::SmartSector,
            confidence: consensus.confidence,
        });
        seen.push(key.clone());
    }

    if let Some(suburb) = center.suburb.as_deref().map(str::trim) {
        let key = normalize(suburb);
        if !key.is_empty() && !is_generic(suburb) {
            let agrees = consensus.winner.as_deref() == Some(key.as_str());
            tags.push(MicroLocationTag {
                name: suburb.to_owned(),
                kind: TagKind::Neighborhood,
                confidence: if agrees { 1.0 } else { 0.5 },
            });
            seen.push(key);
        }
    }

    let radius = f64::from(radius_m.max(1));
    let mut areas = 0;
    for place in nearby {
        if areas == MAX_AREA_TAGS {
            break;
        }
        let name = place.name.trim();
        let key = normalize(name);
        if key.is_empty() || is_generic(name) || seen.contains(&key) {
            continue;
        }
        tags.push(MicroLocationTag {
            name: name.to_owned(),
            kind: TagKind::Area,
            confidence: (1.0 - place.distance_m / radius).clamp(0.0, 1.0),
        });
        seen.push(key);
        areas += 1;
    }

    tags
}
