//! The Resolving phase: gather lookups for one coordinate, then decide.
//!
//! Gathering only talks to the geocoding port and runs in a spawned task.
//! Classification is synchronous and runs on the driver, which owns the
//! mapper, so a verdict is always computed against the latest aliases.

use chrono::Utc;
use geocerca_core::{AssignmentSource, Coordinate, HierarchyAssignment, LocationUpdate};
use geocerca_geocoder::{GeocodeError, GeocodingPort, NearbyPlace, ReverseGeocode};
use uuid::Uuid;

use crate::config::ResolverConfig;
use crate::consensus::{resolve_consensus, with_deadline, ConsensusResult};
use crate::mapper::HierarchyMapper;
use crate::state::{FailureReason, PendingAliasCandidate, Verdict};
use crate::tags::micro_location_tags;

/// Everything looked up for one coordinate.
#[derive(Debug)]
pub struct Gathered {
    pub coordinate: Coordinate,
    pub center: Result<ReverseGeocode, GeocodeError>,
    pub consensus: ConsensusResult,
    pub nearby: Vec<NearbyPlace>,
}

/// Runs the center lookup, the consensus fan-out and the nearby-places lookup
/// concurrently. Nearby failures are logged and otherwise ignored.
pub async fn gather<G: GeocodingPort>(
    geocoder: &G,
    coordinate: Coordinate,
    config: &ResolverConfig,
) -> Gathered {
    let (center, consensus, nearby) = tokio::join!(
        with_deadline(config.lookup_timeout, geocoder.reverse_geocode(coordinate)),
        resolve_consensus(
            geocoder,
            coordinate,
            config.sample_offset_deg,
            config.lookup_timeout
        ),
        with_deadline(
            config.lookup_timeout,
            geocoder.nearby_places(coordinate, config.nearby_radius_m)
        ),
    );

    let nearby = match nearby {
        Ok(places) => places,
        Err(GeocodeError::NotConfigured(what)) => {
            tracing::debug!(missing = what, "nearby places disabled");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(%coordinate, error = %e, "nearby places lookup failed");
            Vec::new()
        }
    };

    Gathered {
        coordinate,
        center,
        consensus,
        nearby,
    }
}

/// Turns gathered lookups into a verdict.
///
/// A failed center lookup fails the attempt even when the sampled points
/// produced a winner. A winner that maps onto a known sector with enough
/// valid votes is assigned; any other winner needs confirmation.
#[must_use]
pub fn classify(gathered: Gathered, mapper: &HierarchyMapper, config: &ResolverConfig) -> Verdict {
    let Gathered {
        coordinate,
        center,
        consensus,
        nearby,
    } = gathered;

    let center = match center {
        Ok(center) => center,
        Err(e) => {
            return Verdict::Fail(FailureReason::CenterLookup {
                message: e.to_string(),
                not_found: matches!(e, GeocodeError::NotFound { .. }),
            })
        }
    };

    if let Some(country) = center.country.as_deref() {
        let bound = mapper.country_id();
        if mapper.table().country(country).is_none_or(|c| c.id() != bound) {
            tracing::warn!(%coordinate, country, "point reverse-geocodes outside the bound country");
        }
    }

    let (Some(key), Some(display)) = (&consensus.winner, &consensus.winner_display) else {
        return Verdict::Fail(FailureReason::NoConsensus {
            sample_count: consensus.sample_count,
        });
    };

    let matched = mapper.map(center.province.as_deref().unwrap_or(""), display);
    let tags = micro_location_tags(&consensus, &center, &nearby, config.nearby_radius_m);

    if matched.sector_matched && consensus.valid_vote_count >= config.min_votes_for_auto {
        return Verdict::Assign(LocationUpdate {
            assignment: HierarchyAssignment {
                country_id: Some(mapper.country_id()),
                province_id: Some(matched.province_id),
                sector_id: Some(matched.sector_id),
            },
            coordinate,
            exact_address: Some(center.display_name).filter(|a| !a.is_empty()),
            micro_location_tags: tags,
            source: AssignmentSource::Auto,
        });
    }

    Verdict::Confirm(PendingAliasCandidate {
        id: Uuid::new_v4(),
        detected_name: display.clone(),
        key: key.clone(),
        raw_address: center.display_name,
        coordinate,
        created_at: Utc::now(),
        country_id: mapper.country_id(),
        province_id: matched.province_id,
        suggested_sector_id: matched.sector_matched.then_some(matched.sector_id),
        confidence: consensus.confidence,
        valid_vote_count: consensus.valid_vote_count,
        micro_location_tags: tags,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::{sample_mapper, santo_domingo, Script, ScriptedGeocoder};

    async fn run(geocoder: &ScriptedGeocoder, config: &ResolverConfig) -> Verdict {
        let gathered = gather(geocoder, santo_domingo(), config).await;
        classify(gathered, &sample_mapper(), config)
    }

    #[tokio::test]
    async fn known_winner_is_assigned() {
        let geocoder = ScriptedGeocoder::new(vec![Script::new(
            santo_domingo(),
            [
                Some("Piantini"),
                Some("Piantini"),
                Some("Centro"),
                Some("Piantini"),
                Some("Piantini"),
                Some("Piantini"),
                Some("Piantini"),
            ],
        )]);

        let Verdict::Assign(update) = run(&geocoder, &ResolverConfig::default()).await else {
            panic!("expected assignment");
        };
        assert_eq!(update.assignment.sector_id, Some(9));
        assert_eq!(update.assignment.province_id, Some(101));
        assert_eq!(update.assignment.country_id, Some(1));
        assert_eq!(update.source, AssignmentSource::Auto);
        assert_eq!(
            update.exact_address.as_deref(),
            Some("Calle 1, Piantini, Distrito Nacional")
        );
        assert_eq!(update.micro_location_tags[0].name, "Piantini");
        assert_eq!(geocoder.nearby_calls(), 1);
    }

    #[tokio::test]
    async fn unknown_winner_needs_confirmation() {
        let name = Some("Nuevo Residencial X");
        let geocoder = ScriptedGeocoder::new(vec![Script::new(
            santo_domingo(),
            [name, name, name, name, None, None, None],
        )]);

        let Verdict::Confirm(candidate) = run(&geocoder, &ResolverConfig::default()).await else {
            panic!("expected confirmation");
        };
        assert_eq!(candidate.key, "nuevo-residencial-x");
        assert_eq!(candidate.detected_name, "Nuevo Residencial X");
        assert_eq!(candidate.province_id, 101);
        assert_eq!(candidate.valid_vote_count, 4);
        assert!(candidate.suggested_sector_id.is_none());
        assert!((candidate.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn center_failure_fails_even_with_a_winner() {
        let geocoder = ScriptedGeocoder::new(vec![Script::new(
            santo_domingo(),
            [None, Some("Naco"), Some("Naco"), Some("Naco"), None, None, None],
        )]);

        let verdict = run(&geocoder, &ResolverConfig::default()).await;
        assert!(matches!(
            verdict,
            Verdict::Fail(FailureReason::CenterLookup { not_found: true, .. })
        ));
    }

    #[tokio::test]
    async fn generic_only_votes_mean_no_consensus() {
        let geocoder = ScriptedGeocoder::new(vec![Script::new(
            santo_domingo(),
            [Some("Centro"), Some("Downtown"), None, None, None, None, None],
        )]);

        let verdict = run(&geocoder, &ResolverConfig::default()).await;
        assert_eq!(
            verdict,
            Verdict::Fail(FailureReason::NoConsensus { sample_count: 7 })
        );
    }

    #[tokio::test]
    async fn thin_support_asks_for_confirmation_with_suggestion() {
        let geocoder = ScriptedGeocoder::new(vec![Script::new(
            santo_domingo(),
            [Some("Gazcue"), Some("Gazcue"), None, None, None, None, None],
        )]);
        let config = ResolverConfig {
            min_votes_for_auto: 3,
            ..ResolverConfig::default()
        };

        let Verdict::Confirm(candidate) = run(&geocoder, &config).await else {
            panic!("expected confirmation");
        };
        assert_eq!(candidate.suggested_sector_id, Some(5));
        assert_eq!(candidate.valid_vote_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn center_timeout_is_a_retryable_failure() {
        let geocoder = ScriptedGeocoder::new(vec![Script::new(santo_domingo(), [Some("Naco"); 7])
            .slow_point(0, Duration::from_secs(60))]);

        let Verdict::Fail(reason) = run(&geocoder, &ResolverConfig::default()).await else {
            panic!("expected failure");
        };
        assert!(reason.is_retryable());
    }

    #[tokio::test]
    async fn nearby_places_become_area_tags() {
        let geocoder = ScriptedGeocoder::new(vec![Script::new(santo_domingo(), [Some("Naco"); 7])])
            .with_nearby(vec![NearbyPlace {
                name: "Plaza Naco".to_owned(),
                categories: vec!["Mall".to_owned()],
                distance_m: 250.0,
                coordinate: None,
            }]);

        let Verdict::Assign(update) = run(&geocoder, &ResolverConfig::default()).await else {
            panic!("expected assignment");
        };
        let area = update
            .micro_location_tags
            .iter()
            .find(|t| t.name == "Plaza Naco")
            .unwrap();
        assert!((area.confidence - 0.5).abs() < 1e-12);
    }
}
