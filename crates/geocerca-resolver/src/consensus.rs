//! Multi-point ("geocerca") consensus.
//!
//! A single reverse-geocode near a sector boundary is a coin flip. Sampling a
//! fixed constellation of seven points around the target and taking the
//! modal neighborhood name turns that into a stable answer with a measurable
//! confidence.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use geocerca_core::{is_generic, normalize, Coordinate};
use geocerca_geocoder::{GeocodeError, GeocodingPort};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchDirection {
    Center,
    North,
    South,
    East,
    West,
    NorthEast,
    SouthWest,
}

impl SearchDirection {
    /// Fixed sampling order. Ties in the vote count go to the direction that
    /// appears first here.
    pub const ALL: [SearchDirection; 7] = [
        SearchDirection::Center,
        SearchDirection::North,
        SearchDirection::South,
        SearchDirection::East,
        SearchDirection::West,
        SearchDirection::NorthEast,
        SearchDirection::SouthWest,
    ];

    /// Unit multipliers applied to the offset, as `(lat, lng)`.
    fn unit(self) -> (f64, f64) {
        match self {
            SearchDirection::Center => (0.0, 0.0),
            SearchDirection::North => (1.0, 0.0),
            SearchDirection::South => (-1.0, 0.0),
            SearchDirection::East => (0.0, 1.0),
            SearchDirection::West => (0.0, -1.0),
            SearchDirection::NorthEast => (1.0, 1.0),
            SearchDirection::SouthWest => (-1.0, -1.0),
        }
    }
}

impl std::fmt::Display for SearchDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SearchDirection::Center => "center",
            SearchDirection::North => "n",
            SearchDirection::South => "s",
            SearchDirection::East => "e",
            SearchDirection::West => "w",
            SearchDirection::NorthEast => "ne",
            SearchDirection::SouthWest => "sw",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchPoint {
    pub direction: SearchDirection,
    pub coordinate: Coordinate,
}

/// One search point's answer. `sector_name` is `None` when the lookup failed,
/// timed out, or the provider had no sector-level name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeVote {
    pub point: SearchPoint,
    pub sector_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusResult {
    /// Normalized key of the modal name.
    pub winner: Option<String>,
    /// First raw spelling seen for the winner.
    pub winner_display: Option<String>,
    /// `winner_votes / valid_vote_count`, or `0.0` without a winner.
    pub confidence: f64,
    pub sample_count: usize,
    pub valid_vote_count: usize,
    pub winner_votes: usize,
}

impl ConsensusResult {
    #[must_use]
    pub fn has_winner(&self) -> bool {
        self.winner.is_some()
    }
}

/// The seven sampling points around `center`, in [`SearchDirection::ALL`] order.
#[must_use]
pub fn search_points(center: Coordinate, offset_deg: f64) -> [SearchPoint; 7] {
    SearchDirection::ALL.map(|direction| {
        let (d_lat, d_lng) = direction.unit();
        SearchPoint {
            direction,
            coordinate: center.offset(d_lat * offset_deg, d_lng * offset_deg),
        }
    })
}

/// Runs `fut` under `timeout`, turning an elapsed deadline into
/// [`GeocodeError::Timeout`].
pub(crate) async fn with_deadline<T, F>(timeout: Duration, fut: F) -> Result<T, GeocodeError>
where
    F: Future<Output = Result<T, GeocodeError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(GeocodeError::Timeout {
            after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

/// Samples the constellation around `center` concurrently and tallies the votes.
///
/// Every lookup is bounded by `lookup_timeout`; failures and timeouts become
/// absent votes and are never returned to the caller.
pub async fn resolve_consensus<G: GeocodingPort>(
    geocoder: &G,
    center: Coordinate,
    offset_deg: f64,
    lookup_timeout: Duration,
) -> ConsensusResult {
    let points = search_points(center, offset_deg);

    let lookups = points.iter().map(|&point| async move {
        let sector_name =
            match with_deadline(lookup_timeout, geocoder.reverse_geocode(point.coordinate)).await {
                Ok(address) => address.suburb,
                Err(e) => {
                    tracing::debug!(
                        direction = %point.direction,
                        at = %point.coordinate,
                        error = %e,
                        "search point lookup failed"
                    );
                    None
                }
            };
        GeocodeVote { point, sector_name }
    });

    let votes = join_all(lookups).await;
    let result = tally_votes(&votes);

    tracing::debug!(
        %center,
        winner = result.winner.as_deref().unwrap_or("-"),
        confidence = result.confidence,
        valid = result.valid_vote_count,
        samples = result.sample_count,
        "consensus tallied"
    );
    result
}

/// Modal normalized name among the valid votes.
///
/// Absent, blank and generic names are discarded before counting. Ties go to
/// the name first seen in vote order.
#[must_use]
pub fn tally_votes(votes: &[GeocodeVote]) -> ConsensusResult {
    // (key, first display spelling, count), in first-seen order
    let mut tally: Vec<(String, String, usize)> = Vec::new();
    let mut valid = 0usize;

    for raw in votes.iter().filter_map(|v| v.sector_name.as_deref()) {
        let raw = raw.trim();
        if raw.is_empty() || is_generic(raw) {
            continue;
        }
        let key = normalize(raw);
        if key.is_empty() {
            continue;
        }
        valid += 1;
        match tally.iter_mut().find(|(k, _, _)| *k == key) {
            Some(entry) => entry.2 += 1,
            None => tally.push((key, raw.to_owned(), 1)),
        }
    }

    let mut best: Option<&(String, String, usize)> = None;
    for entry in &tally {
        if best.is_none_or(|b| entry.2 > b.2) {
            best = Some(entry);
        }
    }

    match best {
        Some((key, display, count)) => {
            #[allow(clippy::cast_precision_loss)]
            let confidence = *count as f64 / valid as f64;
            ConsensusResult {
                winner: Some(key.clone()),
                winner_display: Some(display.clone()),
                confidence,
                sample_count: votes.len(),
                valid_vote_count: valid,
                winner_votes: *count,
            }
        }
        None => ConsensusResult {
            winner: None,
            winner_display: None,
            confidence: 0.0,
            sample_count: votes.len(),
            valid_vote_count: 0,
            winner_votes: 0,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::{santo_domingo, Script, ScriptedGeocoder, OFFSET};

    fn votes(names: &[Option<&str>]) -> Vec<GeocodeVote> {
        let points = search_points(santo_domingo(), OFFSET);
        names
            .iter()
            .zip(points)
            .map(|(name, point)| GeocodeVote {
                point,
                sector_name: name.map(str::to_owned),
            })
            .collect()
    }

    #[test]
    fn search_points_cover_seven_directions() {
        let center = santo_domingo();
        let points = search_points(center, OFFSET);
        assert_eq!(points[0].coordinate, center);
        let north = points[1].coordinate;
        assert!((north.latitude - (center.latitude + OFFSET)).abs() < 1e-12);
        assert!((north.longitude - center.longitude).abs() < 1e-12);
        let sw = points[6].coordinate;
        assert!((sw.latitude - (center.latitude - OFFSET)).abs() < 1e-12);
        assert!((sw.longitude - (center.longitude - OFFSET)).abs() < 1e-12);
        let directions: std::collections::HashSet<String> =
            points.iter().map(|p| p.direction.to_string()).collect();
        assert_eq!(directions.len(), 7);
    }

    #[test]
    fn unanimous_votes_give_full_confidence() {
        let result = tally_votes(&votes(&[Some("Naco"); 7]));
        assert_eq!(result.winner.as_deref(), Some("naco"));
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(result.valid_vote_count, 7);
        assert_eq!(result.sample_count, 7);
    }

    #[test]
    fn generic_votes_are_discarded_before_counting() {
        let result = tally_votes(&votes(&[
            Some("Piantini"),
            Some("Piantini"),
            Some("Piantini"),
            Some("Centro"),
            Some("Piantini"),
            Some("Piantini"),
            Some("Piantini"),
        ]));
        assert_eq!(result.winner.as_deref(), Some("piantini"));
        assert_eq!(result.valid_vote_count, 6);
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn spelling_variants_count_as_one_name() {
        let result = tally_votes(&votes(&[
            Some("Ensanche Paraíso"),
            Some("ENSANCHE PARAISO"),
            Some("Naco"),
            None,
            None,
            None,
            None,
        ]));
        assert_eq!(result.winner.as_deref(), Some("ensanche-paraiso"));
        assert_eq!(result.winner_display.as_deref(), Some("Ensanche Paraíso"));
        assert_eq!(result.winner_votes, 2);
        assert!((result.confidence - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn ties_go_to_first_seen_name() {
        let result = tally_votes(&votes(&[
            None,
            Some("Naco"),
            Some("Piantini"),
            Some("Piantini"),
            Some("Naco"),
            None,
            None,
        ]));
        assert_eq!(result.winner.as_deref(), Some("naco"));
        assert!((result.confidence - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn no_valid_votes_means_no_winner_and_zero_confidence() {
        let result = tally_votes(&votes(&[None, Some(""), Some("  "), Some("Downtown"), None, None, None]));
        assert!(!result.has_winner());
        assert!(result.confidence.abs() < f64::EPSILON);
        assert_eq!(result.valid_vote_count, 0);
        assert_eq!(result.sample_count, 7);
    }

    #[test]
    fn single_valid_vote_is_fully_confident() {
        let result = tally_votes(&votes(&[Some("Gazcue"), None, None, None, None, None, None]));
        assert_eq!(result.winner.as_deref(), Some("gazcue"));
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(result.valid_vote_count, 1);
    }

    #[test]
    fn confidence_stays_in_unit_interval() {
        let grids: [[Option<&str>; 7]; 4] = [
            [Some("A"), Some("B"), Some("C"), Some("D"), Some("E"), Some("F"), Some("G")],
            [Some("A"), Some("A"), Some("B"), None, None, None, Some("Centro")],
            [None; 7],
            [Some("X"); 7],
        ];
        for grid in grids {
            let result = tally_votes(&votes(&grid));
            assert!((0.0..=1.0).contains(&result.confidence));
            assert_eq!(result.confidence.abs() < f64::EPSILON, result.winner.is_none());
        }
    }

    #[tokio::test]
    async fn resolve_consensus_maps_failures_to_absent_votes() {
        let geocoder = ScriptedGeocoder::new(vec![Script::new(
            santo_domingo(),
            [
                Some("Nuevo Residencial X"),
                Some("Nuevo Residencial X"),
                Some("Nuevo Residencial X"),
                Some("Nuevo Residencial X"),
                None,
                None,
                None,
            ],
        )]);

        let result =
            resolve_consensus(&geocoder, santo_domingo(), OFFSET, Duration::from_secs(4)).await;

        assert_eq!(result.winner.as_deref(), Some("nuevo-residencial-x"));
        assert_eq!(result.valid_vote_count, 4);
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(geocoder.reverse_calls(), 7);
    }

    #[tokio::test]
    async fn resolve_consensus_all_failures_has_no_winner() {
        let geocoder = ScriptedGeocoder::new(vec![Script::new(santo_domingo(), [None; 7])]);
        let result =
            resolve_consensus(&geocoder, santo_domingo(), OFFSET, Duration::from_secs(4)).await;
        assert!(!result.has_winner());
        assert_eq!(result.sample_count, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_point_times_out_into_absent_vote() {
        let geocoder = ScriptedGeocoder::new(vec![
            Script::new(santo_domingo(), [Some("Naco"); 7]).slow_point(3, Duration::from_secs(30)),
        ]);

        let started = tokio::time::Instant::now();
        let result =
            resolve_consensus(&geocoder, santo_domingo(), OFFSET, Duration::from_secs(4)).await;

        assert_eq!(result.valid_vote_count, 6);
        assert_eq!(result.winner.as_deref(), Some("naco"));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
