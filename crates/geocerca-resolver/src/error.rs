use geocerca_core::CoreError;
use geocerca_geocoder::GeocodeError;
use thiserror::Error;
use uuid::Uuid;

use crate::state::FailureReason;

/// Errors from the location store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("location store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("country '{0}' is not in the hierarchy table")]
    UnknownCountry(String),

    #[error(transparent)]
    InvalidCoordinate(#[from] CoreError),

    #[error("forward geocode failed: {0}")]
    ForwardGeocode(#[source] GeocodeError),

    /// A resolution attempt ended without an assignment.
    #[error(transparent)]
    Failed(#[from] FailureReason),

    /// The decision refers to a candidate that is no longer pending.
    #[error("alias candidate {candidate_id} is not pending")]
    StaleCandidate { candidate_id: Uuid },

    #[error("sector {sector_id} does not exist in the bound country")]
    UnknownSector { sector_id: i64 },

    #[error("sector name '{name}' has no usable characters")]
    InvalidSectorName { name: String },

    #[error("sector key '{key}' already maps to sector {existing_id}")]
    DuplicateSector { key: String, existing_id: i64 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("orchestrator is no longer running")]
    OrchestratorClosed,
}

impl ResolveError {
    /// Whether showing a retry affordance makes sense for this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ResolveError::Failed(reason) => reason.is_retryable(),
            ResolveError::ForwardGeocode(e) => !matches!(e, GeocodeError::NotFound { .. }),
            ResolveError::Store(_) => true,
            ResolveError::UnknownCountry(_)
            | ResolveError::InvalidCoordinate(_)
            | ResolveError::StaleCandidate { .. }
            | ResolveError::UnknownSector { .. }
            | ResolveError::InvalidSectorName { .. }
            | ResolveError::DuplicateSector { .. }
            | ResolveError::OrchestratorClosed => false,
        }
    }
}
