//! Per-interaction state machine.
//!
//! `ResolutionState` is a plain value. Every transition consumes the current
//! state and returns the next one, so the driver task in [`crate::orchestrator`]
//! is the only owner and nothing is mutated in place. Each interaction carries
//! a sequence number; results tagged with any other number are stale.

use chrono::{DateTime, Utc};
use geocerca_core::{Coordinate, LocationUpdate, MicroLocationTag};
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

/// Why a resolution attempt ended in [`ResolutionState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    /// Reverse geocoding of the clicked point itself failed.
    #[error("center point lookup failed: {message}")]
    CenterLookup { message: String, not_found: bool },

    /// Every sampled vote was absent, blank or generic.
    #[error("no usable sector name among {sample_count} sampled points")]
    NoConsensus { sample_count: usize },
}

impl FailureReason {
    /// A provider that has no address for the point will not have one on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            FailureReason::CenterLookup { not_found, .. } => !not_found,
            FailureReason::NoConsensus { .. } => true,
        }
    }
}

/// A consensus winner waiting for the operator to alias it or register it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingAliasCandidate {
    pub id: Uuid,
    /// Raw spelling of the winning name as the provider returned it.
    pub detected_name: String,
    /// Normalized key of `detected_name`.
    pub key: String,
    pub raw_address: String,
    pub coordinate: Coordinate,
    pub created_at: DateTime<Utc>,
    pub country_id: i64,
    /// Province resolved for the coordinate (or the country fallback).
    pub province_id: i64,
    /// Set when the name did match a sector but too few votes backed it.
    pub suggested_sector_id: Option<i64>,
    pub confidence: f64,
    pub valid_vote_count: usize,
    pub micro_location_tags: Vec<MicroLocationTag>,
}

/// Outcome of classifying one interaction's gathered lookups.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Assign(LocationUpdate),
    Confirm(PendingAliasCandidate),
    Fail(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResolutionState {
    #[default]
    Idle,
    Debouncing {
        seq: u64,
        coordinate: Coordinate,
        deadline: Instant,
    },
    Resolving {
        seq: u64,
        coordinate: Coordinate,
    },
    AutoAssigned {
        seq: u64,
        update: LocationUpdate,
    },
    AwaitingConfirmation {
        seq: u64,
        candidate: PendingAliasCandidate,
    },
    Failed {
        seq: u64,
        coordinate: Coordinate,
        reason: FailureReason,
    },
}

/// Result of offering a verdict to the state machine.
#[derive(Debug)]
pub enum Resolved {
    /// The verdict belonged to the current interaction.
    Applied(ResolutionState),
    /// The verdict was for a superseded interaction; state is unchanged.
    Stale(ResolutionState),
}

impl ResolutionState {
    /// Raw coordinate input. Always starts a new interaction, superseding any
    /// debounce, in-flight resolution or pending candidate. The discarded
    /// candidate, if any, is handed back.
    #[must_use]
    pub fn input(
        self,
        seq: u64,
        coordinate: Coordinate,
        deadline: Instant,
    ) -> (Self, Option<PendingAliasCandidate>) {
        let discarded = match self {
            ResolutionState::AwaitingConfirmation { candidate, .. } => Some(candidate),
            _ => None,
        };
        (
            ResolutionState::Debouncing {
                seq,
                coordinate,
                deadline,
            },
            discarded,
        )
    }

    /// Moves `Debouncing` to `Resolving` once `now` has reached the deadline.
    #[must_use]
    pub fn debounce_elapsed(self, now: Instant) -> Self {
        match self {
            ResolutionState::Debouncing {
                seq,
                coordinate,
                deadline,
            } if now >= deadline => ResolutionState::Resolving { seq, coordinate },
            other => other,
        }
    }

    /// Applies a verdict if it belongs to the interaction currently resolving.
    #[must_use]
    pub fn resolved(self, seq: u64, verdict: Verdict) -> Resolved {
        let coordinate = match self {
            ResolutionState::Resolving {
                seq: current,
                coordinate,
            } if current == seq => coordinate,
            other => return Resolved::Stale(other),
        };

        Resolved::Applied(match verdict {
            Verdict::Assign(update) => ResolutionState::AutoAssigned { seq, update },
            Verdict::Confirm(candidate) => ResolutionState::AwaitingConfirmation { seq, candidate },
            Verdict::Fail(reason) => ResolutionState::Failed {
                seq,
                coordinate,
                reason,
            },
        })
    }

    /// The operator chose (or declined) and the candidate is gone.
    #[must_use]
    pub fn confirmation_closed(self) -> Self {
        match self {
            ResolutionState::AwaitingConfirmation { .. } => ResolutionState::Idle,
            other => other,
        }
    }

    #[must_use]
    pub fn debounce_deadline(&self) -> Option<Instant> {
        match self {
            ResolutionState::Debouncing { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    #[must_use]
    pub fn pending_candidate(&self) -> Option<&PendingAliasCandidate> {
        match self {
            ResolutionState::AwaitingConfirmation { candidate, .. } => Some(candidate),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_resolving(&self, seq: u64) -> bool {
        matches!(self, ResolutionState::Resolving { seq: current, .. } if *current == seq)
    }

    /// Sequence number of the interaction this state belongs to.
    #[must_use]
    pub fn seq(&self) -> Option<u64> {
        match self {
            ResolutionState::Idle => None,
            ResolutionState::Debouncing { seq, .. }
            | ResolutionState::Resolving { seq, .. }
            | ResolutionState::AutoAssigned { seq, .. }
            | ResolutionState::AwaitingConfirmation { seq, .. }
            | ResolutionState::Failed { seq, .. } => Some(*seq),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ResolutionState::Idle => "idle",
            ResolutionState::Debouncing { .. } => "debouncing",
            ResolutionState::Resolving { .. } => "resolving",
            ResolutionState::AutoAssigned { .. } => "auto_assigned",
            ResolutionState::AwaitingConfirmation { .. } => "awaiting_confirmation",
            ResolutionState::Failed { .. } => "failed",
        }
    }

    /// Whether the interaction has settled (nothing left to wait for but input).
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(
            self,
            ResolutionState::Debouncing { .. } | ResolutionState::Resolving { .. }
        )
    }
}
