//! Location resolution pipeline.
//!
//! Turns a dropped pin into a sector assignment: samples a constellation of
//! points around the pin ([`consensus`]), maps the modal neighborhood name
//! onto the static hierarchy ([`mapper`]), and drives one map interaction at
//! a time through debounce, fan-out and confirmation ([`orchestrator`]).
//! Names the hierarchy does not know are routed to the [`alias`] workflow.

pub mod alias;
pub mod classify;
pub mod config;
pub mod consensus;
pub mod error;
pub mod mapper;
pub mod orchestrator;
pub mod state;
pub mod tags;

#[cfg(test)]
pub(crate) mod test_support;

pub use alias::{
    apply_decision, AliasDecision, AliasOutcome, InMemoryLocationStore, LocationStore, NewSector,
    SectorAlias,
};
pub use config::ResolverConfig;
pub use consensus::{
    resolve_consensus, search_points, tally_votes, ConsensusResult, GeocodeVote, SearchDirection,
    SearchPoint,
};
pub use error::{ResolveError, StoreError};
pub use mapper::{HierarchyMapper, HierarchyMatch};
pub use orchestrator::{spawn_orchestrator, LocationSink, OrchestratorHandle};
pub use state::{FailureReason, PendingAliasCandidate, ResolutionState, Verdict};
