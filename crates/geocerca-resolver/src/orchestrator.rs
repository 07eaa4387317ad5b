//! Drives one map interaction at a time.
//!
//! A single driver task owns the [`ResolutionState`] value, the mapper and the
//! sequence counter. Input arrives over a command channel; the geocoding work
//! for the current interaction runs in its own task and reports back tagged
//! with its sequence number. Superseding input aborts that task, and any
//! result that still slips through is dropped unless its number is current.

use std::sync::Arc;

use geocerca_core::{Coordinate, LocationUpdate};
use geocerca_geocoder::GeocodingPort;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::alias::{apply_decision, AliasDecision, AliasOutcome, LocationStore};
use crate::classify::{classify, gather, Gathered};
use crate::config::ResolverConfig;
use crate::consensus::with_deadline;
use crate::error::ResolveError;
use crate::mapper::HierarchyMapper;
use crate::state::{ResolutionState, Resolved};

/// Receives each committed assignment. Never called for debounce, in-flight
/// or failed states.
pub trait LocationSink: Send + Sync + 'static {
    fn on_location_update(&self, update: LocationUpdate);
}

impl LocationSink for mpsc::UnboundedSender<LocationUpdate> {
    fn on_location_update(&self, update: LocationUpdate) {
        if self.send(update).is_err() {
            tracing::debug!("location update receiver dropped");
        }
    }
}

enum Command {
    Locate {
        coordinate: Coordinate,
        reply: oneshot::Sender<u64>,
    },
    Decide {
        candidate_id: Uuid,
        decision: AliasDecision,
        reply: oneshot::Sender<Result<AliasOutcome, ResolveError>>,
    },
}

/// Cheap, cloneable front door to a running orchestrator.
pub struct OrchestratorHandle<G> {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ResolutionState>,
    geocoder: Arc<G>,
    lookup_timeout: std::time::Duration,
}

impl<G> Clone for OrchestratorHandle<G> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            state: self.state.clone(),
            geocoder: Arc::clone(&self.geocoder),
            lookup_timeout: self.lookup_timeout,
        }
    }
}

impl<G: GeocodingPort> OrchestratorHandle<G> {
    /// Starts a new interaction at `coordinate` and returns its sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::OrchestratorClosed`] if the driver has stopped.
    pub async fn locate(&self, coordinate: Coordinate) -> Result<u64, ResolveError> {
        let (reply, seq) = oneshot::channel();
        self.commands
            .send(Command::Locate { coordinate, reply })
            .map_err(|_| ResolveError::OrchestratorClosed)?;
        seq.await.map_err(|_| ResolveError::OrchestratorClosed)
    }

    /// Forward-geocodes `address` and starts an interaction at the result.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::ForwardGeocode`] when the address cannot be
    /// resolved, or [`ResolveError::OrchestratorClosed`].
    pub async fn locate_address(&self, address: &str) -> Result<u64, ResolveError> {
        let found = with_deadline(self.lookup_timeout, self.geocoder.forward_geocode(address))
            .await
            .map_err(ResolveError::ForwardGeocode)?;
        tracing::debug!(address, at = %found.coordinate, matched = %found.display_name, "address located");
        self.locate(found.coordinate).await
    }

    /// Resolves the pending candidate `candidate_id` with `decision`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::StaleCandidate`] if that candidate is no longer
    /// pending, any error from the alias workflow (the candidate then stays
    /// pending), or [`ResolveError::OrchestratorClosed`].
    pub async fn decide(
        &self,
        candidate_id: Uuid,
        decision: AliasDecision,
    ) -> Result<AliasOutcome, ResolveError> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(Command::Decide {
                candidate_id,
                decision,
                reply,
            })
            .map_err(|_| ResolveError::OrchestratorClosed)?;
        outcome.await.map_err(|_| ResolveError::OrchestratorClosed)?
    }

    /// Watches every published state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ResolutionState> {
        self.state.clone()
    }

    #[must_use]
    pub fn state(&self) -> ResolutionState {
        self.state.borrow().clone()
    }

    /// Waits until interaction `seq` (or a later one) has settled.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::OrchestratorClosed`] if the driver stops first.
    pub async fn settled(&self, seq: u64) -> Result<ResolutionState, ResolveError> {
        let mut state = self.state.clone();
        let settled = state
            .wait_for(|s| s.is_settled() && s.seq().is_none_or(|current| current >= seq))
            .await
            .map_err(|_| ResolveError::OrchestratorClosed)?;
        Ok(settled.clone())
    }
}

/// Spawns the driver task. It runs until every handle is dropped.
pub fn spawn_orchestrator<G, S, K>(
    config: ResolverConfig,
    geocoder: Arc<G>,
    mapper: HierarchyMapper,
    store: Arc<S>,
    sink: Arc<K>,
) -> (OrchestratorHandle<G>, JoinHandle<()>)
where
    G: GeocodingPort + 'static,
    S: LocationStore + 'static,
    K: LocationSink,
{
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (results_tx, results_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(ResolutionState::Idle);

    let handle = OrchestratorHandle {
        commands: commands_tx,
        state: state_rx,
        geocoder: Arc::clone(&geocoder),
        lookup_timeout: config.lookup_timeout,
    };

    let driver = Driver {
        config,
        geocoder,
        mapper,
        store,
        sink,
        state: ResolutionState::Idle,
        state_tx,
        next_seq: 0,
        in_flight: None,
        results_tx,
    };
    let task = tokio::spawn(driver.run(commands_rx, results_rx));
    (handle, task)
}

struct Driver<G, S, K> {
    config: ResolverConfig,
    geocoder: Arc<G>,
    mapper: HierarchyMapper,
    store: Arc<S>,
    sink: Arc<K>,
    state: ResolutionState,
    state_tx: watch::Sender<ResolutionState>,
    next_seq: u64,
    in_flight: Option<JoinHandle<()>>,
    results_tx: mpsc::UnboundedSender<(u64, Gathered)>,
}

impl<G, S, K> Driver<G, S, K>
where
    G: GeocodingPort + 'static,
    S: LocationStore + 'static,
    K: LocationSink,
{
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut results: mpsc::UnboundedReceiver<(u64, Gathered)>,
    ) {
        loop {
            let deadline = self.state.debounce_deadline();
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                () = sleep_until(deadline) => self.start_resolving(),
                Some((seq, gathered)) = results.recv() => self.handle_result(seq, gathered),
            }
        }

        self.cancel_in_flight();
        tracing::debug!("orchestrator stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Locate { coordinate, reply } => {
                let seq = self.handle_input(coordinate);
                // the caller may have stopped waiting; the input still counts
                let _ = reply.send(seq);
            }
            Command::Decide {
                candidate_id,
                decision,
                reply,
            } => {
                let outcome = self.handle_decision(candidate_id, decision).await;
                let _ = reply.send(outcome);
            }
        }
    }

    fn handle_input(&mut self, coordinate: Coordinate) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.cancel_in_flight();

        let deadline = Instant::now() + self.config.debounce;
        let (next, discarded) = std::mem::take(&mut self.state).input(seq, coordinate, deadline);
        if let Some(candidate) = discarded {
            tracing::info!(
                candidate = %candidate.id,
                name = %candidate.detected_name,
                "pending candidate discarded by new input"
            );
        }
        tracing::debug!(seq, lat = coordinate.latitude, lng = coordinate.longitude, "input received");
        self.publish(next);
        seq
    }

    fn start_resolving(&mut self) {
        let next = std::mem::take(&mut self.state).debounce_elapsed(Instant::now());
        let ResolutionState::Resolving { seq, coordinate } = next else {
            self.publish(next);
            return;
        };
        self.publish(next);

        let geocoder = Arc::clone(&self.geocoder);
        let config = self.config.clone();
        let results = self.results_tx.clone();
        tracing::debug!(seq, %coordinate, "resolving");
        self.in_flight = Some(tokio::spawn(async move {
            let gathered = gather(geocoder.as_ref(), coordinate, &config).await;
            // the driver only goes away on shutdown
            let _ = results.send((seq, gathered));
        }));
    }

    fn handle_result(&mut self, seq: u64, gathered: Gathered) {
        if !self.state.is_resolving(seq) {
            tracing::debug!(seq, current = ?self.state.seq(), "dropping stale result");
            return;
        }
        self.in_flight = None;

        let verdict = classify(gathered, &self.mapper, &self.config);
        let next = match std::mem::take(&mut self.state).resolved(seq, verdict) {
            Resolved::Applied(next) => next,
            Resolved::Stale(unchanged) => {
                self.state = unchanged;
                return;
            }
        };

        match &next {
            ResolutionState::AutoAssigned { update, .. } => {
                tracing::info!(
                    seq,
                    sector_id = ?update.assignment.sector_id,
                    province_id = ?update.assignment.province_id,
                    "sector auto-assigned"
                );
                self.sink.on_location_update(update.clone());
            }
            ResolutionState::AwaitingConfirmation { candidate, .. } => {
                tracing::info!(
                    seq,
                    candidate = %candidate.id,
                    winner = %candidate.key,
                    confidence = candidate.confidence,
                    "detected sector needs confirmation"
                );
            }
            ResolutionState::Failed { reason, .. } => {
                tracing::warn!(seq, error = %reason, retryable = reason.is_retryable(), "resolution failed");
            }
            _ => {}
        }
        self.publish(next);
    }

    async fn handle_decision(
        &mut self,
        candidate_id: Uuid,
        decision: AliasDecision,
    ) -> Result<AliasOutcome, ResolveError> {
        let candidate = self
            .state
            .pending_candidate()
            .filter(|c| c.id == candidate_id)
            .cloned()
            .ok_or(ResolveError::StaleCandidate { candidate_id })?;

        let outcome =
            apply_decision(&candidate, decision, &mut self.mapper, self.store.as_ref()).await?;

        if let AliasOutcome::Committed(update) = &outcome {
            self.sink.on_location_update(update.clone());
        }
        let next = std::mem::take(&mut self.state).confirmation_closed();
        self.publish(next);
        Ok(outcome)
    }

    fn cancel_in_flight(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
            tracing::debug!("superseded lookup aborted");
        }
    }

    fn publish(&mut self, next: ResolutionState) {
        self.state = next;
        self.state_tx.send_replace(self.state.clone());
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
