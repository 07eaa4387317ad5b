//! `resolve`, `locate` and `geocode` handlers.
//!
//! Each invocation runs one interaction through a fresh orchestrator backed by
//! the HTTP geocoder and an in-memory location store, so aliases and new
//! sectors created here last only for the run.

use std::sync::Arc;

use anyhow::Context;
use geocerca_core::{load_hierarchy, AppConfig, Coordinate};
use geocerca_geocoder::{GeocodingPort, HttpGeocoder, HttpGeocoderConfig};
use geocerca_resolver::{
    spawn_orchestrator, AliasDecision, AliasOutcome, HierarchyMapper, InMemoryLocationStore,
    ResolutionState, ResolverConfig,
};
use tokio::sync::mpsc;

pub(crate) enum Target {
    Coordinate(Coordinate),
    Address(String),
}

fn build_geocoder(config: &AppConfig) -> anyhow::Result<HttpGeocoder> {
    HttpGeocoder::new(&HttpGeocoderConfig::from_app_config(config))
        .context("failed to build geocoder client")
}

/// Resolves `target` and prints the committed update, or the pending
/// candidate when no decision was supplied.
///
/// # Errors
///
/// Returns an error if the hierarchy cannot be loaded, the configured country
/// is unknown, resolution fails, or the decision is rejected.
pub(crate) async fn run_resolve(
    config: &AppConfig,
    target: Target,
    decision: Option<AliasDecision>,
) -> anyhow::Result<()> {
    let table = Arc::new(load_hierarchy(&config.hierarchy_path)?);
    let mapper = HierarchyMapper::new(Arc::clone(&table), &config.country)?;
    let store = Arc::new(InMemoryLocationStore::for_table(&table));
    let geocoder = Arc::new(build_geocoder(config)?);
    let (updates_tx, mut updates) = mpsc::unbounded_channel();

    let (handle, _driver) = spawn_orchestrator(
        ResolverConfig::from_app_config(config),
        geocoder,
        mapper,
        store,
        Arc::new(updates_tx),
    );

    let seq = match target {
        Target::Coordinate(coordinate) => handle.locate(coordinate).await?,
        Target::Address(address) => handle.locate_address(&address).await?,
    };

    match handle.settled(seq).await? {
        ResolutionState::AutoAssigned { .. } => {}
        ResolutionState::AwaitingConfirmation { candidate, .. } => {
            let Some(decision) = decision else {
                println!("{}", serde_json::to_string_pretty(&candidate)?);
                eprintln!(
                    "'{}' is not in the hierarchy; rerun with --alias-to, --alias-fallback, --new-location or --dismiss",
                    candidate.detected_name
                );
                return Ok(());
            };
            if handle.decide(candidate.id, decision).await? == AliasOutcome::Dismissed {
                eprintln!("dismissed '{}'; assignment unchanged", candidate.detected_name);
                return Ok(());
            }
        }
        ResolutionState::Failed { reason, .. } => {
            let hint = if reason.is_retryable() { " (retry later)" } else { "" };
            anyhow::bail!("resolution failed: {reason}{hint}");
        }
        other => anyhow::bail!("orchestrator settled in unexpected state '{}'", other.name()),
    }

    let update = updates
        .recv()
        .await
        .context("orchestrator stopped before emitting an update")?;
    println!("{}", serde_json::to_string_pretty(&update)?);
    Ok(())
}

/// Forward-geocodes `address` and prints the best match.
///
/// # Errors
///
/// Returns an error if the client cannot be built or the lookup fails.
pub(crate) async fn run_geocode(config: &AppConfig, address: &str) -> anyhow::Result<()> {
    let geocoder = build_geocoder(config)?;
    let found = geocoder
        .forward_geocode(address)
        .await
        .with_context(|| format!("could not geocode '{address}'"))?;
    println!("{}", serde_json::to_string_pretty(&found)?);
    Ok(())
}
