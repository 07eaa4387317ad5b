//! Resolving a pending candidate into a committed assignment.
//!
//! The operator either aliases the detected name onto an existing sector,
//! registers it as a new sector under the candidate's province, or dismisses
//! it. Writes go through a [`LocationStore`] first and only then become
//! visible to the mapper, so a failed write leaves nothing behind.

use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use geocerca_core::{
    is_generic, normalize, AssignmentSource, Coordinate, HierarchyAssignment, HierarchyNode,
    HierarchyTable, LocationUpdate, NodeKind,
};
use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, StoreError};
use crate::mapper::HierarchyMapper;
use crate::state::PendingAliasCandidate;

/// The operator's answer to a pending candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AliasDecision {
    /// Map the detected name onto an existing sector; `None` means the
    /// country's fallback sector.
    CreateAlias { target_sector_id: Option<i64> },
    /// Register a new sector; `None` keeps the detected name.
    CreateNewLocation { name: Option<String> },
    Dismiss,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectorAlias {
    pub key: String,
    pub sector_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSector {
    pub name: String,
    pub key: String,
    pub province_id: i64,
    pub coordinate: Coordinate,
}

/// Persistent home for aliases and operator-created sectors.
pub trait LocationStore: Send + Sync {
    fn insert_alias(
        &self,
        alias: SectorAlias,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Stores a new sector and returns its freshly allocated id.
    fn insert_sector(&self, sector: NewSector)
        -> impl Future<Output = Result<i64, StoreError>> + Send;
}

/// Process-local store. Ids are allocated above the static table's maximum.
#[derive(Debug)]
pub struct InMemoryLocationStore {
    next_id: AtomicI64,
    aliases: Mutex<Vec<SectorAlias>>,
    sectors: Mutex<Vec<(i64, NewSector)>>,
}

impl InMemoryLocationStore {
    #[must_use]
    pub fn for_table(table: &HierarchyTable) -> Self {
        Self {
            next_id: AtomicI64::new(table.max_id() + 1),
            aliases: Mutex::new(Vec::new()),
            sectors: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of stored aliases.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the lock is poisoned.
    pub fn aliases(&self) -> Result<Vec<SectorAlias>, StoreError> {
        self.aliases
            .lock()
            .map(|a| a.clone())
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    /// Snapshot of stored sectors with their ids.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the lock is poisoned.
    pub fn sectors(&self) -> Result<Vec<(i64, NewSector)>, StoreError> {
        self.sectors
            .lock()
            .map(|s| s.clone())
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

impl LocationStore for InMemoryLocationStore {
    async fn insert_alias(&self, alias: SectorAlias) -> Result<(), StoreError> {
        self.aliases
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .push(alias);
        Ok(())
    }

    async fn insert_sector(&self, sector: NewSector) -> Result<i64, StoreError> {
        let mut sectors = self
            .sectors
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        sectors.push((id, sector));
        Ok(id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AliasOutcome {
    Committed(LocationUpdate),
    Dismissed,
}

/// Applies the operator's decision to `candidate`.
///
/// # Errors
///
/// - [`ResolveError::UnknownSector`] when the alias target is not a sector of
///   the bound country.
/// - [`ResolveError::InvalidSectorName`] / [`ResolveError::DuplicateSector`]
///   when a new sector's name is unusable or already known.
/// - [`ResolveError::Store`] when the store write fails.
///
/// On error nothing is committed and the mapper is unchanged.
pub async fn apply_decision<S: LocationStore>(
    candidate: &PendingAliasCandidate,
    decision: AliasDecision,
    mapper: &mut HierarchyMapper,
    store: &S,
) -> Result<AliasOutcome, ResolveError> {
    match decision {
        AliasDecision::Dismiss => {
            tracing::info!(candidate = %candidate.id, name = %candidate.detected_name, "candidate dismissed");
            Ok(AliasOutcome::Dismissed)
        }
        AliasDecision::CreateAlias { target_sector_id } => {
            let sector_id = target_sector_id.unwrap_or_else(|| mapper.fallback_sector());
            let province_id = mapper
                .sector(sector_id)
                .and_then(|n| n.parent_id)
                .ok_or(ResolveError::UnknownSector { sector_id })?;

            if mapper.sector_for_key(&candidate.key).is_none() {
                store
                    .insert_alias(SectorAlias {
                        key: candidate.key.clone(),
                        sector_id,
                        created_at: Utc::now(),
                    })
                    .await?;
                mapper.add_alias(&candidate.key, sector_id);
            }

            tracing::info!(key = %candidate.key, sector_id, "alias created");
            Ok(AliasOutcome::Committed(commit(
                candidate,
                province_id,
                sector_id,
                AssignmentSource::Alias,
            )))
        }
        AliasDecision::CreateNewLocation { name } => {
            let name = name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or(candidate.detected_name.as_str())
                .to_owned();
            let key = normalize(&name);
            if key.is_empty() || is_generic(&name) {
                return Err(ResolveError::InvalidSectorName { name });
            }
            if let Some(existing_id) = mapper.sector_for_key(&key) {
                return Err(ResolveError::DuplicateSector { key, existing_id });
            }

            let province_id = candidate.province_id;
            let sector_id = store
                .insert_sector(NewSector {
                    name: name.clone(),
                    key: key.clone(),
                    province_id,
                    coordinate: candidate.coordinate,
                })
                .await?;
            mapper.register_sector(
                &key,
                HierarchyNode {
                    id: sector_id,
                    name,
                    kind: NodeKind::Sector,
                    parent_id: Some(province_id),
                },
            );

            // a renamed sector still answers to the name that was detected
            if key != candidate.key && mapper.sector_for_key(&candidate.key).is_none() {
                let alias = SectorAlias {
                    key: candidate.key.clone(),
                    sector_id,
                    created_at: Utc::now(),
                };
                match store.insert_alias(alias).await {
                    Ok(()) => {
                        mapper.add_alias(&candidate.key, sector_id);
                    }
                    Err(e) => {
                        tracing::warn!(key = %candidate.key, sector_id, error = %e, "failed to alias detected name to new sector");
                    }
                }
            }

            tracing::info!(%key, sector_id, province_id, "sector registered");
            Ok(AliasOutcome::Committed(commit(
                candidate,
                province_id,
                sector_id,
                AssignmentSource::NewLocation,
            )))
        }
    }
}

fn commit(
    candidate: &PendingAliasCandidate,
    province_id: i64,
    sector_id: i64,
    source: AssignmentSource,
) -> LocationUpdate {
    LocationUpdate {
        assignment: HierarchyAssignment {
            country_id: Some(candidate.country_id),
            province_id: Some(province_id),
            sector_id: Some(sector_id),
        },
        coordinate: candidate.coordinate,
        exact_address: Some(candidate.raw_address.clone()).filter(|a| !a.is_empty()),
        micro_location_tags: candidate.micro_location_tags.clone(),
        source,
    }
}

#[cfg(test)]
#[path = "alias_test.rs"]
mod tests;
