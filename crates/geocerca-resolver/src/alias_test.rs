use chrono::Utc;
use uuid::Uuid;

use super::*;
use crate::test_support::{sample_mapper, sample_table, santo_domingo};

fn candidate() -> PendingAliasCandidate {
    PendingAliasCandidate {
        id: Uuid::new_v4(),
        detected_name: "Nuevo Residencial X".to_owned(),
        key: "nuevo-residencial-x".to_owned(),
        raw_address: "Calle 1, Nuevo Residencial X, Distrito Nacional".to_owned(),
        coordinate: santo_domingo(),
        created_at: Utc::now(),
        country_id: 1,
        province_id: 101,
        suggested_sector_id: None,
        confidence: 1.0,
        valid_vote_count: 4,
        micro_location_tags: Vec::new(),
    }
}

fn store() -> InMemoryLocationStore {
    InMemoryLocationStore::for_table(&sample_table())
}

struct BrokenStore;

impl LocationStore for BrokenStore {
    async fn insert_alias(&self, _alias: SectorAlias) -> Result<(), StoreError> {
        Err(StoreError::Backend("connection refused".to_owned()))
    }

    async fn insert_sector(&self, _sector: NewSector) -> Result<i64, StoreError> {
        Err(StoreError::Backend("connection refused".to_owned()))
    }
}

#[tokio::test]
async fn alias_to_existing_sector_commits_that_sector() {
    let mut mapper = sample_mapper();
    let store = store();
    let outcome = apply_decision(
        &candidate(),
        AliasDecision::CreateAlias {
            target_sector_id: Some(9),
        },
        &mut mapper,
        &store,
    )
    .await
    .unwrap();

    let AliasOutcome::Committed(update) = outcome else {
        panic!("expected commit");
    };
    assert_eq!(update.assignment.sector_id, Some(9));
    assert_eq!(update.assignment.province_id, Some(101));
    assert_eq!(update.assignment.country_id, Some(1));
    assert_eq!(update.source, AssignmentSource::Alias);
    assert_eq!(mapper.sector_for_key("nuevo-residencial-x"), Some(9));

    let aliases = store.aliases().unwrap();
    assert_eq!(aliases.len(), 1);
    assert_eq!(aliases[0].key, "nuevo-residencial-x");
    assert_eq!(aliases[0].sector_id, 9);
}

#[tokio::test]
async fn alias_without_target_uses_fallback_sector() {
    let mut mapper = sample_mapper();
    let outcome = apply_decision(
        &candidate(),
        AliasDecision::CreateAlias {
            target_sector_id: None,
        },
        &mut mapper,
        &store(),
    )
    .await
    .unwrap();

    let AliasOutcome::Committed(update) = outcome else {
        panic!("expected commit");
    };
    assert_eq!(update.assignment.sector_id, Some(14));
}

#[tokio::test]
async fn alias_to_unknown_sector_is_rejected() {
    let mut mapper = sample_mapper();
    let store = store();
    for bad in [999, 101, 1] {
        let err = apply_decision(
            &candidate(),
            AliasDecision::CreateAlias {
                target_sector_id: Some(bad),
            },
            &mut mapper,
            &store,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownSector { sector_id } if sector_id == bad));
    }
    assert!(mapper.sector_for_key("nuevo-residencial-x").is_none());
    assert!(store.aliases().unwrap().is_empty());
}

#[tokio::test]
async fn new_location_gets_fresh_id_under_candidate_province() {
    let mut mapper = sample_mapper();
    let store = store();
    let outcome = apply_decision(
        &candidate(),
        AliasDecision::CreateNewLocation { name: None },
        &mut mapper,
        &store,
    )
    .await
    .unwrap();

    let AliasOutcome::Committed(update) = outcome else {
        panic!("expected commit");
    };
    let max_id = sample_table().max_id();
    assert_eq!(update.assignment.sector_id, Some(max_id + 1));
    assert_eq!(update.assignment.province_id, Some(101));
    assert_eq!(update.source, AssignmentSource::NewLocation);

    let node = mapper.sector(max_id + 1).unwrap();
    assert_eq!(node.name, "Nuevo Residencial X");
    assert_eq!(node.parent_id, Some(101));
    assert_eq!(mapper.map("", "Nuevo Residencial X").sector_id, max_id + 1);
    assert_eq!(store.sectors().unwrap().len(), 1);
}

#[tokio::test]
async fn renamed_new_location_still_answers_to_detected_name() {
    let mut mapper = sample_mapper();
    let store = store();
    apply_decision(
        &candidate(),
        AliasDecision::CreateNewLocation {
            name: Some("  Residencial Las Palmas ".to_owned()),
        },
        &mut mapper,
        &store,
    )
    .await
    .unwrap();

    let id = mapper.sector_for_key("residencial-las-palmas").unwrap();
    assert_eq!(mapper.sector_for_key("nuevo-residencial-x"), Some(id));
    assert_eq!(store.sectors().unwrap()[0].1.name, "Residencial Las Palmas");
}

#[tokio::test]
async fn new_location_rejects_known_and_unusable_names() {
    let mut mapper = sample_mapper();
    let store = store();

    let err = apply_decision(
        &candidate(),
        AliasDecision::CreateNewLocation {
            name: Some("PIANTINI".to_owned()),
        },
        &mut mapper,
        &store,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ResolveError::DuplicateSector { existing_id: 9, .. }));

    for name in ["¿?", "Centro Histórico"] {
        let err = apply_decision(
            &candidate(),
            AliasDecision::CreateNewLocation {
                name: Some(name.to_owned()),
            },
            &mut mapper,
            &store,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidSectorName { .. }));
    }
    assert!(store.sectors().unwrap().is_empty());
}

#[tokio::test]
async fn store_failure_leaves_mapper_untouched() {
    let mut mapper = sample_mapper();

    let err = apply_decision(
        &candidate(),
        AliasDecision::CreateAlias {
            target_sector_id: Some(9),
        },
        &mut mapper,
        &BrokenStore,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ResolveError::Store(_)));
    assert!(err.is_retryable());
    assert!(mapper.sector_for_key("nuevo-residencial-x").is_none());

    let err = apply_decision(
        &candidate(),
        AliasDecision::CreateNewLocation { name: None },
        &mut mapper,
        &BrokenStore,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ResolveError::Store(_)));
    assert!(mapper.sector_for_key("nuevo-residencial-x").is_none());
}

#[tokio::test]
async fn dismiss_changes_nothing() {
    let mut mapper = sample_mapper();
    let store = store();
    let outcome = apply_decision(&candidate(), AliasDecision::Dismiss, &mut mapper, &store)
        .await
        .unwrap();
    assert_eq!(outcome, AliasOutcome::Dismissed);
    assert!(mapper.sector_for_key("nuevo-residencial-x").is_none());
    assert!(store.aliases().unwrap().is_empty());
}

#[test]
fn decisions_deserialize_from_tagged_json() {
    let decision: AliasDecision =
        serde_json::from_str(r#"{"action":"create_alias","target_sector_id":9}"#).unwrap();
    assert_eq!(
        decision,
        AliasDecision::CreateAlias {
            target_sector_id: Some(9)
        }
    );
    let decision: AliasDecision = serde_json::from_str(r#"{"action":"dismiss"}"#).unwrap();
    assert_eq!(decision, AliasDecision::Dismiss);
}
