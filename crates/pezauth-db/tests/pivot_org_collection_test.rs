//! Integration tests for the SurrealDB organization collection and the
//! persistence wrapper, using in-memory SurrealDB.

use chrono::Utc;
use pezauth_core::error::PersistenceError;
use pezauth_core::models::pivot_org::{OrgSelector, PivotOrg};
use pezauth_core::repository::{Collection, Persistence};
use pezauth_db::repository::SurrealCollection;
use pezauth_db::{CollectionWrapper, DbError};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    pezauth_db::run_migrations(&db).await.unwrap();
    db
}

fn org(email: &str, guid: &str) -> PivotOrg {
    let now = Utc::now();
    PivotOrg {
        email: email.into(),
        org_name: format!("pivot-{}", email.split('@').next().unwrap()),
        org_guid: guid.into(),
        active: true,
        details: "allocated".into(),
        created_at: now,
        updated_at: now,
    }
}

// -----------------------------------------------------------------------
// Raw collection
// -----------------------------------------------------------------------

#[tokio::test]
async fn find_one_on_empty_collection_is_none() {
    let collection = SurrealCollection::new(setup().await);

    let found = collection
        .find_one(&OrgSelector::owned_by("nobody@pivotal.io"))
        .await
        .unwrap();

    assert!(found.is_none());
}

#[tokio::test]
async fn upsert_inserts_then_updates() {
    let collection = SurrealCollection::new(setup().await);
    let selector = OrgSelector::owned_by("alice@pivotal.io");

    let first = collection
        .upsert(&selector, &org("alice@pivotal.io", "guid-1"))
        .await
        .unwrap();
    assert!(first.inserted);

    let second = collection
        .upsert(&selector, &org("alice@pivotal.io", "guid-2"))
        .await
        .unwrap();
    assert!(!second.inserted);

    let stored = collection.find_one(&selector).await.unwrap().unwrap();
    assert_eq!(stored.org_guid, "guid-2");
    assert_eq!(stored.org_name, "pivot-alice");
    assert!(stored.active);
}

#[tokio::test]
async fn remove_missing_record_reports_not_found() {
    let collection = SurrealCollection::new(setup().await);

    let err = collection
        .remove(&OrgSelector::owned_by("ghost@pivotal.io"))
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::NotFound { .. }));
}

#[tokio::test]
async fn duplicate_org_guid_across_users_rejected() {
    let collection = SurrealCollection::new(setup().await);

    collection
        .upsert(
            &OrgSelector::owned_by("alice@pivotal.io"),
            &org("alice@pivotal.io", "shared-guid"),
        )
        .await
        .unwrap();

    let result = collection
        .upsert(
            &OrgSelector::owned_by("bob@pivotal.io"),
            &org("bob@pivotal.io", "shared-guid"),
        )
        .await;

    assert!(result.is_err(), "org guid must be unique");
}

// -----------------------------------------------------------------------
// Wrapper over SurrealDB
// -----------------------------------------------------------------------

#[tokio::test]
async fn wrapper_round_trip_through_surreal() {
    let store = CollectionWrapper::new(SurrealCollection::new(setup().await));
    let selector = OrgSelector::owned_by("carol@pivotal.io");

    let err = store.find_one(&selector).await.unwrap_err();
    assert!(err.is_not_found());

    store
        .upsert(&selector, &org("carol@pivotal.io", "guid-c"))
        .await
        .unwrap();
    let stored = store.find_one(&selector).await.unwrap();
    assert_eq!(stored.email, "carol@pivotal.io");
    assert_eq!(stored.org_guid, "guid-c");

    store.remove(&selector).await.unwrap();
    assert!(store.find_one(&selector).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn wrapper_collapses_constraint_violation_into_sentinel() {
    let store = CollectionWrapper::new(SurrealCollection::new(setup().await));

    store
        .upsert(
            &OrgSelector::owned_by("alice@pivotal.io"),
            &org("alice@pivotal.io", "shared-guid"),
        )
        .await
        .unwrap();

    let err = store
        .upsert(
            &OrgSelector::owned_by("bob@pivotal.io"),
            &org("bob@pivotal.io", "shared-guid"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PersistenceError::CannotAddOrgRecord));
}

#[tokio::test]
async fn wrapper_remove_passes_db_not_found_through() {
    let store = CollectionWrapper::new(SurrealCollection::new(setup().await));

    let err = store
        .remove(&OrgSelector::owned_by("ghost@pivotal.io"))
        .await
        .unwrap_err();

    assert!(matches!(
        err.store_error::<DbError>(),
        Some(DbError::NotFound { .. })
    ));
    assert_eq!(
        err.to_string(),
        "Record not found: pivot_org with id ghost@pivotal.io"
    );
}
