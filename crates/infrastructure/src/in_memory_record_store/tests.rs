use celoris_application::{Record, RecordEvent, RecordFilter, RecordQuery, RecordStore, record_id};
use celoris_core::AppError;
use celoris_domain::Collection;
use serde_json::json;

use super::InMemoryRecordStore;

fn lead(id: &str, status: &str, price: f64) -> Record {
    json!({ "id": id, "status": status, "price": price })
        .as_object()
        .cloned()
        .unwrap_or_default()
}

async fn seeded() -> InMemoryRecordStore {
    let store = InMemoryRecordStore::new();
    for record in [
        lead("l1", "pending", 30.0),
        lead("l2", "approved", 10.0),
        lead("l3", "pending", 20.0),
    ] {
        assert!(store.create(Collection::Leads, record).await.is_ok());
    }
    store
}

fn ids(records: &[Record]) -> Vec<&str> {
    records.iter().filter_map(record_id).collect()
}

#[tokio::test]
async fn create_assigns_id_and_timestamp() {
    let store = InMemoryRecordStore::new();
    let record = json!({ "subject": "Physics" })
        .as_object()
        .cloned()
        .unwrap_or_default();

    let created = store.create(Collection::Leads, record).await;
    let Ok(created) = created else {
        panic!("create should succeed");
    };

    assert!(record_id(&created).is_some_and(|id| !id.is_empty()));
    assert!(created.get("created_at").is_some_and(|value| value.is_string()));
}

#[tokio::test]
async fn duplicate_id_is_rejected() {
    let store = seeded().await;

    let result = store
        .create(Collection::Leads, lead("l1", "pending", 1.0))
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn query_filters_orders_and_limits() {
    let store = seeded().await;

    let query = RecordQuery::new()
        .filter(RecordFilter::eq("status", "pending"))
        .order_asc("price");
    let result = store.query(Collection::Leads, &query).await;
    assert_eq!(ids(&result.unwrap_or_default()), vec!["l3", "l1"]);

    let query = RecordQuery::new().order_desc("price").limit(2);
    let result = store.query(Collection::Leads, &query).await;
    assert_eq!(ids(&result.unwrap_or_default()), vec!["l1", "l3"]);
}

#[tokio::test]
async fn collections_are_isolated() {
    let store = seeded().await;

    let result = store
        .query(Collection::Applications, &RecordQuery::new())
        .await;
    assert!(result.unwrap_or_default().is_empty());
    assert!(
        store
            .get(Collection::Applications, "l1")
            .await
            .is_err_and(|error| error.is_not_found())
    );
}

#[tokio::test]
async fn update_merges_patch_and_keeps_id() {
    let store = seeded().await;
    let patch = json!({ "id": "other", "status": "approved" })
        .as_object()
        .cloned()
        .unwrap_or_default();

    let updated = store.update(Collection::Leads, "l1", patch).await;
    let Ok(updated) = updated else {
        panic!("update should succeed");
    };

    assert_eq!(record_id(&updated), Some("l1"));
    assert_eq!(updated.get("status"), Some(&json!("approved")));
    assert_eq!(updated.get("price"), Some(&json!(30.0)));
}

#[tokio::test]
async fn missing_records_are_not_found() {
    let store = seeded().await;

    assert!(
        store
            .update(Collection::Leads, "zz", Record::new())
            .await
            .is_err_and(|error| error.is_not_found())
    );
    assert!(
        store
            .delete(Collection::Leads, "zz")
            .await
            .is_err_and(|error| error.is_not_found())
    );
}

#[tokio::test]
async fn writes_publish_changes() {
    let store = InMemoryRecordStore::new();
    let mut changes = store.changes();

    assert!(store.create(Collection::Leads, lead("l1", "pending", 5.0)).await.is_ok());
    assert!(store.delete(Collection::Leads, "l1").await.is_ok());

    let Ok(inserted) = changes.recv().await else {
        panic!("expected insert change");
    };
    assert_eq!(inserted.collection, Collection::Leads);
    assert!(matches!(inserted.event, RecordEvent::Insert(_)));

    let Ok(deleted) = changes.recv().await else {
        panic!("expected delete change");
    };
    assert!(matches!(deleted.event, RecordEvent::Delete(id) if id == "l1"));
}
