use celoris_core::AppResult;
use celoris_domain::Collection;

use crate::{Record, RecordChange, RecordEvent, RecordQuery, RecordStore, record_id};

/// Locally held list of records kept current from change events.
///
/// Inserts go to the front, updates replace the record with the same id,
/// deletes remove it. Changes for unknown ids are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveList {
    collection: Collection,
    records: Vec<Record>,
}

impl LiveList {
    /// Creates a list from already fetched records.
    #[must_use]
    pub fn new(collection: Collection, records: Vec<Record>) -> Self {
        Self {
            collection,
            records,
        }
    }

    /// Fetches the initial records for `query`.
    pub async fn load(
        record_store: &dyn RecordStore,
        collection: Collection,
        query: &RecordQuery,
    ) -> AppResult<Self> {
        let records = record_store.query(collection, query).await?;
        Ok(Self::new(collection, records))
    }

    /// Returns the current records.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Applies a change. Returns whether the list changed.
    pub fn apply(&mut self, change: &RecordChange) -> bool {
        if change.collection != self.collection {
            return false;
        }

        match &change.event {
            RecordEvent::Insert(record) => {
                self.records.insert(0, record.clone());
                true
            }
            RecordEvent::Update(record) => {
                let Some(id) = record_id(record) else {
                    return false;
                };
                match self.position(id) {
                    Some(index) => {
                        self.records[index] = record.clone();
                        true
                    }
                    None => false,
                }
            }
            RecordEvent::Delete(id) => match self.position(id) {
                Some(index) => {
                    self.records.remove(index);
                    true
                }
                None => false,
            },
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record_id(record) == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use celoris_domain::Collection;
    use serde_json::json;

    use super::LiveList;
    use crate::test_support::FakeRecordStore;
    use crate::{
        Record, RecordChange, RecordEvent, RecordFilter, RecordQuery, RecordStore, record_id,
    };

    fn lead(id: &str, status: &str) -> Record {
        json!({ "id": id, "status": status })
            .as_object()
            .cloned()
            .unwrap_or_default()
    }

    fn change(event: RecordEvent) -> RecordChange {
        RecordChange {
            collection: Collection::Leads,
            event,
        }
    }

    fn ids(list: &LiveList) -> Vec<&str> {
        list.records().iter().filter_map(record_id).collect()
    }

    #[test]
    fn applies_insert_update_and_delete() {
        let mut list = LiveList::new(Collection::Leads, vec![lead("l1", "pending")]);

        assert!(list.apply(&change(RecordEvent::Insert(lead("l2", "pending")))));
        assert_eq!(ids(&list), vec!["l2", "l1"]);

        assert!(list.apply(&change(RecordEvent::Update(lead("l1", "approved")))));
        assert_eq!(list.records()[1].get("status"), Some(&json!("approved")));

        assert!(list.apply(&change(RecordEvent::Delete("l2".to_owned()))));
        assert_eq!(ids(&list), vec!["l1"]);
    }

    #[test]
    fn ignores_unknown_ids_and_other_collections() {
        let mut list = LiveList::new(Collection::Leads, vec![lead("l1", "pending")]);

        assert!(!list.apply(&change(RecordEvent::Update(lead("zz", "approved")))));
        assert!(!list.apply(&change(RecordEvent::Delete("zz".to_owned()))));
        assert!(!list.apply(&RecordChange {
            collection: Collection::Transactions,
            event: RecordEvent::Insert(lead("t1", "pending")),
        }));
        assert_eq!(ids(&list), vec!["l1"]);
    }

    #[tokio::test]
    async fn follows_store_subscription() {
        let store = Arc::new(FakeRecordStore::default());
        assert!(store.create(Collection::Leads, lead("l1", "pending")).await.is_ok());

        let query = RecordQuery::new().filter(RecordFilter::neq("status", "rejected"));
        let loaded = LiveList::load(store.as_ref(), Collection::Leads, &query).await;
        let Ok(mut list) = loaded else {
            panic!("initial load failed");
        };
        let mut subscription = store.subscribe(Collection::Leads, None);

        assert!(store.create(Collection::Leads, lead("l2", "pending")).await.is_ok());
        let Some(received) = subscription.next().await else {
            panic!("expected a change");
        };
        assert!(list.apply(&received));
        assert_eq!(ids(&list), vec!["l2", "l1"]);
    }
}
