use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use celoris_application::{
    RECORD_ID_FIELD, Record, RecordChange, RecordEvent, RecordQuery, RecordStore, record_id,
};
use celoris_core::{AppError, AppResult};
use celoris_domain::Collection;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;
use uuid::Uuid;

const CREATED_AT_FIELD: &str = "created_at";

/// In-memory record store for tests and offline runs.
///
/// Records without an id get a UUID and records without `created_at` get
/// the current UTC timestamp.
#[derive(Debug)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<Collection, Vec<Record>>>,
    changes: broadcast::Sender<RecordChange>,
}

impl InMemoryRecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            records: RwLock::new(HashMap::new()),
            changes,
        }
    }

    fn publish(&self, collection: Collection, event: RecordEvent) {
        if self.changes.send(RecordChange { collection, event }).is_err() {
            debug!(collection = %collection, "no record change subscribers");
        }
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Orders JSON values: numbers numerically, strings lexically, nulls first.
fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (Some(Value::Number(left)), Some(Value::Number(right))) => left
            .as_f64()
            .partial_cmp(&right.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(left)), Some(Value::String(right))) => left.cmp(right),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(left), Some(right)) => left.to_string().cmp(&right.to_string()),
    }
}

fn not_found(collection: Collection, id: &str) -> AppError {
    AppError::NotFound(format!("{collection} record '{id}' does not exist"))
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn query(&self, collection: Collection, query: &RecordQuery) -> AppResult<Vec<Record>> {
        let records = self.records.read().await;
        let mut matching: Vec<Record> = records
            .get(&collection)
            .map(|stored| {
                stored
                    .iter()
                    .filter(|record| query.matches(record))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            matching.sort_by(|left, right| {
                let ordering =
                    compare_values(left.get(&order.field), right.get(&order.field));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        if let Some(limit) = query.limit {
            matching.truncate(limit);
        }

        Ok(matching)
    }

    async fn get(&self, collection: Collection, id: &str) -> AppResult<Record> {
        self.records
            .read()
            .await
            .get(&collection)
            .and_then(|stored| stored.iter().find(|record| record_id(record) == Some(id)))
            .cloned()
            .ok_or_else(|| not_found(collection, id))
    }

    async fn create(&self, collection: Collection, mut record: Record) -> AppResult<Record> {
        let id = match record_id(&record) {
            Some(id) => id.to_owned(),
            None => {
                let id = Uuid::new_v4().to_string();
                record.insert(RECORD_ID_FIELD.to_owned(), Value::String(id.clone()));
                id
            }
        };
        record
            .entry(CREATED_AT_FIELD)
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

        let mut records = self.records.write().await;
        let stored = records.entry(collection).or_default();
        if stored
            .iter()
            .any(|existing| record_id(existing) == Some(id.as_str()))
        {
            return Err(AppError::Validation(format!(
                "{collection} record '{id}' already exists"
            )));
        }
        stored.push(record.clone());
        drop(records);

        self.publish(collection, RecordEvent::Insert(record.clone()));
        Ok(record)
    }

    async fn update(&self, collection: Collection, id: &str, patch: Record) -> AppResult<Record> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&collection)
            .and_then(|stored| stored.iter_mut().find(|record| record_id(record) == Some(id)))
            .ok_or_else(|| not_found(collection, id))?;

        for (key, value) in patch {
            if key != RECORD_ID_FIELD {
                record.insert(key, value);
            }
        }
        let updated = record.clone();
        drop(records);

        self.publish(collection, RecordEvent::Update(updated.clone()));
        Ok(updated)
    }

    async fn delete(&self, collection: Collection, id: &str) -> AppResult<()> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(&collection)
            .ok_or_else(|| not_found(collection, id))?;
        let before = stored.len();
        stored.retain(|record| record_id(record) != Some(id));
        if stored.len() == before {
            return Err(not_found(collection, id));
        }
        drop(records);

        self.publish(collection, RecordEvent::Delete(id.to_owned()));
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<RecordChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests;
