use async_trait::async_trait;
use celoris_application::{
    FilterOperator, RECORD_ID_FIELD, Record, RecordChange, RecordEvent, RecordQuery, RecordStore,
    record_id,
};
use celoris_core::{AppError, AppResult};
use celoris_domain::Collection;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::debug;

use crate::AppwriteClient;
use crate::http_errors::{check_status, read_json, transport_error};

/// Database holding every Celoris collection.
pub const APPWRITE_DATABASE_ID: &str = "celoris_connect";

#[derive(Debug, Deserialize)]
struct DocumentList {
    documents: Vec<Value>,
}

/// Record store backed by Appwrite databases.
///
/// Document system fields are mapped away: `$id` becomes `id`,
/// `$createdAt` becomes `created_at` and the rest are dropped.
pub struct AppwriteRecordStore {
    client: AppwriteClient,
    database_id: String,
    changes: broadcast::Sender<RecordChange>,
}

impl AppwriteRecordStore {
    /// Creates a store for [`APPWRITE_DATABASE_ID`].
    #[must_use]
    pub fn new(client: AppwriteClient) -> Self {
        Self::with_database(client, APPWRITE_DATABASE_ID)
    }

    /// Creates a store for another database.
    #[must_use]
    pub fn with_database(client: AppwriteClient, database_id: impl Into<String>) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            client,
            database_id: database_id.into(),
            changes,
        }
    }

    fn documents_path(&self, collection: Collection) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            self.database_id,
            collection_id(collection)
        )
    }

    fn document_path(&self, collection: Collection, id: &str) -> String {
        format!("{}/{id}", self.documents_path(collection))
    }

    fn publish(&self, collection: Collection, event: RecordEvent) {
        if self.changes.send(RecordChange { collection, event }).is_err() {
            debug!(collection = %collection, "no record change subscribers");
        }
    }
}

/// Appwrite collection id for a collection. Profiles live in `users`.
fn collection_id(collection: Collection) -> &'static str {
    match collection {
        Collection::Profiles => "users",
        other => other.as_str(),
    }
}

/// Encodes a query as Appwrite JSON query strings.
fn encode_queries(query: &RecordQuery) -> Vec<String> {
    let mut encoded: Vec<String> = query
        .filters
        .iter()
        .map(|filter| {
            let method = match filter.operator {
                FilterOperator::Eq => "equal",
                FilterOperator::Neq => "notEqual",
            };
            json!({
                "method": method,
                "attribute": filter.field,
                "values": [filter.value],
            })
            .to_string()
        })
        .collect();

    if let Some(order) = &query.order {
        let method = if order.descending {
            "orderDesc"
        } else {
            "orderAsc"
        };
        encoded.push(json!({ "method": method, "attribute": order.field }).to_string());
    }

    if let Some(limit) = query.limit {
        encoded.push(json!({ "method": "limit", "values": [limit] }).to_string());
    }

    encoded
}

fn from_document(document: Value) -> AppResult<Record> {
    let Value::Object(fields) = document else {
        return Err(AppError::Internal(
            "Appwrite returned a non-object document".to_owned(),
        ));
    };

    let mut record = Record::new();
    for (key, value) in fields {
        match key.as_str() {
            "$id" => {
                record.insert(RECORD_ID_FIELD.to_owned(), value);
            }
            "$createdAt" => {
                record.entry("created_at").or_insert(value);
            }
            system if system.starts_with('$') => {}
            _ => {
                record.insert(key, value);
            }
        }
    }

    Ok(record)
}

fn to_document_data(record: Record) -> Record {
    record
        .into_iter()
        .filter(|(key, _)| key != RECORD_ID_FIELD && !key.starts_with('$'))
        .collect()
}

#[async_trait]
impl RecordStore for AppwriteRecordStore {
    async fn query(&self, collection: Collection, query: &RecordQuery) -> AppResult<Vec<Record>> {
        let params: Vec<(&str, String)> = encode_queries(query)
            .into_iter()
            .map(|encoded| ("queries[]", encoded))
            .collect();

        let response = self
            .client
            .request(Method::GET, &self.documents_path(collection))
            .query(&params)
            .send()
            .await
            .map_err(|error| transport_error("Appwrite list documents request", error))?;

        let list = read_json::<DocumentList>("Appwrite list documents", response).await?;
        list.documents.into_iter().map(from_document).collect()
    }

    async fn get(&self, collection: Collection, id: &str) -> AppResult<Record> {
        let response = self
            .client
            .request(Method::GET, &self.document_path(collection, id))
            .send()
            .await
            .map_err(|error| transport_error("Appwrite get document request", error))?;

        from_document(read_json::<Value>("Appwrite get document", response).await?)
    }

    async fn create(&self, collection: Collection, record: Record) -> AppResult<Record> {
        let document_id = record_id(&record).unwrap_or("unique()").to_owned();
        let response = self
            .client
            .request(Method::POST, &self.documents_path(collection))
            .json(&json!({
                "documentId": document_id,
                "data": to_document_data(record),
            }))
            .send()
            .await
            .map_err(|error| transport_error("Appwrite create document request", error))?;

        let document = read_json::<Value>("Appwrite create document", response).await?;
        let created = from_document(document)?;
        self.publish(collection, RecordEvent::Insert(created.clone()));
        Ok(created)
    }

    async fn update(&self, collection: Collection, id: &str, patch: Record) -> AppResult<Record> {
        let response = self
            .client
            .request(Method::PATCH, &self.document_path(collection, id))
            .json(&json!({ "data": to_document_data(patch) }))
            .send()
            .await
            .map_err(|error| transport_error("Appwrite update document request", error))?;

        let document = read_json::<Value>("Appwrite update document", response).await?;
        let updated = from_document(document)?;
        self.publish(collection, RecordEvent::Update(updated.clone()));
        Ok(updated)
    }

    async fn delete(&self, collection: Collection, id: &str) -> AppResult<()> {
        let response = self
            .client
            .request(Method::DELETE, &self.document_path(collection, id))
            .send()
            .await
            .map_err(|error| transport_error("Appwrite delete document request", error))?;
        check_status("Appwrite delete document", response).await?;

        self.publish(collection, RecordEvent::Delete(id.to_owned()));
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<RecordChange> {
        self.changes.subscribe()
    }
}
