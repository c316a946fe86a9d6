use async_trait::async_trait;
use celoris_application::{
    FilterOperator, Record, RecordChange, RecordEvent, RecordQuery, RecordStore,
};
use celoris_core::{AppError, AppResult};
use celoris_domain::Collection;
use reqwest::Method;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::SupabaseClient;
use crate::http_errors::{check_status, read_json, transport_error};

const RETURN_REPRESENTATION: (&str, &str) = ("Prefer", "return=representation");

/// Record store backed by PostgREST, one table per collection.
pub struct SupabaseRecordStore {
    client: SupabaseClient,
    changes: broadcast::Sender<RecordChange>,
}

impl SupabaseRecordStore {
    /// Creates a store sharing `client`'s session token.
    #[must_use]
    pub fn new(client: SupabaseClient) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self { client, changes }
    }

    fn publish(&self, collection: Collection, event: RecordEvent) {
        if self.changes.send(RecordChange { collection, event }).is_err() {
            debug!(collection = %collection, "no record change subscribers");
        }
    }
}

fn table_path(collection: Collection) -> String {
    format!("/rest/v1/{}", collection.as_str())
}

/// Renders a JSON value the way PostgREST expects it in a filter.
fn filter_literal(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Encodes a query as PostgREST query parameters.
fn encode_params(query: &RecordQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_owned(), "*".to_owned())];

    for filter in &query.filters {
        let condition = match (filter.operator, &filter.value) {
            (FilterOperator::Eq, Value::Null) => "is.null".to_owned(),
            (FilterOperator::Neq, Value::Null) => "not.is.null".to_owned(),
            (FilterOperator::Eq, value) => format!("eq.{}", filter_literal(value)),
            (FilterOperator::Neq, value) => format!("neq.{}", filter_literal(value)),
        };
        params.push((filter.field.clone(), condition));
    }

    if let Some(order) = &query.order {
        let direction = if order.descending { "desc" } else { "asc" };
        params.push(("order".to_owned(), format!("{}.{direction}", order.field)));
    }

    if let Some(limit) = query.limit {
        params.push(("limit".to_owned(), limit.to_string()));
    }

    params
}

fn by_id(id: &str) -> [(&'static str, String); 1] {
    [("id", format!("eq.{id}"))]
}

fn single_row(collection: Collection, id: &str, rows: Vec<Record>) -> AppResult<Record> {
    rows.into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(format!("{collection} record '{id}' does not exist")))
}

#[async_trait]
impl RecordStore for SupabaseRecordStore {
    async fn query(&self, collection: Collection, query: &RecordQuery) -> AppResult<Vec<Record>> {
        let response = self
            .client
            .authorized(Method::GET, &table_path(collection))
            .await
            .query(&encode_params(query))
            .send()
            .await
            .map_err(|error| transport_error("PostgREST select request", error))?;

        read_json::<Vec<Record>>("PostgREST select", response).await
    }

    async fn get(&self, collection: Collection, id: &str) -> AppResult<Record> {
        let response = self
            .client
            .authorized(Method::GET, &table_path(collection))
            .await
            .query(&[("select", "*")])
            .query(&by_id(id))
            .send()
            .await
            .map_err(|error| transport_error("PostgREST select request", error))?;

        let rows = read_json::<Vec<Record>>("PostgREST select", response).await?;
        single_row(collection, id, rows)
    }

    async fn create(&self, collection: Collection, record: Record) -> AppResult<Record> {
        let response = self
            .client
            .authorized(Method::POST, &table_path(collection))
            .await
            .header(RETURN_REPRESENTATION.0, RETURN_REPRESENTATION.1)
            .json(&record)
            .send()
            .await
            .map_err(|error| transport_error("PostgREST insert request", error))?;

        let rows = read_json::<Vec<Record>>("PostgREST insert", response).await?;
        let created = rows.into_iter().next().unwrap_or(record);
        self.publish(collection, RecordEvent::Insert(created.clone()));
        Ok(created)
    }

    async fn update(&self, collection: Collection, id: &str, patch: Record) -> AppResult<Record> {
        let response = self
            .client
            .authorized(Method::PATCH, &table_path(collection))
            .await
            .query(&by_id(id))
            .header(RETURN_REPRESENTATION.0, RETURN_REPRESENTATION.1)
            .json(&patch)
            .send()
            .await
            .map_err(|error| transport_error("PostgREST update request", error))?;

        let rows = read_json::<Vec<Record>>("PostgREST update", response).await?;
        let updated = single_row(collection, id, rows)?;
        self.publish(collection, RecordEvent::Update(updated.clone()));
        Ok(updated)
    }

    async fn delete(&self, collection: Collection, id: &str) -> AppResult<()> {
        let response = self
            .client
            .authorized(Method::DELETE, &table_path(collection))
            .await
            .query(&by_id(id))
            .send()
            .await
            .map_err(|error| transport_error("PostgREST delete request", error))?;
        check_status("PostgREST delete", response).await?;

        self.publish(collection, RecordEvent::Delete(id.to_owned()));
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<RecordChange> {
        self.changes.subscribe()
    }
}
