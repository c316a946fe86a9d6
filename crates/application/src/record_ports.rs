use async_trait::async_trait;
use celoris_core::AppResult;
use celoris_domain::Collection;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::warn;

/// Schemaless record as exchanged with the record store.
pub type Record = Map<String, Value>;

/// Field carrying the record identifier.
pub const RECORD_ID_FIELD: &str = "id";

/// Returns the identifier of a record, if present.
#[must_use]
pub fn record_id(record: &Record) -> Option<&str> {
    record.get(RECORD_ID_FIELD).and_then(Value::as_str)
}

/// Comparison operator for record filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Field equals value.
    Eq,
    /// Field differs from value.
    Neq,
}

/// Single field condition.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFilter {
    /// Field name.
    pub field: String,
    /// Operator.
    pub operator: FilterOperator,
    /// Compared value.
    pub value: Value,
}

impl RecordFilter {
    /// Creates an equality filter.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator: FilterOperator::Eq,
            value: value.into(),
        }
    }

    /// Creates an inequality filter.
    #[must_use]
    pub fn neq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator: FilterOperator::Neq,
            value: value.into(),
        }
    }

    /// Returns whether a record satisfies the condition. Missing fields compare as null.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        let actual = record.get(self.field.as_str()).unwrap_or(&Value::Null);
        match self.operator {
            FilterOperator::Eq => actual == &self.value,
            FilterOperator::Neq => actual != &self.value,
        }
    }
}

/// Sort order for record queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOrder {
    /// Field to sort on.
    pub field: String,
    /// Sort descending when true.
    pub descending: bool,
}

/// Query over one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    /// Conditions combined with AND.
    pub filters: Vec<RecordFilter>,
    /// Optional sort.
    pub order: Option<RecordOrder>,
    /// Optional maximum number of records.
    pub limit: Option<usize>,
}

impl RecordQuery {
    /// Creates an unfiltered query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition.
    #[must_use]
    pub fn filter(mut self, filter: RecordFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Sorts ascending on `field`.
    #[must_use]
    pub fn order_asc(mut self, field: impl Into<String>) -> Self {
        self.order = Some(RecordOrder {
            field: field.into(),
            descending: false,
        });
        self
    }

    /// Sorts descending on `field`.
    #[must_use]
    pub fn order_desc(mut self, field: impl Into<String>) -> Self {
        self.order = Some(RecordOrder {
            field: field.into(),
            descending: true,
        });
        self
    }

    /// Caps the number of returned records.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns whether a record satisfies every filter.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|filter| filter.matches(record))
    }
}

/// Kind of change observed on a record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEvent {
    /// A record was created.
    Insert(Record),
    /// A record was replaced by the contained value.
    Update(Record),
    /// The record with this id was removed.
    Delete(String),
}

/// Change notification for one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordChange {
    /// Collection the change belongs to.
    pub collection: Collection,
    /// What happened.
    pub event: RecordEvent,
}

/// Port for the hosted record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Lists records matching `query`.
    async fn query(&self, collection: Collection, query: &RecordQuery) -> AppResult<Vec<Record>>;

    /// Reads one record. Fails with `AppError::NotFound` when absent.
    async fn get(&self, collection: Collection, id: &str) -> AppResult<Record>;

    /// Creates a record and returns the stored value.
    async fn create(&self, collection: Collection, record: Record) -> AppResult<Record>;

    /// Applies a partial update and returns the stored value.
    async fn update(&self, collection: Collection, id: &str, patch: Record) -> AppResult<Record>;

    /// Deletes a record.
    async fn delete(&self, collection: Collection, id: &str) -> AppResult<()>;

    /// Returns a receiver for changes across all collections.
    fn changes(&self) -> broadcast::Receiver<RecordChange>;

    /// Subscribes to changes of one collection, optionally narrowed by a filter.
    fn subscribe(
        &self,
        collection: Collection,
        filter: Option<RecordFilter>,
    ) -> RecordSubscription {
        RecordSubscription {
            collection,
            filter,
            receiver: self.changes(),
        }
    }
}

/// Filtered stream of record changes. Dropping it unsubscribes.
#[derive(Debug)]
pub struct RecordSubscription {
    collection: Collection,
    filter: Option<RecordFilter>,
    receiver: broadcast::Receiver<RecordChange>,
}

impl RecordSubscription {
    /// Waits for the next matching change. Returns `None` once the store is gone.
    ///
    /// Deletes carry only an id, so they pass the filter unconditionally.
    pub async fn next(&mut self) -> Option<RecordChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if self.accepts(&change) => return Some(change),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        collection = %self.collection,
                        skipped,
                        "record subscription lagged behind"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    fn accepts(&self, change: &RecordChange) -> bool {
        if change.collection != self.collection {
            return false;
        }

        match (&change.event, &self.filter) {
            (_, None) | (RecordEvent::Delete(_), Some(_)) => true,
            (RecordEvent::Insert(record) | RecordEvent::Update(record), Some(filter)) => {
                filter.matches(record)
            }
        }
    }
}
