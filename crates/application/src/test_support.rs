//! In-crate fakes for the auth, record and notification ports.

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use celoris_core::{AppError, AppResult, Identity, MetadataMap};
use celoris_domain::Collection;
use tokio::sync::{Mutex, broadcast, oneshot};
use tracing::debug;

use crate::{
    AuthChange, AuthProvider, Notifier, Record, RecordChange, RecordEvent, RecordQuery,
    RecordStore, SignUpRequest, record_id,
};

struct RequestGate {
    entered: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

pub(crate) struct FakeAuthProvider {
    accounts: Mutex<HashMap<String, (String, Identity)>>,
    current: Mutex<Option<Identity>>,
    current_identity_error: Mutex<Option<AppError>>,
    current_identity_gate: Mutex<Option<RequestGate>>,
    metadata_gate: Mutex<Option<RequestGate>>,
    sign_out_error: Mutex<Option<AppError>>,
    metadata_error: Mutex<Option<AppError>>,
    metadata_writes: Mutex<Vec<MetadataMap>>,
    verification_requests: Mutex<Vec<(String, String)>>,
    events: broadcast::Sender<AuthChange>,
}

impl RequestGate {
    fn new() -> (Self, oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (entered, entered_receiver) = oneshot::channel();
        let (release_sender, release) = oneshot::channel();
        (Self { entered, release }, entered_receiver, release_sender)
    }

    async fn pass(self) {
        if self.entered.send(()).is_err() {
            debug!("gated request entered with nobody waiting");
        }
        if self.release.await.is_err() {
            debug!("gate released by dropping its sender");
        }
    }
}

impl FakeAuthProvider {
    pub(crate) fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            accounts: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            current_identity_error: Mutex::new(None),
            current_identity_gate: Mutex::new(None),
            metadata_gate: Mutex::new(None),
            sign_out_error: Mutex::new(None),
            metadata_error: Mutex::new(None),
            metadata_writes: Mutex::new(Vec::new()),
            verification_requests: Mutex::new(Vec::new()),
            events,
        }
    }

    pub(crate) async fn add_account(&self, email: &str, password: &str, identity: Identity) {
        self.accounts
            .lock()
            .await
            .insert(email.to_owned(), (password.to_owned(), identity));
    }

    pub(crate) async fn set_current(&self, identity: Option<Identity>) {
        *self.current.lock().await = identity;
    }

    pub(crate) async fn fail_current_identity_with(&self, error: AppError) {
        *self.current_identity_error.lock().await = Some(error);
    }

    /// Holds the next `current_identity` response until the returned sender fires.
    ///
    /// The returned receiver resolves once the request has been issued.
    pub(crate) async fn gate_current_identity(
        &self,
    ) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (gate, entered, release) = RequestGate::new();
        *self.current_identity_gate.lock().await = Some(gate);
        (entered, release)
    }

    /// Holds the next `update_metadata` call in flight until the returned sender fires.
    ///
    /// The returned receiver resolves once the call has started. The write
    /// itself happens after release.
    pub(crate) async fn gate_metadata(&self) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (gate, entered, release) = RequestGate::new();
        *self.metadata_gate.lock().await = Some(gate);
        (entered, release)
    }

    pub(crate) async fn fail_sign_out_with(&self, error: AppError) {
        *self.sign_out_error.lock().await = Some(error);
    }

    pub(crate) async fn fail_metadata_with(&self, error: AppError) {
        *self.metadata_error.lock().await = Some(error);
    }

    pub(crate) async fn metadata_writes(&self) -> Vec<MetadataMap> {
        self.metadata_writes.lock().await.clone()
    }

    pub(crate) async fn verification_requests(&self) -> Vec<(String, String)> {
        self.verification_requests.lock().await.clone()
    }

    pub(crate) fn emit(&self, change: AuthChange) {
        if self.events.send(change).is_err() {
            debug!("no auth change subscribers");
        }
    }
}

#[async_trait]
impl AuthProvider for FakeAuthProvider {
    async fn current_identity(&self) -> AppResult<Identity> {
        let snapshot = self.current.lock().await.clone();
        let error = self.current_identity_error.lock().await.clone();
        let gate = self.current_identity_gate.lock().await.take();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        if let Some(error) = error {
            return Err(error);
        }

        snapshot.ok_or_else(|| AppError::NotFound("no active session".to_owned()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Identity> {
        let identity = match self.accounts.lock().await.get(email) {
            Some((stored_password, identity)) if stored_password == password => identity.clone(),
            _ => return Err(AppError::Auth("Invalid credentials".to_owned())),
        };

        *self.current.lock().await = Some(identity.clone());
        self.emit(AuthChange::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(&self, request: &SignUpRequest) -> AppResult<Identity> {
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(&request.email) {
            return Err(AppError::Auth(
                "A user with the same email already exists".to_owned(),
            ));
        }

        let identity = Identity::new(
            format!("user-{}", accounts.len() + 1),
            request.name.as_str(),
            request.email.as_str(),
        )
        .with_metadata(request.metadata.clone());
        accounts.insert(
            request.email.clone(),
            (request.password.clone(), identity.clone()),
        );

        Ok(identity)
    }

    async fn sign_out(&self) -> AppResult<()> {
        if let Some(error) = self.sign_out_error.lock().await.clone() {
            return Err(error);
        }

        *self.current.lock().await = None;
        self.emit(AuthChange::SignedOut);
        Ok(())
    }

    async fn update_metadata(&self, patch: MetadataMap) -> AppResult<Identity> {
        let gate = self.metadata_gate.lock().await.take();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        if let Some(error) = self.metadata_error.lock().await.clone() {
            return Err(error);
        }

        let mut current = self.current.lock().await;
        let Some(identity) = current.as_ref() else {
            return Err(AppError::Auth("No active session".to_owned()));
        };

        self.metadata_writes.lock().await.push(patch.clone());
        let mut metadata = identity.metadata().clone();
        metadata.extend(patch);
        let updated = identity.clone().with_metadata(metadata);

        for (_, stored) in self.accounts.lock().await.values_mut() {
            if stored.id() == updated.id() {
                *stored = updated.clone();
            }
        }
        *current = Some(updated.clone());

        Ok(updated)
    }

    async fn request_verification(&self, email: &str, redirect_url: &str) -> AppResult<()> {
        self.verification_requests
            .lock()
            .await
            .push((email.to_owned(), redirect_url.to_owned()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}

pub(crate) struct FakeRecordStore {
    records: Mutex<HashMap<Collection, Vec<Record>>>,
    read_error: Mutex<Option<AppError>>,
    write_error: Mutex<Option<AppError>>,
    changes: broadcast::Sender<RecordChange>,
}

impl Default for FakeRecordStore {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            records: Mutex::new(HashMap::new()),
            read_error: Mutex::new(None),
            write_error: Mutex::new(None),
            changes,
        }
    }
}

impl FakeRecordStore {
    pub(crate) async fn records(&self, collection: Collection) -> Vec<Record> {
        self.records
            .lock()
            .await
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) async fn fail_reads_with(&self, error: AppError) {
        *self.read_error.lock().await = Some(error);
    }

    pub(crate) async fn fail_writes_with(&self, error: AppError) {
        *self.write_error.lock().await = Some(error);
    }
}

#[async_trait]
impl RecordStore for FakeRecordStore {
    async fn query(&self, collection: Collection, query: &RecordQuery) -> AppResult<Vec<Record>> {
        if let Some(error) = self.read_error.lock().await.clone() {
            return Err(error);
        }

        Ok(self
            .records(collection)
            .await
            .into_iter()
            .filter(|record| query.matches(record))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn get(&self, collection: Collection, id: &str) -> AppResult<Record> {
        if let Some(error) = self.read_error.lock().await.clone() {
            return Err(error);
        }

        self.records(collection)
            .await
            .into_iter()
            .find(|record| record_id(record) == Some(id))
            .ok_or_else(|| AppError::NotFound(format!("{collection} record '{id}'")))
    }

    async fn create(&self, collection: Collection, record: Record) -> AppResult<Record> {
        if let Some(error) = self.write_error.lock().await.clone() {
            return Err(error);
        }

        self.records
            .lock()
            .await
            .entry(collection)
            .or_default()
            .push(record.clone());
        let change = RecordChange {
            collection,
            event: RecordEvent::Insert(record.clone()),
        };
        if self.changes.send(change).is_err() {
            debug!(collection = %collection, "no record change subscribers");
        }
        Ok(record)
    }

    async fn update(&self, collection: Collection, id: &str, patch: Record) -> AppResult<Record> {
        if let Some(error) = self.write_error.lock().await.clone() {
            return Err(error);
        }

        let mut records = self.records.lock().await;
        let record = records
            .entry(collection)
            .or_default()
            .iter_mut()
            .find(|record| record_id(record) == Some(id))
            .ok_or_else(|| AppError::NotFound(format!("{collection} record '{id}'")))?;
        record.extend(patch);
        Ok(record.clone())
    }

    async fn delete(&self, collection: Collection, id: &str) -> AppResult<()> {
        self.records
            .lock()
            .await
            .entry(collection)
            .or_default()
            .retain(|record| record_id(record) != Some(id));
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<RecordChange> {
        self.changes.subscribe()
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    successes: StdMutex<Vec<String>>,
    errors: StdMutex<Vec<String>>,
}

impl RecordingNotifier {
    pub(crate) fn successes(&self) -> Vec<String> {
        self.successes
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    pub(crate) fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        if let Ok(mut messages) = self.successes.lock() {
            messages.push(message.to_owned());
        }
    }

    fn error(&self, message: &str) {
        if let Ok(mut messages) = self.errors.lock() {
            messages.push(message.to_owned());
        }
    }
}
