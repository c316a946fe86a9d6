use std::collections::HashMap;

use async_trait::async_trait;
use celoris_application::{AuthChange, AuthProvider, SignUpRequest};
use celoris_core::{AppError, AppResult, Identity, MetadataMap};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};
use uuid::Uuid;

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone)]
struct Account {
    password: String,
    identity: Identity,
}

/// In-memory auth provider for tests and offline runs.
///
/// Sign-up leaves the new account signed out, as a service with email
/// confirmation would.
#[derive(Debug)]
pub struct InMemoryAuthProvider {
    accounts: RwLock<HashMap<String, Account>>,
    current: RwLock<Option<String>>,
    verification_requests: RwLock<Vec<(String, String)>>,
    events: broadcast::Sender<AuthChange>,
}

impl InMemoryAuthProvider {
    /// Creates a provider with no accounts.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            accounts: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
            verification_requests: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Seeds an account that can sign in with `password`.
    pub async fn insert_account(&self, password: impl Into<String>, identity: Identity) {
        self.accounts.write().await.insert(
            identity.email().to_owned(),
            Account {
                password: password.into(),
                identity,
            },
        );
    }

    /// Returns recorded `(email, redirect_url)` verification requests.
    pub async fn verification_requests(&self) -> Vec<(String, String)> {
        self.verification_requests.read().await.clone()
    }

    fn emit(&self, change: AuthChange) {
        if self.events.send(change).is_err() {
            debug!("no auth change subscribers");
        }
    }

    async fn current_account_email(&self) -> AppResult<String> {
        self.current
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::Auth("No active session".to_owned()))
    }
}

impl Default for InMemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn current_identity(&self) -> AppResult<Identity> {
        let Some(email) = self.current.read().await.clone() else {
            return Err(AppError::NotFound("no active session".to_owned()));
        };

        self.accounts
            .read()
            .await
            .get(&email)
            .map(|account| account.identity.clone())
            .ok_or_else(|| AppError::NotFound(format!("account '{email}' no longer exists")))
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Identity> {
        let identity = match self.accounts.read().await.get(email) {
            Some(account) if account.password == password => account.identity.clone(),
            _ => return Err(AppError::Auth("Invalid credentials".to_owned())),
        };

        *self.current.write().await = Some(email.to_owned());
        self.emit(AuthChange::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(&self, request: &SignUpRequest) -> AppResult<Identity> {
        if request.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&request.email) {
            return Err(AppError::Auth(
                "A user with the same email already exists".to_owned(),
            ));
        }

        let identity = Identity::new(
            Uuid::new_v4().to_string(),
            request.name.as_str(),
            request.email.as_str(),
        )
        .with_metadata(request.metadata.clone());
        accounts.insert(
            request.email.clone(),
            Account {
                password: request.password.clone(),
                identity: identity.clone(),
            },
        );

        Ok(identity)
    }

    async fn sign_out(&self) -> AppResult<()> {
        *self.current.write().await = None;
        self.emit(AuthChange::SignedOut);
        Ok(())
    }

    async fn update_metadata(&self, patch: MetadataMap) -> AppResult<Identity> {
        let email = self.current_account_email().await?;
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&email)
            .ok_or_else(|| AppError::NotFound(format!("account '{email}' no longer exists")))?;

        let mut metadata = account.identity.metadata().clone();
        metadata.extend(patch);
        account.identity = account.identity.clone().with_metadata(metadata);

        Ok(account.identity.clone())
    }

    async fn request_verification(&self, email: &str, redirect_url: &str) -> AppResult<()> {
        info!(email = email, redirect_url = redirect_url, "verification mail requested");
        self.verification_requests
            .write()
            .await
            .push((email.to_owned(), redirect_url.to_owned()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests;
