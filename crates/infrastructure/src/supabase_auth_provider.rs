use async_trait::async_trait;
use celoris_application::{AuthChange, AuthProvider, SignUpRequest};
use celoris_core::{AppError, AppResult, Identity, MetadataMap};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use crate::SupabaseClient;
use crate::http_errors::{check_status, read_json, transport_error};

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: MetadataMap,
}

impl From<SupabaseUser> for Identity {
    fn from(user: SupabaseUser) -> Self {
        let name = user
            .user_metadata
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();

        Identity::new(user.id, name, user.email.unwrap_or_default())
            .with_metadata(user.user_metadata)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: SupabaseUser,
}

/// Sign-up returns a session when email confirmation is off, the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(SupabaseUser),
}

/// Auth provider backed by Supabase GoTrue.
///
/// Role and other custom fields live in `user_metadata`.
pub struct SupabaseAuthProvider {
    client: SupabaseClient,
    email_redirect_url: String,
    confirmation_sent_to: Mutex<Option<String>>,
    events: broadcast::Sender<AuthChange>,
}

impl SupabaseAuthProvider {
    /// Creates a provider. `email_redirect_url` is embedded in sign-up confirmation mails.
    #[must_use]
    pub fn new(client: SupabaseClient, email_redirect_url: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            client,
            email_redirect_url: email_redirect_url.into(),
            confirmation_sent_to: Mutex::new(None),
            events,
        }
    }

    fn emit(&self, change: AuthChange) {
        if self.events.send(change).is_err() {
            debug!("no auth change subscribers");
        }
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuthProvider {
    async fn current_identity(&self) -> AppResult<Identity> {
        if self.client.access_token().await.is_none() {
            return Err(AppError::NotFound("no active session".to_owned()));
        }

        let response = self
            .client
            .authorized(Method::GET, "/auth/v1/user")
            .await
            .send()
            .await
            .map_err(|error| transport_error("Supabase user request", error))?;

        match read_json::<SupabaseUser>("Supabase user", response).await {
            Ok(user) => Ok(user.into()),
            Err(AppError::Auth(reason)) => {
                warn!(reason = %reason, "discarding rejected Supabase session");
                self.client.set_access_token(None).await;
                Err(AppError::NotFound(reason))
            }
            Err(error) => Err(error),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Identity> {
        let response = self
            .client
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|error| transport_error("Supabase sign-in request", error))?;

        let token = read_json::<TokenResponse>("Supabase sign-in", response).await?;
        self.client.set_access_token(Some(token.access_token)).await;
        let identity = Identity::from(token.user);

        info!(identity_id = %identity.id(), "supabase session created");
        self.emit(AuthChange::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(&self, request: &SignUpRequest) -> AppResult<Identity> {
        let response = self
            .client
            .request(Method::POST, "/auth/v1/signup")
            .query(&[("redirect_to", self.email_redirect_url.as_str())])
            .json(&json!({
                "email": request.email,
                "password": request.password,
                "data": request.metadata,
            }))
            .send()
            .await
            .map_err(|error| transport_error("Supabase sign-up request", error))?;

        match read_json::<SignUpResponse>("Supabase sign-up", response).await? {
            SignUpResponse::Session(token) => {
                self.client.set_access_token(Some(token.access_token)).await;
                let identity = Identity::from(token.user);
                info!(identity_id = %identity.id(), "supabase account created and signed in");
                self.emit(AuthChange::SignedIn(identity.clone()));
                Ok(identity)
            }
            SignUpResponse::User(user) => {
                *self.confirmation_sent_to.lock().await = Some(request.email.clone());
                let identity = Identity::from(user);
                info!(identity_id = %identity.id(), "supabase account awaiting confirmation");
                Ok(identity)
            }
        }
    }

    async fn sign_out(&self) -> AppResult<()> {
        if self.client.access_token().await.is_some() {
            let response = self
                .client
                .authorized(Method::POST, "/auth/v1/logout")
                .await
                .send()
                .await
                .map_err(|error| transport_error("Supabase sign-out request", error))?;
            check_status("Supabase sign-out", response).await?;
        }

        self.client.set_access_token(None).await;
        self.emit(AuthChange::SignedOut);
        Ok(())
    }

    async fn update_metadata(&self, patch: MetadataMap) -> AppResult<Identity> {
        if self.client.access_token().await.is_none() {
            return Err(AppError::Auth("No active session".to_owned()));
        }

        // GoTrue merges `data` into the existing user_metadata.
        let response = self
            .client
            .authorized(Method::PUT, "/auth/v1/user")
            .await
            .json(&json!({ "data": patch }))
            .send()
            .await
            .map_err(|error| transport_error("Supabase update user request", error))?;

        let user = read_json::<SupabaseUser>("Supabase update user", response).await?;
        Ok(user.into())
    }

    async fn request_verification(&self, email: &str, redirect_url: &str) -> AppResult<()> {
        {
            let mut sent_to = self.confirmation_sent_to.lock().await;
            if sent_to.as_deref() == Some(email) {
                *sent_to = None;
                debug!("confirmation mail already sent by sign-up");
                return Ok(());
            }
        }

        let response = self
            .client
            .request(Method::POST, "/auth/v1/resend")
            .query(&[("redirect_to", redirect_url)])
            .json(&json!({ "type": "signup", "email": email }))
            .send()
            .await
            .map_err(|error| transport_error("Supabase resend request", error))?;

        check_status("Supabase resend", response).await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}
