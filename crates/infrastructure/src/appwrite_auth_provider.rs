use async_trait::async_trait;
use celoris_application::{AuthChange, AuthProvider, SignUpRequest};
use celoris_core::{AppError, AppResult, Identity, MetadataMap};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::AppwriteClient;
use crate::http_errors::{check_status, read_json, transport_error};

/// Account payload returned by the Appwrite account API.
#[derive(Debug, Deserialize)]
struct AppwriteAccount {
    #[serde(rename = "$id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    prefs: MetadataMap,
}

impl From<AppwriteAccount> for Identity {
    fn from(account: AppwriteAccount) -> Self {
        Identity::new(account.id, account.name, account.email).with_metadata(account.prefs)
    }
}

/// Auth provider backed by the Appwrite account API.
///
/// Role and other custom fields live in the account `prefs`.
pub struct AppwriteAuthProvider {
    client: AppwriteClient,
    events: broadcast::Sender<AuthChange>,
}

impl AppwriteAuthProvider {
    /// Creates a provider sharing `client`'s session cookies.
    #[must_use]
    pub fn new(client: AppwriteClient) -> Self {
        let (events, _) = broadcast::channel(32);
        Self { client, events }
    }

    async fn fetch_account(&self) -> AppResult<Identity> {
        let response = self
            .client
            .request(Method::GET, "/account")
            .send()
            .await
            .map_err(|error| transport_error("Appwrite account request", error))?;

        let account = read_json::<AppwriteAccount>("Appwrite account", response).await?;
        Ok(account.into())
    }

    async fn create_email_session(&self, email: &str, password: &str) -> AppResult<()> {
        let response = self
            .client
            .request(Method::POST, "/account/sessions/email")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|error| transport_error("Appwrite session request", error))?;

        check_status("Appwrite session", response).await?;
        Ok(())
    }

    async fn replace_prefs(&self, prefs: MetadataMap) -> AppResult<Identity> {
        let response = self
            .client
            .request(Method::PATCH, "/account/prefs")
            .json(&json!({ "prefs": prefs }))
            .send()
            .await
            .map_err(|error| transport_error("Appwrite prefs request", error))?;

        let account = read_json::<AppwriteAccount>("Appwrite prefs", response).await?;
        Ok(account.into())
    }

    fn emit(&self, change: AuthChange) {
        if self.events.send(change).is_err() {
            debug!("no auth change subscribers");
        }
    }
}

#[async_trait]
impl AuthProvider for AppwriteAuthProvider {
    async fn current_identity(&self) -> AppResult<Identity> {
        match self.fetch_account().await {
            // Guests get 401 from /account.
            Err(AppError::Auth(reason)) => Err(AppError::NotFound(reason)),
            other => other,
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Identity> {
        self.create_email_session(email, password).await?;
        let identity = self.fetch_account().await?;

        info!(identity_id = %identity.id(), "appwrite session created");
        self.emit(AuthChange::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(&self, request: &SignUpRequest) -> AppResult<Identity> {
        let response = self
            .client
            .request(Method::POST, "/account")
            .json(&json!({
                "userId": "unique()",
                "email": request.email,
                "password": request.password,
                "name": request.name,
            }))
            .send()
            .await
            .map_err(|error| transport_error("Appwrite sign-up request", error))?;
        check_status("Appwrite sign-up", response).await?;

        // Prefs and verification both need an active session.
        self.create_email_session(&request.email, &request.password)
            .await?;
        let identity = self.replace_prefs(request.metadata.clone()).await?;

        info!(identity_id = %identity.id(), "appwrite account created");
        self.emit(AuthChange::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> AppResult<()> {
        let response = self
            .client
            .request(Method::DELETE, "/account/sessions/current")
            .send()
            .await
            .map_err(|error| transport_error("Appwrite sign-out request", error))?;
        check_status("Appwrite sign-out", response).await?;

        self.emit(AuthChange::SignedOut);
        Ok(())
    }

    async fn update_metadata(&self, patch: MetadataMap) -> AppResult<Identity> {
        // PATCH /account/prefs replaces the whole object.
        let current = self.fetch_account().await?;
        let mut prefs = current.metadata().clone();
        prefs.extend(patch);

        self.replace_prefs(prefs).await
    }

    async fn request_verification(&self, _email: &str, redirect_url: &str) -> AppResult<()> {
        let response = self
            .client
            .request(Method::POST, "/account/verification")
            .json(&json!({ "url": redirect_url }))
            .send()
            .await
            .map_err(|error| transport_error("Appwrite verification request", error))?;

        check_status("Appwrite verification", response).await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use celoris_core::Identity;

    use super::AppwriteAccount;

    #[test]
    fn account_prefs_become_identity_metadata() {
        let parsed = serde_json::from_str::<AppwriteAccount>(
            r#"{
                "$id": "64f0c2",
                "$createdAt": "2024-01-01T00:00:00.000+00:00",
                "name": "Ana",
                "email": "ana@example.com",
                "emailVerification": false,
                "prefs": { "role": "admin" }
            }"#,
        );
        let Ok(account) = parsed else {
            panic!("account payload should parse");
        };

        let identity = Identity::from(account);
        assert_eq!(identity.id(), "64f0c2");
        assert_eq!(identity.metadata_str("role"), Some("admin"));
    }

    #[test]
    fn missing_prefs_default_to_empty() {
        let parsed = serde_json::from_str::<AppwriteAccount>(
            r#"{ "$id": "u1", "name": "", "email": "ana@example.com" }"#,
        );
        let Ok(account) = parsed else {
            panic!("account payload should parse");
        };

        assert!(Identity::from(account).metadata().is_empty());
    }
}
