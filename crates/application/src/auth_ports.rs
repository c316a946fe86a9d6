use async_trait::async_trait;
use celoris_core::{AppResult, Identity, MetadataMap};
use tokio::sync::broadcast;

/// Sign-in state change announced by the auth service.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthChange {
    /// A session was established for the identity.
    SignedIn(Identity),
    /// The current session ended.
    SignedOut,
}

/// Parameters for creating a new account.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    /// Email address for the new account.
    pub email: String,
    /// Plaintext password. Strength policy belongs to the auth service.
    pub password: String,
    /// Display name.
    pub name: String,
    /// Initial metadata written with the account.
    pub metadata: MetadataMap,
}

/// Port for the hosted authentication service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns the identity behind the active session.
    ///
    /// Fails with `AppError::NotFound` when there is no active session.
    async fn current_identity(&self) -> AppResult<Identity>;

    /// Creates a session from email and password credentials.
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Identity>;

    /// Creates a new account carrying the initial metadata.
    async fn sign_up(&self, request: &SignUpRequest) -> AppResult<Identity>;

    /// Invalidates the active session.
    async fn sign_out(&self) -> AppResult<()>;

    /// Merges `patch` into the identity metadata and returns the stored identity.
    async fn update_metadata(&self, patch: MetadataMap) -> AppResult<Identity>;

    /// Asks the service to email a verification link that returns to `redirect_url`.
    async fn request_verification(&self, email: &str, redirect_url: &str) -> AppResult<()>;

    /// Returns a receiver for sign-in state changes.
    ///
    /// Dropping the receiver ends the subscription.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;
}

/// Port for user-facing notifications (toasts in a browser shell).
pub trait Notifier: Send + Sync {
    /// Announces a successful operation.
    fn success(&self, message: &str);

    /// Announces a failed operation.
    fn error(&self, message: &str);
}
