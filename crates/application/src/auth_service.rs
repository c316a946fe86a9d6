//! Auth operations: login, registration, logout and profile updates.
//!
//! Each operation is one request/response cycle against the auth service,
//! followed by a session update and a user-facing notification. Failures
//! are logged, announced, and then returned so the caller can react too.

mod login;
mod profile;
mod registration;

use std::sync::Arc;

use celoris_core::{AppError, AppResult};
use celoris_domain::Role;
use tracing::error;

use crate::{AuthProvider, Notifier, RecordStore, SessionStore};

pub use registration::RegisterParams;

/// Application service for session-changing operations.
#[derive(Clone)]
pub struct AuthService {
    auth_provider: Arc<dyn AuthProvider>,
    record_store: Arc<dyn RecordStore>,
    session_store: SessionStore,
    notifier: Arc<dyn Notifier>,
    verification_redirect_url: String,
}

impl AuthService {
    /// Creates a new auth service.
    ///
    /// `verification_redirect_url` is where email verification links land.
    #[must_use]
    pub fn new(
        auth_provider: Arc<dyn AuthProvider>,
        record_store: Arc<dyn RecordStore>,
        session_store: SessionStore,
        notifier: Arc<dyn Notifier>,
        verification_redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            auth_provider,
            record_store,
            session_store,
            notifier,
            verification_redirect_url: verification_redirect_url.into(),
        }
    }

    /// Returns the session store this service writes to.
    #[must_use]
    pub fn session_store(&self) -> &SessionStore {
        &self.session_store
    }

    /// Ends the current session.
    ///
    /// The cached identity is cleared only after the auth service confirms.
    /// On failure the session is left untouched.
    pub async fn logout(&self) -> AppResult<()> {
        let ticket = self.session_store.issue_ticket();
        if let Err(error) = self.auth_provider.sign_out().await {
            error!(error = %error, "logout failed");
            self.notifier.error("Logout failed");
            return Err(error);
        }

        self.session_store.apply_identity(ticket, None);
        self.notifier.success("Logged out successfully");
        Ok(())
    }

    /// Returns the role of the current session.
    #[must_use]
    pub fn current_role(&self) -> Role {
        self.session_store.snapshot().role()
    }

    fn announce<T>(&self, result: AppResult<T>, success: &str, failure: &str) -> AppResult<T> {
        match result {
            Ok(value) => {
                self.notifier.success(success);
                Ok(value)
            }
            Err(failure_error) => {
                error!(error = %failure_error, "{failure}");
                self.notifier.error(failure_message(&failure_error, failure));
                Err(failure_error)
            }
        }
    }
}

/// Picks the service-provided reason, or `fallback` when it is blank.
fn failure_message<'a>(error: &'a AppError, fallback: &'a str) -> &'a str {
    let reason = error.reason();
    if reason.trim().is_empty() {
        fallback
    } else {
        reason
    }
}
