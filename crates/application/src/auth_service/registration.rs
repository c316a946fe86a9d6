use celoris_core::{Identity, MetadataMap};
use celoris_domain::ROLE_METADATA_KEY;
use serde_json::Value;

use crate::SignUpRequest;

use super::*;

/// Parameters for account registration.
#[derive(Debug, Clone)]
pub struct RegisterParams {
    /// Email address for the new account.
    pub email: String,
    /// Plaintext password, validated by the auth service.
    pub password: String,
    /// Display name.
    pub name: String,
    /// Initial role. Defaults to tutor.
    pub role: Role,
}

impl RegisterParams {
    /// Creates registration parameters with the default role.
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            name: name.into(),
            role: Role::default(),
        }
    }

    /// Overrides the initial role.
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

impl AuthService {
    /// Creates an account with initial role metadata and requests email verification.
    ///
    /// The session is not touched here; a sign-in, if the service performs
    /// one, arrives through the change subscription.
    pub async fn register(&self, params: RegisterParams) -> AppResult<Identity> {
        let result = self.create_account(params).await;
        self.announce(
            result,
            "Registration successful! Please check your email to verify your account.",
            "Registration failed",
        )
    }

    async fn create_account(&self, params: RegisterParams) -> AppResult<Identity> {
        let mut metadata = MetadataMap::new();
        metadata.insert(
            ROLE_METADATA_KEY.to_owned(),
            Value::String(params.role.as_str().to_owned()),
        );
        metadata.insert("name".to_owned(), Value::String(params.name.clone()));

        let identity = self
            .auth_provider
            .sign_up(&SignUpRequest {
                email: params.email.clone(),
                password: params.password,
                name: params.name,
                metadata,
            })
            .await?;

        self.auth_provider
            .request_verification(&params.email, &self.verification_redirect_url)
            .await?;

        Ok(identity)
    }
}
