use celoris_core::{Identity, MetadataMap};
use celoris_domain::ROLE_METADATA_KEY;
use serde_json::Value;
use tracing::warn;

use super::*;

impl AuthService {
    /// Signs in with email and password and caches the identity.
    ///
    /// Identities without a role get the default role written back. A
    /// failed write-back fails the login, though the session the service
    /// opened stays cached.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Identity> {
        let result = self.sign_in_with_default_role(email, password).await;
        self.announce(result, "Login successful!", "Login failed")
    }

    async fn sign_in_with_default_role(&self, email: &str, password: &str) -> AppResult<Identity> {
        let ticket = self.session_store.issue_ticket();
        let identity = self.auth_provider.sign_in(email, password).await?;

        if identity.metadata_str(ROLE_METADATA_KEY).is_some() {
            self.session_store.apply_identity(ticket, Some(identity.clone()));
            return Ok(identity);
        }

        let mut patch = MetadataMap::new();
        patch.insert(
            ROLE_METADATA_KEY.to_owned(),
            Value::String(Role::default().as_str().to_owned()),
        );

        match self.auth_provider.update_metadata(patch).await {
            Ok(updated) => {
                self.session_store.apply_confirmed(ticket, updated.clone());
                Ok(updated)
            }
            Err(error) => {
                warn!(
                    identity_id = %identity.id(),
                    error = %error,
                    "failed to store default role"
                );
                self.session_store.apply_identity(ticket, Some(identity));
                Err(error)
            }
        }
    }
}
