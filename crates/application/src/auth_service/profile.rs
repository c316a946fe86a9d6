use celoris_core::{Identity, MetadataMap};
use celoris_domain::{Collection, Profile};

use crate::Record;
use crate::profile_reconciler::profile_from_record;

use super::*;

impl AuthService {
    /// Writes partial metadata updates for the signed-in identity.
    ///
    /// The identity returned by the auth service replaces the cached one
    /// as-is; nothing is merged locally.
    pub async fn update_profile(&self, updates: MetadataMap) -> AppResult<Identity> {
        let result = self.write_metadata(updates).await;
        self.announce(
            result,
            "Profile updated successfully",
            "Failed to update profile",
        )
    }

    /// Writes partial updates to the signed-in identity's profile record.
    pub async fn update_profile_record(&self, patch: Record) -> AppResult<Profile> {
        let result = self.write_profile_record(patch).await;
        self.announce(
            result,
            "Profile updated successfully",
            "Failed to update profile",
        )
    }

    /// Reads the signed-in identity's profile record.
    ///
    /// Returns `None` when signed out or when no profile exists yet.
    pub async fn profile(&self) -> AppResult<Option<Profile>> {
        let Some(identity) = self.session_store.snapshot().identity().cloned() else {
            return Ok(None);
        };

        match self
            .record_store
            .get(Collection::Profiles, identity.id())
            .await
        {
            Ok(record) => profile_from_record(record).map(Some),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn write_metadata(&self, updates: MetadataMap) -> AppResult<Identity> {
        self.require_identity()?;

        let ticket = self.session_store.issue_ticket();
        let identity = self.auth_provider.update_metadata(updates).await?;
        self.session_store.apply_confirmed(ticket, identity.clone());
        Ok(identity)
    }

    async fn write_profile_record(&self, patch: Record) -> AppResult<Profile> {
        let identity = self.require_identity()?;
        let record = self
            .record_store
            .update(Collection::Profiles, identity.id(), patch)
            .await?;
        profile_from_record(record)
    }

    fn require_identity(&self) -> AppResult<Identity> {
        self.session_store
            .snapshot()
            .identity()
            .cloned()
            .ok_or_else(|| AppError::Auth("No user logged in".to_owned()))
    }
}
