use std::sync::Arc;

use celoris_core::{AppError, AppResult, Identity};
use celoris_domain::{Collection, Profile};
use serde_json::Value;
use tracing::{info, warn};

use crate::{Record, RecordStore};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A profile already existed.
    Existing,
    /// A default profile was created.
    Created,
    /// Reconciliation failed and was abandoned. It runs again on the next sign-in.
    Deferred,
}

/// Ensures every signed-in identity has a profile record.
#[derive(Clone)]
pub struct ProfileReconciler {
    record_store: Arc<dyn RecordStore>,
}

impl ProfileReconciler {
    /// Creates a reconciler writing to `record_store`.
    #[must_use]
    pub fn new(record_store: Arc<dyn RecordStore>) -> Self {
        Self { record_store }
    }

    /// Creates the default profile for `identity` when none exists.
    ///
    /// Best-effort: every failure other than the expected not-found read is
    /// logged and swallowed without retry.
    pub async fn reconcile(&self, identity: &Identity) -> ReconcileOutcome {
        match self.record_store.get(Collection::Profiles, identity.id()).await {
            Ok(_) => ReconcileOutcome::Existing,
            Err(error) if error.is_not_found() => match self.create_default(identity).await {
                Ok(()) => {
                    info!(identity_id = %identity.id(), "created default profile");
                    ReconcileOutcome::Created
                }
                Err(error) => {
                    warn!(
                        identity_id = %identity.id(),
                        error = %error,
                        "failed to create profile, deferring"
                    );
                    ReconcileOutcome::Deferred
                }
            },
            Err(error) => {
                warn!(
                    identity_id = %identity.id(),
                    error = %error,
                    "failed to read profile, deferring"
                );
                ReconcileOutcome::Deferred
            }
        }
    }

    async fn create_default(&self, identity: &Identity) -> AppResult<()> {
        let record = profile_record(&Profile::for_identity(identity))?;
        self.record_store
            .create(Collection::Profiles, record)
            .await
            .map(|_| ())
    }
}

/// Serializes a profile into a record.
pub(crate) fn profile_record(profile: &Profile) -> AppResult<Record> {
    match serde_json::to_value(profile) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(_) => Err(AppError::Internal(
            "profile did not serialize to an object".to_owned(),
        )),
        Err(error) => Err(AppError::Internal(format!(
            "failed to serialize profile: {error}"
        ))),
    }
}

/// Deserializes a profile from a record.
pub(crate) fn profile_from_record(record: Record) -> AppResult<Profile> {
    serde_json::from_value(Value::Object(record))
        .map_err(|error| AppError::Internal(format!("invalid profile record: {error}")))
}
