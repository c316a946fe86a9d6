//! Application-level user profile persisted next to the auth identity.

use celoris_core::Identity;
use serde::{Deserialize, Serialize};

use crate::{DISPLAY_NAME_FALLBACK, Role, resolve_role};

/// Persisted profile record keyed by identity id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Identity id this profile belongs to.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Coarse role, coerced to `tutor` when the stored value is unknown.
    #[serde(default)]
    pub role: Role,
    /// Wallet balance used to pay for leads.
    #[serde(default)]
    pub wallet_balance: f64,
}

impl Profile {
    /// Builds the default profile for a freshly signed-in identity.
    ///
    /// Name falls back from metadata `name` to the email local part and
    /// finally to [`DISPLAY_NAME_FALLBACK`]. The wallet starts empty.
    #[must_use]
    pub fn for_identity(identity: &Identity) -> Self {
        let name = identity
            .metadata_str("name")
            .or_else(|| email_local_part(identity.email()))
            .unwrap_or(DISPLAY_NAME_FALLBACK)
            .to_owned();

        Self {
            id: identity.id().to_owned(),
            name,
            email: identity.email().to_owned(),
            role: resolve_role(Some(identity)),
            wallet_balance: 0.0,
        }
    }
}

/// Returns the part of an email address before `@`, if non-empty.
#[must_use]
pub fn email_local_part(email: &str) -> Option<&str> {
    email
        .split('@')
        .next()
        .map(str::trim)
        .filter(|local| !local.is_empty())
}
