use std::str::FromStr;

use celoris_core::{AppError, Identity};
use serde::{Deserialize, Serialize};

use crate::RedirectTarget;

/// Metadata key under which both backends store the coarse role.
pub const ROLE_METADATA_KEY: &str = "role";

/// Coarse authorization category of a signed-in user.
///
/// The set is closed. Stored values outside it are coerced to [`Role::Tutor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Marketplace administrator.
    Admin,
    /// Tutor applying for leads. Default for every account.
    #[default]
    Tutor,
}

impl Role {
    /// Returns the stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Tutor => "tutor",
        }
    }

    /// Returns all known roles.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Role] = &[Role::Admin, Role::Tutor];

        ALL
    }

    /// Coerces an arbitrary stored value into a role.
    ///
    /// Missing, blank and unknown values resolve to [`Role::Tutor`].
    #[must_use]
    pub fn coerce(value: Option<&str>) -> Self {
        value
            .and_then(|value| Self::from_str(value.trim()).ok())
            .unwrap_or_default()
    }

    /// Returns the landing page for this role.
    #[must_use]
    pub fn home(&self) -> RedirectTarget {
        match self {
            Self::Admin => RedirectTarget::AdminHome,
            Self::Tutor => RedirectTarget::TutorHome,
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "tutor" => Ok(Self::Tutor),
            _ => Err(AppError::Validation(format!("unknown role '{value}'"))),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self::coerce(Some(value.as_str()))
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_owned()
    }
}

/// Derives the role of an identity from its metadata.
///
/// Pure and deterministic. An absent identity resolves to [`Role::Tutor`].
#[must_use]
pub fn resolve_role(identity: Option<&Identity>) -> Role {
    Role::coerce(identity.and_then(|identity| identity.metadata_str(ROLE_METADATA_KEY)))
}
