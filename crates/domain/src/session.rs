use celoris_core::Identity;

use crate::{Role, resolve_role};

/// Fallback display name used when an identity carries no name.
pub const DISPLAY_NAME_FALLBACK: &str = "User";

/// Local view of the authenticated principal plus loading status.
///
/// `version` is the sequence number of the last update applied to the
/// session cell. It only ever increases.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    identity: Option<Identity>,
    loading: bool,
    version: u64,
}

impl Session {
    /// Creates the initial session: loading, no identity.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            identity: None,
            loading: true,
            version: 0,
        }
    }

    /// Creates a settled session for the given identity.
    #[must_use]
    pub fn resolved(identity: Option<Identity>) -> Self {
        Self {
            identity,
            loading: false,
            version: 0,
        }
    }

    /// Returns a copy of this session with a different identity at `version`.
    #[must_use]
    pub fn with_identity(&self, identity: Option<Identity>, version: u64) -> Self {
        Self {
            identity,
            loading: self.loading,
            version,
        }
    }

    /// Returns a copy of this session marked as settled.
    #[must_use]
    pub fn settled(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            loading: false,
            version: self.version,
        }
    }

    /// Returns the cached identity, if signed in.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Returns whether the initial identity fetch is still outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns the sequence number of the last applied update.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns whether an identity is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Returns the role derived from the current identity.
    #[must_use]
    pub fn role(&self) -> Role {
        resolve_role(self.identity.as_ref())
    }

    /// Returns whether the current identity resolves to [`Role::Admin`].
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_authenticated() && self.role() == Role::Admin
    }

    /// Returns whether the current identity resolves to [`Role::Tutor`].
    #[must_use]
    pub fn is_tutor(&self) -> bool {
        self.is_authenticated() && self.role() == Role::Tutor
    }

    /// Returns the identity name, or [`DISPLAY_NAME_FALLBACK`].
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.identity
            .as_ref()
            .map(Identity::name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DISPLAY_NAME_FALLBACK)
    }

    /// Returns the identity email, or an empty string when signed out.
    #[must_use]
    pub fn email(&self) -> &str {
        self.identity.as_ref().map(Identity::email).unwrap_or("")
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use celoris_core::Identity;
    use serde_json::json;

    use super::Session;
    use crate::Role;

    #[test]
    fn initial_session_is_loading_without_identity() {
        let session = Session::initial();
        assert!(session.is_loading());
        assert!(!session.is_authenticated());
        assert_eq!(session.version(), 0);
    }

    #[test]
    fn helpers_fall_back_when_signed_out() {
        let session = Session::resolved(None);
        assert_eq!(session.display_name(), "User");
        assert_eq!(session.email(), "");
        assert!(!session.is_admin());
        assert!(!session.is_tutor());
        assert_eq!(session.role(), Role::Tutor);
    }

    #[test]
    fn helpers_read_identity() {
        let identity = Identity::new("u2", "Bo", "bo@example.com")
            .with_metadata(json!({ "role": "admin" }).as_object().cloned().unwrap_or_default());
        let session = Session::resolved(Some(identity));

        assert!(session.is_admin());
        assert!(!session.is_tutor());
        assert_eq!(session.display_name(), "Bo");
        assert_eq!(session.email(), "bo@example.com");
    }

    #[test]
    fn with_identity_preserves_loading_flag() {
        let session = Session::initial().with_identity(Some(Identity::new("u1", "", "")), 3);
        assert!(session.is_loading());
        assert_eq!(session.version(), 3);
        assert!(!session.settled().is_loading());
        assert_eq!(session.settled().version(), 3);
    }
}
