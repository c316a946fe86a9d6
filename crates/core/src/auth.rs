use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open metadata map attached to an identity (Appwrite `prefs`, Supabase `user_metadata`).
pub type MetadataMap = Map<String, Value>;

/// Authenticated principal as returned by the external auth service.
///
/// Instances are read-only snapshots. Changes are written through the auth
/// service and the returned value replaces the cached copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    id: String,
    name: String,
    email: String,
    #[serde(default)]
    metadata: MetadataMap,
}

impl Identity {
    /// Creates an identity without metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            metadata: MetadataMap::new(),
        }
    }

    /// Returns the identity with the provided metadata map.
    #[must_use]
    pub fn with_metadata(mut self, metadata: MetadataMap) -> Self {
        self.metadata = metadata;
        self
    }

    /// Returns the stable identifier assigned by the auth service.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the account display name, which may be empty.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the account email, which may be empty.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns the metadata map.
    #[must_use]
    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    /// Returns a metadata value as a trimmed, non-empty string slice.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}
