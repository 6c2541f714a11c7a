use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Opaque identifier of the principal that submitted a URL.
///
/// Used to scope listing and deletion. The value is never interpreted beyond
/// equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::InvalidOwnerId("owner id cannot be empty".to_string()));
        }
        Ok(Self(id))
    }

    /// Issues a fresh random owner id (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
