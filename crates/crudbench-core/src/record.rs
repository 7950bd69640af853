//! Record type shared by all backends.

use serde::{Deserialize, Serialize};

/// Backend-assigned record identity.
///
/// Identities start at 1 and only ever grow within a store's lifetime.
pub type RecordId = u64;

/// A single stored entity: an identity and an opaque string payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Identity assigned by the backend's sequence allocator.
    pub id: RecordId,

    /// Payload.
    pub value: String,
}

impl Record {
    /// Create a record.
    pub fn new(id: RecordId, value: impl Into<String>) -> Self {
        Self {
            id,
            value: value.into(),
        }
    }
}

impl From<(RecordId, &str)> for Record {
    fn from((id, value): (RecordId, &str)) -> Self {
        Self::new(id, value)
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {:?})", self.id, self.value)
    }
}
