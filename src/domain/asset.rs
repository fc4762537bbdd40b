use serde::{Deserialize, Serialize};

/// Key of an asset within its partition. Generated ids are UUIDs, but ids
/// supplied by callers for read/update/delete are treated as opaque strings.
pub type AssetId = String;

/// The persisted asset record. Stored as compact JSON: `{"value":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub value: String,
}

impl Asset {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Encode the record into the bytes written to the store.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decode a record previously written with [`Asset::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
