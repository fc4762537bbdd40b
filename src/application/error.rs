use std::string::FromUtf8Error;

use thiserror::Error;

use crate::domain::AssetId;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Asset already exists: {0}")]
    AssetAlreadyExists(AssetId),

    #[error("Asset not found: {0}")]
    AssetNotFound(AssetId),

    #[error("No transient data detected")]
    NoTransientData,

    #[error("Transient entry '{0}' has no value")]
    EmptyTransientValue(String),

    #[error("Transient entry not supplied: {0}")]
    MissingTransientKey(String),

    #[error("Expected exactly one transient entry, found {0}")]
    AmbiguousTransientData(usize),

    #[error("Transient entry '{key}' is not valid UTF-8")]
    InvalidTransientEncoding {
        key: String,
        #[source]
        source: FromUtf8Error,
    },

    #[error("Stored record for asset {id} is malformed")]
    MalformedRecord {
        id: AssetId,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode asset record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}
