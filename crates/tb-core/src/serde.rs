//! Canonical JSON helpers used for hashing and persisted descriptors.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{ErrorInfo, TbError};

/// Serializes `value` to JSON with object keys in sorted order.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, TbError> {
    let tree = serde_json::to_value(value).map_err(|err| {
        TbError::Serde(ErrorInfo::new("serde.to-value", err.to_string()))
    })?;
    serde_json::to_vec(&tree)
        .map_err(|err| TbError::Serde(ErrorInfo::new("serde.to-bytes", err.to_string())))
}

/// Parses a JSON payload.
pub fn from_json_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TbError> {
    serde_json::from_slice(bytes)
        .map_err(|err| TbError::Serde(ErrorInfo::new("serde.from-slice", err.to_string())))
}
