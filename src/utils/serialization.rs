// src/utils/serialization.rs
//! Serialization utilities for the portal client.
//!
//! Provides serialization and deserialization functions for:
//! - JSON request and response bodies
//! - Documents written to disk (pretty printed, two-space indent)
//! - Documents read from user supplied files

use crate::error::{PortalError, PortalResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serializes a value to a compact JSON string.
///
/// # Arguments
/// * `data` - The value to serialize (must implement `Serialize`)
///
/// # Returns
/// - `Ok(String)` with JSON representation on success
/// - `Err(serde_json::Error)` if serialization fails
pub fn serialize<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(data)
}

/// Serializes a value to indented JSON, the format every downloaded file
/// uses.
pub fn serialize_pretty<T: Serialize + ?Sized>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(data)
}

/// Deserializes a value from a JSON string.
///
/// # Arguments
/// * `data` - JSON string to deserialize
///
/// # Returns
/// - `Ok(T)` with deserialized value on success
/// - `Err(serde_json::Error)` if deserialization fails
pub fn deserialize<'a, T: Deserialize<'a>>(data: &'a str) -> Result<T, serde_json::Error> {
    serde_json::from_str(data)
}

/// Parses a file a user handed in (an uploaded credential or presentation).
///
/// # Errors
/// `MalformedInput` if the bytes are not UTF-8 JSON or not a JSON object.
pub fn parse_json_document(bytes: &[u8], source: &str) -> PortalResult<Value> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| PortalError::MalformedInput(format!("{} is not valid JSON: {}", source, e)))?;
    if !value.is_object() {
        return Err(PortalError::MalformedInput(format!(
            "{} does not contain a JSON object",
            source
        )));
    }
    Ok(value)
}
