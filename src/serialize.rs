//! Snapshot → YAML / JSON rendering.
//!
//! Input maps are ordered by name and form fields follow declaration order,
//! so two equal snapshots always render to the same text.

use crate::error::SerializeError;
use crate::state::{FormState, RootState};
use serde::Serialize;

/// A snapshot that can be exported.
pub trait Snapshot: Serialize {}

impl Snapshot for RootState {}
impl Snapshot for FormState {}

/// Render a [`RootState`] or a single [`FormState`] as YAML.
pub fn to_yaml<S: Snapshot>(snapshot: &S) -> Result<String, SerializeError> {
    // Convert to serde_json::Value first, as for the JSON export
    let value = serde_json::to_value(snapshot).map_err(|e| SerializeError {
        message: format!("failed to convert state to JSON value: {}", e),
    })?;

    serde_saphyr::to_string(&value).map_err(|e| SerializeError {
        message: format!("failed to serialize to YAML: {}", e),
    })
}

/// Render a [`RootState`] or a single [`FormState`] as pretty-printed JSON.
pub fn to_json<S: Snapshot>(snapshot: &S) -> Result<String, SerializeError> {
    serde_json::to_string_pretty(snapshot).map_err(|e| SerializeError {
        message: format!("failed to serialize to JSON: {}", e),
    })
}
