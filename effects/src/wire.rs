//! JSON bodies exchanged with `/api/edit-image`.
//!
//! Shared so the server and the CLI agree on field names and on the
//! `type`-tagged shape of [`EditResult`].

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Body of `POST /api/edit-image`. Fields are optional on the wire so a
/// missing field is a validation error rather than a decode error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
}

impl EditRequest {
    #[must_use]
    pub fn new(image: impl Into<String>, command: impl Into<String>) -> Self {
        Self { image: Some(image.into()), command: Some(command.into()) }
    }
}

/// Outcome of one edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EditResult {
    /// Render `filter` over the unchanged `image` on the client.
    #[serde(rename = "filter")]
    Filter { filter: Option<String>, image: String },
    /// A new image produced upstream.
    #[serde(rename = "processedImage")]
    ProcessedImage { image: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditResponse {
    pub success: bool,
    pub result: EditResult,
    /// Human-readable description of what was done.
    pub analysis: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub endpoints: HealthEndpoints,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthEndpoints {
    pub edit: String,
}

#[cfg(test)]
#[path = "wire_test.rs"]
mod tests;
