//! Change messages
//!
//! The decoded form of one frame on the change feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StreamError;

/// What happened to the resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Archived,
    /// Any kind this client does not know yet
    #[serde(other)]
    Other,
}

/// A change to one backend resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMessage {
    pub kind: ChangeKind,

    /// e.g. "project", "dashboard"
    #[serde(default)]
    pub resource_type: String,

    #[serde(default)]
    pub resource_id: String,

    /// Resource body, passed through untouched
    #[serde(default)]
    pub payload: serde_json::Value,

    /// When the backend recorded the change, if it says
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChangeMessage {
    /// Decode one frame
    pub fn decode(frame: &[u8]) -> Result<Self, StreamError> {
        Ok(serde_json::from_slice(frame)?)
    }
}
