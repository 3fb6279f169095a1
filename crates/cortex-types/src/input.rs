//! Sensory input and agent-core response envelopes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The modality of a sensory input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensoryKind {
    Text,
    Voice,
    Visual,
}

/// One unit of input routed into the agent-core. Immutable; constructed by
/// the caller and consumed exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensoryInput {
    /// Input modality.
    #[serde(rename = "type")]
    pub kind: SensoryKind,
    /// Opaque payload; for text inputs this is a JSON string.
    pub payload: serde_json::Value,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    /// Caller-chosen session identifier.
    pub session_id: String,
}

impl SensoryInput {
    /// Construct a text input for the given session, stamped with the
    /// current time.
    pub fn text(payload: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            kind: SensoryKind::Text,
            payload: serde_json::Value::String(payload.into()),
            timestamp: chrono::Utc::now().timestamp_millis(),
            session_id: session_id.into(),
        }
    }
}

/// The response envelope produced exactly once per agent-core `execute`
/// call. Domain failures set `success: false` and `error`; they are data,
/// not host-level faults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCoreResponse {
    /// Whether the operation succeeded in the domain sense.
    pub success: bool,
    /// Operation result, when successful.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Domain error message, when unsuccessful.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Always `"agent-core"`; stamped by the host wrapper (guest envelopes
    /// may omit it).
    #[serde(default = "default_source")]
    pub source: String,
    /// Host-measured wall time of the boundary call.
    #[serde(default)]
    pub processing_time_ms: f64,
    /// Guest-reported confidence, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Guest-reported metadata, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

fn default_source() -> String {
    AgentCoreResponse::SOURCE.to_string()
}

impl AgentCoreResponse {
    /// The `source` value every agent-core response carries.
    pub const SOURCE: &'static str = "agent-core";

    /// A domain failure envelope (used for fail-fast guards).
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
            source: Self::SOURCE.to_string(),
            processing_time_ms: 0.0,
            confidence: None,
            metadata: None,
        }
    }
}
