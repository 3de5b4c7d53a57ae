//! Inline Lambda tool definitions.
//!
//! A Lambda target's `toolSchema.inlinePayload` is a JSON array of tool
//! definitions. The control plane takes them as structured values, so
//! the payload is parsed here and rendered back on read.

use super::{ApiError, VALIDATION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: SchemaDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<SchemaDefinition>,
}

/// A JSON-schema-like type description. `type` is one of `string`,
/// `number`, `integer`, `boolean`, `array` or `object`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SchemaDefinition {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, SchemaDefinition>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// Parses an inline payload. Malformed JSON is a validation error so it
/// surfaces in the resource status without a request being sent.
pub fn parse_tools(payload: &str) -> Result<Vec<ToolDefinition>, ApiError> {
    serde_json::from_str(payload)
        .map_err(|err| ApiError::new(VALIDATION, format!("invalid inline tool schema: {}", err)))
}

pub fn render_tools(tools: &[ToolDefinition]) -> String {
    serde_json::to_string(tools).unwrap_or_default()
}

/// Rewrites a JSON payload into a canonical form so documents that only
/// differ in whitespace or key order compare equal. Payloads that are
/// not JSON (e.g. YAML OpenAPI documents) are returned unchanged.
pub fn canonical_payload(payload: &str) -> String {
    serde_json::from_str::<serde_json::Value>(payload)
        .map(|value| value.to_string())
        .unwrap_or_else(|_| payload.to_owned())
}
