//! MCP-facing types
//!
//! This module defines the shapes the bridge hands to the external MCP
//! surface: resource and tool definitions plus tool-call results. The
//! JSON-RPC framing itself belongs to the MCP server machinery and is
//! out of scope here.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// MCP resource definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpResource {
    /// Resource URI (`wot://{thingId}/properties/{name}` or `.../events/{name}`)
    pub uri: String,
    /// Human-readable name
    pub name: String,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the resource content
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// MCP tool definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolDefinition {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// Input JSON schema (always an object schema)
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Content of a read resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpResourceContent {
    /// Resource URI
    pub uri: String,
    /// MIME type
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Text content (for text resources)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Binary content as base64 (for binary resources)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

impl McpResourceContent {
    /// Create JSON text content for a URI
    pub fn json(uri: impl Into<String>, value: &Value) -> Self {
        Self {
            uri: uri.into(),
            mime_type: "application/json".to_string(),
            text: Some(serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())),
            blob: None,
        }
    }
}

/// Result of a tool call
///
/// Failures are reported inside the result (`is_error` plus a structured
/// `{"error": ...}` payload), never as a protocol-level exception, so an
/// agent always receives a well-formed result to reason about.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    /// Whether the call was an error
    #[serde(rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
    /// Content array
    pub content: Vec<ToolContent>,
}

impl ToolCallResult {
    /// Create a success result with text content
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            is_error: false,
            content: vec![ToolContent::text(text)],
        }
    }

    /// Create a success result carrying a JSON value as pretty text
    pub fn json(value: &Value) -> Self {
        Self::text(serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string()))
    }

    /// Create an error result with a structured `{"error": ...}` payload
    pub fn error(message: impl Into<String>) -> Self {
        let payload = json!({ "error": message.into() });
        Self {
            is_error: true,
            content: vec![ToolContent::text(
                serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string()),
            )],
        }
    }
}

/// Content item in a tool result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    /// Text content
    #[serde(rename = "text")]
    Text {
        /// The text content
        text: String,
    },
    /// Embedded resource content
    #[serde(rename = "resource")]
    Resource {
        /// The embedded resource
        resource: McpResourceContent,
    },
}

impl ToolContent {
    /// Create text content
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// The text of this content item, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ToolContent::Text { text } => Some(text),
            ToolContent::Resource { resource } => resource.text.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definition_serializes_camel_case() {
        let def = McpToolDefinition {
            name: "lamp_toggle".to_string(),
            description: "[My Lamp] toggle".to_string(),
            input_schema: json!({"type": "object", "properties": {}}),
        };
        let out = serde_json::to_string(&def).unwrap();
        assert!(out.contains("\"inputSchema\""));
    }

    #[test]
    fn test_tool_call_result_text() {
        let result = ToolCallResult::text("42");
        assert!(!result.is_error);
        assert_eq!(result.content.len(), 1);
        let out = serde_json::to_string(&result).unwrap();
        assert!(!out.contains("isError"));
    }

    #[test]
    fn test_tool_call_result_error_is_structured() {
        let result = ToolCallResult::error("Thing not found: lamp-1");
        assert!(result.is_error);
        let text = result.content[0].as_text().unwrap();
        let payload: Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["error"], "Thing not found: lamp-1");
    }

    #[test]
    fn test_resource_content_json() {
        let content = McpResourceContent::json("wot://lamp-1/properties/status", &json!("on"));
        assert_eq!(content.mime_type, "application/json");
        assert_eq!(content.text.as_deref(), Some("\"on\""));
        assert!(content.blob.is_none());
    }

    #[test]
    fn test_tool_content_tagged_serialization() {
        let content = ToolContent::text("hello");
        let out = serde_json::to_string(&content).unwrap();
        assert!(out.contains("\"type\":\"text\""));
    }
}
