//! Translated thing types
//!
//! The canonical internal representation of a bridged device: one
//! [`TranslatedThing`] per device, produced once at add-time and
//! immutable thereafter. Re-adding a thing replaces the whole value,
//! never patches it in place.

use crate::mcp::types::{McpResource, McpToolDefinition};
use crate::td::{Form, ThingDescription};
use serde::Serialize;
use serde_json::Value;

/// A WoT property translated into an MCP resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslatedProperty {
    /// MCP resource URI: `wot://{thingId}/properties/{name}`
    pub uri: String,
    /// Human-readable name
    pub name: String,
    /// Description from the TD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type for the resource content
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Whether the property accepts writes
    pub writable: bool,
    /// Original WoT property name
    #[serde(rename = "wotName")]
    pub wot_name: String,
    /// JSON Schema for the property value
    pub schema: Value,
    /// Binding forms for the live read/write, carried as-is
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forms: Vec<Form>,
}

/// What a translated tool does when called.
///
/// This closed set replaces the dynamic `type -> name -> function`
/// handler tables of reflective implementations: the orchestrator
/// matches on the tag and dispatches to the corresponding WotClient
/// operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolTarget {
    /// Invoke the underlying WoT action
    Action,
    /// Write the underlying WoT property
    PropertyWrite,
    /// Read the underlying WoT property
    PropertyRead,
}

/// A WoT action (or synthetic property accessor) translated into an MCP tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslatedAction {
    /// Tool name: `{thingId}_{actionName}`, sanitized to `[A-Za-z0-9_-]`
    pub name: String,
    /// Description shown to the agent
    pub description: String,
    /// Input JSON Schema (always an object schema)
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    /// Original WoT affordance name
    #[serde(rename = "wotName")]
    pub wot_name: String,
    /// Thing this tool belongs to
    #[serde(rename = "thingId")]
    pub thing_id: String,
    /// Whether a scalar input schema was wrapped in `{"value": ...}`
    #[serde(rename = "inputWrapped")]
    pub input_wrapped: bool,
    /// Which operation the tool performs
    pub target: ToolTarget,
    /// Binding forms for the live invocation, carried as-is
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forms: Vec<Form>,
}

/// A WoT event translated into an MCP resource backed by buffered history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslatedEvent {
    /// MCP resource URI: `wot://{thingId}/events/{name}`
    pub uri: String,
    /// Human-readable name
    pub name: String,
    /// Description from the TD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type (always JSON for events)
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Original WoT event name
    #[serde(rename = "wotName")]
    pub wot_name: String,
    /// JSON Schema for the event payload
    pub schema: Value,
    /// Binding forms for the subscription, carried as-is
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forms: Vec<Form>,
}

/// A completely translated thing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslatedThing {
    /// Stable, URL-safe thing id derived from the TD
    pub id: String,
    /// Human-readable title
    pub title: String,
    /// Description from the TD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Translated properties, in TD order
    pub properties: Vec<TranslatedProperty>,
    /// Translated tools: actions first, then property setters/getters
    pub actions: Vec<TranslatedAction>,
    /// Translated events, in TD order
    pub events: Vec<TranslatedEvent>,
    /// The original TD, retained for introspection
    #[serde(rename = "originalTd")]
    pub original_td: ThingDescription,
}

impl TranslatedThing {
    /// The MCP resource list for this thing: properties then events.
    pub fn resources(&self) -> Vec<McpResource> {
        let props = self.properties.iter().map(|p| McpResource {
            uri: p.uri.clone(),
            name: format!("{} - {}", self.title, p.name),
            description: p.description.clone(),
            mime_type: p.mime_type.clone(),
        });
        let events = self.events.iter().map(|e| McpResource {
            uri: e.uri.clone(),
            name: format!("{} - {}", self.title, e.name),
            description: e.description.clone(),
            mime_type: e.mime_type.clone(),
        });
        props.chain(events).collect()
    }

    /// The MCP tool list for this thing.
    pub fn tools(&self) -> Vec<McpToolDefinition> {
        self.actions
            .iter()
            .map(|a| McpToolDefinition {
                name: a.name.clone(),
                description: a.description.clone(),
                input_schema: a.input_schema.clone(),
            })
            .collect()
    }

    /// Look up a translated tool by its MCP tool name.
    pub fn tool(&self, name: &str) -> Option<&TranslatedAction> {
        self.actions.iter().find(|a| a.name == name)
    }
}
