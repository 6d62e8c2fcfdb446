//! Thing Description translation
//!
//! Maps one Thing Description into the MCP-facing shape: resources from
//! properties and events, tools from actions and property accessors.
//! Translation is pure and deterministic: the same TD always yields the
//! same ids, names, and URIs, so re-registration is idempotent at the
//! identity level.

mod types;

pub use types::{
    ToolTarget, TranslatedAction, TranslatedEvent, TranslatedProperty, TranslatedThing,
};

use crate::error::{Result, TranslationError};
use crate::td::ThingDescription;
use serde_json::{json, Value};

/// Default MIME type for translated resources
const DEFAULT_MIME_TYPE: &str = "application/json";

/// Translates Thing Descriptions into MCP tool/resource definitions.
///
/// Stateless; a single instance can translate any number of TDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThingTranslator;

impl ThingTranslator {
    /// Create a new translator
    pub fn new() -> Self {
        Self
    }

    /// Derive the stable thing id for a TD.
    ///
    /// Takes the last `:`/`/`-separated segment of the TD `id` (or the
    /// whole `title` when `id` is absent), lowercases it, and collapses
    /// every run of non-alphanumeric characters into a single hyphen.
    /// An `id` whose derived slug is empty falls back to the title; a TD
    /// where neither yields a non-empty slug is structurally unusable.
    pub fn derive_thing_id(td: &ThingDescription) -> Result<String> {
        if let Some(id) = td.id.as_deref() {
            let segment = id.rsplit([':', '/']).next().unwrap_or(id);
            let slug = slugify(segment);
            if !slug.is_empty() {
                return Ok(slug);
            }
        }
        let slug = td.title.as_deref().map(slugify).unwrap_or_default();
        if slug.is_empty() {
            return Err(TranslationError::MissingIdentity.into());
        }
        Ok(slug)
    }

    /// Translate a TD into its MCP-facing representation.
    ///
    /// The only failure mode is a TD missing both `id` and `title`;
    /// properties without forms are translated anyway, since a missing
    /// form is an error at use time, not at translation time.
    pub fn translate(&self, td: &ThingDescription) -> Result<TranslatedThing> {
        let id = Self::derive_thing_id(td)?;
        let title = td.title.clone().unwrap_or_else(|| id.clone());

        let properties: Vec<TranslatedProperty> = td
            .properties
            .iter()
            .map(|(name, prop)| TranslatedProperty {
                uri: format!("wot://{}/properties/{}", id, name),
                name: prop.title.clone().unwrap_or_else(|| name.clone()),
                description: prop.description.clone(),
                mime_type: prop
                    .forms
                    .first()
                    .and_then(|f| f.content_type.clone())
                    .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
                writable: !prop.read_only,
                wot_name: name.clone(),
                schema: prop.value_schema(),
                forms: prop.forms.clone(),
            })
            .collect();

        let mut actions: Vec<TranslatedAction> = Vec::new();

        for (name, action) in &td.actions {
            let (input_schema, input_wrapped) = normalize_input_schema(action.input.as_ref());
            actions.push(TranslatedAction {
                name: tool_name(&id, name),
                description: format!(
                    "[{}] {}",
                    title,
                    action.description.clone().unwrap_or_else(|| name.clone())
                ),
                input_schema,
                wot_name: name.clone(),
                thing_id: id.clone(),
                input_wrapped,
                target: ToolTarget::Action,
                forms: action.forms.clone(),
            });
        }

        // Writable properties get a setter tool, read-only ones a getter,
        // so tool-oriented MCP clients have an access path alongside the
        // resource URI.
        for (name, prop) in &td.properties {
            let display = prop.title.clone().unwrap_or_else(|| name.clone());
            if !prop.read_only {
                let mut fields = serde_json::Map::new();
                fields.insert(name.clone(), prop.value_schema());
                actions.push(TranslatedAction {
                    name: tool_name(&id, &format!("set_{}", name)),
                    description: format!("[{}] Set {}", title, display),
                    input_schema: json!({
                        "type": "object",
                        "properties": fields,
                        "required": [name.clone()]
                    }),
                    wot_name: name.clone(),
                    thing_id: id.clone(),
                    input_wrapped: false,
                    target: ToolTarget::PropertyWrite,
                    forms: prop.forms.clone(),
                });
            } else {
                actions.push(TranslatedAction {
                    name: tool_name(&id, &format!("get_{}", name)),
                    description: format!("[{}] Get {}", title, display),
                    input_schema: json!({ "type": "object", "properties": {} }),
                    wot_name: name.clone(),
                    thing_id: id.clone(),
                    input_wrapped: false,
                    target: ToolTarget::PropertyRead,
                    forms: prop.forms.clone(),
                });
            }
        }

        let events: Vec<TranslatedEvent> = td
            .events
            .iter()
            .map(|(name, event)| TranslatedEvent {
                uri: format!("wot://{}/events/{}", id, name),
                name: event.title.clone().unwrap_or_else(|| name.clone()),
                description: event.description.clone(),
                mime_type: DEFAULT_MIME_TYPE.to_string(),
                wot_name: name.clone(),
                schema: event.data.clone().unwrap_or(Value::Null),
                forms: event.forms.clone(),
            })
            .collect();

        Ok(TranslatedThing {
            id,
            title,
            description: td.description.clone(),
            properties,
            actions,
            events,
            original_td: td.clone(),
        })
    }
}

/// Lowercase and collapse every non-alphanumeric run to a single hyphen.
///
/// Leading and trailing runs map to a hyphen too; the result is not
/// trimmed.
fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut run = false;
    for c in s.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if run {
                out.push('-');
                run = false;
            }
            out.push(c);
        } else {
            run = true;
        }
    }
    if run {
        out.push('-');
    }
    out
}

/// Join thing id and member name, sanitizing to `[A-Za-z0-9_-]`.
fn tool_name(thing_id: &str, member: &str) -> String {
    format!("{}_{}", thing_id, member)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Coerce an action's input schema into MCP's object-only convention.
///
/// A missing schema becomes an empty object schema. A schema whose type
/// is not `object` (a bare number, boolean, string, ...) is wrapped so
/// callers supply `{"value": <scalar>}`; the returned flag records that
/// the real invocation must unwrap it again.
fn normalize_input_schema(input: Option<&Value>) -> (Value, bool) {
    match input {
        None => (json!({ "type": "object", "properties": {} }), false),
        Some(schema) => {
            let is_object = schema.get("type").and_then(Value::as_str) == Some("object");
            if is_object {
                (schema.clone(), false)
            } else {
                (
                    json!({
                        "type": "object",
                        "properties": { "value": schema.clone() },
                        "required": ["value"]
                    }),
                    true,
                )
            }
        }
    }
}
