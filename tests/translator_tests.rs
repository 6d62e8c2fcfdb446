//! Translator integration tests
//!
//! These tests verify the TD → MCP mapping through the public API.

use pretty_assertions::assert_eq;
use serde_json::json;
use wot_mcp_bridge::td::ThingDescription;
use wot_mcp_bridge::translator::{ThingTranslator, ToolTarget};

fn td(value: serde_json::Value) -> ThingDescription {
    ThingDescription::from_value(value).unwrap()
}

fn kitchen_td() -> ThingDescription {
    td(json!({
        "id": "urn:dev:ops:kitchen-multisensor",
        "title": "Kitchen MultiSensor",
        "description": "Temperature, humidity and fan control",
        "properties": {
            "temperature": {
                "type": "number",
                "readOnly": true,
                "forms": [{"href": "http://sensor.local/temperature"}]
            },
            "humidity": {
                "type": "number",
                "readOnly": true,
                "forms": [{"href": "http://sensor.local/humidity"}]
            },
            "fanSpeed": {
                "type": "integer",
                "minimum": 0,
                "maximum": 3,
                "forms": [{"href": "http://sensor.local/fan"}]
            }
        },
        "actions": {
            "recalibrate": {
                "forms": [{"href": "http://sensor.local/recalibrate"}]
            },
            "setTarget": {
                "input": {"type": "number"},
                "forms": [{"href": "http://sensor.local/target"}]
            }
        },
        "events": {
            "overheated": {
                "data": {"type": "number"},
                "forms": [{"href": "http://sensor.local/events/overheated"}]
            },
            "fanStalled": {
                "forms": [{"href": "http://sensor.local/events/fanStalled"}]
            }
        }
    }))
}

#[test]
fn test_translation_counts() {
    let thing = ThingTranslator::new().translate(&kitchen_td()).unwrap();

    // P properties, E events, and A + writable + read-only tools.
    assert_eq!(thing.properties.len(), 3);
    assert_eq!(thing.events.len(), 2);
    assert_eq!(thing.actions.len(), 2 + 1 + 2);
    assert_eq!(thing.tools().len(), 5);
    assert_eq!(thing.resources().len(), 5);
}

#[test]
fn test_translation_is_idempotent() {
    let translator = ThingTranslator::new();
    let source = kitchen_td();
    let first = translator.translate(&source).unwrap();
    let second = translator.translate(&source).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first, second);

    let names = |t: &wot_mcp_bridge::TranslatedThing| {
        t.tools().iter().map(|d| d.name.clone()).collect::<Vec<_>>()
    };
    assert_eq!(names(&first), names(&second));
}

#[test]
fn test_writable_and_read_only_split() {
    let thing = ThingTranslator::new().translate(&kitchen_td()).unwrap();
    let id = &thing.id;

    // Read-only properties get a getter and never a setter.
    assert!(thing.tool(&format!("{id}_get_temperature")).is_some());
    assert!(thing.tool(&format!("{id}_set_temperature")).is_none());

    // Writable properties get a setter and never a getter.
    assert!(thing.tool(&format!("{id}_set_fanSpeed")).is_some());
    assert!(thing.tool(&format!("{id}_get_fanSpeed")).is_none());
}

#[test]
fn test_end_to_end_naming_scenario() {
    // One read-only number property and one object-input action.
    let thing = ThingTranslator::new()
        .translate(&td(json!({
            "id": "urn:dev:thermostat-7",
            "title": "Thermostat",
            "properties": {
                "temperature": {
                    "type": "number",
                    "readOnly": true,
                    "forms": [{"href": "http://t.local/temperature"}]
                }
            },
            "actions": {
                "setTemperature": {
                    "input": {
                        "type": "object",
                        "properties": {"value": {"type": "number"}},
                        "required": ["value"]
                    },
                    "forms": [{"href": "http://t.local/setTemperature"}]
                }
            }
        })))
        .unwrap();

    assert_eq!(thing.id, "thermostat-7");
    let tool_names: Vec<_> = thing.tools().iter().map(|d| d.name.clone()).collect();
    assert!(tool_names.contains(&"thermostat-7_setTemperature".to_string()));
    assert!(tool_names.contains(&"thermostat-7_get_temperature".to_string()));
    assert_eq!(
        thing.properties[0].uri,
        "wot://thermostat-7/properties/temperature"
    );

    // The object input schema passes through unwrapped.
    let action = thing.tool("thermostat-7_setTemperature").unwrap();
    assert!(!action.input_wrapped);
    assert_eq!(action.target, ToolTarget::Action);
}

#[test]
fn test_scalar_action_input_is_wrapped() {
    let thing = ThingTranslator::new().translate(&kitchen_td()).unwrap();
    let action = thing.tool("kitchen-multisensor_setTarget").unwrap();
    assert!(action.input_wrapped);
    assert_eq!(action.input_schema["type"], "object");
    assert_eq!(action.input_schema["properties"]["value"]["type"], "number");
}

#[test]
fn test_missing_action_input_defaults_to_empty_object() {
    let thing = ThingTranslator::new().translate(&kitchen_td()).unwrap();
    let action = thing.tool("kitchen-multisensor_recalibrate").unwrap();
    assert!(!action.input_wrapped);
    assert_eq!(
        action.input_schema,
        json!({"type": "object", "properties": {}})
    );
}

#[test]
fn test_event_resources_mirror_property_uri_scheme() {
    let thing = ThingTranslator::new().translate(&kitchen_td()).unwrap();
    let uris: Vec<_> = thing.events.iter().map(|e| e.uri.clone()).collect();
    assert!(uris.contains(&"wot://kitchen-multisensor/events/overheated".to_string()));
    assert!(uris.contains(&"wot://kitchen-multisensor/events/fanStalled".to_string()));
}

#[test]
fn test_awkward_names_are_sanitized() {
    let thing = ThingTranslator::new()
        .translate(&td(json!({
            "title": "Café Machine #2",
            "actions": {
                "brew espresso": {"forms": [{"href": "http://c.local/brew"}]}
            }
        })))
        .unwrap();

    // Thing id from the title; tool name sanitized to [A-Za-z0-9_-].
    assert_eq!(thing.id, "caf-machine-2");
    let name = &thing.actions[0].name;
    assert_eq!(name, "caf-machine-2_brew_espresso");
    assert!(name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
}

#[test]
fn test_td_without_identity_is_rejected() {
    let err = ThingTranslator::new()
        .translate(&td(json!({"properties": {}})))
        .unwrap_err();
    assert!(matches!(err, wot_mcp_bridge::Error::Translation(_)));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Tool names stay inside [A-Za-z0-9_-] whatever the TD throws
        /// at the translator.
        #[test]
        fn tool_names_always_sanitized(title in "[^\\x00]{1,40}", action in "[^\\x00]{1,40}") {
            let doc = json!({
                "title": title,
                "actions": { action: {} }
            });
            let td = ThingDescription::from_value(doc).unwrap();
            if let Ok(thing) = ThingTranslator::new().translate(&td) {
                for tool in thing.tools() {
                    let sanitized = tool.name.chars().all(|c| {
                        c.is_ascii_alphanumeric() || c == '_' || c == '-'
                    });
                    prop_assert!(sanitized);
                }
            }
        }

        /// The derived id is deterministic.
        #[test]
        fn thing_id_is_stable(id in "[a-zA-Z0-9:/._-]{1,60}") {
            let doc = json!({"id": id, "title": "Fallback"});
            let td = ThingDescription::from_value(doc).unwrap();
            let a = ThingTranslator::derive_thing_id(&td).unwrap();
            let b = ThingTranslator::derive_thing_id(&td).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
