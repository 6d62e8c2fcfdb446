//! Error types for the WoT-MCP bridge
//!
//! This module provides the error type hierarchy using `thiserror`.
//! The taxonomy deliberately separates "not found" conditions (a bad thing
//! id, property, action, or event name supplied by the caller) from
//! transport failures (the live network operation against a real device
//! went wrong), because the MCP surface reports the two differently to an
//! agent.

use thiserror::Error;

/// The main error type for bridge operations
#[derive(Error, Debug)]
pub enum Error {
    /// Unknown thing, affordance, resource, or tool
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// Failure of a live network operation against a device
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Structurally unusable Thing Description
    #[error(transparent)]
    Translation(#[from] TranslationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Caller/configuration errors: the named entity does not exist.
///
/// Never retried automatically.
#[derive(Error, Debug)]
pub enum NotFoundError {
    /// Unknown thing id
    #[error("Thing not found: {0}")]
    Thing(String),

    /// Unknown property name on a known thing
    #[error("Property '{property}' not found on '{thing_id}'")]
    Property {
        /// Thing the lookup ran against
        thing_id: String,
        /// The missing property name
        property: String,
    },

    /// Unknown action name on a known thing
    #[error("Action '{action}' not found on '{thing_id}'")]
    Action {
        /// Thing the lookup ran against
        thing_id: String,
        /// The missing action name
        action: String,
    },

    /// Unknown event name on a known thing
    #[error("Event '{event}' not found on '{thing_id}'")]
    Event {
        /// Thing the lookup ran against
        thing_id: String,
        /// The missing event name
        event: String,
    },

    /// No resource at the given URI
    #[error("Unknown resource URI: {0}")]
    Resource(String),

    /// Unknown tool name
    #[error("Tool not found: {0}")]
    Tool(String),
}

/// Failures of live network operations against a device.
///
/// The contextual variants carry the thing id and member name so the
/// caller sees which interaction failed, not just the raw transport
/// message.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Fetching a Thing Description from a URL failed
    #[error("Failed to fetch Thing Description from '{url}': {message}")]
    TdFetch {
        /// The TD URL
        url: String,
        /// Underlying transport message
        message: String,
    },

    /// A live property read failed
    #[error("Failed to read property '{member}' from '{thing_id}': {message}")]
    Read {
        /// Thing the read ran against
        thing_id: String,
        /// Property name
        member: String,
        /// Underlying transport message
        message: String,
    },

    /// A live property write failed
    #[error("Failed to write property '{member}' to '{thing_id}': {message}")]
    Write {
        /// Thing the write ran against
        thing_id: String,
        /// Property name
        member: String,
        /// Underlying transport message
        message: String,
    },

    /// A live action invocation failed
    #[error("Failed to invoke action '{member}' on '{thing_id}': {message}")]
    Invoke {
        /// Thing the invocation ran against
        thing_id: String,
        /// Action name
        member: String,
        /// Underlying transport message
        message: String,
    },

    /// Setting up an event subscription failed
    #[error("Failed to subscribe to event '{member}' on '{thing_id}': {message}")]
    Subscribe {
        /// Thing the subscription ran against
        thing_id: String,
        /// Event name
        member: String,
        /// Underlying transport message
        message: String,
    },

    /// The affordance declares no usable form for this operation
    #[error("No usable form for '{member}' on '{thing_id}'")]
    NoForm {
        /// Thing the lookup ran against
        thing_id: String,
        /// Affordance name
        member: String,
    },

    /// No transport is registered for the form's URI scheme
    #[error("No transport registered for scheme '{0}'")]
    UnsupportedScheme(String),

    /// The operation exceeded the configured per-operation timeout
    #[error("Transport operation timed out after {0}ms")]
    Timeout(u64),

    /// The device answered with an HTTP error status
    #[error("HTTP error {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Status text or response body
        message: String,
    },

    /// Connection-level or protocol-level failure
    #[error("Transport request failed: {0}")]
    Request(String),
}

/// A Thing Description that cannot be translated at all
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The TD carries neither an `id` nor a `title` to derive an id from
    #[error("Thing Description has neither 'id' nor 'title'")]
    MissingIdentity,
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }

    /// Whether this is a "not found" (caller) error as opposed to a
    /// transport or translation failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
