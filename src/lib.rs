//! WoT-MCP Bridge - Web of Things devices as MCP tools and resources
//!
//! This crate bridges two protocol models: the W3C Web of Things device
//! model (properties, actions, events exposed over transport "forms")
//! and the Model Context Protocol used by LLM-agent tooling (named
//! tools, URI-addressed resources, change notifications). An MCP-
//! speaking agent can discover and operate arbitrary WoT devices
//! without either side knowing the other's wire format.
//!
//! # Architecture
//!
//! ```text
//! AI Agent ──▶ MCP surface ──▶ WotMcpBridge ──▶ WotClient (HTTP/...)
//!                                   │                │
//!                                   ▼                ▼
//!                           ┌──────────────┐  ┌─────────────┐
//!                           │ Translator   │  │ EventBuffer │
//!                           └──────┬───────┘  └──────┬──────┘
//!                                  │                 │
//!                                  ▼                 ▼
//!                           Tools + Resources   Buffered events
//! ```
//!
//! A Thing Description is translated once at add-time: properties and
//! events become `wot://` resources, actions and property accessors
//! become tools. Live reads/writes/invocations are relayed to the
//! device; emitted events land in a bounded per-resource history buffer
//! that backs MCP resource reads.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wot_mcp_bridge::{BridgeConfig, NullSurface, WotMcpBridge};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bridge = WotMcpBridge::new(BridgeConfig::default(), Arc::new(NullSurface));
//!     bridge.start().await?;
//!
//!     let thing = bridge.add_thing("http://lamp.local/td", true).await?;
//!     println!("Bridged {} with {} tools", thing.id, thing.tools().len());
//!
//!     let status = bridge.read_property(&thing.id, "status").await?;
//!     println!("status = {}", status);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bridge;
pub mod buffer;
pub mod client;
pub mod error;
pub mod mcp;
pub mod td;
pub mod translator;

// Re-exports for convenience
pub use bridge::{BridgeConfig, McpSurface, NullSurface, ResourceAddress, WotMcpBridge};
pub use buffer::{EventBuffer, EventBufferOptions, EventRecord};
pub use client::{ProtocolClient, TdSource, TransportRegistry, WotClient, WotClientConfig};
pub use error::{Error, NotFoundError, Result, TransportError, TranslationError};
pub use td::ThingDescription;
pub use translator::{ThingTranslator, TranslatedThing};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
