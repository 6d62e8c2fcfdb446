//! Bridge orchestrator
//!
//! Ties the WoT client, the translator, and the event buffer together
//! behind the registration surface the external MCP machinery
//! implements. The bridge owns the authoritative map of bridged things,
//! drives the add-thing pipeline, and relays device events into the
//! buffer and outward as resource-updated notifications.

use crate::buffer::{BufferStats, EventBuffer, EventBufferOptions, EventRecord};
use crate::client::{EventCallback, TdSource, WotClient, WotClientConfig};
use crate::error::{Error, NotFoundError, Result};
use crate::mcp::types::{McpResourceContent, ToolCallResult};
use crate::translator::{ThingTranslator, ToolTarget, TranslatedAction, TranslatedThing};
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

/// The registration and notification contract of the external MCP
/// server machinery.
///
/// The bridge never touches MCP protocol state directly; it registers
/// translated things and signals changes through this trait, and the
/// surface answers MCP requests by calling back into the bridge
/// ([`WotMcpBridge::read_property`], [`WotMcpBridge::write_property`],
/// [`WotMcpBridge::invoke_action`], [`WotMcpBridge::call_tool`],
/// [`WotMcpBridge::read_resource`]).
#[async_trait]
pub trait McpSurface: Send + Sync {
    /// Begin accepting MCP requests
    async fn start(&self) -> Result<()>;

    /// Stop accepting MCP requests
    async fn stop(&self) -> Result<()>;

    /// Expose a translated thing's tools and resources
    async fn register_thing(&self, thing: &TranslatedThing) -> Result<()>;

    /// Tell clients the resource list changed
    async fn notify_resource_list_changed(&self) -> Result<()>;

    /// Tell clients a resource's content changed
    async fn notify_resource_updated(&self, uri: &str) -> Result<()>;
}

/// Surface that accepts everything and notifies no one.
///
/// Useful for embedding the bridge without an MCP server and as a test
/// stand-in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSurface;

#[async_trait]
impl McpSurface for NullSurface {
    async fn start(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    async fn register_thing(&self, _thing: &TranslatedThing) -> Result<()> {
        Ok(())
    }

    async fn notify_resource_list_changed(&self) -> Result<()> {
        Ok(())
    }

    async fn notify_resource_updated(&self, _uri: &str) -> Result<()> {
        Ok(())
    }
}

/// Bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Bridge name reported to the MCP surface
    pub name: String,
    /// Bridge version reported to the MCP surface
    pub version: String,
    /// Event buffer sizing and retention
    pub buffer: EventBufferOptions,
    /// WoT client settings
    pub client: WotClientConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            buffer: EventBufferOptions::default(),
            client: WotClientConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Create a new config builder
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }
}

/// Builder for [`BridgeConfig`]
#[derive(Default)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    /// Set the bridge name
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the bridge version
    pub fn version<S: Into<String>>(mut self, version: S) -> Self {
        self.config.version = version.into();
        self
    }

    /// Set the maximum buffered events per resource URI
    pub fn max_events_per_uri(mut self, max: usize) -> Self {
        self.config.buffer.max_events_per_uri = max;
        self
    }

    /// Set the buffered-event time-to-live
    pub fn event_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.config.buffer.event_ttl_ms = ttl_ms;
        self
    }

    /// Set the per-operation transport timeout
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.client.timeout_ms = timeout_ms;
        self
    }

    /// Build the config
    pub fn build(self) -> BridgeConfig {
        self.config
    }
}

/// A parsed `wot://` resource URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceAddress {
    /// `wot://{thingId}/properties/{name}`, read live from the device
    Property {
        /// Thing id from the URI authority
        thing_id: String,
        /// Property name
        name: String,
    },
    /// `wot://{thingId}/events/{name}`, served from buffered history
    Event {
        /// Thing id from the URI authority
        thing_id: String,
        /// Event name
        name: String,
    },
}

impl ResourceAddress {
    /// Parse a resource URI, rejecting anything outside the `wot://`
    /// scheme and the two known path shapes.
    pub fn parse(uri: &str) -> Result<Self> {
        let parsed = uri.strip_prefix("wot://").and_then(|rest| {
            let mut parts = rest.splitn(3, '/');
            let thing_id = parts.next().filter(|s| !s.is_empty())?;
            let kind = parts.next()?;
            let name = parts.next().filter(|s| !s.is_empty())?;
            match kind {
                "properties" => Some(ResourceAddress::Property {
                    thing_id: thing_id.to_string(),
                    name: name.to_string(),
                }),
                "events" => Some(ResourceAddress::Event {
                    thing_id: thing_id.to_string(),
                    name: name.to_string(),
                }),
                _ => None,
            }
        });
        parsed.ok_or_else(|| NotFoundError::Resource(uri.to_string()).into())
    }
}

/// Orchestrator bridging WoT things into MCP.
pub struct WotMcpBridge {
    client: WotClient,
    translator: ThingTranslator,
    surface: Arc<dyn McpSurface>,
    things: RwLock<HashMap<String, TranslatedThing>>,
    events: Arc<Mutex<EventBuffer>>,
    config: BridgeConfig,
}

impl WotMcpBridge {
    /// Create a bridge with the built-in HTTP transport
    pub fn new(config: BridgeConfig, surface: Arc<dyn McpSurface>) -> Self {
        let client = WotClient::new(config.client.clone());
        Self::with_client(client, config, surface)
    }

    /// Create a bridge around an explicit WoT client (custom transport
    /// registry)
    pub fn with_client(
        client: WotClient,
        config: BridgeConfig,
        surface: Arc<dyn McpSurface>,
    ) -> Self {
        let events = Arc::new(Mutex::new(EventBuffer::with_options(config.buffer.clone())));
        Self {
            client,
            translator: ThingTranslator::new(),
            surface,
            things: RwLock::new(HashMap::new()),
            events,
            config,
        }
    }

    /// The bridge configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The underlying WoT client
    pub fn client(&self) -> &WotClient {
        &self.client
    }

    /// Start the bridge: the WoT client first, then the MCP surface.
    ///
    /// The order matters: the surface may begin answering requests
    /// about things immediately, so the client must already be usable.
    pub async fn start(&self) -> Result<()> {
        self.client.start().await?;
        self.surface.start().await?;
        info!("{} v{} started", self.config.name, self.config.version);
        Ok(())
    }

    /// Stop the bridge: the MCP surface first (no new requests), then
    /// the WoT client unconditionally, so device connections are
    /// released even if the MCP layer misbehaves during shutdown.
    pub async fn stop(&self) -> Result<()> {
        if let Err(e) = self.surface.stop().await {
            error!("Error stopping MCP surface: {}", e);
        }
        self.client.stop().await;
        info!("Bridge stopped");
        Ok(())
    }

    /// Add a thing to the bridge.
    ///
    /// Runs consume → translate → register → subscribe (optional) and
    /// finally signals that the resource list changed. A consume or
    /// translation failure propagates and leaves the bridge's map
    /// untouched. Re-adding a thing whose TD derives an id already in
    /// use replaces the prior entry wholesale (last write wins).
    #[instrument(skip(self, source))]
    pub async fn add_thing(
        &self,
        source: impl Into<TdSource>,
        subscribe_to_events: bool,
    ) -> Result<TranslatedThing> {
        let consumed = self.client.consume(source).await?;
        let translated = self.translator.translate(&consumed.td)?;

        {
            let mut things = self.things.write().await;
            if let Some(prev) = things.insert(translated.id.clone(), translated.clone()) {
                warn!(
                    "Replacing bridged thing '{}' (previously '{}')",
                    translated.id, prev.title
                );
            }
        }

        // Event URIs become visible before their first event arrives.
        {
            let mut buffer = self.events.lock();
            for event in &translated.events {
                buffer.initialize(&event.uri);
            }
        }

        self.surface.register_thing(&translated).await?;

        if subscribe_to_events && !consumed.td.events.is_empty() {
            let callback = self.event_callback(translated.id.clone());
            self.client
                .subscribe_all_events(&translated.id, callback)
                .await?;
        }

        self.surface.notify_resource_list_changed().await?;
        info!(
            "Added thing '{}': {} resources, {} tools",
            translated.id,
            translated.resources().len(),
            translated.tools().len()
        );
        Ok(translated)
    }

    /// Add several things sequentially.
    ///
    /// The first failure aborts the remainder; things added before the
    /// failure stay registered (no rollback).
    pub async fn add_things<I>(&self, sources: I) -> Result<Vec<TranslatedThing>>
    where
        I: IntoIterator,
        I::Item: Into<TdSource>,
    {
        let mut results = Vec::new();
        for source in sources {
            results.push(self.add_thing(source, true).await?);
        }
        Ok(results)
    }

    /// All bridged things
    pub async fn things(&self) -> Vec<TranslatedThing> {
        self.things.read().await.values().cloned().collect()
    }

    /// One bridged thing by id
    pub async fn thing(&self, thing_id: &str) -> Option<TranslatedThing> {
        self.things.read().await.get(thing_id).cloned()
    }

    /// Read a property from the live device (MCP surface callback)
    pub async fn read_property(&self, thing_id: &str, property: &str) -> Result<Value> {
        self.client.read_property(thing_id, property).await
    }

    /// Write a property to the live device (MCP surface callback)
    pub async fn write_property(&self, thing_id: &str, property: &str, value: Value) -> Result<()> {
        self.client.write_property(thing_id, property, value).await
    }

    /// Invoke an action on the live device (MCP surface callback)
    pub async fn invoke_action(
        &self,
        thing_id: &str,
        action: &str,
        params: Option<Value>,
    ) -> Result<Option<Value>> {
        self.client.invoke_action(thing_id, action, params).await
    }

    /// Execute a tool call.
    ///
    /// Resolves the tool name against the bridged things, dispatches
    /// the tagged operation through the WoT client, and reports any
    /// failure as a structured error payload inside the result (never
    /// as an `Err`), so the MCP surface always has a well-formed result
    /// to return.
    #[instrument(skip(self, args))]
    pub async fn call_tool(&self, name: &str, args: Value) -> ToolCallResult {
        let tool = {
            let things = self.things.read().await;
            things.values().find_map(|t| t.tool(name).cloned())
        };
        let Some(tool) = tool else {
            let err: Error = NotFoundError::Tool(name.to_string()).into();
            return ToolCallResult::error(err.to_string());
        };

        info!("Executing tool: {}", name);
        match self.dispatch_tool(&tool, args).await {
            Ok(value) => ToolCallResult::json(&value),
            Err(e) => {
                error!("Tool {} failed: {}", name, e);
                ToolCallResult::error(e.to_string())
            }
        }
    }

    async fn dispatch_tool(&self, tool: &TranslatedAction, args: Value) -> Result<Value> {
        match tool.target {
            ToolTarget::Action => {
                let params = if tool.input_wrapped {
                    // The translator wrapped a scalar input schema; the
                    // device expects the bare value back.
                    match args.get("value") {
                        Some(value) => Some(value.clone()),
                        None => return Err(Error::generic("Missing required parameter: value")),
                    }
                } else if args.is_null() {
                    None
                } else {
                    Some(args)
                };
                let output = self
                    .client
                    .invoke_action(&tool.thing_id, &tool.wot_name, params)
                    .await?;
                Ok(output.unwrap_or_else(|| json!({ "status": "success" })))
            }
            ToolTarget::PropertyWrite => {
                let value = match args.get(&tool.wot_name) {
                    Some(value) => value.clone(),
                    None => args,
                };
                self.client
                    .write_property(&tool.thing_id, &tool.wot_name, value)
                    .await?;
                Ok(json!({ "status": "success" }))
            }
            ToolTarget::PropertyRead => {
                self.client
                    .read_property(&tool.thing_id, &tool.wot_name)
                    .await
            }
        }
    }

    /// Read a `wot://` resource.
    ///
    /// Property URIs perform a live read against the device; event URIs
    /// are served from the buffer only, never a live transport call.
    pub async fn read_resource(&self, uri: &str) -> Result<McpResourceContent> {
        match ResourceAddress::parse(uri)? {
            ResourceAddress::Property { thing_id, name } => {
                let value = self.client.read_property(&thing_id, &name).await?;
                Ok(McpResourceContent::json(uri, &value))
            }
            ResourceAddress::Event { .. } => {
                let records = self.events.lock().get(uri);
                Ok(McpResourceContent::json(uri, &serde_json::to_value(records)?))
            }
        }
    }

    /// Manually inject an event, going through the same buffer/notify
    /// path as a live subscription delivery.
    pub async fn push_event(&self, thing_id: &str, event: &str, data: Value) -> Result<EventRecord> {
        let uri = format!("wot://{}/events/{}", thing_id, event);
        let record = self.events.lock().push(&uri, event, data);
        self.surface.notify_resource_updated(&uri).await?;
        Ok(record)
    }

    /// Buffered history for an event resource URI, oldest first
    pub fn event_history(&self, uri: &str) -> Vec<EventRecord> {
        self.events.lock().get(uri)
    }

    /// Aggregate event buffer statistics
    pub fn buffer_stats(&self) -> BufferStats {
        self.events.lock().stats()
    }

    /// Build the per-thing callback wired into event subscriptions:
    /// buffer the payload under the event's resource URI and signal a
    /// resource update. Failures are logged and swallowed so one bad
    /// delivery never terminates the stream.
    fn event_callback(&self, thing_id: String) -> EventCallback {
        let buffer = Arc::clone(&self.events);
        let surface = Arc::clone(&self.surface);
        Arc::new(move |event_name: String, data: Value| {
            let uri = format!("wot://{}/events/{}", thing_id, event_name);
            let buffer = Arc::clone(&buffer);
            let surface = Arc::clone(&surface);
            async move {
                buffer.lock().push(&uri, &event_name, data);
                debug!("Buffered event {}", uri);
                if let Err(e) = surface.notify_resource_updated(&uri).await {
                    warn!("Resource-updated notification for {} failed: {}", uri, e);
                }
            }
            .boxed()
        })
    }
}
