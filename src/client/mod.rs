//! WoT client
//!
//! Manages the live connections backing translated things: TD
//! consumption, property reads/writes, action invocations, and event
//! subscriptions, abstracted over transport bindings through the
//! [`TransportRegistry`].

pub mod transport;

pub use transport::{HttpTransport, ProtocolClient, SubscriptionHandle, TransportRegistry};

use crate::error::{Error, NotFoundError, Result, TransportError};
use crate::td::ThingDescription;
use crate::translator::ThingTranslator;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, instrument};

/// Callback invoked once per emitted event, with the event name and the
/// already-unwrapped payload.
pub type EventCallback = Arc<dyn Fn(String, Value) -> BoxFuture<'static, ()> + Send + Sync>;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct WotClientConfig {
    /// Per-operation timeout for transport calls, in milliseconds.
    ///
    /// Applies to TD fetches, reads, writes, invocations, and
    /// subscription setup, not to the lifetime of an established
    /// subscription.
    pub timeout_ms: u64,
}

impl Default for WotClientConfig {
    fn default() -> Self {
        Self { timeout_ms: 30_000 }
    }
}

impl WotClientConfig {
    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// A Thing Description to consume: a URL to fetch it from, or the
/// document itself.
#[derive(Debug, Clone)]
pub enum TdSource {
    /// Fetch the TD from this URL
    Url(String),
    /// Use this in-memory TD
    Description(ThingDescription),
}

impl From<ThingDescription> for TdSource {
    fn from(td: ThingDescription) -> Self {
        TdSource::Description(td)
    }
}

impl From<&str> for TdSource {
    fn from(url: &str) -> Self {
        TdSource::Url(url.to_string())
    }
}

impl From<String> for TdSource {
    fn from(url: String) -> Self {
        TdSource::Url(url)
    }
}

/// A consumed thing: the parsed TD plus its derived id.
#[derive(Debug, Clone)]
pub struct ConsumedThing {
    /// Derived thing id (same rule the translator uses)
    pub id: String,
    /// The parsed Thing Description
    pub td: ThingDescription,
}

/// Manages live connections to WoT things.
pub struct WotClient {
    registry: Arc<TransportRegistry>,
    config: WotClientConfig,
    things: RwLock<HashMap<String, Arc<ConsumedThing>>>,
    subscriptions: RwLock<HashMap<String, HashMap<String, SubscriptionHandle>>>,
    started: AtomicBool,
}

impl WotClient {
    /// Create a client with the built-in HTTP/HTTPS binding
    pub fn new(config: WotClientConfig) -> Self {
        Self::with_registry(TransportRegistry::with_defaults(), config)
    }

    /// Create a client with an explicit transport registry
    pub fn with_registry(registry: TransportRegistry, config: WotClientConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
            things: RwLock::new(HashMap::new()),
            subscriptions: RwLock::new(HashMap::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Initialize the client. Subsequent calls are no-ops.
    pub async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!(
            "WoT client started, transports: {:?}",
            self.registry.schemes()
        );
        Ok(())
    }

    /// Stop the client: cancel every active event subscription, clear
    /// internal maps, and release the transport runtime.
    ///
    /// Cancellation is best-effort: every subscription is attempted
    /// regardless of earlier ones.
    pub async fn stop(&self) {
        let drained: Vec<_> = {
            let mut subs = self.subscriptions.write().await;
            subs.drain().collect()
        };
        for (thing_id, events) in drained {
            for (event, handle) in events {
                debug!("Cancelling subscription {}.{}", thing_id, event);
                handle.stop();
            }
        }
        self.things.write().await.clear();
        self.started.store(false, Ordering::SeqCst);
        info!("WoT client stopped");
    }

    /// Whether `start` has run (and `stop` has not)
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Consume a thing from its TD URL or an in-memory TD.
    ///
    /// Starts the client if needed, derives the thing id, and stores
    /// the handle keyed by it. Consuming a TD that derives an id
    /// already in use replaces the prior handle; cleaning up the prior
    /// handle's subscriptions is the caller's concern (the bridge does
    /// this via resubscription).
    #[instrument(skip(self, source))]
    pub async fn consume(&self, source: impl Into<TdSource>) -> Result<Arc<ConsumedThing>> {
        if !self.is_started() {
            self.start().await?;
        }

        let td = match source.into() {
            TdSource::Description(td) => td,
            TdSource::Url(url) => {
                let scheme = url::Url::parse(&url)
                    .map_err(|e| Error::Generic(format!("Invalid TD URL '{}': {}", url, e)))?
                    .scheme()
                    .to_string();
                let transport = self.registry.get(&scheme)?;
                let value = self
                    .with_timeout(transport.fetch_td(&url))
                    .await
                    .map_err(|e| TransportError::TdFetch {
                        url: url.clone(),
                        message: e.to_string(),
                    })?;
                ThingDescription::from_value(value)?
            }
        };

        let id = ThingTranslator::derive_thing_id(&td)?;
        let thing = Arc::new(ConsumedThing { id: id.clone(), td });
        let prev = self
            .things
            .write()
            .await
            .insert(id.clone(), Arc::clone(&thing));
        if prev.is_some() {
            debug!("Replaced consumed thing: {}", id);
        } else {
            debug!("Consumed thing: {}", id);
        }
        Ok(thing)
    }

    /// The consumed thing for an id, if any
    pub async fn thing(&self, thing_id: &str) -> Option<Arc<ConsumedThing>> {
        self.things.read().await.get(thing_id).cloned()
    }

    /// Ids of all consumed things
    pub async fn thing_ids(&self) -> Vec<String> {
        self.things.read().await.keys().cloned().collect()
    }

    /// Number of active event subscriptions for a thing
    pub async fn subscription_count(&self, thing_id: &str) -> usize {
        self.subscriptions
            .read()
            .await
            .get(thing_id)
            .map_or(0, HashMap::len)
    }

    /// Read a property value from the live device.
    #[instrument(skip(self))]
    pub async fn read_property(&self, thing_id: &str, property: &str) -> Result<Value> {
        let thing = self.thing_or_not_found(thing_id).await?;
        let affordance =
            thing
                .td
                .properties
                .get(property)
                .ok_or_else(|| NotFoundError::Property {
                    thing_id: thing_id.to_string(),
                    property: property.to_string(),
                })?;
        let (transport, form) =
            self.resolve_form(thing_id, property, &affordance.forms, "readproperty")?;

        let value = self
            .with_timeout(transport.read_form(&form))
            .await
            .map_err(|e| TransportError::Read {
                thing_id: thing_id.to_string(),
                member: property.to_string(),
                message: e.to_string(),
            })?;
        debug!("Read property {}.{}", thing_id, property);
        Ok(value)
    }

    /// Write a property value to the live device.
    #[instrument(skip(self, value))]
    pub async fn write_property(&self, thing_id: &str, property: &str, value: Value) -> Result<()> {
        let thing = self.thing_or_not_found(thing_id).await?;
        let affordance =
            thing
                .td
                .properties
                .get(property)
                .ok_or_else(|| NotFoundError::Property {
                    thing_id: thing_id.to_string(),
                    property: property.to_string(),
                })?;
        let (transport, form) =
            self.resolve_form(thing_id, property, &affordance.forms, "writeproperty")?;

        self.with_timeout(transport.write_form(&form, &value))
            .await
            .map_err(|e| TransportError::Write {
                thing_id: thing_id.to_string(),
                member: property.to_string(),
                message: e.to_string(),
            })?;
        debug!("Wrote property {}.{}", thing_id, property);
        Ok(())
    }

    /// Invoke an action on the live device.
    ///
    /// Returns `None` when the action produces no output; that is not
    /// an error.
    #[instrument(skip(self, params))]
    pub async fn invoke_action(
        &self,
        thing_id: &str,
        action: &str,
        params: Option<Value>,
    ) -> Result<Option<Value>> {
        let thing = self.thing_or_not_found(thing_id).await?;
        let affordance = thing
            .td
            .actions
            .get(action)
            .ok_or_else(|| NotFoundError::Action {
                thing_id: thing_id.to_string(),
                action: action.to_string(),
            })?;
        let (transport, form) =
            self.resolve_form(thing_id, action, &affordance.forms, "invokeaction")?;

        let output = self
            .with_timeout(transport.invoke_form(&form, params.as_ref()))
            .await
            .map_err(|e| TransportError::Invoke {
                thing_id: thing_id.to_string(),
                member: action.to_string(),
                message: e.to_string(),
            })?;
        debug!("Invoked action {}.{}", thing_id, action);
        Ok(output)
    }

    /// Subscribe to one event.
    ///
    /// Idempotent per (thing, event): an existing subscription is
    /// cancelled first, then replaced.
    #[instrument(skip(self, callback))]
    pub async fn subscribe_event(
        &self,
        thing_id: &str,
        event: &str,
        callback: EventCallback,
    ) -> Result<()> {
        let thing = self.thing_or_not_found(thing_id).await?;
        let affordance = thing
            .td
            .events
            .get(event)
            .ok_or_else(|| NotFoundError::Event {
                thing_id: thing_id.to_string(),
                event: event.to_string(),
            })?;
        let (transport, form) =
            self.resolve_form(thing_id, event, &affordance.forms, "subscribeevent")?;

        if let Some(existing) = self
            .subscriptions
            .write()
            .await
            .get_mut(thing_id)
            .and_then(|events| events.remove(event))
        {
            debug!("Replacing subscription {}.{}", thing_id, event);
            existing.stop();
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handle = self
            .with_timeout(transport.subscribe_form(&form, tx))
            .await
            .map_err(|e| TransportError::Subscribe {
                thing_id: thing_id.to_string(),
                member: event.to_string(),
                message: e.to_string(),
            })?;

        let event_name = event.to_string();
        let forward_thing = thing_id.to_string();
        handle.push(tokio::spawn(async move {
            while let Some(value) = rx.recv().await {
                debug!("Received event {}.{}", forward_thing, event_name);
                callback(event_name.clone(), value).await;
            }
        }));

        self.subscriptions
            .write()
            .await
            .entry(thing_id.to_string())
            .or_default()
            .insert(event.to_string(), handle);
        debug!("Subscribed to event {}.{}", thing_id, event);
        Ok(())
    }

    /// Subscribe to every event declared in the thing's TD.
    ///
    /// A TD without events is a no-op, not an error.
    pub async fn subscribe_all_events(
        &self,
        thing_id: &str,
        callback: EventCallback,
    ) -> Result<()> {
        let thing = self.thing_or_not_found(thing_id).await?;
        let events: Vec<String> = thing.td.events.keys().cloned().collect();
        for event in events {
            self.subscribe_event(thing_id, &event, Arc::clone(&callback))
                .await?;
        }
        Ok(())
    }

    /// Cancel one subscription. Absent subscriptions are a no-op.
    pub async fn unsubscribe_event(&self, thing_id: &str, event: &str) {
        let removed = self
            .subscriptions
            .write()
            .await
            .get_mut(thing_id)
            .and_then(|events| events.remove(event));
        if let Some(handle) = removed {
            debug!("Unsubscribed from event {}.{}", thing_id, event);
            handle.stop();
        }
    }

    async fn thing_or_not_found(&self, thing_id: &str) -> Result<Arc<ConsumedThing>> {
        self.things
            .read()
            .await
            .get(thing_id)
            .cloned()
            .ok_or_else(|| NotFoundError::Thing(thing_id.to_string()).into())
    }

    /// Pick the form serving `op` (first match, falling back to the
    /// first form) and the transport its scheme maps to.
    fn resolve_form(
        &self,
        thing_id: &str,
        member: &str,
        forms: &[crate::td::Form],
        op: &str,
    ) -> Result<(Arc<dyn ProtocolClient>, crate::td::Form)> {
        let form = forms
            .iter()
            .find(|f| f.serves(op))
            .or_else(|| forms.first())
            .ok_or_else(|| TransportError::NoForm {
                thing_id: thing_id.to_string(),
                member: member.to_string(),
            })?;
        let scheme = form.scheme().ok_or_else(|| {
            TransportError::Request(format!("Invalid form href '{}'", form.href))
        })?;
        let transport = self.registry.get(&scheme)?;
        Ok((transport, form.clone()))
    }

    async fn with_timeout<T>(
        &self,
        operation: impl Future<Output = std::result::Result<T, TransportError>>,
    ) -> std::result::Result<T, TransportError> {
        match tokio::time::timeout(self.config.timeout(), operation).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.config.timeout_ms)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    /// Transport double answering canned values under the `mock` scheme.
    struct MockTransport;

    #[async_trait]
    impl ProtocolClient for MockTransport {
        async fn fetch_td(&self, _url: &str) -> std::result::Result<Value, TransportError> {
            Err(TransportError::Request("no TDs here".to_string()))
        }

        async fn read_form(
            &self,
            _form: &crate::td::Form,
        ) -> std::result::Result<Value, TransportError> {
            Ok(json!(21.5))
        }

        async fn write_form(
            &self,
            _form: &crate::td::Form,
            _value: &Value,
        ) -> std::result::Result<(), TransportError> {
            Ok(())
        }

        async fn invoke_form(
            &self,
            _form: &crate::td::Form,
            _input: Option<&Value>,
        ) -> std::result::Result<Option<Value>, TransportError> {
            Ok(None)
        }

        async fn subscribe_form(
            &self,
            _form: &crate::td::Form,
            _tx: mpsc::UnboundedSender<Value>,
        ) -> std::result::Result<SubscriptionHandle, TransportError> {
            Ok(SubscriptionHandle::new(tokio::spawn(async {
                futures::future::pending::<()>().await;
            })))
        }
    }

    fn mock_client() -> WotClient {
        let mut registry = TransportRegistry::new();
        registry.register("mock", Arc::new(MockTransport));
        WotClient::with_registry(registry, WotClientConfig::default())
    }

    fn sensor_td() -> ThingDescription {
        ThingDescription::from_value(json!({
            "title": "Sensor",
            "properties": {
                "temperature": {
                    "type": "number",
                    "readOnly": true,
                    "forms": [{"href": "mock://sensor/temperature"}]
                }
            },
            "actions": {
                "calibrate": { "forms": [{"href": "mock://sensor/calibrate"}] }
            },
            "events": {
                "alarm": { "forms": [{"href": "mock://sensor/alarm"}] }
            }
        }))
        .unwrap()
    }

    fn noop_callback() -> EventCallback {
        use futures::FutureExt;
        Arc::new(|_, _| async {}.boxed())
    }

    #[tokio::test]
    async fn test_consume_derives_and_stores() {
        let client = mock_client();
        let thing = client.consume(sensor_td()).await.unwrap();
        assert_eq!(thing.id, "sensor");
        assert!(client.is_started());
        assert!(client.thing("sensor").await.is_some());
    }

    #[tokio::test]
    async fn test_unknown_thing_is_not_found() {
        let client = mock_client();
        let err = client.read_property("ghost", "temperature").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unknown_property_is_not_found() {
        let client = mock_client();
        client.consume(sensor_td()).await.unwrap();
        let err = client.read_property("sensor", "humidity").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("humidity"));
    }

    #[tokio::test]
    async fn test_read_property_unwraps_value() {
        let client = mock_client();
        client.consume(sensor_td()).await.unwrap();
        let value = client.read_property("sensor", "temperature").await.unwrap();
        assert_eq!(value, json!(21.5));
    }

    #[tokio::test]
    async fn test_invoke_action_without_output() {
        let client = mock_client();
        client.consume(sensor_td()).await.unwrap();
        let output = client.invoke_action("sensor", "calibrate", None).await.unwrap();
        assert!(output.is_none());
    }

    #[tokio::test]
    async fn test_missing_form_is_transport_error_at_use_time() {
        let client = mock_client();
        let mut td = sensor_td();
        td.properties.get_mut("temperature").unwrap().forms.clear();
        client.consume(td).await.unwrap();

        let err = client.read_property("sensor", "temperature").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::NoForm { .. })
        ));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let client = mock_client();
        let mut td = sensor_td();
        td.properties.get_mut("temperature").unwrap().forms[0].href =
            "coap://sensor/temperature".to_string();
        client.consume(td).await.unwrap();

        let err = client.read_property("sensor", "temperature").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Transport(TransportError::UnsupportedScheme(_))
        ));
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent_per_event() {
        let client = mock_client();
        client.consume(sensor_td()).await.unwrap();

        client
            .subscribe_event("sensor", "alarm", noop_callback())
            .await
            .unwrap();
        client
            .subscribe_event("sensor", "alarm", noop_callback())
            .await
            .unwrap();
        assert_eq!(client.subscription_count("sensor").await, 1);
    }

    #[tokio::test]
    async fn test_subscribe_all_without_events_is_noop() {
        let client = mock_client();
        client
            .consume(
                ThingDescription::from_value(json!({"title": "Eventless"})).unwrap(),
            )
            .await
            .unwrap();
        client
            .subscribe_all_events("eventless", noop_callback())
            .await
            .unwrap();
        assert_eq!(client.subscription_count("eventless").await, 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_absent_is_noop() {
        let client = mock_client();
        client.consume(sensor_td()).await.unwrap();
        client.unsubscribe_event("sensor", "alarm").await;
    }

    #[tokio::test]
    async fn test_stop_clears_state() {
        let client = mock_client();
        client.consume(sensor_td()).await.unwrap();
        client
            .subscribe_event("sensor", "alarm", noop_callback())
            .await
            .unwrap();

        client.stop().await;
        assert!(!client.is_started());
        assert!(client.thing("sensor").await.is_none());
        assert_eq!(client.subscription_count("sensor").await, 0);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let client = mock_client();
        client.start().await.unwrap();
        client.start().await.unwrap();
        assert!(client.is_started());
    }
}
