//! Transport bindings
//!
//! The seam between the WoT client and concrete protocols. Each binding
//! implements [`ProtocolClient`]; the [`TransportRegistry`] maps a
//! form's URI scheme to the binding that serves it. The registry is
//! populated at construction time; embedders add `coap`/`mqtt` (or
//! test doubles) by registering their own client under the scheme.

use crate::error::TransportError;
use crate::td::Form;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Delay before retrying a failed subscription poll
const SUBSCRIBE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// A live protocol binding.
///
/// Implementations perform the actual network operations described by a
/// form. Errors are raw transport errors; the WoT client adds thing and
/// member context before surfacing them.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Fetch a Thing Description document from a URL
    async fn fetch_td(&self, url: &str) -> Result<Value, TransportError>;

    /// Read the value behind a form
    async fn read_form(&self, form: &Form) -> Result<Value, TransportError>;

    /// Write a value through a form
    async fn write_form(&self, form: &Form, value: &Value) -> Result<(), TransportError>;

    /// Invoke the operation behind a form, returning its output if any
    async fn invoke_form(
        &self,
        form: &Form,
        input: Option<&Value>,
    ) -> Result<Option<Value>, TransportError>;

    /// Start delivering the event stream behind a form into `tx`.
    ///
    /// Delivery runs until the returned handle is stopped; the
    /// implementation owns whatever task or connection drives it.
    async fn subscribe_form(
        &self,
        form: &Form,
        tx: mpsc::UnboundedSender<Value>,
    ) -> Result<SubscriptionHandle, TransportError>;
}

/// Handle to an active event subscription.
///
/// Owns the tasks driving delivery; `stop` aborts them all.
pub struct SubscriptionHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// Create a handle owning one task
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { tasks: vec![task] }
    }

    /// Attach another task to the same subscription lifetime
    pub fn push(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    /// Cancel the subscription
    pub fn stop(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Registry of protocol bindings keyed by URI scheme.
pub struct TransportRegistry {
    clients: HashMap<String, Arc<dyn ProtocolClient>>,
}

impl TransportRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    /// Create a registry with the built-in HTTP/HTTPS binding
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let http: Arc<dyn ProtocolClient> = Arc::new(HttpTransport::new());
        registry.register("http", Arc::clone(&http));
        registry.register("https", http);
        registry
    }

    /// Register a binding for a scheme, replacing any existing one
    pub fn register(&mut self, scheme: &str, client: Arc<dyn ProtocolClient>) {
        self.clients.insert(scheme.to_ascii_lowercase(), client);
    }

    /// The binding serving a scheme
    pub fn get(&self, scheme: &str) -> Result<Arc<dyn ProtocolClient>, TransportError> {
        self.clients
            .get(&scheme.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| TransportError::UnsupportedScheme(scheme.to_string()))
    }

    /// Registered schemes, for diagnostics
    pub fn schemes(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// HTTP/HTTPS binding backed by `reqwest`.
///
/// Reads are GETs, writes are PUTs, invocations are POSTs, each
/// overridable per form via `htv:methodName`. Event subscription is a
/// long-poll GET loop: every completed response carrying a body is one
/// event. The client carries no request timeout of its own; the WoT
/// client applies the per-operation timeout, and the poll loop must be
/// free to wait as long as the device holds the connection.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create the binding with a fresh HTTP client
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn method(form: &Form, default: reqwest::Method) -> Result<reqwest::Method, TransportError> {
        match &form.method_name {
            None => Ok(default),
            Some(name) => reqwest::Method::from_bytes(name.as_bytes())
                .map_err(|_| TransportError::Request(format!("invalid HTTP method '{}'", name))),
        }
    }

    /// Perform one request and parse the response body.
    ///
    /// Returns `None` for an empty body; a body that is not valid JSON
    /// is carried through as a JSON string rather than rejected.
    async fn request(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>, TransportError> {
        let mut request = self.client.request(method, url);
        if let Some(value) = body {
            request = request.json(value);
        }
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                message: if text.is_empty() {
                    status.canonical_reason().unwrap_or("unknown").to_string()
                } else {
                    text
                },
            });
        }

        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            serde_json::from_str(&text).unwrap_or(Value::String(text)),
        ))
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolClient for HttpTransport {
    async fn fetch_td(&self, url: &str) -> Result<Value, TransportError> {
        self.request(reqwest::Method::GET, url, None)
            .await?
            .ok_or_else(|| TransportError::Request("empty Thing Description response".to_string()))
    }

    async fn read_form(&self, form: &Form) -> Result<Value, TransportError> {
        let method = Self::method(form, reqwest::Method::GET)?;
        Ok(self
            .request(method, &form.href, None)
            .await?
            .unwrap_or(Value::Null))
    }

    async fn write_form(&self, form: &Form, value: &Value) -> Result<(), TransportError> {
        let method = Self::method(form, reqwest::Method::PUT)?;
        self.request(method, &form.href, Some(value)).await?;
        Ok(())
    }

    async fn invoke_form(
        &self,
        form: &Form,
        input: Option<&Value>,
    ) -> Result<Option<Value>, TransportError> {
        let method = Self::method(form, reqwest::Method::POST)?;
        self.request(method, &form.href, input).await
    }

    async fn subscribe_form(
        &self,
        form: &Form,
        tx: mpsc::UnboundedSender<Value>,
    ) -> Result<SubscriptionHandle, TransportError> {
        let client = self.client.clone();
        let href = form.href.clone();

        let task = tokio::spawn(async move {
            loop {
                match client.get(href.as_str()).send().await {
                    Ok(response) if response.status().is_success() => {
                        let text = response.text().await.unwrap_or_default();
                        if text.is_empty() {
                            // Poll timed out server-side with no event.
                            continue;
                        }
                        let value =
                            serde_json::from_str(&text).unwrap_or(Value::String(text));
                        if tx.send(value).is_err() {
                            debug!("event receiver for {} dropped, stopping poll", href);
                            break;
                        }
                    }
                    Ok(response) => {
                        warn!(
                            "event poll for {} answered {}, retrying",
                            href,
                            response.status()
                        );
                        tokio::time::sleep(SUBSCRIBE_RETRY_DELAY).await;
                    }
                    Err(e) => {
                        warn!("event poll for {} failed: {}, retrying", href, e);
                        tokio::time::sleep(SUBSCRIBE_RETRY_DELAY).await;
                    }
                }
            }
        });

        Ok(SubscriptionHandle::new(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_defaults_cover_http() {
        let registry = TransportRegistry::with_defaults();
        assert!(registry.get("http").is_ok());
        assert!(registry.get("https").is_ok());
        assert!(registry.get("HTTP").is_ok());
    }

    #[test]
    fn test_registry_unknown_scheme() {
        let registry = TransportRegistry::with_defaults();
        let err = registry.get("coap").err().unwrap();
        assert!(matches!(err, TransportError::UnsupportedScheme(_)));
    }

    #[test]
    fn test_registry_register_replaces() {
        let mut registry = TransportRegistry::new();
        assert!(registry.get("http").is_err());
        registry.register("http", Arc::new(HttpTransport::new()));
        assert!(registry.get("http").is_ok());
        assert_eq!(registry.schemes(), vec!["http".to_string()]);
    }

    #[test]
    fn test_method_override() {
        let form = Form {
            href: "http://device.local/act".to_string(),
            method_name: Some("PATCH".to_string()),
            ..Default::default()
        };
        let method = HttpTransport::method(&form, reqwest::Method::POST).unwrap();
        assert_eq!(method, reqwest::Method::PATCH);

        let bare = Form {
            href: "http://device.local/act".to_string(),
            ..Default::default()
        };
        assert_eq!(
            HttpTransport::method(&bare, reqwest::Method::POST).unwrap(),
            reqwest::Method::POST
        );
    }
}
