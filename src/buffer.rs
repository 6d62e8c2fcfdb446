//! Event history buffer
//!
//! A bounded, per-URI, time-windowed log of observed WoT events. Pure
//! data structure: no network access, no background timers. Expired
//! records are pruned lazily on the next read of a URI, so memory for a
//! URI that is never read again is only reclaimed at its next push or
//! read; that tradeoff is deliberate.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Default maximum number of records kept per URI
pub const DEFAULT_MAX_EVENTS_PER_URI: usize = 100;

/// Default record time-to-live: one hour
pub const DEFAULT_EVENT_TTL_MS: u64 = 60 * 60 * 1000;

/// Clock source used to stamp and expire records.
///
/// Injected at construction (defaulting to `Utc::now`) so TTL behaviour
/// is testable with a simulated clock.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// One buffered event occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Insertion time, stamped by the buffer (RFC 3339 on the wire)
    pub timestamp: DateTime<Utc>,
    /// Event name as declared in the TD
    #[serde(rename = "eventType")]
    pub event_type: String,
    /// Event payload
    pub data: Value,
}

/// Buffer sizing and retention options.
#[derive(Debug, Clone)]
pub struct EventBufferOptions {
    /// Maximum records retained per URI before FIFO eviction
    pub max_events_per_uri: usize,
    /// Record time-to-live in milliseconds
    pub event_ttl_ms: u64,
}

impl Default for EventBufferOptions {
    fn default() -> Self {
        Self {
            max_events_per_uri: DEFAULT_MAX_EVENTS_PER_URI,
            event_ttl_ms: DEFAULT_EVENT_TTL_MS,
        }
    }
}

/// Aggregate statistics across all URIs.
///
/// Computed from the current, unpruned state: callers should not assume
/// fresh pruning unless they have recently read each URI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferStats {
    /// Total records across all URIs
    #[serde(rename = "totalEvents")]
    pub total_events: usize,
    /// Number of URIs with a buffer entry
    #[serde(rename = "uriCount")]
    pub uri_count: usize,
    /// Timestamp of the oldest retained record, if any
    #[serde(rename = "oldestEvent", skip_serializing_if = "Option::is_none")]
    pub oldest_event: Option<DateTime<Utc>>,
}

/// Bounded per-URI event history.
pub struct EventBuffer {
    buffers: HashMap<String, VecDeque<EventRecord>>,
    last_updated: HashMap<String, DateTime<Utc>>,
    max_events: usize,
    ttl: Duration,
    clock: Clock,
}

impl EventBuffer {
    /// Create a buffer with default options
    pub fn new() -> Self {
        Self::with_options(EventBufferOptions::default())
    }

    /// Create a buffer with explicit options
    pub fn with_options(options: EventBufferOptions) -> Self {
        Self::with_clock(options, Arc::new(Utc::now))
    }

    /// Create a buffer with an injected clock (for tests)
    pub fn with_clock(options: EventBufferOptions, clock: Clock) -> Self {
        Self {
            buffers: HashMap::new(),
            last_updated: HashMap::new(),
            max_events: options.max_events_per_uri,
            ttl: Duration::milliseconds(options.event_ttl_ms as i64),
            clock,
        }
    }

    /// Append an event, stamping it with the current time.
    ///
    /// Initializes the URI's buffer on first use and evicts the oldest
    /// record if the cap is exceeded.
    pub fn push(&mut self, uri: &str, event_type: &str, data: Value) -> EventRecord {
        let record = EventRecord {
            timestamp: (self.clock)(),
            event_type: event_type.to_string(),
            data,
        };
        let buffer = self.buffers.entry(uri.to_string()).or_default();
        buffer.push_back(record.clone());
        if buffer.len() > self.max_events {
            buffer.pop_front();
        }
        self.last_updated.insert(uri.to_string(), record.timestamp);
        record
    }

    /// All retained records for a URI, oldest first.
    ///
    /// Prunes expired records first; pruning only ever happens on read.
    pub fn get(&mut self, uri: &str) -> Vec<EventRecord> {
        self.prune_expired(uri);
        self.buffers
            .get(uri)
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Records strictly newer than the given timestamp, oldest first.
    pub fn get_since(&mut self, uri: &str, since: DateTime<Utc>) -> Vec<EventRecord> {
        self.get(uri)
            .into_iter()
            .filter(|r| r.timestamp > since)
            .collect()
    }

    /// The most recent `count` records, oldest first.
    pub fn get_recent(&mut self, uri: &str, count: usize) -> Vec<EventRecord> {
        let records = self.get(uri);
        let skip = records.len().saturating_sub(count);
        records.into_iter().skip(skip).collect()
    }

    /// Last insertion time for a URI
    pub fn last_updated(&self, uri: &str) -> Option<DateTime<Utc>> {
        self.last_updated.get(uri).copied()
    }

    /// Whether the URI has any buffered records
    pub fn has(&self, uri: &str) -> bool {
        self.buffers.get(uri).is_some_and(|b| !b.is_empty())
    }

    /// Number of buffered records for a URI
    pub fn count(&self, uri: &str) -> usize {
        self.buffers.get(uri).map_or(0, VecDeque::len)
    }

    /// All URIs with a buffer entry
    pub fn uris(&self) -> Vec<String> {
        self.buffers.keys().cloned().collect()
    }

    /// Drop all records and bookkeeping for a URI
    pub fn clear(&mut self, uri: &str) {
        self.buffers.remove(uri);
        self.last_updated.remove(uri);
    }

    /// Drop everything
    pub fn clear_all(&mut self) {
        self.buffers.clear();
        self.last_updated.clear();
    }

    /// Create an empty buffer entry so a URI is visible before its
    /// first event
    pub fn initialize(&mut self, uri: &str) {
        self.buffers.entry(uri.to_string()).or_default();
    }

    /// Aggregate statistics over the current (unpruned) state
    pub fn stats(&self) -> BufferStats {
        let total_events = self.buffers.values().map(VecDeque::len).sum();
        let oldest_event = self
            .buffers
            .values()
            .filter_map(|b| b.front())
            .map(|r| r.timestamp)
            .min();
        BufferStats {
            total_events,
            uri_count: self.buffers.len(),
            oldest_event,
        }
    }

    fn prune_expired(&mut self, uri: &str) {
        let Some(buffer) = self.buffers.get_mut(uri) else {
            return;
        };
        let cutoff = (self.clock)() - self.ttl;
        buffer.retain(|r| r.timestamp > cutoff);
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    const URI: &str = "wot://lamp-1/events/overheating";

    /// Buffer driven by a manually advanced clock.
    fn simulated() -> (EventBuffer, Arc<Mutex<DateTime<Utc>>>) {
        let now = Arc::new(Mutex::new(Utc::now()));
        let clock_now = Arc::clone(&now);
        let buffer = EventBuffer::with_clock(
            EventBufferOptions::default(),
            Arc::new(move || *clock_now.lock()),
        );
        (buffer, now)
    }

    #[test]
    fn test_push_and_get_in_order() {
        let mut buffer = EventBuffer::new();
        buffer.push(URI, "overheating", json!(1));
        buffer.push(URI, "overheating", json!(2));
        buffer.push(URI, "overheating", json!(3));

        let records = buffer.get(URI);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].data, json!(1));
        assert_eq!(records[2].data, json!(3));
    }

    #[test]
    fn test_cap_evicts_oldest_fifo() {
        let mut buffer = EventBuffer::with_options(EventBufferOptions {
            max_events_per_uri: 5,
            ..Default::default()
        });
        for i in 0..8 {
            buffer.push(URI, "tick", json!(i));
        }
        let records = buffer.get(URI);
        assert_eq!(records.len(), 5);
        // The oldest three were dropped; relative order preserved.
        let data: Vec<_> = records.iter().map(|r| r.data.clone()).collect();
        assert_eq!(data, vec![json!(3), json!(4), json!(5), json!(6), json!(7)]);
    }

    #[test]
    fn test_ttl_prunes_on_read() {
        let (mut buffer, now) = simulated();
        buffer.push(URI, "tick", json!("old"));

        // Advance past the TTL; the record is gone even though the cap
        // was never reached.
        *now.lock() += Duration::milliseconds(DEFAULT_EVENT_TTL_MS as i64 + 1);
        assert!(buffer.get(URI).is_empty());
    }

    #[test]
    fn test_ttl_pruning_is_lazy() {
        let (mut buffer, now) = simulated();
        buffer.push(URI, "tick", json!(1));
        *now.lock() += Duration::milliseconds(DEFAULT_EVENT_TTL_MS as i64 + 1);

        // Nothing read yet, so the record is still counted.
        assert_eq!(buffer.count(URI), 1);
        buffer.get(URI);
        assert_eq!(buffer.count(URI), 0);
    }

    #[test]
    fn test_get_since_is_strict() {
        let (mut buffer, now) = simulated();
        buffer.push(URI, "tick", json!(1));
        let t2 = {
            *now.lock() += Duration::seconds(1);
            buffer.push(URI, "tick", json!(2)).timestamp
        };
        *now.lock() += Duration::seconds(1);
        buffer.push(URI, "tick", json!(3));

        let since_t2 = buffer.get_since(URI, t2);
        assert_eq!(since_t2.len(), 1);
        assert_eq!(since_t2[0].data, json!(3));
    }

    #[test]
    fn test_get_recent() {
        let mut buffer = EventBuffer::new();
        for i in 0..5 {
            buffer.push(URI, "tick", json!(i));
        }
        let recent = buffer.get_recent(URI, 2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].data, json!(3));
        assert_eq!(recent[1].data, json!(4));

        // Asking for more than exists returns everything.
        assert_eq!(buffer.get_recent(URI, 99).len(), 5);
    }

    #[test]
    fn test_initialize_makes_uri_visible() {
        let mut buffer = EventBuffer::new();
        buffer.initialize(URI);
        assert!(buffer.uris().contains(&URI.to_string()));
        assert!(!buffer.has(URI));
        assert_eq!(buffer.count(URI), 0);
    }

    #[test]
    fn test_clear_and_clear_all() {
        let mut buffer = EventBuffer::new();
        buffer.push(URI, "tick", json!(1));
        buffer.push("wot://other/events/e", "e", json!(2));

        buffer.clear(URI);
        assert!(!buffer.has(URI));
        assert!(buffer.last_updated(URI).is_none());
        assert!(buffer.has("wot://other/events/e"));

        buffer.clear_all();
        assert!(buffer.uris().is_empty());
    }

    #[test]
    fn test_stats_unpruned() {
        let (mut buffer, now) = simulated();
        let first = buffer.push(URI, "tick", json!(1)).timestamp;
        *now.lock() += Duration::seconds(5);
        buffer.push("wot://other/events/e", "e", json!(2));

        let stats = buffer.stats();
        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.uri_count, 2);
        assert_eq!(stats.oldest_event, Some(first));
    }

    #[test]
    fn test_record_timestamp_serializes_rfc3339() {
        let mut buffer = EventBuffer::new();
        let record = buffer.push(URI, "tick", json!(null));
        let wire = serde_json::to_value(&record).unwrap();
        let text = wire["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(text).is_ok());
        assert_eq!(wire["eventType"], "tick");
    }
}
