//! Product analytics.
//!
//! Events are handed to an [`EventSink`]. Capture is a no-op when no sink
//! is configured, and delivery failures never reach the caller.

mod posthog;

pub use posthog::PosthogSink;

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::AnalyticsConfig;
use crate::db::User;
use crate::item::Item;
use crate::Result;

/// An item was marked as favorite.
pub const ITEM_FAVORITED: &str = "item_favorited";
/// An item was unmarked as favorite.
pub const ITEM_UNFAVORITED: &str = "item_unfavorited";
/// An item was created.
pub const ITEM_CREATED: &str = "item_created";

/// An event ready to be delivered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapturedEvent {
    /// Event name.
    pub event: String,
    /// Identity of the user (email), None for anonymous callers.
    pub distinct_id: Option<String>,
    /// Event properties.
    pub properties: Map<String, Value>,
}

/// Destination of captured events.
pub trait EventSink: Send + Sync {
    /// Deliver an event. Must not block the caller on network I/O.
    fn send(&self, event: CapturedEvent);
}

/// Analytics entry point shared by request handlers.
#[derive(Clone, Default)]
pub struct Analytics {
    sink: Option<Arc<dyn EventSink>>,
}

impl std::fmt::Debug for Analytics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analytics")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl Analytics {
    /// Analytics that drop every event.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Analytics delivering to `sink`.
    pub fn with_sink(sink: Arc<dyn EventSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Build analytics from configuration.
    ///
    /// Disabled unless a capture key is configured.
    pub fn from_config(config: &AnalyticsConfig) -> Result<Self> {
        if config.posthog_key.is_empty() {
            tracing::info!("Analytics disabled (no capture key configured)");
            return Ok(Self::disabled());
        }

        let sink = PosthogSink::new(&config.posthog_host, &config.posthog_key)?;
        tracing::info!(host = %config.posthog_host, "Analytics enabled");
        Ok(Self::with_sink(Arc::new(sink)))
    }

    /// Whether events are delivered anywhere.
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Capture an event.
    ///
    /// With an item, its `item_id`, `item_title`, `item_size`,
    /// `item_mimetype` and `item_type` are added to the properties.
    pub fn capture(
        &self,
        event: &str,
        user: Option<&User>,
        properties: Map<String, Value>,
        item: Option<&Item>,
    ) {
        let Some(sink) = &self.sink else {
            return;
        };

        let mut properties = properties;
        if let Some(item) = item {
            properties.insert("item_id".into(), Value::from(item.id.clone()));
            properties.insert("item_title".into(), Value::from(item.title.clone()));
            properties.insert("item_size".into(), Value::from(item.size));
            properties.insert("item_mimetype".into(), Value::from(item.mimetype.clone()));
            properties.insert("item_type".into(), Value::from(item.item_type.as_str()));
        }

        sink.send(CapturedEvent {
            event: event.to_string(),
            distinct_id: user.and_then(|u| u.email.clone()),
            properties,
        });
    }
}

/// Sink keeping events in memory, for tests and local inspection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<CapturedEvent>>,
}

impl RecordingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Names of the events received so far.
    pub fn event_names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.event).collect()
    }
}

impl EventSink for RecordingSink {
    fn send(&self, event: CapturedEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
