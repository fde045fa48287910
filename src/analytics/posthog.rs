//! PostHog capture API sink.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;

use super::{CapturedEvent, EventSink};
use crate::{DriveError, Result};

/// Total timeout of a capture request in seconds.
const TIMEOUT_SECS: u64 = 10;

/// User agent string for capture requests.
const USER_AGENT: &str = concat!("drive/", env!("CARGO_PKG_VERSION"));

/// Sink posting events to a PostHog-compatible `/capture/` endpoint.
///
/// Each event is delivered on its own background task.
#[derive(Debug, Clone)]
pub struct PosthogSink {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl PosthogSink {
    /// Create a sink for the given host and project key.
    pub fn new(host: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DriveError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: capture_endpoint(host),
            api_key: api_key.to_string(),
        })
    }

    /// URL events are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn capture_endpoint(host: &str) -> String {
    format!("{}/capture/", host.trim_end_matches('/'))
}

impl EventSink for PosthogSink {
    fn send(&self, event: CapturedEvent) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(event = %event.event, "No async runtime, dropping analytics event");
            return;
        };

        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let body = json!({
            "api_key": self.api_key,
            "event": event.event,
            "distinct_id": event.distinct_id,
            "properties": event.properties,
        });

        runtime.spawn(async move {
            match client.post(&endpoint).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(event = %event.event, "Analytics event delivered");
                }
                Ok(response) => {
                    tracing::warn!(
                        event = %event.event,
                        status = %response.status(),
                        "Analytics endpoint rejected event"
                    );
                }
                Err(e) => {
                    tracing::warn!(event = %event.event, "Failed to deliver analytics event: {}", e);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_endpoint() {
        assert_eq!(
            capture_endpoint("https://eu.i.posthog.com"),
            "https://eu.i.posthog.com/capture/"
        );
        assert_eq!(
            capture_endpoint("http://localhost:8000/"),
            "http://localhost:8000/capture/"
        );
    }

    #[test]
    fn test_send_without_runtime_is_dropped() {
        let sink = PosthogSink::new("http://127.0.0.1:9", "key").unwrap();
        assert_eq!(sink.endpoint(), "http://127.0.0.1:9/capture/");
        sink.send(CapturedEvent {
            event: "item_created".to_string(),
            distinct_id: None,
            properties: Default::default(),
        });
    }
}
