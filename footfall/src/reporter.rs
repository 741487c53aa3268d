//! Event reporting to analytics destinations.
//!
//! ## Metrics
//!
//! `events_sent`: Events accepted by a destination
//! `events_failed`: Events a destination refused or never received
//! `profiles_sent`: Profile property sets accepted by a destination
//! `profiles_failed`: Profile property sets that did not go through
//!
//! Reporting is strictly fire-and-forget: a destination failure is logged
//! and counted at this boundary and never surfaces to the visit engine.

use std::sync::{Arc, Mutex};

use metrics::counter;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::shopper::{Registered, Shopper};

/// The fixed vocabulary of reportable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventName {
    /// Shopper landed on the main page.
    MainPage,
    /// Shopper viewed an item page.
    ItemPage,
    /// Shopper put an item in the cart.
    AddToCart,
    /// Shopper checked out the cart.
    Checkout,
    /// Shopper filled in the registration form.
    Register,
}

impl EventName {
    /// The wire name of this event.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MainPage => "main page",
            Self::ItemPage => "item page",
            Self::AddToCart => "add to cart",
            Self::Checkout => "checkout",
            Self::Register => "register",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported action: who did what, with which properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Id of the shopper the event belongs to.
    pub shopper_id: Uuid,
    /// Which action happened.
    pub name: EventName,
    /// Event properties, identity fields included.
    pub properties: FxHashMap<String, Value>,
}

/// Configuration for a single analytics destination.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum SinkConfig {
    /// A mixpanel-shaped HTTP ingestion endpoint.
    Http {
        /// Base URI of the destination; `/track` and `/engage` are derived.
        uri: String,
        /// Project credential attached to every payload.
        token: String,
    },
    /// Log every event through `tracing` instead of shipping it anywhere.
    Log,
}

/// A single analytics destination.
#[derive(Debug)]
pub enum Sink {
    /// HTTP ingestion endpoint.
    Http(HttpSink),
    /// Structured-log destination.
    Log,
    /// In-memory capture, for tests and deterministic traces.
    Memory(MemorySink),
}

impl Sink {
    /// Build a sink from its configuration.
    #[must_use]
    pub fn from_config(config: &SinkConfig) -> Self {
        match config {
            SinkConfig::Http { uri, token } => Self::Http(HttpSink::new(uri, token.clone())),
            SinkConfig::Log => Self::Log,
        }
    }

    /// Build a capturing sink plus the handle that reads it back.
    #[must_use]
    pub fn memory() -> (Self, MemoryHandle) {
        let sink = MemorySink::default();
        let handle = MemoryHandle {
            events: Arc::clone(&sink.events),
            profiles: Arc::clone(&sink.profiles),
        };
        (Self::Memory(sink), handle)
    }

    async fn track(&self, event: &Event) {
        match self {
            Self::Http(sink) => sink.track(event).await,
            Self::Log => {
                debug!(shopper = %event.shopper_id, event = %event.name, "event");
                counter!("events_sent", &log_labels()).increment(1);
            }
            Self::Memory(sink) => {
                sink.events
                    .lock()
                    .expect("memory sink lock poisoned")
                    .push(event.clone());
            }
        }
    }

    async fn set_profile(&self, id: Uuid, properties: &FxHashMap<String, Value>) {
        match self {
            Self::Http(sink) => sink.set_profile(id, properties).await,
            Self::Log => {
                debug!(shopper = %id, "profile set");
                counter!("profiles_sent", &log_labels()).increment(1);
            }
            Self::Memory(sink) => {
                sink.profiles
                    .lock()
                    .expect("memory sink lock poisoned")
                    .push((id, properties.clone()));
            }
        }
    }
}

fn log_labels() -> Vec<(String, String)> {
    vec![("sink".to_string(), "log".to_string())]
}

/// A mixpanel-shaped HTTP destination.
#[derive(Debug)]
pub struct HttpSink {
    client: reqwest::Client,
    track_uri: String,
    engage_uri: String,
    token: String,
    labels: Vec<(String, String)>,
}

impl HttpSink {
    fn new(uri: &str, token: String) -> Self {
        let base = uri.trim_end_matches('/');
        Self {
            client: reqwest::Client::new(),
            track_uri: format!("{base}/track"),
            engage_uri: format!("{base}/engage"),
            token,
            labels: vec![("sink".to_string(), "http".to_string())],
        }
    }

    async fn track(&self, event: &Event) {
        let mut properties = serde_json::Map::with_capacity(event.properties.len() + 2);
        properties.insert("token".to_string(), Value::String(self.token.clone()));
        properties.insert(
            "distinct_id".to_string(),
            Value::String(event.shopper_id.to_string()),
        );
        for (key, value) in &event.properties {
            properties.insert(key.clone(), value.clone());
        }

        let body = serde_json::json!({
            "event": event.name.as_str(),
            "properties": Value::Object(properties),
        });
        self.post(&self.track_uri, &body, "events").await;
    }

    async fn set_profile(&self, id: Uuid, properties: &FxHashMap<String, Value>) {
        let set: serde_json::Map<String, Value> = properties
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let body = serde_json::json!({
            "$token": self.token,
            "$distinct_id": id.to_string(),
            "$set": Value::Object(set),
        });
        self.post(&self.engage_uri, &body, "profiles").await;
    }

    async fn post(&self, uri: &str, body: &Value, kind: &str) {
        let outcome = self
            .client
            .post(uri)
            .json(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);
        match outcome {
            Ok(_) => {
                counter!(format!("{kind}_sent"), &self.labels).increment(1);
            }
            Err(error) => {
                warn!(uri, %error, "analytics dispatch failed");
                counter!(format!("{kind}_failed"), &self.labels).increment(1);
            }
        }
    }
}

/// In-memory capture destination.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<Event>>>,
    profiles: Arc<Mutex<Vec<(Uuid, FxHashMap<String, Value>)>>>,
}

/// Read side of a [`MemorySink`].
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    events: Arc<Mutex<Vec<Event>>>,
    profiles: Arc<Mutex<Vec<(Uuid, FxHashMap<String, Value>)>>>,
}

impl MemoryHandle {
    /// Every event captured so far, in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .expect("memory sink lock poisoned")
            .clone()
    }

    /// The captured event names, in emission order.
    #[must_use]
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events()
            .into_iter()
            .map(|event| event.name.as_str())
            .collect()
    }

    /// Every profile set captured so far.
    #[must_use]
    pub fn profiles(&self) -> Vec<(Uuid, FxHashMap<String, Value>)> {
        self.profiles
            .lock()
            .expect("memory sink lock poisoned")
            .clone()
    }
}

/// Fans events out to every configured destination.
#[derive(Debug)]
pub struct Reporter {
    sinks: Vec<Sink>,
}

impl Reporter {
    /// Create a reporter over `sinks`. Zero sinks makes every call a no-op.
    #[must_use]
    pub fn new(sinks: Vec<Sink>) -> Self {
        Self { sinks }
    }

    /// Report `name` for `shopper`, merging `extra` over the shopper's own
    /// properties.
    ///
    /// Never fails; destination errors are swallowed and counted.
    pub async fn track(
        &self,
        shopper: &Shopper,
        name: EventName,
        extra: FxHashMap<String, Value>,
    ) {
        let mut properties = shopper.properties();
        properties.extend(extra);
        let event = Event {
            shopper_id: shopper.id(),
            name,
            properties,
        };
        for sink in &self.sinks {
            sink.track(&event).await;
        }
    }

    /// Push a registered shopper's profile to every destination.
    ///
    /// Called once per shopper, at registration time. Never fails.
    pub async fn set_profile(&self, registered: &Registered) {
        for sink in &self.sinks {
            sink.set_profile(registered.id(), registered.properties())
                .await;
        }
    }
}

#[cfg(test)]
mod test {
    use footfall_persona::{AgentPool, Identity};
    use rand::{SeedableRng, rngs::SmallRng};
    use rustc_hash::FxHashMap;
    use serde_json::Value;

    use super::{EventName, Reporter, Sink};
    use crate::shopper::Shopper;

    fn anonymous_shopper(seed: u64) -> Shopper {
        let mut rng = SmallRng::seed_from_u64(seed);
        let agents = AgentPool::new();
        Shopper::Anonymous(Identity::generate(&mut rng, &agents).expect("generation failed"))
    }

    #[tokio::test]
    async fn memory_sink_captures_in_order() {
        let (sink, handle) = Sink::memory();
        let reporter = Reporter::new(vec![sink]);
        let shopper = anonymous_shopper(41);

        reporter
            .track(&shopper, EventName::MainPage, FxHashMap::default())
            .await;
        let mut extra = FxHashMap::default();
        extra.insert("item".to_string(), Value::String("chaise".to_string()));
        reporter.track(&shopper, EventName::ItemPage, extra).await;

        assert_eq!(handle.event_names(), vec!["main page", "item page"]);
        let events = handle.events();
        assert_eq!(events[1].shopper_id, shopper.id());
        assert_eq!(
            events[1].properties.get("item"),
            Some(&Value::String("chaise".to_string()))
        );
        // Shopper identity fields ride along on every event.
        assert!(events[0].properties.contains_key("user_agent"));
    }

    #[tokio::test]
    async fn zero_sinks_is_a_noop() {
        let reporter = Reporter::new(Vec::new());
        let shopper = anonymous_shopper(42);
        reporter
            .track(&shopper, EventName::Checkout, FxHashMap::default())
            .await;
    }

    #[tokio::test]
    async fn transport_failure_never_propagates() {
        // Nothing listens on this port; both calls must still return.
        let sink = Sink::from_config(&super::SinkConfig::Http {
            uri: "http://127.0.0.1:9".to_string(),
            token: "t0k3n".to_string(),
        });
        let reporter = Reporter::new(vec![sink]);
        let shopper = anonymous_shopper(43);

        reporter
            .track(&shopper, EventName::MainPage, FxHashMap::default())
            .await;
    }
}
