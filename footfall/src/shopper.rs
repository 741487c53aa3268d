//! Shopper representations.
//!
//! A visit is driven either by an anonymous shopper -- an identity that
//! lives for one visit only -- or by a registered shopper pulled from the
//! shared registry. The two are an explicit tagged variant; code branches on
//! the variant, never on runtime type identity.

use std::sync::Arc;

use footfall_persona::Identity;
use rustc_hash::FxHashMap;
use serde_json::Value;
use uuid::Uuid;

/// A shopper that completed registration.
///
/// Identity fields are fixed at creation; the property bag carries both the
/// base identity properties and the demographic profile merged in at
/// registration time.
#[derive(Debug, Clone, PartialEq)]
pub struct Registered {
    identity: Identity,
    properties: FxHashMap<String, Value>,
}

impl Registered {
    pub(crate) fn new(identity: Identity, properties: FxHashMap<String, Value>) -> Self {
        Self {
            identity,
            properties,
        }
    }

    /// The shopper's stable identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.identity.id
    }

    /// The shopper's fixed identity fields.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The full property bag: identity plus demographics.
    #[must_use]
    pub fn properties(&self) -> &FxHashMap<String, Value> {
        &self.properties
    }
}

/// The shopper driving a visit.
#[derive(Debug, Clone)]
pub enum Shopper {
    /// An unregistered shopper, discarded when the visit ends.
    Anonymous(Identity),
    /// A registered shopper shared through the registry.
    Registered(Arc<Registered>),
}

impl Shopper {
    /// The shopper's stable identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            Self::Anonymous(identity) => identity.id,
            Self::Registered(registered) => registered.id(),
        }
    }

    /// True for the registered variant.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered(_))
    }

    /// Properties reported with every event this shopper emits.
    ///
    /// Anonymous shoppers carry only their identity fields; registered
    /// shoppers carry their full merged bag.
    #[must_use]
    pub fn properties(&self) -> FxHashMap<String, Value> {
        match self {
            Self::Anonymous(identity) => base_properties(identity),
            Self::Registered(registered) => registered.properties().clone(),
        }
    }
}

/// The identity fields every shopper reports, registered or not.
pub(crate) fn base_properties(identity: &Identity) -> FxHashMap<String, Value> {
    let mut properties = FxHashMap::default();
    properties.insert(
        "uuid".to_string(),
        Value::String(identity.id.to_string()),
    );
    properties.insert(
        "user_agent".to_string(),
        Value::String(identity.user_agent.clone()),
    );
    properties.insert(
        "ip".to_string(),
        Value::String(identity.ip_address.to_string()),
    );
    properties
}
