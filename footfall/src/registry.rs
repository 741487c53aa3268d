//! The shared pool of registered shoppers.
//!
//! One registry instance is owned by the runner and handed to every visit
//! by `Arc`. It is append-only: shoppers are promoted in and never removed
//! or edited afterward. The mutex is held only for the in-memory append or
//! read; profile fetches happen before `register` is called so no network
//! I/O ever sits inside the critical section.

use std::sync::{Arc, Mutex};

use footfall_persona::{Identity, Profile};
use metrics::counter;
use rand::seq::IndexedRandom;

use crate::shopper::{Registered, base_properties};

/// Append-only collection of registered shoppers, safe for concurrent
/// append and random read.
#[derive(Debug, Default)]
pub struct Registry {
    shoppers: Mutex<Vec<Arc<Registered>>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Promote an anonymous shopper to registered.
    ///
    /// The demographic profile is merged under the shopper's base identity
    /// properties; on key collision the identity fields win, so `uuid`,
    /// `user_agent` and `ip` are always preserved verbatim. Each call
    /// appends a fresh entry -- callers promote a given shopper at most
    /// once.
    pub fn register(&self, identity: Identity, profile: Profile) -> Arc<Registered> {
        let mut properties = profile.into_properties();
        properties.extend(base_properties(&identity));

        let registered = Arc::new(Registered::new(identity, properties));
        self.shoppers
            .lock()
            .expect("registry lock poisoned")
            .push(Arc::clone(&registered));
        counter!("shoppers_registered").increment(1);
        registered
    }

    /// A uniformly random registered shopper, or `None` when the registry
    /// is empty.
    pub fn pick_random<R>(&self, rng: &mut R) -> Option<Arc<Registered>>
    where
        R: rand::Rng + ?Sized,
    {
        self.shoppers
            .lock()
            .expect("registry lock poisoned")
            .choose(rng)
            .map(Arc::clone)
    }

    /// Number of registered shoppers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shoppers.lock().expect("registry lock poisoned").len()
    }

    /// True when no shopper has registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
