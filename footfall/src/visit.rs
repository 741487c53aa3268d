//! The visit engine.
//!
//! One [`Visit`] drives a single simulated browsing session end to end: it
//! picks the shopper (returning or first-time), walks the page flow as a
//! weighted-random state machine and reports an event at every step. On a
//! successful registration the visit's anonymous shopper is promoted into
//! the shared registry and drives the rest of the visit as a registered
//! shopper.

use std::sync::Arc;

use footfall_persona::{AgentPool, Identity, Source};
use metrics::counter;
use rand::distr::weighted;
use rand::seq::IndexedRandom;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::common::weighted_choice;
use crate::registry::Registry;
use crate::reporter::{EventName, Reporter};
use crate::shopper::Shopper;

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`Visit`].
pub enum Error {
    /// Identity generation failed, see
    /// [`footfall_persona::identity::Error`].
    #[error(transparent)]
    Identity(#[from] footfall_persona::identity::Error),
    /// A branch decision had no weight to draw from.
    #[error(transparent)]
    Choice(#[from] weighted::Error),
    /// The product catalog has no items to browse.
    #[error("product catalog is empty")]
    EmptyCatalog,
}

/// Branch weights for the visit state machine.
///
/// `progress`/`stall` weigh every "does the shopper advance" decision;
/// `returning`/`first_time` weigh the shopper choice at visit start. The
/// mid-flow "go home or leave" coin is a fixed 50/50 and not configurable.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct Odds {
    /// Weight of advancing at a decision point.
    pub progress: u32,
    /// Weight of not advancing at a decision point.
    pub stall: u32,
    /// Weight of driving the visit with a returning shopper.
    pub returning: u32,
    /// Weight of driving the visit with a first-time shopper.
    pub first_time: u32,
}

impl Default for Odds {
    fn default() -> Self {
        Self {
            progress: 70,
            stall: 30,
            returning: 50,
            first_time: 50,
        }
    }
}

impl Odds {
    /// The first decision whose weights sum to zero, if any. Such a
    /// decision could never be drawn and is rejected at config load.
    #[must_use]
    pub fn degenerate_decision(&self) -> Option<&'static str> {
        if self.progress == 0 && self.stall == 0 {
            return Some("progress/stall");
        }
        if self.returning == 0 && self.first_time == 0 {
            return Some("returning/first_time");
        }
        None
    }
}

/// How a visit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The shopper checked out a non-empty cart.
    Completed,
    /// The shopper left somewhere along the way.
    Dropped,
    /// The shopper reached checkout with an empty cart and wandered off.
    Abandoned,
}

// Where the shopper currently is. `Item` carries the product being looked
// at.
#[derive(Debug)]
enum Page {
    Main,
    Item(String),
    Checkout,
}

#[derive(Debug)]
enum Flow {
    Goto(Page),
    Finish(Outcome),
}

/// One simulated browsing session.
#[derive(Debug)]
pub struct Visit<R> {
    rng: R,
    shopper: Shopper,
    is_returning: bool,
    cart: Vec<String>,
    registry: Arc<Registry>,
    reporter: Arc<Reporter>,
    enricher: Arc<Source>,
    catalog: Arc<[String]>,
    odds: Odds,
}

impl<R> Visit<R>
where
    R: rand::Rng,
{
    /// Create a visit, deciding up front whether a returning or first-time
    /// shopper drives it.
    ///
    /// The returning/first-time draw sticks for the whole visit even when
    /// the registry turned out to be empty and an anonymous shopper had to
    /// be generated anyway -- a "returning" shopper never re-registers.
    ///
    /// # Errors
    ///
    /// Function will return an error if identity generation fails or the
    /// shopper-choice weights are degenerate.
    pub fn new(
        mut rng: R,
        registry: Arc<Registry>,
        reporter: Arc<Reporter>,
        enricher: Arc<Source>,
        agents: &AgentPool,
        catalog: Arc<[String]>,
        odds: Odds,
    ) -> Result<Self, Error> {
        let is_returning = *weighted_choice(
            &mut rng,
            &[(true, odds.returning), (false, odds.first_time)],
        )?;
        let shopper = if is_returning {
            match registry.pick_random(&mut rng) {
                Some(registered) => Shopper::Registered(registered),
                None => Shopper::Anonymous(Identity::generate(&mut rng, agents)?),
            }
        } else {
            Shopper::Anonymous(Identity::generate(&mut rng, agents)?)
        };

        Ok(Self {
            rng,
            shopper,
            is_returning,
            cart: Vec::new(),
            registry,
            reporter,
            enricher,
            catalog,
            odds,
        })
    }

    /// Run the visit to a terminal state.
    ///
    /// # Errors
    ///
    /// Function will return an error if a branch decision cannot be drawn
    /// or the catalog is empty. Enrichment and reporting failures do not
    /// error; they degrade the visit instead.
    pub async fn run(mut self) -> Result<Outcome, Error> {
        debug!(shopper = %self.shopper.id(), returning = self.is_returning, "visit started");
        let mut page = Page::Main;
        loop {
            match self.step(page).await? {
                Flow::Goto(next) => page = next,
                Flow::Finish(outcome) => {
                    debug!(shopper = %self.shopper.id(), ?outcome, "visit finished");
                    return Ok(outcome);
                }
            }
        }
    }

    async fn step(&mut self, page: Page) -> Result<Flow, Error> {
        let flow = match page {
            Page::Main => {
                self.reporter
                    .track(&self.shopper, EventName::MainPage, FxHashMap::default())
                    .await;
                if self.progress()? {
                    let item = self
                        .catalog
                        .choose(&mut self.rng)
                        .ok_or(Error::EmptyCatalog)?
                        .clone();
                    self.reporter
                        .track(&self.shopper, EventName::ItemPage, item_properties(&item))
                        .await;
                    Flow::Goto(Page::Item(item))
                } else if self.coin() {
                    Flow::Goto(Page::Main)
                } else {
                    Flow::Finish(Outcome::Dropped)
                }
            }
            Page::Item(item) => {
                if self.progress()? {
                    self.cart.push(item.clone());
                    self.reporter
                        .track(&self.shopper, EventName::AddToCart, item_properties(&item))
                        .await;
                    Flow::Goto(Page::Checkout)
                } else if self.progress()? {
                    // Nothing added, but the shopper heads for checkout
                    // anyway; an empty cart ends the visit there.
                    Flow::Goto(Page::Checkout)
                } else if self.coin() {
                    Flow::Goto(Page::Main)
                } else {
                    Flow::Finish(Outcome::Dropped)
                }
            }
            Page::Checkout => {
                if self.cart.is_empty() {
                    Flow::Finish(Outcome::Abandoned)
                } else if self.progress()? {
                    self.registration_step().await?;
                    self.reporter
                        .track(&self.shopper, EventName::Checkout, cart_properties(&self.cart))
                        .await;
                    self.cart.clear();
                    Flow::Finish(Outcome::Completed)
                } else {
                    Flow::Finish(Outcome::Dropped)
                }
            }
        };
        Ok(flow)
    }

    // The registration step of the checkout path. No-op for returning or
    // already-registered shoppers. An enrichment failure skips the
    // promotion and the visit carries on anonymous.
    async fn registration_step(&mut self) -> Result<(), Error> {
        if self.is_returning || self.shopper.is_registered() {
            return Ok(());
        }
        if !self.progress()? {
            return Ok(());
        }

        self.reporter
            .track(&self.shopper, EventName::Register, cart_properties(&self.cart))
            .await;
        match self.enricher.fetch(&mut self.rng).await {
            Ok(profile) => {
                if let Shopper::Anonymous(identity) = &self.shopper {
                    let registered = self.registry.register(identity.clone(), profile);
                    self.reporter.set_profile(&registered).await;
                    self.shopper = Shopper::Registered(registered);
                }
            }
            Err(error) => {
                warn!(
                    shopper = %self.shopper.id(),
                    %error,
                    "profile enrichment failed, shopper stays anonymous"
                );
                counter!("enrichment_failures").increment(1);
            }
        }
        Ok(())
    }

    fn progress(&mut self) -> Result<bool, Error> {
        Ok(*weighted_choice(
            &mut self.rng,
            &[(true, self.odds.progress), (false, self.odds.stall)],
        )?)
    }

    fn coin(&mut self) -> bool {
        self.rng.random()
    }
}

fn item_properties(item: &str) -> FxHashMap<String, Value> {
    let mut properties = FxHashMap::default();
    properties.insert("item".to_string(), Value::String(item.to_string()));
    properties
}

fn cart_properties(cart: &[String]) -> FxHashMap<String, Value> {
    let mut properties = FxHashMap::default();
    properties.insert(
        "items".to_string(),
        Value::Array(cart.iter().cloned().map(Value::String).collect()),
    );
    properties
}
