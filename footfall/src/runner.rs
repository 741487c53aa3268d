//! The visit orchestrator.
//!
//! ## Metrics
//!
//! `visits_completed`: Visits that checked out
//! `visits_dropped`: Visits that left mid-flow
//! `visits_abandoned`: Visits that reached checkout with nothing to buy
//! `visits_failed`: Visits that errored or panicked
//!
//! Fires a configured number of visits as concurrent tasks, bounded by a
//! semaphore so a big batch cannot balloon into a big task pile. A failure
//! inside one visit is caught and logged at the join boundary here; it
//! never stops the remaining visits from being started or finished.

use std::sync::Arc;

use footfall_persona::{AgentPool, Source};
use metrics::counter;
use rand::rngs::{SmallRng, StdRng};
use rand::{Rng, SeedableRng};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::registry::Registry;
use crate::reporter::{Reporter, Sink};
use crate::visit::{self, Odds, Outcome, Visit};

/// Tally of how the batch's visits ended.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Visits that checked out a cart.
    pub completed: u64,
    /// Visits that dropped somewhere mid-flow.
    pub dropped: u64,
    /// Visits that reached checkout with an empty cart.
    pub abandoned: u64,
    /// Visits that errored or panicked.
    pub failed: u64,
}

impl Summary {
    /// Total visits accounted for.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.completed + self.dropped + self.abandoned + self.failed
    }
}

/// The batch orchestrator.
#[derive(Debug)]
pub struct Runner {
    visits: u32,
    max_concurrency: u32,
    seed: u64,
    registry: Arc<Registry>,
    reporter: Arc<Reporter>,
    enricher: Arc<Source>,
    agents: Arc<AgentPool>,
    catalog: Arc<[String]>,
    odds: Odds,
}

impl Runner {
    /// Assemble a runner from a validated [`Config`].
    ///
    /// Owns the shopper registry and hands it to every visit; no global
    /// state is involved.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let sinks: Vec<Sink> = config.destinations.iter().map(Sink::from_config).collect();
        Self {
            visits: config.visits,
            max_concurrency: config.max_concurrency.get(),
            seed: config.seed.unwrap_or_else(|| rand::rng().random()),
            registry: Arc::new(Registry::new()),
            reporter: Arc::new(Reporter::new(sinks)),
            enricher: Arc::new(Source::new(&config.profile_source)),
            agents: Arc::new(AgentPool::new()),
            catalog: Arc::from(config.catalog),
            odds: config.odds,
        }
    }

    /// The registry this runner's visits share.
    #[must_use]
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Fire all visits and wait for the stragglers.
    ///
    /// Best effort: every visit is attempted, failures are logged and
    /// tallied, and the batch always runs to the end.
    #[allow(clippy::cast_possible_truncation)]
    pub async fn run(self) -> Summary {
        info!(
            visits = self.visits,
            max_concurrency = self.max_concurrency,
            seed = self.seed,
            "starting visit batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency as usize));
        let mut master = StdRng::seed_from_u64(self.seed);
        let mut tasks: JoinSet<Result<Outcome, visit::Error>> = JoinSet::new();

        for _ in 0..self.visits {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .expect("semaphore closed");
            let rng = SmallRng::seed_from_u64(master.random());
            let registry = Arc::clone(&self.registry);
            let reporter = Arc::clone(&self.reporter);
            let enricher = Arc::clone(&self.enricher);
            let agents = Arc::clone(&self.agents);
            let catalog = Arc::clone(&self.catalog);
            let odds = self.odds;

            tasks.spawn(async move {
                let _permit = permit;
                let visit = Visit::new(rng, registry, reporter, enricher, &agents, catalog, odds)?;
                visit.run().await
            });
        }

        let mut summary = Summary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(Outcome::Completed)) => {
                    counter!("visits_completed").increment(1);
                    summary.completed += 1;
                }
                Ok(Ok(Outcome::Dropped)) => {
                    counter!("visits_dropped").increment(1);
                    summary.dropped += 1;
                }
                Ok(Ok(Outcome::Abandoned)) => {
                    counter!("visits_abandoned").increment(1);
                    summary.abandoned += 1;
                }
                Ok(Err(err)) => {
                    warn!(error = %err, "visit failed");
                    counter!("visits_failed").increment(1);
                    summary.failed += 1;
                }
                Err(join_error) => {
                    error!(%join_error, "visit task died");
                    counter!("visits_failed").increment(1);
                    summary.failed += 1;
                }
            }
        }

        info!(
            completed = summary.completed,
            dropped = summary.dropped,
            abandoned = summary.abandoned,
            failed = summary.failed,
            registered_shoppers = self.registry.len(),
            "visit batch finished"
        );
        summary
    }
}
