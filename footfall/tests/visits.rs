//! End-to-end behavior of the visit batch and the HTTP reporting path.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use warp::Filter;

use footfall::config::Config;
use footfall::registry::Registry;
use footfall::reporter::{EventName, Reporter, Sink, SinkConfig};
use footfall::runner::Runner;
use footfall::shopper::Shopper;
use footfall_persona::{AgentPool, Identity, Profile};
use rand::{SeedableRng, rngs::SmallRng};
use rustc_hash::FxHashMap;

const FIXED_SOURCE: &str = r#"
profile_source:
  fixed:
    profile:
      name: Jeanne Dubois
      date_of_birth: "1987-06-15"
      city: Lyon
      postcode: "69002"
      latitude: "45.7640"
      longitude: "4.8357"
      gender: female
      phone: "04-11-22-33-44"
      mobile: "06-55-66-77-88"
      age: 33
      email: jeanne.dubois@example.com
"#;

fn sample_profile() -> Profile {
    Profile {
        name: "Jeanne Dubois".to_string(),
        date_of_birth: "1987-06-15".to_string(),
        city: "Lyon".to_string(),
        postcode: "69002".to_string(),
        latitude: "45.7640".to_string(),
        longitude: "4.8357".to_string(),
        gender: "female".to_string(),
        phone: "04-11-22-33-44".to_string(),
        mobile: "06-55-66-77-88".to_string(),
        age: 33,
        email: "jeanne.dubois@example.com".to_string(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn every_visit_is_accounted_for() {
    let contents = format!(
        r#"
catalog: ["chaise longue", "ottoman", "credenza"]
visits: 50
max_concurrency: 8
seed: 7
{FIXED_SOURCE}
"#
    );
    let config = Config::parse(&contents).expect("config did not parse");
    let summary = Runner::new(config).run().await;

    assert_eq!(summary.total(), 50);
    assert_eq!(summary.failed, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_visits_register_without_losing_entries() {
    // Every decision progresses and every shopper is first-time, so all 40
    // visits complete and promote exactly one shopper each.
    let contents = format!(
        r#"
catalog: ["chaise longue"]
visits: 40
max_concurrency: 16
seed: 11
odds:
  progress: 1
  stall: 0
  returning: 0
  first_time: 1
{FIXED_SOURCE}
"#
    );
    let config = Config::parse(&contents).expect("config did not parse");
    let runner = Runner::new(config);
    let registry = runner.registry();

    let summary = runner.run().await;

    assert_eq!(summary.completed, 40);
    assert_eq!(registry.len(), 40);

    let mut rng = SmallRng::seed_from_u64(12);
    let mut ids = HashSet::new();
    for _ in 0..2_000 {
        let shopper = registry.pick_random(&mut rng).expect("registry is empty");
        ids.insert(shopper.id());
    }
    assert_eq!(ids.len(), 40, "expected 40 distinct registered shoppers");
}

#[tokio::test(flavor = "multi_thread")]
async fn http_sink_delivers_events_and_profiles() {
    let tracked: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let engaged: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));

    let track_store = Arc::clone(&tracked);
    let track = warp::post()
        .and(warp::path("track"))
        .and(warp::body::json())
        .map(move |body: Value| {
            track_store.lock().expect("track store poisoned").push(body);
            warp::reply()
        });
    let engage_store = Arc::clone(&engaged);
    let engage = warp::post()
        .and(warp::path("engage"))
        .and(warp::body::json())
        .map(move |body: Value| {
            engage_store
                .lock()
                .expect("engage store poisoned")
                .push(body);
            warp::reply()
        });

    let (addr, server) = warp::serve(track.or(engage)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    let sink = Sink::from_config(&SinkConfig::Http {
        uri: format!("http://{addr}"),
        token: "s3cret".to_string(),
    });
    let reporter = Reporter::new(vec![sink]);

    let mut rng = SmallRng::seed_from_u64(13);
    let agents = AgentPool::new();
    let identity = Identity::generate(&mut rng, &agents).expect("generation failed");
    let shopper = Shopper::Anonymous(identity.clone());

    reporter
        .track(&shopper, EventName::MainPage, FxHashMap::default())
        .await;

    let registry = Registry::new();
    let registered = registry.register(identity.clone(), sample_profile());
    reporter.set_profile(&registered).await;

    let tracked = tracked.lock().expect("track store poisoned");
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0]["event"], "main page");
    assert_eq!(tracked[0]["properties"]["token"], "s3cret");
    assert_eq!(
        tracked[0]["properties"]["distinct_id"],
        identity.id.to_string()
    );
    assert_eq!(
        tracked[0]["properties"]["user_agent"],
        identity.user_agent.as_str()
    );

    let engaged = engaged.lock().expect("engage store poisoned");
    assert_eq!(engaged.len(), 1);
    assert_eq!(engaged[0]["$token"], "s3cret");
    assert_eq!(engaged[0]["$distinct_id"], identity.id.to_string());
    assert_eq!(engaged[0]["$set"]["name"], "Jeanne Dubois");
    assert_eq!(engaged[0]["$set"]["uuid"], identity.id.to_string());
}
