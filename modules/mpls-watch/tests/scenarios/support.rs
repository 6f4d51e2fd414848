//! Shared harness for the end-to-end scenario tests: drives real
//! `Scheduler` -> queue -> `pipeline::run` -> `MemoryStore` wiring, the way
//! `main.rs` wires the same pieces together, rather than calling pipeline
//! internals directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mpls_watch::adapters::{AdapterKind, AdapterRegistration, MockSourceAdapter};
use mpls_watch::extractor::GazetteerOnlyExtractor;
use mpls_watch::notifier::LogSinkBackend;
use mpls_watch::pipeline::{self, PipelineStats};
use mpls_watch::scheduler::{Scheduler, SchedulerConfig};
use mpls_watch::store::{MemoryStore, Store};
use mpls_watch_common::{Cluster, Config, ExtractedLocation, GeoPoint, Report, TrustTier};

pub fn test_config() -> Config {
    Config {
        webhook_url: String::new(),
        max_distance_km: 50.0,
        min_corroboration_sources: 2,
        cluster_expiry_hours: 6.0,
        fresh_max_hours: 3.0,
        temporal_window_hours: 2.0,
        geo_window_km: 3.0,
        sim_threshold: 0.25,
        dry_run: true,
        log_level: "INFO".into(),
        poll_queue_capacity: 64,
        adapter_deadline_secs: 5,
        webhook_timeout_secs: 10,
        shutdown_grace_secs: 2,
        max_consecutive_transient_failures: 5,
        center_lat: 44.9778,
        center_lon: -93.2650,
        sources: HashMap::new(),
        database_url: String::new(),
    }
}

pub fn report(
    dedup_key: &str,
    source: &str,
    trust: TrustTier,
    content: &str,
    minutes_ago: i64,
    coords: Option<(f64, f64)>,
) -> Report {
    let now = Utc::now();
    Report {
        dedup_key: dedup_key.to_string(),
        source_name: source.to_string(),
        trust,
        observed_at: now - chrono::Duration::minutes(minutes_ago),
        ingested_at: now,
        content: content.to_string(),
        author: None,
        url: None,
        coords: coords.map(|(lat, lon)| GeoPoint { lat, lon }),
        locations: coords
            .map(|(lat, lon)| vec![ExtractedLocation { name: "pre-resolved".into(), lat, lon, confidence: 1.0 }])
            .unwrap_or_default(),
        verdict: None,
    }
}

/// Run one batch of reports from a single named source through the full
/// Scheduler -> queue -> pipeline -> Store wiring, and return the resulting
/// stats and store for assertions.
pub async fn run_scenario(source_name: &str, kind: AdapterKind, reports: Vec<Report>, config: Config) -> (Arc<PipelineStats>, MemoryStore) {
    run_scenario_with_store(MemoryStore::new(), source_name, kind, reports, config).await
}

/// Same as `run_scenario`, but against a Store pre-seeded with existing
/// cluster/report state (e.g. to exercise warm-start and expiry against a
/// stale cluster already on record).
pub async fn seed_cluster(store: &MemoryStore, cluster: Cluster, members: Vec<Report>) {
    for member in &members {
        store.put_report(member).await.unwrap();
    }
    store.upsert_cluster(&cluster).await.unwrap();
}

pub async fn run_scenario_with_store(
    store: MemoryStore,
    source_name: &str,
    kind: AdapterKind,
    reports: Vec<Report>,
    config: Config,
) -> (Arc<PipelineStats>, MemoryStore) {
    let store = Arc::new(store);
    let backend = Arc::new(LogSinkBackend);
    let extractor = Arc::new(GazetteerOnlyExtractor);

    let mut source_kinds = HashMap::new();
    source_kinds.insert(source_name.to_string(), kind);

    let scheduler = Scheduler::new(SchedulerConfig {
        queue_capacity: config.poll_queue_capacity,
        adapter_deadline: Duration::from_secs(config.adapter_deadline_secs),
        shutdown_grace: Duration::from_secs(config.shutdown_grace_secs),
        max_consecutive_transient_failures: config.max_consecutive_transient_failures,
    });
    let (tx, rx) = scheduler.make_queue();

    let adapter = MockSourceAdapter::new(source_name, kind).push_batch(reports);
    let registration = AdapterRegistration {
        name: source_name.to_string(),
        interval: Duration::from_secs(60),
        adapter: Box::new(adapter),
    };
    let (handles, shutdown_tx) = scheduler.spawn_all(vec![registration], tx);

    let stats = Arc::new(PipelineStats::default());
    let pipeline_task = tokio::spawn(pipeline::run(rx, store.clone(), backend, extractor, config, source_kinds, stats.clone()));

    // The scheduler polls its adapters immediately on spawn; this gives the
    // single scripted batch time to reach the pipeline before shutdown.
    tokio::time::sleep(Duration::from_millis(150)).await;
    scheduler.shutdown(shutdown_tx, handles).await;
    pipeline_task.await.expect("pipeline task should not panic");

    let store = Arc::try_unwrap(store).unwrap_or_else(|_| panic!("store still has other owners after shutdown"));
    (stats, store)
}
