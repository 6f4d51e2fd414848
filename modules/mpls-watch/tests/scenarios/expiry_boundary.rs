//! Scenario 5 (spec §8): a cluster whose `last_updated` is more than
//! `cluster_expiry` in the past is expired, and a fresh matching report
//! starts a brand-new cluster rather than joining it.

use std::sync::atomic::Ordering;

use chrono::Utc;
use mpls_watch::adapters::AdapterKind;
use mpls_watch::store::{MemoryStore, Store};
use mpls_watch_common::{Cluster, ClusterState, GeoPoint, TrustTier};
use uuid::Uuid;

use super::support::{report, run_scenario_with_store, seed_cluster, test_config};

#[tokio::test]
async fn stale_cluster_is_expired_and_fresh_report_starts_anew() {
    let now = Utc::now();
    let stale = Cluster {
        id: Uuid::new_v4(),
        centroid: GeoPoint { lat: 44.9806, lon: -93.2714 },
        label: Some("5th and Hennepin".into()),
        first_seen: now - chrono::Duration::hours(8),
        last_updated: now - chrono::Duration::hours(6) - chrono::Duration::seconds(1),
        members: vec!["community:0".into()],
        state: ClusterState::Active,
        confidence: 0.6,
        alerts_emitted: vec![],
    };
    let seed_member = report(
        "community:0",
        "community",
        TrustTier::High,
        "ICE agents at 5th and Hennepin",
        400,
        Some((44.9806, -93.2714)),
    );

    let store = MemoryStore::new();
    seed_cluster(&store, stale.clone(), vec![seed_member]).await;

    let fresh = report(
        "community:1",
        "community",
        TrustTier::High,
        "ICE agents at 5th and Hennepin again",
        1,
        Some((44.9806, -93.2714)),
    );

    let (stats, store) = run_scenario_with_store(store, "community", AdapterKind::CommunityPlatform, vec![fresh], test_config()).await;

    assert_eq!(stats.alerts_sent.load(Ordering::Relaxed), 1);

    let warm = store.warm_start().await.unwrap();
    assert_eq!(warm.clusters.len(), 1, "the stale cluster must not still be active");
    assert_ne!(warm.clusters[0].id, stale.id, "the fresh report must seed a new cluster, not join the expired one");
    assert_eq!(warm.clusters[0].members, vec!["community:1".to_string()]);
}
