//! Scenario 6 (spec §8): a cluster with one NEW already emitted receives
//! two more matching reports, producing two UPDATE alerts with strictly
//! increasing `member_count_at_emit`.

use std::sync::atomic::Ordering;

use chrono::Utc;
use mpls_watch::adapters::AdapterKind;
use mpls_watch::store::{MemoryStore, Store};
use mpls_watch_common::{AlertKind, AlertRecord, Cluster, ClusterState, GeoPoint, TrustTier};
use uuid::Uuid;

use super::support::{report, run_scenario_with_store, seed_cluster, test_config};

#[tokio::test]
async fn matching_reports_after_new_produce_increasing_update_alerts() {
    let now = Utc::now();
    let seed_member = report(
        "community:1",
        "community",
        TrustTier::High,
        "ICE agents at 5th and Hennepin right now",
        30,
        Some((44.9806, -93.2714)),
    );
    let seeded = Cluster {
        id: Uuid::new_v4(),
        centroid: GeoPoint { lat: 44.9806, lon: -93.2714 },
        label: Some("5th and Hennepin".into()),
        first_seen: now - chrono::Duration::minutes(30),
        last_updated: now - chrono::Duration::minutes(30),
        members: vec!["community:1".into()],
        state: ClusterState::Active,
        confidence: 0.6,
        alerts_emitted: vec![AlertRecord { kind: AlertKind::New, timestamp: now - chrono::Duration::minutes(30), member_count_at_emit: 1 }],
    };

    let store = MemoryStore::new();
    seed_cluster(&store, seeded, vec![seed_member]).await;

    let follow_up_a = report(
        "community:2",
        "community",
        TrustTier::High,
        "more ICE agents at 5th and Hennepin",
        10,
        Some((44.9806, -93.2714)),
    );
    let follow_up_b = report(
        "community:3",
        "community",
        TrustTier::High,
        "ICE agents still at 5th and Hennepin",
        2,
        Some((44.9806, -93.2714)),
    );

    let (stats, store) = run_scenario_with_store(
        store,
        "community",
        AdapterKind::CommunityPlatform,
        vec![follow_up_a, follow_up_b],
        test_config(),
    )
    .await;

    assert_eq!(stats.alerts_sent.load(Ordering::Relaxed), 2);

    let warm = store.warm_start().await.unwrap();
    assert_eq!(warm.clusters.len(), 1);
    let alerts = &warm.clusters[0].alerts_emitted;
    assert_eq!(alerts.len(), 3);
    assert_eq!(alerts[1].kind, AlertKind::Update);
    assert_eq!(alerts[2].kind, AlertKind::Update);
    assert!(alerts[1].member_count_at_emit < alerts[2].member_count_at_emit);
}
