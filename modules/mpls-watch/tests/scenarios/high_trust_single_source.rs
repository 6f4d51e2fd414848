//! Scenario 1 (spec §8): a single HIGH-trust report emits one NEW alert
//! with confidence >= 0.4.

use std::sync::atomic::Ordering;

use mpls_watch::adapters::AdapterKind;
use mpls_watch::store::Store;
use mpls_watch_common::TrustTier;

use super::support::{report, run_scenario, test_config};

#[tokio::test]
async fn high_trust_single_source_emits_one_new_alert() {
    let r = report(
        "community:1",
        "community",
        TrustTier::High,
        "ICE agents at 5th and Hennepin right now",
        10,
        Some((44.9806, -93.2714)),
    );

    let (stats, store) = run_scenario("community", AdapterKind::CommunityPlatform, vec![r], test_config()).await;

    assert_eq!(stats.alerts_sent.load(Ordering::Relaxed), 1);
    assert_eq!(stats.alerts_dropped.load(Ordering::Relaxed), 0);
    assert!(store.has_report("community:1").await.unwrap());

    let warm = store.warm_start().await.unwrap();
    assert_eq!(warm.clusters.len(), 1);
    assert!(warm.clusters[0].confidence >= 0.4);
}
