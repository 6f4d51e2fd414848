//! Scenario 4 (spec §8): a report whose coordinates fall in St. Louis, MO
//! is rejected as out of region and never creates a cluster.

use std::sync::atomic::Ordering;

use mpls_watch::adapters::AdapterKind;
use mpls_watch::store::Store;
use mpls_watch_common::TrustTier;

use super::support::{report, run_scenario, test_config};

#[tokio::test]
async fn out_of_region_report_is_rejected_and_no_cluster_created() {
    let r = report(
        "news:1",
        "community",
        TrustTier::High,
        "ICE raid happening right now",
        5,
        Some((38.6270, -90.1994)),
    );

    let (stats, store) = run_scenario("community", AdapterKind::CommunityPlatform, vec![r], test_config()).await;

    assert_eq!(stats.rejected_out_of_region.load(Ordering::Relaxed), 1);
    assert_eq!(stats.alerts_sent.load(Ordering::Relaxed), 0);

    let warm = store.warm_start().await.unwrap();
    assert_eq!(warm.clusters.len(), 0);
}
