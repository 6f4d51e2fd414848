//! Scenario 3 (spec §8): a retrospective RSS report is rejected as news and
//! never reaches the Correlator.

use std::sync::atomic::Ordering;

use mpls_watch::adapters::AdapterKind;
use mpls_watch_common::TrustTier;

use super::support::{report, run_scenario, test_config};

#[tokio::test]
async fn news_source_retrospective_report_is_rejected() {
    let r = report(
        "mn-news-rss:1",
        "mn-news-rss",
        TrustTier::High,
        "ICE raids in Minneapolis last year drew protests",
        5,
        None,
    );

    let (stats, _store) = run_scenario("mn-news-rss", AdapterKind::NewsRss, vec![r], test_config()).await;

    assert_eq!(stats.rejected_news.load(Ordering::Relaxed), 1);
    assert_eq!(stats.alerts_sent.load(Ordering::Relaxed), 0);
}
