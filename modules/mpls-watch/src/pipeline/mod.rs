//! The pipeline task (spec §5): drains the scheduler's bounded queue
//! sequentially, running Filter -> Location Extractor -> Correlator ->
//! Notifier for one report at a time. Single-threaded by design — this is
//! what makes cluster assignment deterministic w.r.t. arrival order and
//! avoids locking the active-cluster set.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use mpls_watch_common::{Config, Report, Verdict};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::adapters::AdapterKind;
use crate::correlator::{Correlator, CorrelatorConfig};
use crate::extractor::NameExtractor;
use crate::notifier::{self, NotifyBackend};
use crate::store::Store;
use crate::{extractor, filter};

/// Live counters surfaced in the periodic health log (spec §9's "critical
/// alert when fully silent" note starts here).
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub processed: AtomicU64,
    pub rejected_stale: AtomicU64,
    pub rejected_duplicate: AtomicU64,
    pub rejected_irrelevant: AtomicU64,
    pub rejected_news: AtomicU64,
    pub rejected_out_of_region: AtomicU64,
    pub alerts_sent: AtomicU64,
    pub alerts_dropped: AtomicU64,
}

/// Run the pipeline until the queue's sender side is dropped (scheduler
/// shutdown complete and drained).
pub async fn run(
    mut rx: mpsc::Receiver<Report>,
    store: Arc<dyn Store>,
    backend: Arc<dyn NotifyBackend>,
    name_extractor: Arc<dyn NameExtractor>,
    config: Config,
    source_kinds: HashMap<String, AdapterKind>,
    stats: Arc<PipelineStats>,
) {
    extractor::log_capability_once(name_extractor.as_ref());

    let mut correlator = Correlator::new(CorrelatorConfig::from_config(&config));
    match store.warm_start().await {
        Ok(warm) => {
            let restored = warm.clusters.len();
            correlator.warm_start(warm.clusters, warm.members);
            info!(restored, "correlator warm-started from store");
        }
        Err(e) => {
            tracing::error!(error = %e, "warm start failed, starting with an empty correlator");
        }
    }

    while let Some(report) = rx.recv().await {
        process_one(&mut correlator, store.as_ref(), backend.as_ref(), name_extractor.as_ref(), &config, &source_kinds, &stats, report).await;
    }

    info!("pipeline queue closed, pipeline task exiting");
}

async fn process_one(
    correlator: &mut Correlator,
    store: &dyn Store,
    backend: &dyn NotifyBackend,
    name_extractor: &dyn NameExtractor,
    config: &Config,
    source_kinds: &HashMap<String, AdapterKind>,
    stats: &PipelineStats,
    mut report: Report,
) {
    stats.processed.fetch_add(1, Ordering::Relaxed);

    match store.has_report(&report.dedup_key).await {
        Ok(true) => {
            stats.rejected_duplicate.fetch_add(1, Ordering::Relaxed);
            debug!(dedup_key = %report.dedup_key, "duplicate report, dropped");
            return;
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!(error = %e, "store error during dedup check, report dropped this cycle");
            return;
        }
    }

    if !filter::check_freshness(&report, config.fresh_max()) {
        report.verdict = Some(Verdict::RejectedStale);
        stats.rejected_stale.fetch_add(1, Ordering::Relaxed);
        let _ = store.put_report(&report).await;
        return;
    }

    let is_news_source = source_kinds.get(&report.source_name).copied() == Some(AdapterKind::NewsRss);
    let verdict = filter::classify_content(&report, is_news_source, config);
    report.verdict = Some(verdict);

    match verdict {
        Verdict::RejectedIrrelevant => {
            stats.rejected_irrelevant.fetch_add(1, Ordering::Relaxed);
            let _ = store.put_report(&report).await;
            return;
        }
        Verdict::RejectedNews => {
            stats.rejected_news.fetch_add(1, Ordering::Relaxed);
            let _ = store.put_report(&report).await;
            return;
        }
        Verdict::RejectedOutOfRegion => {
            stats.rejected_out_of_region.fetch_add(1, Ordering::Relaxed);
            let _ = store.put_report(&report).await;
            return;
        }
        Verdict::RejectedStale => unreachable!("handled above"),
        Verdict::Relevant => {}
    }

    report.locations = extractor::extract(&report, name_extractor);

    if let Err(e) = store.put_report(&report).await {
        tracing::error!(error = %e, "fatal store error persisting relevant report");
        return;
    }

    let now = Utc::now();
    let outcome = correlator.process_report(report, now);

    for expired in &outcome.expired {
        if let Err(e) = store.upsert_cluster(expired).await {
            tracing::error!(error = %e, cluster_id = %expired.id, "failed to persist expired cluster");
        }
    }

    if let Err(e) = store.upsert_cluster(&outcome.cluster).await {
        tracing::error!(error = %e, cluster_id = %outcome.cluster.id, "failed to persist cluster");
    }

    if let Some(candidate) = outcome.emission {
        let cluster_id = candidate.cluster.id;
        match notifier::notify(backend, &candidate, now).await {
            Some(record) => {
                stats.alerts_sent.fetch_add(1, Ordering::Relaxed);
                correlator.record_alert(cluster_id, record.clone());
                if let Err(e) = store.mark_alert(cluster_id, &record).await {
                    tracing::error!(error = %e, %cluster_id, "failed to persist alert record");
                }
            }
            None => {
                stats.alerts_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
