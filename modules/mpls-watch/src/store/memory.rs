use std::collections::HashMap;

use async_trait::async_trait;
use mpls_watch_common::{AlertRecord, Cluster, ClusterState, IceWatchError, Report};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, WarmStartData};

#[derive(Default)]
struct Inner {
    reports: HashMap<String, Report>,
    clusters: HashMap<Uuid, Cluster>,
}

/// In-memory Store: used by the test suite and by `--dry-run` runs that
/// don't want to stand up Postgres. Not durable across restarts.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put_report(&self, report: &Report) -> Result<(), IceWatchError> {
        let mut inner = self.inner.write().await;
        inner.reports.entry(report.dedup_key.clone()).or_insert_with(|| report.clone());
        Ok(())
    }

    async fn has_report(&self, dedup_key: &str) -> Result<bool, IceWatchError> {
        Ok(self.inner.read().await.reports.contains_key(dedup_key))
    }

    async fn upsert_cluster(&self, cluster: &Cluster) -> Result<(), IceWatchError> {
        let mut inner = self.inner.write().await;
        inner.clusters.insert(cluster.id, cluster.clone());
        Ok(())
    }

    async fn mark_alert(&self, cluster_id: Uuid, record: &AlertRecord) -> Result<(), IceWatchError> {
        let mut inner = self.inner.write().await;
        let cluster = inner
            .clusters
            .get_mut(&cluster_id)
            .ok_or_else(|| IceWatchError::Store(format!("mark_alert: unknown cluster {cluster_id}")))?;
        cluster.alerts_emitted.push(record.clone());
        Ok(())
    }

    async fn warm_start(&self) -> Result<WarmStartData, IceWatchError> {
        let inner = self.inner.read().await;
        let clusters: Vec<Cluster> = inner
            .clusters
            .values()
            .filter(|c| c.state == ClusterState::Active)
            .cloned()
            .collect();
        let active_member_keys: std::collections::HashSet<&str> = clusters
            .iter()
            .flat_map(|c| c.members.iter().map(String::as_str))
            .collect();
        let members = inner
            .reports
            .values()
            .filter(|r| active_member_keys.contains(r.dedup_key.as_str()))
            .cloned()
            .collect();
        Ok(WarmStartData { clusters, members })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mpls_watch_common::{AlertKind, GeoPoint, TrustTier};

    fn report(key: &str) -> Report {
        Report {
            dedup_key: key.to_string(),
            source_name: "src".into(),
            trust: TrustTier::High,
            observed_at: Utc::now(),
            ingested_at: Utc::now(),
            content: "ICE agents right now".into(),
            author: None,
            url: None,
            coords: None,
            locations: vec![],
            verdict: None,
        }
    }

    fn cluster(id: Uuid, members: Vec<String>, state: ClusterState) -> Cluster {
        Cluster {
            id,
            centroid: GeoPoint { lat: 44.9778, lon: -93.2650 },
            label: None,
            first_seen: Utc::now(),
            last_updated: Utc::now(),
            members,
            state,
            confidence: 0.5,
            alerts_emitted: vec![],
        }
    }

    #[tokio::test]
    async fn put_report_is_idempotent() {
        let store = MemoryStore::new();
        let r = report("src:1");
        store.put_report(&r).await.unwrap();
        store.put_report(&r).await.unwrap();
        assert!(store.has_report("src:1").await.unwrap());
    }

    #[tokio::test]
    async fn mark_alert_appends_to_existing_cluster() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.upsert_cluster(&cluster(id, vec!["src:1".into()], ClusterState::Active)).await.unwrap();
        store
            .mark_alert(id, &AlertRecord { kind: AlertKind::New, timestamp: Utc::now(), member_count_at_emit: 1 })
            .await
            .unwrap();

        let warm = store.warm_start().await.unwrap();
        assert_eq!(warm.clusters[0].alerts_emitted.len(), 1);
    }

    #[tokio::test]
    async fn warm_start_excludes_expired_clusters() {
        let store = MemoryStore::new();
        store.upsert_cluster(&cluster(Uuid::new_v4(), vec![], ClusterState::Active)).await.unwrap();
        store.upsert_cluster(&cluster(Uuid::new_v4(), vec![], ClusterState::Expired)).await.unwrap();

        let warm = store.warm_start().await.unwrap();
        assert_eq!(warm.clusters.len(), 1);
    }
}
