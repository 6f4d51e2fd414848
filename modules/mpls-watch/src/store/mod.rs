//! The Store (spec §4.7): durable state behind three idempotent operations
//! — `put_report`, `upsert_cluster`, `mark_alert` — plus the startup
//! warm-start read of every `ACTIVE` cluster and its members.
//!
//! Two implementations: `MemoryStore` (tests, `--dry-run`) and
//! `PostgresStore` (production), mirroring the teacher's split between
//! in-memory fixtures and a real `sqlx`-backed store
//! (`rootsignal-events::EventStore`).

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use mpls_watch_common::{AlertRecord, Cluster, IceWatchError, Report};
use uuid::Uuid;

/// Everything the Correlator needs restored on process launch.
#[derive(Debug, Default)]
pub struct WarmStartData {
    pub clusters: Vec<Cluster>,
    pub members: Vec<Report>,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Idempotent: re-inserting a report with the same dedup key is a no-op
    /// (invariant P1, law L1).
    async fn put_report(&self, report: &Report) -> Result<(), IceWatchError>;

    async fn has_report(&self, dedup_key: &str) -> Result<bool, IceWatchError>;

    /// Idempotent upsert of full cluster state, including membership.
    async fn upsert_cluster(&self, cluster: &Cluster) -> Result<(), IceWatchError>;

    /// Append one alert record to a cluster's history, atomically with
    /// whatever cluster-state change motivated it.
    async fn mark_alert(&self, cluster_id: Uuid, record: &AlertRecord) -> Result<(), IceWatchError>;

    /// Restore all `ACTIVE` clusters and their member reports.
    async fn warm_start(&self) -> Result<WarmStartData, IceWatchError>;

    /// Release any held connections. Default no-op; `PostgresStore`
    /// overrides this to close its pool on shutdown.
    async fn close(&self) {}
}
