//! Drives each registered adapter at its configured interval (spec §4.2).
//!
//! Each adapter runs in its own logical task; polls are independent and
//! never serialize across adapters. Outputs fan into a single bounded
//! queue consumed by the pipeline task. When the queue is full, outputs are
//! dropped (with a counter increment) rather than blocking — this preserves
//! liveness of faster adapters when a downstream stage is slow.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mpls_watch_common::Report;
use rand::Rng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::adapters::{AdapterError, AdapterKind, SourceAdapter};

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub queue_capacity: usize,
    pub adapter_deadline: Duration,
    pub shutdown_grace: Duration,
    pub max_consecutive_transient_failures: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            adapter_deadline: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(10),
            max_consecutive_transient_failures: 5,
        }
    }
}

/// Live counters surfaced to the pipeline's periodic health log.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    pub dropped_for_backpressure: AtomicU64,
    pub adapters_disabled: AtomicU64,
}

/// One adapter registration: its identity plus its poll interval.
pub struct AdapterRegistration {
    pub name: String,
    pub interval: Duration,
    pub adapter: Box<dyn SourceAdapter>,
}

pub struct Scheduler {
    config: SchedulerConfig,
    pub stats: Arc<SchedulerStats>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            stats: Arc::new(SchedulerStats::default()),
        }
    }

    /// Build the bounded output queue. The pipeline task owns the receiver.
    pub fn make_queue(&self) -> (mpsc::Sender<Report>, mpsc::Receiver<Report>) {
        mpsc::channel(self.config.queue_capacity)
    }

    /// Spawn one logical task per adapter. Returns the join handles so the
    /// caller can await clean shutdown, and a `watch` sender used to signal
    /// shutdown to every adapter task at once.
    pub fn spawn_all(
        &self,
        adapters: Vec<AdapterRegistration>,
        tx: mpsc::Sender<Report>,
    ) -> (Vec<JoinHandle<()>>, watch::Sender<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handles = adapters
            .into_iter()
            .map(|reg| {
                let tx = tx.clone();
                let stats = self.stats.clone();
                let shutdown_rx = shutdown_rx.clone();
                let deadline = self.config.adapter_deadline;
                let max_failures = self.config.max_consecutive_transient_failures;
                tokio::spawn(run_adapter_loop(
                    reg.name,
                    reg.interval,
                    deadline,
                    max_failures,
                    reg.adapter,
                    tx,
                    stats,
                    shutdown_rx,
                ))
            })
            .collect();

        (handles, shutdown_tx)
    }

    /// Signal shutdown, then wait up to `shutdown_grace` for adapter tasks
    /// to drain in-flight polls before returning. Tasks still running after
    /// the grace period are left to finish in the background — callers that
    /// need a hard stop should drop the join handles.
    pub async fn shutdown(&self, shutdown_tx: watch::Sender<bool>, handles: Vec<JoinHandle<()>>) {
        let _ = shutdown_tx.send(true);
        let drain = futures::future::join_all(handles);
        match tokio::time::timeout(self.config.shutdown_grace, drain).await {
            Ok(_) => info!("scheduler drained all adapters before grace period elapsed"),
            Err(_) => warn!("scheduler grace period elapsed with adapters still in flight"),
        }
    }
}

/// Apply ±10% jitter to an interval, per spec §4.2 ("avoid thundering herds
/// against shared upstreams").
fn jittered(interval: Duration) -> Duration {
    let base = interval.as_secs_f64();
    let factor = rand::rng().random_range(0.9..=1.1);
    Duration::from_secs_f64((base * factor).max(0.0))
}

async fn run_adapter_loop(
    name: String,
    interval: Duration,
    deadline: Duration,
    max_consecutive_failures: u32,
    mut adapter: Box<dyn SourceAdapter>,
    tx: mpsc::Sender<Report>,
    stats: Arc<SchedulerStats>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut consecutive_transient = 0u32;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        match tokio::time::timeout(deadline, adapter.poll()).await {
            Ok(Ok(reports)) => {
                consecutive_transient = 0;
                let mut accepted = 0usize;
                let mut dropped = 0usize;
                for report in reports {
                    match tx.try_send(report) {
                        Ok(()) => accepted += 1,
                        Err(_) => {
                            dropped += 1;
                            stats.dropped_for_backpressure.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                if accepted > 0 || dropped > 0 {
                    info!(adapter = %name, accepted, dropped, "poll complete");
                }
            }
            Ok(Err(AdapterError::Transient(message))) => {
                consecutive_transient += 1;
                warn!(adapter = %name, message, consecutive_transient, "adapter transient failure");
                if consecutive_transient >= max_consecutive_failures {
                    error!(adapter = %name, "adapter disabled after repeated transient failures");
                    stats.adapters_disabled.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }
            Ok(Err(AdapterError::Permanent(message))) => {
                error!(adapter = %name, message, "adapter permanently disabled");
                stats.adapters_disabled.fetch_add(1, Ordering::Relaxed);
                break;
            }
            Err(_elapsed) => {
                consecutive_transient += 1;
                warn!(adapter = %name, deadline = ?deadline, "poll exceeded deadline");
                if consecutive_transient >= max_consecutive_failures {
                    error!(adapter = %name, "adapter disabled after repeated deadline overruns");
                    stats.adapters_disabled.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(jittered(interval)) => {}
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}
