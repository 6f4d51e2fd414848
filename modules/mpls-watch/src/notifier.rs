//! The Notifier (spec §4.6). Consumes emission candidates from the
//! Correlator, enforces the NEW/UPDATE idempotency invariants (I3/I4)
//! against `alerts_emitted`, and dispatches to a webhook with bounded
//! exponential-backoff retry. Grounded in the teacher's
//! `rootsignal-scout-supervisor::notify` split of a `NotifyBackend` trait
//! with a real webhook backend and a no-op/log backend for dry runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mpls_watch_common::{AlertKind, AlertRecord, Cluster, IceWatchError};
use serde_json::json;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::correlator::EmissionCandidate;

const BACKOFF_BASE_SECS: u64 = 2;
const BACKOFF_CAP_SECS: u64 = 60;
const MAX_ATTEMPTS: u32 = 5;

/// Outcome classification for a single dispatch attempt (spec §4.6 /
/// §7 error taxonomy).
#[derive(Debug)]
enum DispatchOutcome {
    Success,
    Transient(String),
    Permanent(String),
}

/// Where a notification is actually sent. Mirrors the teacher's
/// `NotifyBackend` trait — a real webhook implementation plus a no-op/log
/// backend selected by `--dry-run`.
#[async_trait]
pub trait NotifyBackend: Send + Sync {
    async fn dispatch(&self, payload: serde_json::Value, idempotency_token: &str) -> DispatchResult;
}

/// What a backend reports back about one attempt. Kept separate from
/// `DispatchOutcome` so backends only need to describe HTTP-level facts;
/// the retry loop owns the transient/permanent classification policy.
pub enum DispatchResult {
    Ok,
    Retryable(String),
    Fatal(String),
}

pub struct WebhookBackend {
    webhook_url: String,
    http: reqwest::Client,
}

impl WebhookBackend {
    pub fn new(webhook_url: String, timeout: std::time::Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client with a fixed timeout should always build");
        Self { webhook_url, http }
    }
}

#[async_trait]
impl NotifyBackend for WebhookBackend {
    async fn dispatch(&self, payload: serde_json::Value, idempotency_token: &str) -> DispatchResult {
        let result = self
            .http
            .post(&self.webhook_url)
            .header("Idempotency-Key", idempotency_token)
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => DispatchResult::Ok,
            Ok(resp) if resp.status().is_client_error() => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                DispatchResult::Fatal(format!("webhook returned {status}: {body}"))
            }
            Ok(resp) => {
                let status = resp.status();
                DispatchResult::Retryable(format!("webhook returned {status}"))
            }
            Err(e) if e.is_timeout() || e.is_connect() => DispatchResult::Retryable(e.to_string()),
            Err(e) => DispatchResult::Retryable(e.to_string()),
        }
    }
}

/// Dry-run backend: logs the would-be payload instead of sending it.
/// Grounded in the teacher's no-op notify backend used for local runs.
pub struct LogSinkBackend;

#[async_trait]
impl NotifyBackend for LogSinkBackend {
    async fn dispatch(&self, payload: serde_json::Value, idempotency_token: &str) -> DispatchResult {
        info!(idempotency_token, payload = %payload, "dry-run: would dispatch alert");
        DispatchResult::Ok
    }
}

fn cluster_payload(cluster: &Cluster, kind: AlertKind, sequence_number: usize) -> serde_json::Value {
    json!({
        "cluster_id": cluster.id,
        "kind": kind.to_string(),
        "sequence_number": sequence_number,
        "centroid": { "lat": cluster.centroid.lat, "lon": cluster.centroid.lon },
        "label": cluster.label,
        "member_count": cluster.members.len(),
        "confidence": cluster.confidence,
        "first_seen": cluster.first_seen,
        "last_updated": cluster.last_updated,
    })
}

/// Resolve the kind actually recorded (I3/I4): a NEW candidate downgrades
/// to UPDATE if a NEW is already on record; an UPDATE candidate upgrades
/// to NEW if none is.
fn resolved_kind(cluster: &Cluster, candidate_kind: AlertKind) -> AlertKind {
    match candidate_kind {
        AlertKind::New if cluster.has_new_alert() => AlertKind::Update,
        AlertKind::Update if !cluster.has_new_alert() => AlertKind::New,
        other => other,
    }
}

/// Dispatch one emission candidate, retrying transient failures with
/// exponential backoff. Returns the `AlertRecord` to persist on success,
/// or `None` if the dispatch was permanently abandoned.
pub async fn notify(backend: &dyn NotifyBackend, candidate: &EmissionCandidate, now: DateTime<Utc>) -> Option<AlertRecord> {
    let kind = resolved_kind(&candidate.cluster, candidate.kind);
    let sequence_number = candidate.cluster.next_sequence_number();
    let idempotency_token = format!("{}/{}", candidate.cluster.id, sequence_number);
    let payload = cluster_payload(&candidate.cluster, kind, sequence_number);

    for attempt in 1..=MAX_ATTEMPTS {
        match classify(backend.dispatch(payload.clone(), &idempotency_token).await) {
            DispatchOutcome::Success => {
                info!(cluster_id = %candidate.cluster.id, %kind, attempt, "alert dispatched");
                return Some(AlertRecord {
                    kind,
                    timestamp: now,
                    member_count_at_emit: candidate.cluster.members.len(),
                });
            }
            DispatchOutcome::Permanent(message) => {
                warn!(cluster_id = %candidate.cluster.id, message, "alert dispatch permanently failed, dropping");
                return None;
            }
            DispatchOutcome::Transient(message) => {
                if attempt == MAX_ATTEMPTS {
                    warn!(cluster_id = %candidate.cluster.id, message, attempts = attempt, "alert dispatch exhausted retries");
                    return None;
                }
                let backoff = backoff_for_attempt(attempt);
                warn!(cluster_id = %candidate.cluster.id, message, attempt, backoff_secs = backoff.as_secs(), "alert dispatch transient failure, retrying");
                sleep(backoff).await;
            }
        }
    }

    None
}

fn classify(result: DispatchResult) -> DispatchOutcome {
    match result {
        DispatchResult::Ok => DispatchOutcome::Success,
        DispatchResult::Retryable(message) => DispatchOutcome::Transient(message),
        DispatchResult::Fatal(message) => DispatchOutcome::Permanent(message),
    }
}

fn backoff_for_attempt(attempt: u32) -> std::time::Duration {
    let secs = BACKOFF_BASE_SECS.saturating_pow(attempt).min(BACKOFF_CAP_SECS);
    std::time::Duration::from_secs(secs)
}

/// Build a backend for the given configuration; selects the log sink under
/// `--dry-run`.
pub fn build_backend(webhook_url: &str, timeout: std::time::Duration, dry_run: bool) -> Result<Box<dyn NotifyBackend>, IceWatchError> {
    if dry_run {
        return Ok(Box::new(LogSinkBackend));
    }
    if webhook_url.is_empty() {
        return Err(IceWatchError::Config("webhook_url is required unless --dry-run is set".to_string()));
    }
    Ok(Box::new(WebhookBackend::new(webhook_url.to_string(), timeout)))
}
