//! The Source Adapter contract (spec §4.1).
//!
//! Scraping mechanics for any individual source are out of scope for this
//! crate — adapters are pluggable collectors. This module defines the
//! contract every adapter must satisfy to plug into the Scheduler, plus a
//! `test-support`-gated mock used by the pipeline's own tests.

use async_trait::async_trait;
use mpls_watch_common::Report;

/// Recognized adapter kinds and their minimum cadence (spec §4.1 table).
/// Cadence itself is configurable per-source; the Scheduler treats every
/// kind uniformly — this enum exists for adapter bookkeeping and defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    CommunityPlatform,
    MicroblogFirehose,
    PhotoPlatform,
    SmsWebMap,
    NewsRss,
}

impl AdapterKind {
    /// Minimum cadence in seconds, per spec §4.1.
    pub fn min_cadence_secs(self) -> u64 {
        match self {
            AdapterKind::CommunityPlatform => 90,
            AdapterKind::MicroblogFirehose => 120,
            AdapterKind::PhotoPlatform => 300,
            AdapterKind::SmsWebMap => 1800,
            AdapterKind::NewsRss => 300,
        }
    }
}

/// An adapter-raised failure, categorized per spec §4.1: `Transient` errors
/// are retried on the next scheduler tick; `Permanent` errors disable the
/// adapter until operator intervention (the Scheduler stops scheduling it).
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdapterError {
    #[error("transient: {0}")]
    Transient(String),
    #[error("permanent: {0}")]
    Permanent(String),
}

/// One pluggable collector. Each poll produces zero or more reports
/// observed since the adapter's last successful poll; adapters own their
/// own pagination cursors.
///
/// Contract (spec §4.1):
/// - MUST populate `Report::dedup_key` deterministically.
/// - MUST set `Report::trust` to the adapter's configured trust tier.
/// - MUST NOT block indefinitely — the Scheduler enforces a deadline around
///   `poll()`, but a well-behaved adapter should respect it directly too.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable adapter/source name, used as the dedup-key prefix.
    fn name(&self) -> &str;

    fn kind(&self) -> AdapterKind;

    /// Collect reports observed since the last successful poll.
    async fn poll(&mut self) -> Result<Vec<Report>, AdapterError>;
}

/// A deterministic, in-memory adapter for tests: replays a fixed queue of
/// reports, one batch per call to `poll`, optionally raising a scripted
/// error on a given call index. Mirrors the teacher's pattern of a
/// `test-support`-gated fixture adapter alongside the real `SourceAdapter`
/// trait (see `rootsignal-scout::testing`).
#[cfg(any(test, feature = "test-support"))]
pub struct MockSourceAdapter {
    name: String,
    kind: AdapterKind,
    batches: std::collections::VecDeque<Result<Vec<Report>, AdapterError>>,
}

#[cfg(any(test, feature = "test-support"))]
impl MockSourceAdapter {
    pub fn new(name: impl Into<String>, kind: AdapterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            batches: std::collections::VecDeque::new(),
        }
    }

    pub fn push_batch(mut self, batch: Vec<Report>) -> Self {
        self.batches.push_back(Ok(batch));
        self
    }

    pub fn push_error(mut self, err: AdapterError) -> Self {
        self.batches.push_back(Err(err));
        self
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl SourceAdapter for MockSourceAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AdapterKind {
        self.kind
    }

    async fn poll(&mut self) -> Result<Vec<Report>, AdapterError> {
        match self.batches.pop_front() {
            Some(result) => result,
            None => Ok(Vec::new()),
        }
    }
}
