//! The Correlator (spec §4.5): the pipeline's central, single-writer
//! component. Maintains the `ACTIVE` cluster set in memory, keyed by id,
//! with a ~1km grid index for candidate lookup, and decides whether an
//! incoming report joins an existing cluster or seeds a new one.
//!
//! Pure over in-memory state: no I/O happens here. The pipeline task is
//! responsible for persisting whatever this module hands back (newly
//! created/updated clusters, expired clusters, alert records).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use mpls_watch_common::{
    haversine_km, AlertKind, AlertRecord, Cluster, ClusterState, Config, GeoPoint, Report, TrustTier,
};
use uuid::Uuid;

const GRID_BUCKET_KM: f64 = 1.0;

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "of", "for", "with", "is", "are", "was",
    "were", "be", "been", "it", "this", "that", "these", "those", "by", "from", "as", "near", "about",
];

#[derive(Debug, Clone, Copy)]
pub struct CorrelatorConfig {
    pub temporal_window: Duration,
    pub geo_window_km: f64,
    pub sim_threshold: f64,
    pub cluster_expiry: Duration,
    pub min_corroboration_sources: usize,
}

impl CorrelatorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            temporal_window: config.temporal_window(),
            geo_window_km: config.geo_window_km,
            sim_threshold: config.sim_threshold,
            cluster_expiry: config.cluster_expiry(),
            min_corroboration_sources: config.min_corroboration_sources,
        }
    }
}

/// A cluster assignment worth notifying about.
#[derive(Debug, Clone)]
pub struct EmissionCandidate {
    pub cluster: Cluster,
    pub kind: AlertKind,
}

/// What processing one report through the Correlator produced: at most one
/// emission candidate, plus any clusters that aged out this tick.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// The cluster the report ended up assigned to or seeding, whether or
    /// not that produced an emission. Callers persist this unconditionally.
    pub cluster: Cluster,
    pub emission: Option<EmissionCandidate>,
    pub expired: Vec<Cluster>,
}

/// Tokenize, lowercasing and dropping punctuation and short stopwords.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1 && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

fn term_frequencies(tokens: &[String]) -> HashMap<String, f64> {
    let mut tf: HashMap<String, f64> = HashMap::new();
    for token in tokens {
        *tf.entry(token.clone()).or_insert(0.0) += 1.0;
    }
    let total = tokens.len() as f64;
    if total > 0.0 {
        for v in tf.values_mut() {
            *v /= total;
        }
    }
    tf
}

/// TF-IDF cosine similarity between two documents, with idf computed over
/// the two-document corpus formed by the comparison itself (spec §4.5: "a
/// fixed vocabulary built lazily from observed tokens" — here, the tokens
/// observed in this particular comparison; see DESIGN.md for the rationale).
fn content_similarity(doc_a: &str, doc_b: &str) -> f64 {
    let tokens_a = tokenize(doc_a);
    let tokens_b = tokenize(doc_b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    let tf_a = term_frequencies(&tokens_a);
    let tf_b = term_frequencies(&tokens_b);

    let vocab: HashSet<&String> = tf_a.keys().chain(tf_b.keys()).collect();
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for term in vocab {
        let df = usize::from(tf_a.contains_key(term)) + usize::from(tf_b.contains_key(term));
        let idf = (3.0 / (df as f64 + 1.0)).ln() + 1.0;
        let wa = tf_a.get(term).copied().unwrap_or(0.0) * idf;
        let wb = tf_b.get(term).copied().unwrap_or(0.0) * idf;
        dot += wa * wb;
        norm_a += wa * wa;
        norm_b += wb * wb;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

fn lat_step() -> f64 {
    GRID_BUCKET_KM / 111.0
}

fn lon_step(lat: f64) -> f64 {
    GRID_BUCKET_KM / (111.0 * lat.to_radians().cos().abs().max(0.01))
}

fn grid_key(point: GeoPoint) -> (i64, i64) {
    ((point.lat / lat_step()).floor() as i64, (point.lon / lon_step(point.lat)).floor() as i64)
}

/// The in-memory correlation engine. Owns the active cluster set, a side
/// table of member reports (needed to recompute centroids and TF-IDF
/// documents), and the spatial grid index over cluster centroids.
pub struct Correlator {
    config: CorrelatorConfig,
    active: HashMap<Uuid, Cluster>,
    members: HashMap<String, Report>,
    grid: HashMap<(i64, i64), HashSet<Uuid>>,
    cluster_grid_key: HashMap<Uuid, (i64, i64)>,
}

impl Correlator {
    pub fn new(config: CorrelatorConfig) -> Self {
        Self {
            config,
            active: HashMap::new(),
            members: HashMap::new(),
            grid: HashMap::new(),
            cluster_grid_key: HashMap::new(),
        }
    }

    /// Restore `ACTIVE` clusters and their member reports from the Store on
    /// startup (spec §4.7, §9).
    pub fn warm_start(&mut self, clusters: Vec<Cluster>, members: Vec<Report>) {
        for report in members {
            self.members.insert(report.dedup_key.clone(), report);
        }
        for cluster in clusters {
            if cluster.state != ClusterState::Active {
                continue;
            }
            let key = grid_key(cluster.centroid);
            self.grid.entry(key).or_default().insert(cluster.id);
            self.cluster_grid_key.insert(cluster.id, key);
            self.active.insert(cluster.id, cluster);
        }
    }

    pub fn active_cluster_count(&self) -> usize {
        self.active.len()
    }

    /// Process one filtered, relevant report through expire/match/assign or
    /// create, in that fixed order (spec §4.5 a-d).
    pub fn process_report(&mut self, report: Report, now: DateTime<Utc>) -> ProcessOutcome {
        let expired = self.expire_clusters(now);

        let (cluster, kind) = match self.find_best_match(&report) {
            Some(cluster_id) => self.assign(cluster_id, report),
            None => self.create_cluster(report),
        };
        let emission = kind.map(|kind| EmissionCandidate { cluster: cluster.clone(), kind });

        ProcessOutcome { cluster, emission, expired }
    }

    /// Append a successfully-dispatched alert to its cluster's history.
    /// Called by the Notifier after a 2xx response (spec §4.6).
    pub fn record_alert(&mut self, cluster_id: Uuid, record: AlertRecord) -> Option<Cluster> {
        let cluster = self.active.get_mut(&cluster_id)?;
        cluster.alerts_emitted.push(record);
        Some(cluster.clone())
    }

    fn expire_clusters(&mut self, now: DateTime<Utc>) -> Vec<Cluster> {
        let expired_ids: Vec<Uuid> = self
            .active
            .iter()
            .filter(|(_, c)| now - c.last_updated > self.config.cluster_expiry)
            .map(|(id, _)| *id)
            .collect();

        let mut expired = Vec::with_capacity(expired_ids.len());
        for id in expired_ids {
            if let Some(mut cluster) = self.active.remove(&id) {
                cluster.state = ClusterState::Expired;
                if let Some(key) = self.cluster_grid_key.remove(&id) {
                    if let Some(bucket) = self.grid.get_mut(&key) {
                        bucket.remove(&id);
                    }
                }
                for member_key in &cluster.members {
                    self.members.remove(member_key);
                }
                expired.push(cluster);
            }
        }
        expired
    }

    fn cluster_content(&self, cluster: &Cluster) -> String {
        cluster
            .members
            .iter()
            .filter_map(|k| self.members.get(k))
            .map(|r| r.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn candidate_ids(&self, report: &Report) -> HashSet<Uuid> {
        match report.best_location() {
            Some(loc) => {
                let point = loc.point();
                let radius_buckets = (self.config.geo_window_km / GRID_BUCKET_KM).ceil() as i64 + 1;
                let (lat_idx, lon_idx) = grid_key(point);
                let mut ids = HashSet::new();
                for d_lat in -radius_buckets..=radius_buckets {
                    for d_lon in -radius_buckets..=radius_buckets {
                        if let Some(bucket) = self.grid.get(&(lat_idx + d_lat, lon_idx + d_lon)) {
                            ids.extend(bucket.iter().copied());
                        }
                    }
                }
                ids
            }
            None => {
                // No location on R: only clusters already containing a
                // member from the same source and author are candidates
                // (spec §4.5 geographic predicate, no-location branch).
                self.active
                    .keys()
                    .copied()
                    .filter(|id| self.has_same_observer(&self.active[id], report))
                    .collect()
            }
        }
    }

    fn has_same_observer(&self, cluster: &Cluster, report: &Report) -> bool {
        let Some(author) = report.author.as_deref() else {
            return false;
        };
        cluster.members.iter().filter_map(|k| self.members.get(k)).any(|m| {
            m.source_name == report.source_name && m.author.as_deref() == Some(author)
        })
    }

    fn matches(&self, cluster: &Cluster, report: &Report) -> bool {
        let temporal_ok = (report.observed_at - cluster.last_updated).abs() <= self.config.temporal_window;
        if !temporal_ok {
            return false;
        }

        let geo_ok = match report.best_location() {
            Some(loc) => {
                haversine_km(cluster.centroid.lat, cluster.centroid.lon, loc.lat, loc.lon)
                    <= self.config.geo_window_km
            }
            None => self.has_same_observer(cluster, report),
        };
        if !geo_ok {
            return false;
        }

        let sim = content_similarity(&report.content, &self.cluster_content(cluster));
        sim >= self.config.sim_threshold
    }

    fn composite_score(&self, cluster: &Cluster, report: &Report) -> f64 {
        let sim = content_similarity(&report.content, &self.cluster_content(cluster));
        let geo_term = match report.best_location() {
            Some(loc) => {
                let dist = haversine_km(cluster.centroid.lat, cluster.centroid.lon, loc.lat, loc.lon);
                (1.0 - dist / self.config.geo_window_km).clamp(0.0, 1.0)
            }
            None => 1.0,
        };
        let time_gap_hours = (report.observed_at - cluster.last_updated).num_milliseconds().unsigned_abs() as f64
            / 3_600_000.0;
        let window_hours = self.config.temporal_window.num_milliseconds() as f64 / 3_600_000.0;
        let time_term = (1.0 - time_gap_hours / window_hours).clamp(0.0, 1.0);

        0.5 * sim + 0.3 * geo_term + 0.2 * time_term
    }

    fn find_best_match(&self, report: &Report) -> Option<Uuid> {
        let mut best: Option<(Uuid, f64, DateTime<Utc>)> = None;
        for id in self.candidate_ids(report) {
            let cluster = &self.active[&id];
            if !self.matches(cluster, report) {
                continue;
            }
            let score = self.composite_score(cluster, report);
            let better = match &best {
                None => true,
                Some((_, best_score, best_first_seen)) => {
                    score > *best_score || (score == *best_score && cluster.first_seen < *best_first_seen)
                }
            };
            if better {
                best = Some((id, score, cluster.first_seen));
            }
        }
        best.map(|(id, _, _)| id)
    }

    fn weighted_centroid(member_reports: &[&Report], fallback: GeoPoint) -> GeoPoint {
        let mut weighted_lat = 0.0;
        let mut weighted_lon = 0.0;
        let mut total_weight = 0.0;

        for report in member_reports {
            if let Some(loc) = report.best_location() {
                weighted_lat += loc.lat * loc.confidence;
                weighted_lon += loc.lon * loc.confidence;
                total_weight += loc.confidence;
            }
        }

        if total_weight > 0.0 {
            GeoPoint {
                lat: weighted_lat / total_weight,
                lon: weighted_lon / total_weight,
            }
        } else {
            fallback
        }
    }

    fn compute_confidence(member_reports: &[&Report], span_hours: f64, window_hours: f64) -> f64 {
        let diversity = Cluster::source_diversity(member_reports);
        let div_term = (diversity as f64 / 3.0).min(1.0);
        let count_term = (member_reports.len() as f64 / 5.0).min(1.0);
        let time_term = (1.0 - span_hours / window_hours).clamp(0.0, 1.0);
        let loc_confidences: Vec<f64> = member_reports.iter().filter_map(|r| r.best_location().map(|l| l.confidence)).collect();
        let loc_term = if loc_confidences.is_empty() {
            0.0
        } else {
            loc_confidences.iter().sum::<f64>() / loc_confidences.len() as f64
        };

        (0.35 * div_term + 0.25 * count_term + 0.20 * time_term + 0.20 * loc_term).clamp(0.0, 1.0)
    }

    /// Takes `min_corroboration_sources` by value rather than `&self` so
    /// callers can invoke it while already holding a `&mut` into
    /// `self.active` (see `assign`).
    fn decide_kind(min_corroboration_sources: usize, cluster: &Cluster, member_reports: &[&Report]) -> Option<AlertKind> {
        if !cluster.alerts_emitted.is_empty() {
            return Some(AlertKind::Update);
        }
        let trust_high = member_reports.iter().any(|r| r.trust == TrustTier::High);
        if trust_high {
            return Some(AlertKind::New);
        }
        let diversity = Cluster::source_diversity(member_reports);
        if diversity >= min_corroboration_sources {
            Some(AlertKind::New)
        } else {
            None
        }
    }

    fn move_in_grid(&mut self, cluster_id: Uuid, new_point: GeoPoint) {
        let new_key = grid_key(new_point);
        if let Some(old_key) = self.cluster_grid_key.get(&cluster_id).copied() {
            if old_key == new_key {
                return;
            }
            if let Some(bucket) = self.grid.get_mut(&old_key) {
                bucket.remove(&cluster_id);
            }
        }
        self.grid.entry(new_key).or_default().insert(cluster_id);
        self.cluster_grid_key.insert(cluster_id, new_key);
    }

    fn assign(&mut self, cluster_id: Uuid, report: Report) -> (Cluster, Option<AlertKind>) {
        self.members.insert(report.dedup_key.clone(), report.clone());
        let observed_at = report.observed_at;
        let min_corroboration_sources = self.config.min_corroboration_sources;
        let window_hours = self.config.temporal_window.num_milliseconds() as f64 / 3_600_000.0;

        let cluster = self.active.get_mut(&cluster_id).expect("candidate id must be active");
        cluster.members.push(report.dedup_key.clone());
        cluster.last_updated = cluster.last_updated.max(observed_at);

        let member_reports: Vec<&Report> = cluster.members.iter().filter_map(|k| self.members.get(k)).collect();
        let centroid = Self::weighted_centroid(&member_reports, cluster.centroid);

        let earliest = member_reports.iter().map(|r| r.observed_at).min().expect("cluster never empty");
        let latest = member_reports.iter().map(|r| r.observed_at).max().expect("cluster never empty");
        let span_hours = (latest - earliest).num_milliseconds() as f64 / 3_600_000.0;
        let confidence = Self::compute_confidence(&member_reports, span_hours, window_hours);
        let kind = Self::decide_kind(min_corroboration_sources, cluster, &member_reports);

        cluster.centroid = centroid;
        cluster.confidence = confidence;
        let snapshot = cluster.clone();

        self.move_in_grid(cluster_id, centroid);

        (snapshot, kind)
    }

    fn create_cluster(&mut self, report: Report) -> (Cluster, Option<AlertKind>) {
        let id = Uuid::new_v4();
        let mut cluster = Cluster::new(id, &report);
        let trust = report.trust;
        let member_reports = [&report];
        cluster.confidence = Self::compute_confidence(&member_reports, 0.0, self.config.temporal_window.num_milliseconds() as f64 / 3_600_000.0);

        self.members.insert(report.dedup_key.clone(), report);
        let key = grid_key(cluster.centroid);
        self.grid.entry(key).or_default().insert(id);
        self.cluster_grid_key.insert(id, key);

        let snapshot = cluster.clone();
        self.active.insert(id, cluster);

        let kind = if trust == TrustTier::High { Some(AlertKind::New) } else { None };
        (snapshot, kind)
    }
}
