use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Haversine great-circle distance between two lat/lon points in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Coarse source-level priority governing single-source alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    High,
    Normal,
}

impl std::fmt::Display for TrustTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrustTier::High => write!(f, "high"),
            TrustTier::Normal => write!(f, "normal"),
        }
    }
}

/// The derived relevance verdict produced by the filter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Relevant,
    RejectedStale,
    RejectedIrrelevant,
    RejectedNews,
    RejectedOutOfRegion,
}

impl Verdict {
    pub fn is_relevant(self) -> bool {
        matches!(self, Verdict::Relevant)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Relevant => "relevant",
            Verdict::RejectedStale => "rejected_stale",
            Verdict::RejectedIrrelevant => "rejected_irrelevant",
            Verdict::RejectedNews => "rejected_news",
            Verdict::RejectedOutOfRegion => "rejected_out_of_region",
        };
        write!(f, "{s}")
    }
}

/// A place name resolved by the Location Extractor, with its confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedLocation {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub confidence: f64,
}

impl ExtractedLocation {
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// A single observation of possible enforcement activity, from one source at
/// one timestamp. Immutable once `verdict` has been set by the filter stage
/// and `locations` has been populated by the extractor.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Report {
    /// `source_name + source_local_id`; globally unique (invariant I7).
    pub dedup_key: String,
    pub source_name: String,
    pub trust: TrustTier,
    pub observed_at: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
    pub content: String,
    pub author: Option<String>,
    pub url: Option<String>,
    /// Coordinates some sources carry directly, pre-extraction.
    pub coords: Option<GeoPoint>,
    /// Populated by the Location Extractor; empty until that stage runs.
    pub locations: Vec<ExtractedLocation>,
    /// Populated by the Filter stage; `None` until that stage runs.
    pub verdict: Option<Verdict>,
}

impl Report {
    /// The best-confidence resolved location, if any.
    pub fn best_location(&self) -> Option<&ExtractedLocation> {
        self.locations
            .iter()
            .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap())
    }
}

/// Why a report was scheduled or skipped for correlation — used only in
/// tracing/debug output, not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    New,
    Update,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::New => write!(f, "NEW"),
            AlertKind::Update => write!(f, "UPDATE"),
        }
    }
}

/// One emitted-alert record, appended to `Cluster::alerts_emitted`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AlertRecord {
    pub kind: AlertKind,
    pub timestamp: DateTime<Utc>,
    pub member_count_at_emit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClusterState {
    Active,
    Expired,
}

/// A hypothesized incident: a set of reports the Correlator believes describe
/// the same real-world event.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Cluster {
    pub id: Uuid,
    pub centroid: GeoPoint,
    pub label: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Member dedup keys, in arrival order (invariant I2: never empty).
    pub members: Vec<String>,
    pub state: ClusterState,
    pub confidence: f64,
    pub alerts_emitted: Vec<AlertRecord>,
}

impl Cluster {
    pub fn new(id: Uuid, first_member: &Report) -> Self {
        let centroid = first_member
            .best_location()
            .map(|l| l.point())
            .or(first_member.coords)
            .unwrap_or(GeoPoint { lat: 0.0, lon: 0.0 });

        Self {
            id,
            centroid,
            label: first_member.best_location().map(|l| l.name.clone()),
            first_seen: first_member.observed_at,
            last_updated: first_member.observed_at,
            members: vec![first_member.dedup_key.clone()],
            state: ClusterState::Active,
            confidence: 0.0,
            alerts_emitted: Vec::new(),
        }
    }

    /// Distinct source names among members — recomputed from the report set
    /// the caller has on hand, since the Cluster itself only tracks dedup keys.
    pub fn source_diversity(members: &[&Report]) -> usize {
        members
            .iter()
            .map(|r| r.source_name.as_str())
            .collect::<std::collections::HashSet<_>>()
            .len()
    }

    pub fn has_new_alert(&self) -> bool {
        self.alerts_emitted
            .iter()
            .any(|a| a.kind == AlertKind::New)
    }

    pub fn next_sequence_number(&self) -> usize {
        self.alerts_emitted.len()
    }
}
