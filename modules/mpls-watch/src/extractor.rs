//! The Location Extractor (spec §4.4): turns report content into zero or
//! more `ExtractedLocation` candidates, ranked by confidence.
//!
//! Candidate generation is split from gazetteer resolution behind a
//! `NameExtractor` trait so a real NER backend can be swapped in later
//! without touching the resolution or confidence rules. Degraded mode (no
//! NER backend configured) still resolves pre-existing coordinates and
//! gazetteer substring matches; it just can't propose novel candidate
//! strings, so its ceiling confidence is the gazetteer's 0.9.

use mpls_watch_common::{gazetteer, ExtractedLocation, Report};
use tracing::warn;

/// Proposes location-name candidate strings from free text. A production
/// NER model would implement this; `GazetteerOnlyExtractor` is the
/// degraded-mode fallback used when none is configured.
pub trait NameExtractor: Send + Sync {
    /// Candidate place-name substrings found in `content`, in no particular
    /// order. Empty is a valid answer (no candidates found).
    fn candidates(&self, content: &str) -> Vec<String>;

    /// Whether this extractor can itself resolve candidates it didn't
    /// recognize from the static gazetteer. `false` caps output confidence
    /// at the gazetteer ceiling (spec §9 degraded-mode note).
    fn is_full_ner(&self) -> bool;
}

/// Degraded-mode extractor: proposes no novel candidates of its own, relies
/// entirely on gazetteer substring scanning of the raw content. This is the
/// extractor wired up when no NER capability is configured at startup.
pub struct GazetteerOnlyExtractor;

impl NameExtractor for GazetteerOnlyExtractor {
    fn candidates(&self, _content: &str) -> Vec<String> {
        Vec::new()
    }

    fn is_full_ner(&self) -> bool {
        false
    }
}

/// Scans `content` directly against the gazetteer's known terms, without
/// requiring the extractor to propose candidate substrings first. This is
/// how `GazetteerOnlyExtractor` still finds matches despite contributing no
/// candidates of its own.
fn scan_known_terms(content: &str) -> Vec<String> {
    let lower = content.to_lowercase();
    let mut found = Vec::new();

    for entry in gazetteer::NEIGHBORHOODS {
        if lower.contains(entry.normalized) {
            found.push(entry.normalized.to_string());
        }
    }
    for entry in gazetteer::CITIES {
        if lower.contains(entry.normalized) {
            found.push(entry.normalized.to_string());
        }
    }
    found
}

/// Resolve every location signal in a report: pre-existing coordinates (if
/// any, confidence 1.0), plus NER/gazetteer candidates resolved through the
/// neighborhood (0.9) and city (0.5) tiers. Logged once at startup whether
/// NER is available (spec §9): callers should log degraded mode before the
/// first `extract` call, not on every report.
pub fn extract(report: &Report, extractor: &dyn NameExtractor) -> Vec<ExtractedLocation> {
    let mut locations = Vec::new();

    if let Some(coords) = report.coords {
        locations.push(ExtractedLocation {
            name: "reported coordinates".to_string(),
            lat: coords.lat,
            lon: coords.lon,
            confidence: 1.0,
        });
    }

    let mut candidates = extractor.candidates(&report.content);
    candidates.extend(scan_known_terms(&report.content));
    candidates.sort();
    candidates.dedup();

    for candidate in candidates {
        if let Some((name, point, confidence)) = gazetteer::lookup_neighborhood(&candidate) {
            locations.push(ExtractedLocation {
                name: name.to_string(),
                lat: point.lat,
                lon: point.lon,
                confidence,
            });
        } else if let Some((name, point, confidence)) = gazetteer::lookup_city(&candidate) {
            locations.push(ExtractedLocation {
                name: name.to_string(),
                lat: point.lat,
                lon: point.lon,
                confidence,
            });
        }
    }

    locations.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());
    locations.dedup_by(|a, b| a.name == b.name);
    locations
}

/// Log the extractor's capability once at startup (spec §9): a degraded
/// deployment without NER should be visibly distinguishable in logs from a
/// fully capable one, since it silently caps location confidence at 0.9.
pub fn log_capability_once(extractor: &dyn NameExtractor) {
    if extractor.is_full_ner() {
        tracing::info!("location extractor: full NER backend configured");
    } else {
        warn!("location extractor: running in degraded gazetteer-only mode (no NER backend configured); location confidence capped at 0.9");
    }
}
