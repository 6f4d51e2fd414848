//! The Filter stage (spec §4.3): a (mostly) pure `Report -> Verdict`
//! function, plus the dedup lookup that must run between the freshness and
//! relevance checks. Stages run in fixed order; the first rejection wins.

use std::sync::OnceLock;

use chrono::Duration;
use mpls_watch_common::{gazetteer, haversine_km, Config, GeoPoint, Report, Verdict};
use regex::Regex;

/// Enforcement-activity keywords, case-insensitive, whole-word (spec §6).
const KEYWORDS: &[&str] = &[
    "ice",
    "i.c.e.",
    "ero",
    "cbp",
    "border patrol",
    "raid",
    "raids",
    "detention",
    "detained",
    "agents",
    "agent",
    "enforcement",
    "deportation",
    "la migra",
    "immigration",
];

/// Contextual cues that disambiguate a bare "ice" match from hockey/weather
/// chatter (spec §4.3.3).
const ICE_DISAMBIGUATION_CUES: &[&str] = &["agent", "agents", "raid", "van", "checkpoint", "detain", "deport"];

/// Real-time signal tokens for the news-article rejection stage (spec §6).
const REAL_TIME_TOKENS: &[&str] = &[
    "right now",
    "currently",
    "happening",
    "on scene",
    "minutes ago",
    "this morning",
];

/// Retrospective markers that force a news-source rejection even when a
/// real-time token is also present (spec §4.3.5).
const RETROSPECTIVE_MARKERS: &[&str] = &[
    "yesterday",
    "last week",
    "last month",
    "last year",
    "court ruling",
    "policy",
    "announced",
];

fn word_regex(term: &str) -> Regex {
    // Terms containing punctuation (e.g. "i.c.e.") or spaces (e.g. "border
    // patrol") can't use \b on both sides around the literal punctuation, so
    // escape the term and anchor on non-word boundaries instead.
    let escaped = regex::escape(term);
    Regex::new(&format!(r"(?i)(?:^|[^\w]){escaped}(?:$|[^\w])")).expect("valid generated regex")
}

fn contains_word(content: &str, term: &str) -> bool {
    // Pad so a match at the very start/end of the string still has a
    // non-word boundary character on each side.
    let padded = format!(" {content} ");
    word_regex(term).is_match(&padded)
}

fn past_date_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(20\d{2}|jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?|aug(?:ust)?|sep(?:tember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\s+\d{1,2}\b")
            .expect("valid regex")
    })
}

/// Stage 1 — freshness. `true` means the report passes (is fresh enough).
/// Exactly at the boundary (`ingested - observed == fresh_max`) still
/// passes; strictly greater is rejected (spec §8 boundary behavior).
pub fn check_freshness(report: &Report, fresh_max: Duration) -> bool {
    report.ingested_at - report.observed_at <= fresh_max
}

/// Stage 3 — relevance. Requires at least one whole-word keyword match; a
/// bare "ice" match additionally requires a co-occurring contextual cue.
pub fn check_relevance(content: &str) -> bool {
    let mut matched_non_ice = false;
    let mut matched_bare_ice = false;

    for &kw in KEYWORDS {
        if kw == "ice" {
            if contains_word(content, "ice") {
                matched_bare_ice = true;
            }
        } else if contains_word(content, kw) {
            matched_non_ice = true;
        }
    }

    if matched_non_ice {
        return true;
    }
    if matched_bare_ice {
        return ICE_DISAMBIGUATION_CUES.iter().any(|cue| contains_word(content, cue));
    }
    false
}

/// Stage 4 — geographic scope. Accepts on a known Minneapolis-area token in
/// the content, OR pre-resolved coordinates within `max_distance_km` of the
/// downtown reference point (spec §4.3.4): either test passing is enough,
/// so a report with in-region content but out-of-region coordinates (or
/// vice versa) still passes. Coordinates exactly at the boundary are
/// in-scope (spec §8 boundary behavior).
pub fn check_geo_scope(report: &Report, center: GeoPoint, max_distance_km: f64) -> bool {
    let coords_ok = report
        .coords
        .is_some_and(|coords| haversine_km(center.lat, center.lon, coords.lat, coords.lon) <= max_distance_km);
    if coords_ok {
        return true;
    }

    let lower = report.content.to_lowercase();
    gazetteer::geo_scope_terms()
        .iter()
        .any(|term| lower.contains(&term.to_lowercase()))
}

/// Stage 5 — news-article rejection. Only applies to `news-rss` sources.
/// Rejects unless a real-time signal is present and no retrospective marker
/// is present.
pub fn check_news_rejection(content: &str, is_news_source: bool) -> bool {
    if !is_news_source {
        return false;
    }

    let lower = content.to_lowercase();
    let has_real_time_signal = REAL_TIME_TOKENS.iter().any(|t| lower.contains(t));
    let has_retrospective_marker =
        RETROSPECTIVE_MARKERS.iter().any(|m| lower.contains(m)) || past_date_token_regex().is_match(content);

    !has_real_time_signal || has_retrospective_marker
}

/// Run stages 3–5 against an already-fresh, non-duplicate report. Stages 1
/// (freshness) and 2 (dedup) are handled by the caller, since freshness is
/// a pure timestamp check done before any store lookup and dedup requires
/// an async Store round-trip.
pub fn classify_content(report: &Report, is_news_source: bool, config: &Config) -> Verdict {
    if !check_relevance(&report.content) {
        return Verdict::RejectedIrrelevant;
    }

    let center = GeoPoint {
        lat: config.center_lat,
        lon: config.center_lon,
    };
    if !check_geo_scope(report, center, config.max_distance_km) {
        return Verdict::RejectedOutOfRegion;
    }

    if check_news_rejection(&report.content, is_news_source) {
        return Verdict::RejectedNews;
    }

    Verdict::Relevant
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mpls_watch_common::TrustTier;

    fn report(content: &str) -> Report {
        Report {
            dedup_key: "src:1".into(),
            source_name: "src".into(),
            trust: TrustTier::High,
            observed_at: Utc::now(),
            ingested_at: Utc::now(),
            content: content.to_string(),
            author: None,
            url: None,
            coords: None,
            locations: vec![],
            verdict: None,
        }
    }

    #[test]
    fn freshness_boundary_exact_passes_strictly_over_rejects() {
        let fresh_max = Duration::hours(3);
        let observed = Utc::now();
        let exact = Report {
            ingested_at: observed + fresh_max,
            ..report("x")
        };
        assert!(check_freshness(&exact, fresh_max));

        let over = Report {
            ingested_at: observed + fresh_max + Duration::seconds(1),
            ..report("x")
        };
        assert!(!check_freshness(&over, fresh_max));
    }

    #[test]
    fn relevance_requires_keyword() {
        assert!(check_relevance("ICE agents at 5th and Hennepin right now"));
        assert!(!check_relevance("Minnesota Wild win in overtime"));
    }

    #[test]
    fn bare_ice_needs_disambiguation_cue() {
        assert!(!check_relevance("ice on the roads this morning, drive safe"));
        assert!(check_relevance("ICE van spotted, agents getting out"));
    }

    #[test]
    fn whole_word_matching_does_not_match_substrings() {
        // "agents" should not fire on unrelated words containing "ice" etc.
        assert!(!check_relevance("the service agency released pricing"));
    }

    #[test]
    fn geo_scope_accepts_known_neighborhood_token() {
        let r = report("ICE raid reported in Uptown this morning");
        assert!(check_geo_scope(&r, gazetteer::DOWNTOWN_MINNEAPOLIS, 50.0));
    }

    #[test]
    fn geo_scope_rejects_out_of_region_coords() {
        let mut r = report("ICE raid happening");
        r.coords = Some(GeoPoint { lat: 38.6270, lon: -90.1994 }); // St. Louis
        assert!(!check_geo_scope(&r, gazetteer::DOWNTOWN_MINNEAPOLIS, 50.0));
    }

    #[test]
    fn geo_scope_boundary_exact_distance_is_in_scope() {
        // ~50km due north of downtown Minneapolis.
        let center = gazetteer::DOWNTOWN_MINNEAPOLIS;
        let delta_lat = 50.0 / 111.0; // ~1 deg latitude per ~111km
        let r = Report {
            coords: Some(GeoPoint { lat: center.lat + delta_lat, lon: center.lon }),
            ..report("ICE raid happening")
        };
        let dist = haversine_km(center.lat, center.lon, r.coords.unwrap().lat, r.coords.unwrap().lon);
        assert!(check_geo_scope(&r, center, dist));
    }

    #[test]
    fn news_rejection_requires_real_time_signal() {
        assert!(check_news_rejection("ICE raids in Minneapolis last year drew protests", true));
        assert!(!check_news_rejection("ICE raid happening right now in Minneapolis", true));
    }

    #[test]
    fn news_rejection_retrospective_marker_overrides_real_time_token() {
        // Has "currently" but also a retrospective marker -> still rejected.
        assert!(check_news_rejection(
            "The policy announced last week is currently under review",
            true
        ));
    }

    #[test]
    fn news_rejection_does_not_apply_to_non_news_sources() {
        assert!(!check_news_rejection("ICE raids in Minneapolis last year drew protests", false));
    }
}
