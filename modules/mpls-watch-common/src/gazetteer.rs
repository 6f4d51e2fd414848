//! Static gazetteer: normalized Minneapolis-area place name -> coordinates.
//!
//! Seeded by hand for the metro's commonly-referenced neighborhoods and
//! landmarks, following the teacher's `sources::city_profile` pattern of a
//! hand-curated, region-specific static table rather than a general
//! geocoder. Region-specific by design (spec Non-goals: no cross-region
//! generalization).

use crate::types::GeoPoint;

/// One gazetteer entry: normalized lookup name and canonical display name.
pub struct GazetteerEntry {
    pub normalized: &'static str,
    pub canonical_name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

/// Downtown Minneapolis — the default region reference point (spec §4.3.4).
pub const DOWNTOWN_MINNEAPOLIS: GeoPoint = GeoPoint {
    lat: 44.9778,
    lon: -93.2650,
};

/// Neighborhood- and landmark-level entries (NER-candidate confidence 0.9).
pub const NEIGHBORHOODS: &[GazetteerEntry] = &[
    GazetteerEntry { normalized: "downtown", canonical_name: "Downtown Minneapolis", lat: 44.9778, lon: -93.2650 },
    GazetteerEntry { normalized: "uptown", canonical_name: "Uptown", lat: 44.9483, lon: -93.2983 },
    GazetteerEntry { normalized: "cedar-riverside", canonical_name: "Cedar-Riverside", lat: 44.9686, lon: -93.2428 },
    GazetteerEntry { normalized: "whittier", canonical_name: "Whittier", lat: 44.9605, lon: -93.2813 },
    GazetteerEntry { normalized: "powderhorn", canonical_name: "Powderhorn Park", lat: 44.9425, lon: -93.2500 },
    GazetteerEntry { normalized: "longfellow", canonical_name: "Longfellow", lat: 44.9393, lon: -93.2226 },
    GazetteerEntry { normalized: "phillips", canonical_name: "Phillips", lat: 44.9511, lon: -93.2636 },
    GazetteerEntry { normalized: "lyn-lake", canonical_name: "Lyn-Lake", lat: 44.9483, lon: -93.2880 },
    GazetteerEntry { normalized: "northeast minneapolis", canonical_name: "Northeast Minneapolis", lat: 45.0003, lon: -93.2477 },
    GazetteerEntry { normalized: "north minneapolis", canonical_name: "North Minneapolis", lat: 45.0116, lon: -93.3100 },
    GazetteerEntry { normalized: "south minneapolis", canonical_name: "South Minneapolis", lat: 44.9200, lon: -93.2600 },
    GazetteerEntry { normalized: "lake street", canonical_name: "Lake Street", lat: 44.9483, lon: -93.2600 },
    GazetteerEntry { normalized: "franklin avenue", canonical_name: "Franklin Avenue", lat: 44.9625, lon: -93.2500 },
    GazetteerEntry { normalized: "5th and hennepin", canonical_name: "5th and Hennepin", lat: 44.9806, lon: -93.2714 },
    GazetteerEntry { normalized: "government center", canonical_name: "Hennepin County Government Center", lat: 44.9766, lon: -93.2636 },
    GazetteerEntry { normalized: "midtown", canonical_name: "Midtown", lat: 44.9483, lon: -93.2590 },
    GazetteerEntry { normalized: "st. paul", canonical_name: "St. Paul", lat: 44.9537, lon: -93.0900 },
    GazetteerEntry { normalized: "saint paul", canonical_name: "St. Paul", lat: 44.9537, lon: -93.0900 },
    GazetteerEntry { normalized: "frogtown", canonical_name: "Frogtown, St. Paul", lat: 44.9597, lon: -93.1289 },
    GazetteerEntry { normalized: "west side st. paul", canonical_name: "West Side, St. Paul", lat: 44.9364, lon: -93.0730 },
    GazetteerEntry { normalized: "richfield", canonical_name: "Richfield", lat: 44.8833, lon: -93.2830 },
    GazetteerEntry { normalized: "bloomington", canonical_name: "Bloomington", lat: 44.8408, lon: -93.2983 },
    GazetteerEntry { normalized: "brooklyn center", canonical_name: "Brooklyn Center", lat: 45.0761, lon: -93.3328 },
    GazetteerEntry { normalized: "brooklyn park", canonical_name: "Brooklyn Park", lat: 45.0941, lon: -93.3563 },
    GazetteerEntry { normalized: "st. paul airport", canonical_name: "MSP Airport", lat: 44.8820, lon: -93.2218 },
];

/// City-level fallback entries (NER-candidate confidence 0.5). Broader than
/// the neighborhood list, used when a candidate name doesn't resolve to a
/// specific neighborhood/landmark.
pub const CITIES: &[GazetteerEntry] = &[
    GazetteerEntry { normalized: "minneapolis", canonical_name: "Minneapolis", lat: 44.9778, lon: -93.2650 },
    GazetteerEntry { normalized: "st paul", canonical_name: "St. Paul", lat: 44.9537, lon: -93.0900 },
    GazetteerEntry { normalized: "twin cities", canonical_name: "Twin Cities", lat: 44.9650, lon: -93.1780 },
    GazetteerEntry { normalized: "hennepin county", canonical_name: "Hennepin County", lat: 44.9800, lon: -93.4700 },
    GazetteerEntry { normalized: "ramsey county", canonical_name: "Ramsey County", lat: 45.0170, lon: -93.0370 },
    GazetteerEntry { normalized: "minnesota", canonical_name: "Minnesota", lat: 46.7296, lon: -94.6859 },
];

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Look up a candidate name in the neighborhood-level gazetteer.
/// Returns `(canonical_name, GeoPoint, confidence=0.9)` on a match.
pub fn lookup_neighborhood(name: &str) -> Option<(&'static str, GeoPoint, f64)> {
    let key = normalize(name);
    NEIGHBORHOODS
        .iter()
        .find(|e| e.normalized == key || key.contains(e.normalized))
        .map(|e| (e.canonical_name, GeoPoint { lat: e.lat, lon: e.lon }, 0.9))
}

/// Look up a candidate name in the coarser city-level gazetteer.
/// Returns `(canonical_name, GeoPoint, confidence=0.5)` on a match.
pub fn lookup_city(name: &str) -> Option<(&'static str, GeoPoint, f64)> {
    let key = normalize(name);
    CITIES
        .iter()
        .find(|e| e.normalized == key || key.contains(e.normalized))
        .map(|e| (e.canonical_name, GeoPoint { lat: e.lat, lon: e.lon }, 0.5))
}

/// All geo-scope tokens recognized by the Filter stage's geographic-scope
/// check (spec §4.3.4): city names, neighborhood names, landmark strings.
pub fn geo_scope_terms() -> Vec<&'static str> {
    let mut terms: Vec<&'static str> = NEIGHBORHOODS.iter().map(|e| e.canonical_name).collect();
    terms.extend(CITIES.iter().map(|e| e.canonical_name));
    terms.push("Mpls");
    terms.push("MN");
    terms
}
