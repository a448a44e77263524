//! Core domain model for the POI ingest pipeline: raw source records, normalized entities
//! and load statistics.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod entity;
mod stats;

pub use entity::{
    Address, Attraction, AttractionCategory, Contact, Dining, EntryFee, Envelope, Event, Lodging,
    ModerationStatus, NormalizedEntity, PriceRange, Promotion, SportsFacility, DEFAULT_CURRENCY,
};
pub use stats::LoadStatistics;

/// Provenance label stamped on entities built from the geodata API.
pub const OSM_PROVENANCE: &str = "openstreetmap";
/// Provenance label stamped on entities generated from the built-in catalogue.
pub const SYNTHETIC_PROVENANCE: &str = "synthetic";

/// Fixed domain buckets the pipeline processes independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Lodging,
    Dining,
    Attractions,
    Sports,
    Events,
    Promotions,
}

impl Category {
    /// Processing order used by every run mode.
    pub const ALL: [Category; 6] = [
        Category::Lodging,
        Category::Dining,
        Category::Attractions,
        Category::Sports,
        Category::Events,
        Category::Promotions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Lodging => "lodging",
            Category::Dining => "dining",
            Category::Attractions => "attractions",
            Category::Sports => "sports",
            Category::Events => "events",
            Category::Promotions => "promotions",
        }
    }

    /// Datastore collection the category loads into.
    pub fn collection(self) -> &'static str {
        match self {
            Category::Lodging => "hotels",
            Category::Dining => "restaurants",
            Category::Attractions => "attractions",
            Category::Sports => "sports_facilities",
            Category::Events => "events",
            Category::Promotions => "promotions",
        }
    }

    /// Synthetic categories are generated locally instead of fetched.
    pub fn is_synthetic(self) -> bool {
        matches!(self, Category::Events | Category::Promotions)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category `{}`", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Whether the upstream feature is a single point or an area reduced to its center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Point,
    Area,
}

/// WGS84 point serialized GeoJSON-style as `{"type":"Point","coordinates":[lon,lat]}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    kind: PointTag,
    coordinates: [f64; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum PointTag {
    Point,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: PointTag::Point,
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// One record as handed over by the geodata source, before any interpretation of its tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub external_id: String,
    pub kind: ElementKind,
    pub coordinates: Option<GeoPoint>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// URL-safe slug for `name` + `external_id`. Pure: the same pair always yields the same slug.
pub fn slugify(name: &str, external_id: &str) -> String {
    let raw = format!("{}-{}", name.to_lowercase(), external_id.to_lowercase());
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}
