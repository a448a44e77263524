use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Category, ElementKind, GeoPoint};

/// Moderation lifecycle gating public visibility. Ingestion always produces `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    #[default]
    Pending,
    Active,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Active => "active",
            ModerationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub area: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: Option<String>,
    pub landmark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Contact {
    pub phones: Vec<String>,
    pub email: Option<String>,
    pub website: Option<String>,
}

/// Fields shared by every entity shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub location: GeoPoint,
    pub address: Address,
    pub contact: Contact,
    pub status: ModerationStatus,
    pub featured: bool,
    pub promoted: bool,
    /// Upstream identifier used as the deduplication key.
    pub external_id: Option<String>,
    pub element_kind: Option<ElementKind>,
    pub source: String,
    pub imported_at: DateTime<Utc>,
}

impl Envelope {
    /// Reset lifecycle flags to their ingestion values.
    pub fn mark_pending(&mut self) {
        self.status = ModerationStatus::Pending;
        self.featured = false;
        self.promoted = false;
    }
}

pub const DEFAULT_CURRENCY: &str = "INR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: u32,
    pub max: u32,
    pub currency: String,
}

impl PriceRange {
    pub fn inr(min: u32, max: u32) -> Self {
        Self {
            min,
            max,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFee {
    pub adult: u32,
    pub child: u32,
    pub foreigner: u32,
    pub currency: String,
}

impl EntryFee {
    pub fn inr(adult: u32, child: u32, foreigner: u32) -> Self {
        Self {
            adult,
            child,
            foreigner,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    pub fn free() -> Self {
        Self::inr(0, 0, 0)
    }

    pub fn is_free(&self) -> bool {
        self.adult == 0 && self.child == 0 && self.foreigner == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttractionCategory {
    Historical,
    Religious,
    Museum,
    Park,
    Government,
    Cultural,
}

impl AttractionCategory {
    pub fn label(self) -> &'static str {
        match self {
            AttractionCategory::Historical => "historical site",
            AttractionCategory::Religious => "place of worship",
            AttractionCategory::Museum => "museum",
            AttractionCategory::Park => "park",
            AttractionCategory::Government => "government landmark",
            AttractionCategory::Cultural => "cultural attraction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lodging {
    pub envelope: Envelope,
    pub lodging_type: String,
    pub star_rating: Option<u8>,
    pub price_range: PriceRange,
    pub rooms: Option<u32>,
    pub amenities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dining {
    pub envelope: Envelope,
    pub dining_type: String,
    pub cuisines: Vec<String>,
    pub dietary: Vec<String>,
    pub price_range: PriceRange,
    pub amenities: Vec<String>,
    pub opening_hours: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attraction {
    pub envelope: Envelope,
    pub category: AttractionCategory,
    pub entry_fee: EntryFee,
    pub opening_hours: Option<String>,
    pub amenities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportsFacility {
    pub envelope: Envelope,
    pub facility_type: String,
    pub sports: Vec<String>,
    pub capacity: u32,
    pub fee_range: PriceRange,
    pub amenities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub envelope: Envelope,
    pub event_type: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub ticket_price: PriceRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
    pub envelope: Envelope,
    pub promotion_type: String,
    pub discount_percent: u8,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub applies_to: Category,
}

/// One normalized record, shaped by its category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizedEntity {
    Lodging(Lodging),
    Dining(Dining),
    Attraction(Attraction),
    SportsFacility(SportsFacility),
    Event(Event),
    Promotion(Promotion),
}

impl NormalizedEntity {
    pub fn category(&self) -> Category {
        match self {
            NormalizedEntity::Lodging(_) => Category::Lodging,
            NormalizedEntity::Dining(_) => Category::Dining,
            NormalizedEntity::Attraction(_) => Category::Attractions,
            NormalizedEntity::SportsFacility(_) => Category::Sports,
            NormalizedEntity::Event(_) => Category::Events,
            NormalizedEntity::Promotion(_) => Category::Promotions,
        }
    }

    pub fn envelope(&self) -> &Envelope {
        match self {
            NormalizedEntity::Lodging(e) => &e.envelope,
            NormalizedEntity::Dining(e) => &e.envelope,
            NormalizedEntity::Attraction(e) => &e.envelope,
            NormalizedEntity::SportsFacility(e) => &e.envelope,
            NormalizedEntity::Event(e) => &e.envelope,
            NormalizedEntity::Promotion(e) => &e.envelope,
        }
    }

    pub fn envelope_mut(&mut self) -> &mut Envelope {
        match self {
            NormalizedEntity::Lodging(e) => &mut e.envelope,
            NormalizedEntity::Dining(e) => &mut e.envelope,
            NormalizedEntity::Attraction(e) => &mut e.envelope,
            NormalizedEntity::SportsFacility(e) => &mut e.envelope,
            NormalizedEntity::Event(e) => &mut e.envelope,
            NormalizedEntity::Promotion(e) => &mut e.envelope,
        }
    }

    pub fn name(&self) -> &str {
        &self.envelope().name
    }

    pub fn slug(&self) -> &str {
        &self.envelope().slug
    }

    pub fn external_id(&self) -> Option<&str> {
        self.envelope().external_id.as_deref()
    }
}
