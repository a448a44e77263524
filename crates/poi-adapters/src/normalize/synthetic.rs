//! Locally generated events and promotions. The geodata source has nothing to offer for
//! these categories, so each run rebuilds them from a fixed catalogue around the region.

use chrono::{Days, NaiveDate};
use poi_core::{
    slugify, Address, Category, Contact, Envelope, Event, GeoPoint, ModerationStatus,
    NormalizedEntity, PriceRange, Promotion, SYNTHETIC_PROVENANCE,
};

use super::NormalizeContext;

struct EventTemplate {
    key: &'static str,
    name: &'static str,
    event_type: &'static str,
    starts_in_days: u64,
    duration_days: u64,
    ticket: (u32, u32),
    /// Degrees east/north of the region center.
    offset: (f64, f64),
    description: &'static str,
}

const EVENTS: &[EventTemplate] = &[
    EventTemplate {
        key: "heritage-walk",
        name: "Old City Heritage Walk",
        event_type: "tour",
        starts_in_days: 7,
        duration_days: 1,
        ticket: (200, 500),
        offset: (0.012, 0.010),
        description: "Guided morning walk through the walled city bazaars and havelis.",
    },
    EventTemplate {
        key: "food-festival",
        name: "Street Food Festival",
        event_type: "festival",
        starts_in_days: 14,
        duration_days: 3,
        ticket: (0, 300),
        offset: (-0.008, 0.004),
        description: "Three days of regional street food stalls and cooking demonstrations.",
    },
    EventTemplate {
        key: "folk-music-night",
        name: "Folk Music Night",
        event_type: "concert",
        starts_in_days: 21,
        duration_days: 1,
        ticket: (300, 1_500),
        offset: (0.005, -0.006),
        description: "Evening of folk music and dance performances under the stars.",
    },
    EventTemplate {
        key: "crafts-fair",
        name: "Handicrafts Fair",
        event_type: "exhibition",
        starts_in_days: 30,
        duration_days: 5,
        ticket: (0, 100),
        offset: (-0.015, -0.011),
        description: "Block printing, blue pottery and textile makers selling direct.",
    },
];

struct PromotionTemplate {
    key: &'static str,
    name: &'static str,
    promotion_type: &'static str,
    discount_percent: u8,
    valid_for_days: u64,
    applies_to: Category,
}

const PROMOTIONS: &[PromotionTemplate] = &[
    PromotionTemplate {
        key: "monsoon-stay",
        name: "Monsoon Stay Offer",
        promotion_type: "seasonal",
        discount_percent: 20,
        valid_for_days: 60,
        applies_to: Category::Lodging,
    },
    PromotionTemplate {
        key: "weekday-dining",
        name: "Weekday Dining Deal",
        promotion_type: "discount",
        discount_percent: 15,
        valid_for_days: 30,
        applies_to: Category::Dining,
    },
    PromotionTemplate {
        key: "heritage-pass",
        name: "Composite Heritage Pass",
        promotion_type: "bundle",
        discount_percent: 25,
        valid_for_days: 90,
        applies_to: Category::Attractions,
    },
    PromotionTemplate {
        key: "fitness-trial",
        name: "Fitness Trial Month",
        promotion_type: "trial",
        discount_percent: 50,
        valid_for_days: 30,
        applies_to: Category::Sports,
    },
];

/// Entities for a synthetic category; empty for sourced categories.
pub fn synthesize(category: Category, ctx: &NormalizeContext) -> Vec<NormalizedEntity> {
    let today = ctx.imported_at.date_naive();
    match category {
        Category::Events => EVENTS
            .iter()
            .map(|t| {
                let starts_on = days_after(today, t.starts_in_days);
                NormalizedEntity::Event(Event {
                    envelope: envelope(
                        ctx,
                        t.name,
                        &format!("event-{}", t.key),
                        t.description,
                        t.offset,
                    ),
                    event_type: t.event_type.to_string(),
                    starts_on,
                    ends_on: days_after(starts_on, t.duration_days.saturating_sub(1)),
                    ticket_price: PriceRange::inr(t.ticket.0, t.ticket.1),
                })
            })
            .collect(),
        Category::Promotions => PROMOTIONS
            .iter()
            .map(|t| {
                let description = format!(
                    "{}% off selected {} in {} for {} days.",
                    t.discount_percent, t.applies_to, ctx.default_city, t.valid_for_days
                );
                NormalizedEntity::Promotion(Promotion {
                    envelope: envelope(
                        ctx,
                        t.name,
                        &format!("promo-{}", t.key),
                        &description,
                        (0.0, 0.0),
                    ),
                    promotion_type: t.promotion_type.to_string(),
                    discount_percent: t.discount_percent,
                    valid_from: today,
                    valid_until: days_after(today, t.valid_for_days),
                    applies_to: t.applies_to,
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn days_after(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(date)
}

fn envelope(
    ctx: &NormalizeContext,
    name: &str,
    external_id: &str,
    description: &str,
    (east, north): (f64, f64),
) -> Envelope {
    let center = ctx.region_center;
    Envelope {
        name: name.to_string(),
        slug: slugify(name, external_id),
        description: description.to_string(),
        location: GeoPoint::new(center.longitude() + east, center.latitude() + north),
        address: Address {
            city: ctx.default_city.clone(),
            state: ctx.default_state.clone(),
            ..Address::default()
        },
        contact: Contact::default(),
        status: ModerationStatus::Pending,
        featured: false,
        promoted: false,
        external_id: Some(external_id.to_string()),
        element_kind: None,
        source: SYNTHETIC_PROVENANCE.to_string(),
        imported_at: ctx.imported_at,
    }
}
