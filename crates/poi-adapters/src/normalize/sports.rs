use poi_core::{Envelope, NormalizedEntity, PriceRange, SportsFacility};

use super::tags::{humanize, Tags};
use super::{amenities, describe, CategoryNormalizer};

const AMENITIES: &[(&str, &str)] = &[
    ("lit", "floodlights"),
    ("changing_room", "changing rooms"),
    ("shower", "showers"),
    ("toilets", "toilets"),
    ("parking", "parking"),
    ("covered", "covered area"),
];

/// Per-facility defaults: (leisure value, capacity, fee range in INR per visit).
const FACILITY_TABLE: &[(&str, u32, (u32, u32))] = &[
    ("stadium", 20_000, (200, 2_000)),
    ("sports_centre", 500, (100, 500)),
    ("pitch", 100, (200, 1_000)),
    ("fitness_centre", 80, (300, 1_500)),
    ("swimming_pool", 150, (100, 400)),
];
const FACILITY_FALLBACK: (u32, (u32, u32)) = (50, (100, 500));

fn facility_defaults(facility_type: &str) -> (u32, (u32, u32)) {
    FACILITY_TABLE
        .iter()
        .find(|(kind, _, _)| *kind == facility_type)
        .map(|(_, capacity, fees)| (*capacity, *fees))
        .unwrap_or(FACILITY_FALLBACK)
}

pub(crate) struct SportsNormalizer;

impl CategoryNormalizer for SportsNormalizer {
    fn fallback_name(&self) -> &'static str {
        "Unnamed Sports Facility"
    }

    fn build(&self, tags: &Tags<'_>, mut envelope: Envelope) -> NormalizedEntity {
        let facility_type = tags
            .get("leisure")
            .unwrap_or("sports_centre")
            .to_ascii_lowercase();
        let (default_capacity, (min, max)) = facility_defaults(&facility_type);
        let fee_range = if tags.is("fee", "no") {
            PriceRange::inr(0, 0)
        } else {
            PriceRange::inr(min, max)
        };
        let amenities = amenities(tags, AMENITIES);
        describe(&mut envelope, &humanize(&facility_type), &amenities);

        NormalizedEntity::SportsFacility(SportsFacility {
            envelope,
            sports: tags.list("sport"),
            capacity: tags.number("capacity").unwrap_or(default_capacity),
            fee_range,
            amenities,
            facility_type,
        })
    }
}
