use poi_core::{Dining, Envelope, NormalizedEntity, PriceRange};

use super::tags::Tags;
use super::{amenities, describe, first_match, CategoryNormalizer, Rule};

const AMENITIES: &[(&str, &str)] = &[
    ("internet_access", "wifi"),
    ("outdoor_seating", "outdoor seating"),
    ("takeaway", "takeaway"),
    ("delivery", "delivery"),
    ("air_conditioning", "air conditioning"),
    ("wheelchair", "wheelchair access"),
];

/// `diet:*` keys mapped to the dietary label stored on the entity.
const DIETARY: &[(&str, &str)] = &[
    ("diet:vegetarian", "vegetarian"),
    ("diet:vegan", "vegan"),
    ("diet:jain", "jain"),
    ("diet:halal", "halal"),
    ("diet:gluten_free", "gluten free"),
];

fn is_fast_food(tags: &Tags<'_>) -> bool {
    tags.is("amenity", "fast_food")
}

fn is_cafe(tags: &Tags<'_>) -> bool {
    tags.is("amenity", "cafe")
}

fn is_restaurant(tags: &Tags<'_>) -> bool {
    tags.is("amenity", "restaurant")
}

/// Average spend for two in INR.
const PRICE_TABLE: &[Rule<(u32, u32)>] = &[
    Rule {
        when: is_fast_food,
        then: (100, 400),
    },
    Rule {
        when: is_cafe,
        then: (150, 600),
    },
    Rule {
        when: is_restaurant,
        then: (300, 1_200),
    },
];
const PRICE_FALLBACK: (u32, u32) = (200, 800);

fn type_label(dining_type: &str) -> &str {
    match dining_type {
        "fast_food" => "fast food outlet",
        other => other,
    }
}

pub(crate) struct DiningNormalizer;

impl CategoryNormalizer for DiningNormalizer {
    fn fallback_name(&self) -> &'static str {
        "Unnamed Restaurant"
    }

    fn build(&self, tags: &Tags<'_>, mut envelope: Envelope) -> NormalizedEntity {
        let dining_type = tags.get("amenity").unwrap_or("restaurant").to_ascii_lowercase();
        let (min, max) = first_match(PRICE_TABLE, tags, PRICE_FALLBACK);
        let dietary = DIETARY
            .iter()
            .filter(|(key, _)| tags.is_any(key, &["yes", "only"]))
            .map(|(_, label)| label.to_string())
            .collect();
        let amenities = amenities(tags, AMENITIES);
        describe(&mut envelope, type_label(&dining_type), &amenities);

        NormalizedEntity::Dining(Dining {
            envelope,
            cuisines: tags.list("cuisine"),
            dietary,
            price_range: PriceRange::inr(min, max),
            amenities,
            opening_hours: tags.get("opening_hours").map(str::to_string),
            dining_type,
        })
    }
}
