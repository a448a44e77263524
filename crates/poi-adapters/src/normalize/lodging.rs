use poi_core::{Envelope, Lodging, NormalizedEntity, PriceRange};

use super::tags::{humanize, Tags};
use super::{amenities, describe, first_match, CategoryNormalizer, Rule};

const AMENITIES: &[(&str, &str)] = &[
    ("internet_access", "wifi"),
    ("parking", "parking"),
    ("swimming_pool", "swimming pool"),
    ("restaurant", "restaurant"),
    ("air_conditioning", "air conditioning"),
    ("wheelchair", "wheelchair access"),
    ("bar", "bar"),
];

fn star_rating(tags: &Tags<'_>) -> Option<u8> {
    tags.number("stars")
        .filter(|stars| (1..=5).contains(stars))
        .and_then(|stars| u8::try_from(stars).ok())
}

fn is_hostel(tags: &Tags<'_>) -> bool {
    tags.is("tourism", "hostel")
}

fn is_guest_house(tags: &Tags<'_>) -> bool {
    tags.is("tourism", "guest_house")
}

fn five_star(tags: &Tags<'_>) -> bool {
    star_rating(tags) == Some(5)
}

fn four_star(tags: &Tags<'_>) -> bool {
    star_rating(tags) == Some(4)
}

fn three_star(tags: &Tags<'_>) -> bool {
    star_rating(tags) == Some(3)
}

fn budget_star(tags: &Tags<'_>) -> bool {
    matches!(star_rating(tags), Some(1 | 2))
}

/// Nightly price in INR.
const PRICE_TABLE: &[Rule<(u32, u32)>] = &[
    Rule {
        when: is_hostel,
        then: (500, 1_500),
    },
    Rule {
        when: is_guest_house,
        then: (1_000, 3_000),
    },
    Rule {
        when: five_star,
        then: (8_000, 25_000),
    },
    Rule {
        when: four_star,
        then: (5_000, 12_000),
    },
    Rule {
        when: three_star,
        then: (2_500, 6_000),
    },
    Rule {
        when: budget_star,
        then: (1_200, 3_000),
    },
];
const PRICE_FALLBACK: (u32, u32) = (2_000, 5_000);

pub(crate) struct LodgingNormalizer;

impl CategoryNormalizer for LodgingNormalizer {
    fn fallback_name(&self) -> &'static str {
        "Unnamed Lodging"
    }

    fn build(&self, tags: &Tags<'_>, mut envelope: Envelope) -> NormalizedEntity {
        let lodging_type = tags.get("tourism").unwrap_or("hotel").to_ascii_lowercase();
        let (min, max) = first_match(PRICE_TABLE, tags, PRICE_FALLBACK);
        let amenities = amenities(tags, AMENITIES);
        describe(&mut envelope, &humanize(&lodging_type), &amenities);

        NormalizedEntity::Lodging(Lodging {
            envelope,
            star_rating: star_rating(tags),
            price_range: PriceRange::inr(min, max),
            rooms: tags.number("rooms"),
            amenities,
            lodging_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{ctx, entity, record};
    use super::super::normalize;
    use poi_core::{Category, NormalizedEntity};

    fn lodging(pairs: &[(&str, &str)]) -> poi_core::Lodging {
        match entity(normalize(&record("500", pairs), Category::Lodging, &ctx())) {
            NormalizedEntity::Lodging(lodging) => lodging,
            other => panic!("expected lodging, got {other:?}"),
        }
    }

    #[test]
    fn hotel_price_follows_star_rating() {
        let luxury = lodging(&[
            ("tourism", "hotel"),
            ("name", "The Oberoi Grand"),
            ("stars", "5"),
        ]);
        assert_eq!(luxury.star_rating, Some(5));
        assert_eq!((luxury.price_range.min, luxury.price_range.max), (8_000, 25_000));

        let budget = lodging(&[("tourism", "hotel"), ("name", "Hotel Lindsay"), ("stars", "2")]);
        assert_eq!((budget.price_range.min, budget.price_range.max), (1_200, 3_000));
    }

    #[test]
    fn type_beats_stars_and_unknowns_use_fallback() {
        let hostel = lodging(&[("tourism", "hostel"), ("name", "Zostel"), ("stars", "5")]);
        assert_eq!(hostel.lodging_type, "hostel");
        assert_eq!((hostel.price_range.min, hostel.price_range.max), (500, 1_500));

        let unrated = lodging(&[
            ("tourism", "hotel"),
            ("name", "Hotel Heritage"),
            ("stars", "9"),
        ]);
        assert_eq!(unrated.star_rating, None);
        assert_eq!((unrated.price_range.min, unrated.price_range.max), (2_000, 5_000));
        assert_eq!(unrated.price_range.currency, "INR");
    }

    #[test]
    fn rooms_and_amenities_are_extracted() {
        let hotel = lodging(&[
            ("tourism", "guest_house"),
            ("name", "Bonne Maison"),
            ("rooms", "24"),
            ("internet_access", "wlan"),
            ("parking", "no"),
            ("air_conditioning", "yes"),
        ]);
        assert_eq!(hotel.rooms, Some(24));
        assert_eq!(hotel.amenities, vec!["wifi", "air conditioning"]);
        assert_eq!(
            hotel.envelope.description,
            "Bonne Maison is a guest house in Kolkata. Amenities include wifi, air conditioning."
        );
    }
}
