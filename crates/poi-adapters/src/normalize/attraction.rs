use poi_core::{Attraction, AttractionCategory, EntryFee, Envelope, NormalizedEntity};

use super::tags::Tags;
use super::{amenities, describe, first_match, CategoryNormalizer, Rule};

const AMENITIES: &[(&str, &str)] = &[
    ("toilets", "toilets"),
    ("parking", "parking"),
    ("wheelchair", "wheelchair access"),
    ("drinking_water", "drinking water"),
    ("guided_tours", "guided tours"),
];

fn is_historic(tags: &Tags<'_>) -> bool {
    tags.has("historic")
}

fn is_place_of_worship(tags: &Tags<'_>) -> bool {
    tags.is("amenity", "place_of_worship")
}

fn is_museum(tags: &Tags<'_>) -> bool {
    tags.is_any("tourism", &["museum", "gallery"])
}

fn is_park(tags: &Tags<'_>) -> bool {
    tags.is_any("leisure", &["park", "garden"])
}

fn is_government(tags: &Tags<'_>) -> bool {
    tags.is("building", "government")
        || tags.is("office", "government")
        || tags.is("amenity", "townhall")
}

const CATEGORY_TABLE: &[Rule<AttractionCategory>] = &[
    Rule {
        when: is_historic,
        then: AttractionCategory::Historical,
    },
    Rule {
        when: is_place_of_worship,
        then: AttractionCategory::Religious,
    },
    Rule {
        when: is_museum,
        then: AttractionCategory::Museum,
    },
    Rule {
        when: is_park,
        then: AttractionCategory::Park,
    },
    Rule {
        when: is_government,
        then: AttractionCategory::Government,
    },
];

/// Adult, child and foreign-visitor entry fee in INR.
fn fee_schedule(category: AttractionCategory) -> EntryFee {
    match category {
        AttractionCategory::Historical => EntryFee::inr(50, 25, 500),
        AttractionCategory::Museum => EntryFee::inr(40, 20, 300),
        AttractionCategory::Park => EntryFee::inr(20, 10, 50),
        AttractionCategory::Cultural => EntryFee::inr(30, 15, 200),
        AttractionCategory::Religious | AttractionCategory::Government => EntryFee::free(),
    }
}

pub(crate) fn categorize(tags: &Tags<'_>) -> AttractionCategory {
    first_match(CATEGORY_TABLE, tags, AttractionCategory::Cultural)
}

pub(crate) struct AttractionNormalizer;

impl CategoryNormalizer for AttractionNormalizer {
    fn fallback_name(&self) -> &'static str {
        "Unnamed Attraction"
    }

    fn build(&self, tags: &Tags<'_>, mut envelope: Envelope) -> NormalizedEntity {
        let category = categorize(tags);
        let entry_fee = if tags.is("fee", "no") {
            EntryFee::free()
        } else {
            fee_schedule(category)
        };
        let amenities = amenities(tags, AMENITIES);
        describe(&mut envelope, category.label(), &amenities);

        NormalizedEntity::Attraction(Attraction {
            envelope,
            category,
            entry_fee,
            opening_hours: tags.get("opening_hours").map(str::to_string),
            amenities,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn categorize_pairs(pairs: &[(&str, &str)]) -> AttractionCategory {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        categorize(&Tags::new(&map))
    }

    #[test]
    fn decision_table_is_first_match_wins() {
        // A historic temple is historical before it is religious.
        assert_eq!(
            categorize_pairs(&[("historic", "temple"), ("amenity", "place_of_worship")]),
            AttractionCategory::Historical
        );
        assert_eq!(
            categorize_pairs(&[("amenity", "place_of_worship"), ("tourism", "museum")]),
            AttractionCategory::Religious
        );
        assert_eq!(categorize_pairs(&[("tourism", "gallery")]), AttractionCategory::Museum);
        assert_eq!(categorize_pairs(&[("leisure", "garden")]), AttractionCategory::Park);
        assert_eq!(
            categorize_pairs(&[("tourism", "attraction"), ("office", "government")]),
            AttractionCategory::Government
        );
        assert_eq!(
            categorize_pairs(&[("tourism", "viewpoint")]),
            AttractionCategory::Cultural
        );
    }

    #[test]
    fn fees_follow_category_unless_marked_free() {
        use super::super::normalize;
        use super::super::tests::{ctx, entity, record};
        use poi_core::Category;

        let fort = entity(normalize(
            &record("401", &[("historic", "fort"), ("name", "Fort William")]),
            Category::Attractions,
            &ctx(),
        ));
        let NormalizedEntity::Attraction(fort) = fort else {
            panic!("expected attraction");
        };
        assert_eq!(fort.entry_fee, EntryFee::inr(50, 25, 500));
        assert_eq!(
            fort.envelope.description,
            "Fort William is a historical site in Kolkata."
        );

        let garden = entity(normalize(
            &record(
                "402",
                &[("leisure", "park"), ("name", "Rabindra Sarobar"), ("fee", "no")],
            ),
            Category::Attractions,
            &ctx(),
        ));
        let NormalizedEntity::Attraction(garden) = garden else {
            panic!("expected attraction");
        };
        assert_eq!(garden.category, AttractionCategory::Park);
        assert!(garden.entry_fee.is_free());
    }
}
