use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use poi_adapters::{
    normalize_batch, DiscardReason, FixtureSource, GeoSource, NormalizeContext, QueryArea,
};
use poi_core::{AttractionCategory, Category, ElementKind, NormalizedEntity};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/overpass")
}

fn ctx() -> NormalizeContext {
    NormalizeContext::new("Kolkata", "West Bengal", QueryArea::DEFAULT.center())
        .imported_at(Utc.with_ymd_and_hms(2026, 3, 1, 6, 30, 0).single().unwrap())
}

async fn normalized(category: Category) -> poi_adapters::NormalizedBatch {
    let records = FixtureSource::new(fixtures_dir())
        .fetch(category, "")
        .await
        .expect("fixture records");
    normalize_batch(&records, category, &ctx())
}

#[tokio::test]
async fn lodging_fixture_normalizes_named_located_records() {
    let batch = normalized(Category::Lodging).await;

    let names: Vec<_> = batch.entities.iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["Grand Hotel", "Sudder Street Hostel", "Salt Lake Homestay"]);
    assert_eq!(batch.discarded.get(&DiscardReason::Unnamed), Some(&1));
    assert_eq!(batch.discarded.get(&DiscardReason::MissingCoordinates), Some(&1));

    let NormalizedEntity::Lodging(grand) = &batch.entities[0] else {
        panic!("expected lodging");
    };
    assert_eq!(grand.envelope.slug, "grand-hotel-101");
    assert_eq!(
        grand.envelope.contact.phones,
        vec!["+91 33 2249 0101", "+91 33 2249 0102"]
    );
    assert_eq!(grand.star_rating, Some(4));
    assert_eq!(grand.rooms, Some(86));
    assert_eq!(grand.amenities, vec!["wifi", "swimming pool"]);

    let hostel = &batch.entities[1];
    assert_eq!(hostel.external_id(), Some("way-2001"));
    assert_eq!(hostel.envelope().element_kind, Some(ElementKind::Area));
    assert_eq!(
        hostel.envelope().contact.email.as_deref(),
        Some("stay@sudderstreet.example.in")
    );
}

#[tokio::test]
async fn dining_fixture_resolves_brand_names() {
    let batch = normalized(Category::Dining).await;
    assert_eq!(batch.entities.len(), 2);
    assert_eq!(batch.discarded_total(), 1);

    let NormalizedEntity::Dining(ccd) = &batch.entities[1] else {
        panic!("expected dining");
    };
    assert_eq!(ccd.envelope.name, "Cafe Coffee Day");
    assert_eq!(
        ccd.envelope.contact.website.as_deref(),
        Some("https://cafecoffeeday.example.com")
    );
    assert_eq!(ccd.dining_type, "cafe");
}

#[tokio::test]
async fn attraction_fixture_covers_the_decision_table() {
    let batch = normalized(Category::Attractions).await;
    let categories: Vec<_> = batch
        .entities
        .iter()
        .map(|e| match e {
            NormalizedEntity::Attraction(a) => a.category,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(
        categories,
        vec![
            AttractionCategory::Historical,
            AttractionCategory::Religious,
            AttractionCategory::Museum,
            AttractionCategory::Park,
            AttractionCategory::Cultural,
        ]
    );
    assert_eq!(batch.discarded_total(), 1);
    assert_eq!(batch.entities[0].slug(), "marble-palace-401");
}

#[tokio::test]
async fn sports_fixture_keeps_tagged_capacity() {
    let batch = normalized(Category::Sports).await;
    assert_eq!(batch.entities.len(), 2);
    let NormalizedEntity::SportsFacility(stadium) = &batch.entities[0] else {
        panic!("expected sports facility");
    };
    assert_eq!(stadium.capacity, 68_000);
    assert_eq!(stadium.envelope.slug, "eden-gardens-way-6001");
}

#[tokio::test]
async fn every_fixture_entity_has_a_unique_slug() {
    let mut slugs = std::collections::HashSet::new();
    for category in [
        Category::Lodging,
        Category::Dining,
        Category::Attractions,
        Category::Sports,
    ] {
        for entity in normalized(category).await.entities {
            assert!(!entity.name().is_empty());
            assert!(slugs.insert(entity.slug().to_string()), "{}", entity.slug());
        }
    }
    assert_eq!(slugs.len(), 12);
}
