//! Raw tagged record -> typed entity, one normalizer per sourced category.
//!
//! Every heuristic here is an ordered decision table evaluated top to bottom, first match
//! wins, with an explicit fallback. Records that cannot yield a real name are discarded
//! rather than stored under a placeholder.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use poi_core::{
    slugify, Address, Category, Envelope, GeoPoint, ModerationStatus, NormalizedEntity, RawRecord,
    OSM_PROVENANCE,
};
use serde::Serialize;
use tracing::{debug, warn};

mod attraction;
mod contact;
mod dining;
mod lodging;
mod sports;
mod synthetic;
mod tags;

pub use synthetic::synthesize;

use tags::Tags;

const NAME_KEYS: [&str; 4] = ["name", "name:en", "official_name", "brand"];
const DESCRIPTION_KEYS: [&str; 2] = ["description", "description:en"];

/// Run-scoped values every normalizer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeContext {
    pub default_city: String,
    pub default_state: String,
    pub region_center: GeoPoint,
    pub imported_at: DateTime<Utc>,
}

impl NormalizeContext {
    pub fn new(
        default_city: impl Into<String>,
        default_state: impl Into<String>,
        region_center: GeoPoint,
    ) -> Self {
        Self {
            default_city: default_city.into(),
            default_state: default_state.into(),
            region_center,
            imported_at: Utc::now(),
        }
    }

    pub fn imported_at(mut self, at: DateTime<Utc>) -> Self {
        self.imported_at = at;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    MissingCoordinates,
    MissingTags,
    Unnamed,
    NotSourced,
}

impl DiscardReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscardReason::MissingCoordinates => "missing_coordinates",
            DiscardReason::MissingTags => "missing_tags",
            DiscardReason::Unnamed => "unnamed",
            DiscardReason::NotSourced => "not_sourced",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeOutcome {
    Entity(NormalizedEntity),
    Discard(DiscardReason),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub entities: Vec<NormalizedEntity>,
    pub discarded: BTreeMap<DiscardReason, usize>,
    /// Records dropped because an earlier record in the batch had the same external id.
    pub duplicates: usize,
}

impl NormalizedBatch {
    pub fn discarded_total(&self) -> usize {
        self.discarded.values().sum::<usize>() + self.duplicates
    }
}

/// One row of a decision table.
pub(crate) struct Rule<T> {
    pub(crate) when: fn(&Tags<'_>) -> bool,
    pub(crate) then: T,
}

pub(crate) fn first_match<T: Copy>(rules: &[Rule<T>], tags: &Tags<'_>, default: T) -> T {
    rules
        .iter()
        .find(|rule| (rule.when)(tags))
        .map(|rule| rule.then)
        .unwrap_or(default)
}

trait CategoryNormalizer: Sync {
    /// Placeholder name used when no name tag resolves; entities never keep it.
    fn fallback_name(&self) -> &'static str;

    fn build(&self, tags: &Tags<'_>, envelope: Envelope) -> NormalizedEntity;
}

fn normalizer_for(category: Category) -> Option<&'static dyn CategoryNormalizer> {
    match category {
        Category::Lodging => Some(&lodging::LodgingNormalizer),
        Category::Dining => Some(&dining::DiningNormalizer),
        Category::Attractions => Some(&attraction::AttractionNormalizer),
        Category::Sports => Some(&sports::SportsNormalizer),
        Category::Events | Category::Promotions => None,
    }
}

/// Placeholder name for a sourced category.
pub fn fallback_name(category: Category) -> Option<&'static str> {
    normalizer_for(category).map(|n| n.fallback_name())
}

pub fn normalize(
    record: &RawRecord,
    category: Category,
    ctx: &NormalizeContext,
) -> NormalizeOutcome {
    let Some(location) = record.coordinates else {
        return NormalizeOutcome::Discard(DiscardReason::MissingCoordinates);
    };
    if record.tags.is_empty() {
        return NormalizeOutcome::Discard(DiscardReason::MissingTags);
    }
    let Some(normalizer) = normalizer_for(category) else {
        return NormalizeOutcome::Discard(DiscardReason::NotSourced);
    };

    let tags = Tags::new(&record.tags);
    let fallback = normalizer.fallback_name();
    let name = tags.first_of(&NAME_KEYS).unwrap_or(fallback);
    if name == fallback {
        return NormalizeOutcome::Discard(DiscardReason::Unnamed);
    }

    let envelope = Envelope {
        name: name.to_string(),
        slug: slugify(name, &record.external_id),
        description: tags.first_of(&DESCRIPTION_KEYS).unwrap_or_default().to_string(),
        location,
        address: resolve_address(&tags, ctx),
        contact: contact::resolve_contact(&tags),
        status: ModerationStatus::Pending,
        featured: false,
        promoted: false,
        external_id: Some(record.external_id.clone()),
        element_kind: Some(record.kind),
        source: OSM_PROVENANCE.to_string(),
        imported_at: ctx.imported_at,
    };
    NormalizeOutcome::Entity(normalizer.build(&tags, envelope))
}

/// Normalize a whole category response. The first record wins for each external id and for
/// each slug; later collisions are dropped and counted as duplicates.
pub fn normalize_batch(
    records: &[RawRecord],
    category: Category,
    ctx: &NormalizeContext,
) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    let mut seen_ids = HashSet::with_capacity(records.len());
    let mut seen_slugs = HashSet::with_capacity(records.len());
    for record in records {
        match normalize(record, category, ctx) {
            NormalizeOutcome::Entity(entity) => {
                if !seen_ids.insert(record.external_id.clone()) {
                    debug!(
                        %category,
                        external_id = %record.external_id,
                        "duplicate external id dropped"
                    );
                    batch.duplicates += 1;
                    continue;
                }
                if !seen_slugs.insert(entity.slug().to_string()) {
                    warn!(
                        %category,
                        external_id = %record.external_id,
                        slug = entity.slug(),
                        "slug already taken in this batch, record dropped"
                    );
                    batch.duplicates += 1;
                    continue;
                }
                batch.entities.push(entity);
            }
            NormalizeOutcome::Discard(reason) => {
                debug!(
                    %category,
                    external_id = %record.external_id,
                    reason = reason.as_str(),
                    "record discarded"
                );
                *batch.discarded.entry(reason).or_default() += 1;
            }
        }
    }
    batch
}

fn resolve_address(tags: &Tags<'_>, ctx: &NormalizeContext) -> Address {
    let street = match (tags.get("addr:housenumber"), tags.get("addr:street")) {
        (Some(number), Some(street)) => Some(format!("{number} {street}")),
        (None, Some(street)) => Some(street.to_string()),
        _ => None,
    };
    Address {
        street,
        area: tags
            .first_of(&["addr:suburb", "addr:neighbourhood", "addr:district"])
            .map(str::to_string),
        city: tags
            .get("addr:city")
            .unwrap_or(ctx.default_city.as_str())
            .to_string(),
        state: tags
            .get("addr:state")
            .unwrap_or(ctx.default_state.as_str())
            .to_string(),
        postal_code: tags.get("addr:postcode").map(str::to_string),
        landmark: tags.first_of(&["addr:place", "landmark"]).map(str::to_string),
    }
}

/// Amenity labels whose tag is present and not negated, in table order.
pub(crate) fn amenities(tags: &Tags<'_>, table: &[(&str, &str)]) -> Vec<String> {
    table
        .iter()
        .filter(|(key, _)| tags.enabled(key))
        .map(|(_, label)| label.to_string())
        .collect()
}

/// Fill an empty description with a sentence built from the entity's own attributes.
pub(crate) fn describe(envelope: &mut Envelope, label: &str, amenities: &[String]) {
    if !envelope.description.is_empty() {
        return;
    }
    let article = match label.chars().next() {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    };
    let mut text = format!(
        "{} is {article} {label} in {}.",
        envelope.name, envelope.address.city
    );
    if !amenities.is_empty() {
        let leading = amenities.iter().take(3).cloned().collect::<Vec<_>>();
        text.push_str(&format!(" Amenities include {}.", leading.join(", ")));
    }
    envelope.description = text;
}
