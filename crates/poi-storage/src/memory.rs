use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use poi_core::{Category, NormalizedEntity};

use crate::datastore::{validate_document, Collection, Datastore, DocumentFilter, StoreError};

/// A document as held by the in-memory backend, with its store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: u64,
    pub entity: NormalizedEntity,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    collections: HashMap<&'static str, Vec<StoredDocument>>,
    broken_lookups: HashSet<&'static str>,
}

/// Process-local datastore applying the same validation rules as the Postgres schema.
/// Backs `memory://` dry runs and the test suites.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatastore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one collection, in insertion order.
    pub fn documents(&self, category: Category) -> Vec<StoredDocument> {
        lock(&self.state)
            .collections
            .get(category.collection())
            .cloned()
            .unwrap_or_default()
    }

    /// Make every external-id lookup on the category's collection fail.
    pub fn break_lookups(&self, category: Category) {
        lock(&self.state).broken_lookups.insert(category.collection());
    }
}

impl Datastore for MemoryDatastore {
    fn collection(&self, category: Category) -> Arc<dyn Collection> {
        Arc::new(MemoryCollection {
            name: category.collection(),
            state: Arc::clone(&self.state),
        })
    }
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

struct MemoryCollection {
    name: &'static str,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryCollection {
    fn check_insertable<'a>(
        &self,
        existing: &'a [StoredDocument],
        entities: &'a [NormalizedEntity],
    ) -> Result<(), StoreError> {
        let mut slugs: HashSet<&'a str> = existing.iter().map(|d| d.entity.slug()).collect();
        for entity in entities {
            validate_document(self.name, entity)?;
            if !slugs.insert(entity.slug()) {
                return Err(StoreError::Rejected {
                    collection: self.name.to_string(),
                    slug: entity.slug().to_string(),
                    reason: "duplicate slug".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        self.name
    }

    async fn find(&self, filter: &DocumentFilter) -> Result<Vec<NormalizedEntity>, StoreError> {
        let state = lock(&self.state);
        let lookup = matches!(filter, DocumentFilter::ExternalIds(_));
        if lookup && state.broken_lookups.contains(self.name) {
            return Err(StoreError::query(self.name, "external id lookup unavailable"));
        }
        Ok(state
            .collections
            .get(self.name)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filter.matches(&d.entity))
                    .map(|d| d.entity.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert_many(&self, entities: &[NormalizedEntity]) -> Result<usize, StoreError> {
        let mut state = lock(&self.state);
        let existing = state.collections.get(self.name).map(Vec::as_slice).unwrap_or(&[]);
        self.check_insertable(existing, entities)?;

        let mut next_id = state.next_id;
        let docs = entities
            .iter()
            .map(|entity| {
                next_id += 1;
                StoredDocument {
                    id: next_id,
                    entity: entity.clone(),
                }
            })
            .collect::<Vec<_>>();
        state.next_id = next_id;
        state.collections.entry(self.name).or_default().extend(docs);
        Ok(entities.len())
    }

    async fn insert_one(&self, entity: &NormalizedEntity) -> Result<(), StoreError> {
        self.insert_many(std::slice::from_ref(entity)).await.map(|_| ())
    }

    async fn delete_many(&self, filter: &DocumentFilter) -> Result<u64, StoreError> {
        let mut state = lock(&self.state);
        let Some(docs) = state.collections.get_mut(self.name) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !filter.matches(&d.entity));
        Ok((before - docs.len()) as u64)
    }

    async fn count_documents(&self, filter: &DocumentFilter) -> Result<u64, StoreError> {
        let state = lock(&self.state);
        Ok(state
            .collections
            .get(self.name)
            .map(|docs| docs.iter().filter(|d| filter.matches(&d.entity)).count() as u64)
            .unwrap_or(0))
    }
}
