use poi_core::{LoadStatistics, NormalizedEntity};
use poi_storage::{Collection, StoreError};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BATCH_SIZE: usize = 50;

/// An existence check failed part way through a load. `completed` holds what the batches
/// before the failure already did.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct LoadError {
    pub completed: LoadStatistics,
    #[source]
    pub source: StoreError,
}

/// Loads entities in fixed-size batches, skipping anything already stored under the same
/// external id. Only the existence check can fail a load; insert failures are counted.
#[derive(Debug, Clone, Copy)]
pub struct BatchLoader {
    batch_size: usize,
}

impl Default for BatchLoader {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl BatchLoader {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub async fn load(
        &self,
        collection: &dyn Collection,
        entities: Vec<NormalizedEntity>,
    ) -> Result<LoadStatistics, LoadError> {
        let mut stats = LoadStatistics::default();
        for (index, batch) in entities.chunks(self.batch_size).enumerate() {
            match self.load_batch(collection, index, batch).await {
                Ok(batch_stats) => stats += batch_stats,
                Err(source) => {
                    return Err(LoadError {
                        completed: stats,
                        source,
                    })
                }
            }
        }
        Ok(stats)
    }

    async fn load_batch(
        &self,
        collection: &dyn Collection,
        index: usize,
        batch: &[NormalizedEntity],
    ) -> Result<LoadStatistics, StoreError> {
        let ids: Vec<String> = batch
            .iter()
            .filter_map(|e| e.external_id().map(str::to_string))
            .collect();
        let existing = collection.existing_external_ids(&ids).await?;

        let mut fresh = Vec::with_capacity(batch.len());
        for entity in batch {
            if entity.external_id().is_some_and(|id| existing.contains(id)) {
                continue;
            }
            let mut entity = entity.clone();
            entity.envelope_mut().mark_pending();
            fresh.push(entity);
        }
        let stats = LoadStatistics::considered(batch.len()).skipped(batch.len() - fresh.len());
        if fresh.is_empty() {
            debug!(collection = collection.name(), batch = index, "batch fully skipped");
            return Ok(stats);
        }

        match collection.insert_many(&fresh).await {
            Ok(inserted) => {
                debug!(collection = collection.name(), batch = index, inserted, "batch inserted");
                Ok(stats
                    .inserted(inserted)
                    .failed(fresh.len().saturating_sub(inserted)))
            }
            Err(err) => {
                warn!(
                    collection = collection.name(),
                    batch = index,
                    records = fresh.len(),
                    error = %err,
                    "bulk insert failed, inserting records individually"
                );
                let (mut inserted, mut failed) = (0, 0);
                for entity in &fresh {
                    match collection.insert_one(entity).await {
                        Ok(()) => inserted += 1,
                        Err(err) => {
                            failed += 1;
                            warn!(
                                collection = collection.name(),
                                slug = entity.slug(),
                                external_id = entity.external_id().unwrap_or("-"),
                                error = %err,
                                "record insert failed"
                            );
                        }
                    }
                }
                Ok(stats.inserted(inserted).failed(failed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use poi_adapters::{normalize, NormalizeContext, NormalizeOutcome, QueryArea};
    use poi_core::{Category, ElementKind, GeoPoint, ModerationStatus, RawRecord};
    use poi_storage::{Datastore, DocumentFilter, MemoryDatastore};

    /// Delegates to a real collection but fails the n-th existence check.
    struct FailingLookup {
        inner: Arc<dyn Collection>,
        fail_on_call: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Collection for FailingLookup {
        fn name(&self) -> &str {
            self.inner.name()
        }

        async fn find(&self, filter: &DocumentFilter) -> Result<Vec<NormalizedEntity>, StoreError> {
            self.inner.find(filter).await
        }

        async fn existing_external_ids(
            &self,
            ids: &[String],
        ) -> Result<HashSet<String>, StoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on_call {
                return Err(StoreError::query(self.name(), "connection reset"));
            }
            self.inner.existing_external_ids(ids).await
        }

        async fn insert_many(&self, entities: &[NormalizedEntity]) -> Result<usize, StoreError> {
            self.inner.insert_many(entities).await
        }

        async fn insert_one(&self, entity: &NormalizedEntity) -> Result<(), StoreError> {
            self.inner.insert_one(entity).await
        }

        async fn delete_many(&self, filter: &DocumentFilter) -> Result<u64, StoreError> {
            self.inner.delete_many(filter).await
        }

        async fn count_documents(&self, filter: &DocumentFilter) -> Result<u64, StoreError> {
            self.inner.count_documents(filter).await
        }
    }

    fn hotel(id: &str, name: &str, lat: f64) -> NormalizedEntity {
        let record = RawRecord {
            external_id: id.to_string(),
            kind: ElementKind::Point,
            coordinates: Some(GeoPoint::new(88.36, lat)),
            tags: [("tourism", "hotel"), ("name", name)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        let ctx = NormalizeContext::new("Kolkata", "West Bengal", QueryArea::DEFAULT.center())
            .imported_at(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).single().unwrap());
        match normalize(&record, Category::Lodging, &ctx) {
            NormalizeOutcome::Entity(entity) => entity,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn hotels(ids: std::ops::RangeInclusive<u32>) -> Vec<NormalizedEntity> {
        ids.map(|i| hotel(&i.to_string(), &format!("Hotel {i}"), 22.57))
            .collect()
    }

    #[tokio::test]
    async fn existing_external_ids_are_skipped() {
        let store = MemoryDatastore::new();
        let collection = store.collection(Category::Lodging);
        let loader = BatchLoader::new(2);

        let first = loader.load(collection.as_ref(), hotels(1..=2)).await.unwrap();
        assert_eq!(first, LoadStatistics::considered(2).inserted(2));

        let second = loader.load(collection.as_ref(), hotels(1..=5)).await.unwrap();
        assert_eq!(second.total, 5);
        assert_eq!(second.skipped, 2);
        assert_eq!(second.succeeded, 3);
        assert!(second.is_balanced());
        assert_eq!(collection.count_documents(&DocumentFilter::All).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn one_bad_record_does_not_sink_its_batch() {
        let store = MemoryDatastore::new();
        let collection = store.collection(Category::Lodging);
        let mut batch = hotels(1..=4);
        batch.insert(2, hotel("99", "Hotel Off The Map", 122.57));

        let stats = BatchLoader::new(50)
            .load(collection.as_ref(), batch)
            .await
            .unwrap();

        assert_eq!(stats.total, 5);
        assert_eq!(stats.succeeded, 4);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 4);
        assert!(stats.is_balanced());
    }

    #[tokio::test]
    async fn loaded_records_are_forced_pending() {
        let store = MemoryDatastore::new();
        let mut approved = hotel("7", "Already Approved", 22.57);
        let envelope = approved.envelope_mut();
        envelope.status = ModerationStatus::Active;
        envelope.featured = true;
        envelope.promoted = true;

        BatchLoader::default()
            .load(store.collection(Category::Lodging).as_ref(), vec![approved])
            .await
            .unwrap();

        let stored = store.documents(Category::Lodging);
        let envelope = stored[0].entity.envelope();
        assert_eq!(envelope.status, ModerationStatus::Pending);
        assert!(!envelope.featured);
        assert!(!envelope.promoted);
    }

    #[tokio::test]
    async fn entities_without_external_ids_are_never_skipped() {
        let store = MemoryDatastore::new();
        let collection = store.collection(Category::Lodging);
        let mut anonymous = hotel("1", "Anonymous Inn", 22.57);
        anonymous.envelope_mut().external_id = None;
        collection.insert_one(&hotel("1", "Stored Inn", 22.57)).await.unwrap();

        let stats = BatchLoader::default()
            .load(collection.as_ref(), vec![anonymous])
            .await
            .unwrap();
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.succeeded, 1);
    }

    #[tokio::test]
    async fn failed_existence_check_fails_the_load() {
        let store = MemoryDatastore::new();
        store.break_lookups(Category::Lodging);
        let result = BatchLoader::default()
            .load(store.collection(Category::Lodging).as_ref(), hotels(1..=3))
            .await;
        let err = result.unwrap_err();
        assert_eq!(err.completed, LoadStatistics::default());
        assert!(store.documents(Category::Lodging).is_empty());
    }

    #[tokio::test]
    async fn later_lookup_failure_keeps_earlier_batch_counts() {
        let store = MemoryDatastore::new();
        let collection = FailingLookup {
            inner: store.collection(Category::Lodging),
            fail_on_call: 2,
            calls: AtomicUsize::new(0),
        };

        let err = BatchLoader::new(2)
            .load(&collection, hotels(1..=4))
            .await
            .unwrap_err();

        assert_eq!(err.completed, LoadStatistics::considered(2).inserted(2));
        assert_eq!(err.completed.pending, 2);
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(store.documents(Category::Lodging).len(), 2);
    }
}
