use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use poi_core::{Category, ModerationStatus, NormalizedEntity};
use thiserror::Error;

/// Selection applied to find, count and delete operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFilter {
    All,
    Status(ModerationStatus),
    ExternalIds(Vec<String>),
}

impl DocumentFilter {
    pub fn matches(&self, entity: &NormalizedEntity) -> bool {
        match self {
            DocumentFilter::All => true,
            DocumentFilter::Status(status) => entity.envelope().status == *status,
            DocumentFilter::ExternalIds(ids) => entity
                .external_id()
                .is_some_and(|id| ids.iter().any(|candidate| candidate == id)),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("datastore connection failed: {0}")]
    Connection(String),
    #[error("query on `{collection}` failed: {message}")]
    Query { collection: String, message: String },
    #[error("document `{slug}` rejected by `{collection}`: {reason}")]
    Rejected {
        collection: String,
        slug: String,
        reason: String,
    },
    #[error("encoding document: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    pub fn query(collection: &str, message: impl ToString) -> Self {
        StoreError::Query {
            collection: collection.to_string(),
            message: message.to_string(),
        }
    }
}

/// One named collection of entity documents.
#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    async fn find(&self, filter: &DocumentFilter) -> Result<Vec<NormalizedEntity>, StoreError>;

    /// External ids from `ids` already present in the collection.
    async fn existing_external_ids(&self, ids: &[String]) -> Result<HashSet<String>, StoreError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let found = self
            .find(&DocumentFilter::ExternalIds(ids.to_vec()))
            .await?;
        Ok(found
            .iter()
            .filter_map(|entity| entity.external_id().map(str::to_string))
            .collect())
    }

    /// All-or-nothing bulk insert; returns the number of inserted documents.
    async fn insert_many(&self, entities: &[NormalizedEntity]) -> Result<usize, StoreError>;

    async fn insert_one(&self, entity: &NormalizedEntity) -> Result<(), StoreError>;

    async fn delete_many(&self, filter: &DocumentFilter) -> Result<u64, StoreError>;

    async fn count_documents(&self, filter: &DocumentFilter) -> Result<u64, StoreError>;
}

/// Handle to the backing store, shared across all categories of a run.
pub trait Datastore: Send + Sync {
    fn collection(&self, category: Category) -> Arc<dyn Collection>;
}

/// Schema rules every backend enforces before accepting a document.
pub fn validate_document(collection: &str, entity: &NormalizedEntity) -> Result<(), StoreError> {
    let envelope = entity.envelope();
    let reject = |reason: &str| StoreError::Rejected {
        collection: collection.to_string(),
        slug: envelope.slug.clone(),
        reason: reason.to_string(),
    };

    if envelope.name.trim().is_empty() {
        return Err(reject("name must not be empty"));
    }
    if envelope.slug.trim().is_empty() {
        return Err(reject("slug must not be empty"));
    }
    let (lon, lat) = (envelope.location.longitude(), envelope.location.latitude());
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(reject("longitude out of range"));
    }
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(reject("latitude out of range"));
    }
    Ok(())
}
