//! Persistence, snapshot and HTTP transport utilities for the POI ingest pipeline.

mod datastore;
mod http;
mod memory;
mod postgres;
mod snapshot;

pub use datastore::{validate_document, Collection, Datastore, DocumentFilter, StoreError};
pub use http::{
    classify_reqwest_error, classify_status, BackoffPolicy, FetchError, FetchedResponse,
    HttpClientConfig, HttpFetcher, RetryDisposition,
};
pub use memory::{MemoryDatastore, StoredDocument};
pub use postgres::PgDatastore;
pub use snapshot::{SnapshotManifest, SnapshotStore, StoredSnapshot};
