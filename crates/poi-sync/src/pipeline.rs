use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use poi_adapters::{
    build_query, normalize_batch, synthesize, FixtureSource, GeoSource, NormalizeContext,
    OverpassClient, QueryArea, SourceError,
};
use poi_core::{Category, LoadStatistics, ModerationStatus, NormalizedEntity, RawRecord};
use poi_storage::{
    BackoffPolicy, Datastore, DocumentFilter, MemoryDatastore, PgDatastore, SnapshotStore,
    StoreError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{ConfigError, SyncConfig};
use crate::loader::{BatchLoader, LoadError};
use crate::report::{CategoryOutcome, RunReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Fetch, normalize, snapshot and load every category.
    IngestAndLoad,
    /// Load whatever snapshots are on disk without contacting the source.
    LoadExisting,
    /// Purge pending records, then ingest and load.
    FreshIngest,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::IngestAndLoad => "ingest-and-load",
            RunMode::LoadExisting => "load-existing",
            RunMode::FreshIngest => "fresh-ingest",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one run. The four middle phases repeat for every category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Connecting,
    Fetching,
    Normalizing,
    Snapshotting,
    Loading,
    Reporting,
    Done,
}

impl RunPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Connecting => "connecting",
            RunPhase::Fetching => "fetching",
            RunPhase::Normalizing => "normalizing",
            RunPhase::Snapshotting => "snapshotting",
            RunPhase::Loading => "loading",
            RunPhase::Reporting => "reporting",
            RunPhase::Done => "done",
        }
    }

    fn enter(self) {
        debug!(phase = self.as_str(), "phase");
    }
}

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("fetch failed after {attempts} attempt(s): {source}")]
    Fetch { attempts: usize, source: SourceError },
    /// `partial` holds what the batches before the failed check stored.
    #[error("duplicate check failed: {source}")]
    DuplicateCheck {
        partial: LoadStatistics,
        source: StoreError,
    },
    #[error("snapshot failed: {0}")]
    Snapshot(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("purging pending records from `{collection}`: {source}")]
    Purge {
        collection: &'static str,
        source: StoreError,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Sequences every category through fetch, normalize, snapshot and load.
pub struct SyncPipeline {
    source: Arc<dyn GeoSource>,
    datastore: Arc<dyn Datastore>,
    snapshots: SnapshotStore,
    loader: BatchLoader,
    area: QueryArea,
    default_city: String,
    default_state: String,
    category_delay: Duration,
    backoff: BackoffPolicy,
}

impl SyncPipeline {
    pub fn new(
        source: Arc<dyn GeoSource>,
        datastore: Arc<dyn Datastore>,
        snapshots: SnapshotStore,
    ) -> Self {
        Self {
            source,
            datastore,
            snapshots,
            loader: BatchLoader::default(),
            area: QueryArea::DEFAULT,
            default_city: "Kolkata".to_string(),
            default_state: "West Bengal".to_string(),
            category_delay: Duration::from_secs(2),
            backoff: BackoffPolicy::default(),
        }
    }

    /// Wire a pipeline from configuration, opening the datastore once for the whole run.
    pub async fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        let source: Arc<dyn GeoSource> = match &config.source_fixtures {
            Some(dir) => {
                info!(dir = %dir.display(), "using fixture source");
                Arc::new(FixtureSource::new(dir))
            }
            None => Arc::new(OverpassClient::new(
                config.overpass_url.clone(),
                config.http_client(),
            )?),
        };
        let datastore: Arc<dyn Datastore> = if config.uses_memory_store() {
            info!("using in-memory datastore; nothing will persist past this run");
            Arc::new(MemoryDatastore::new())
        } else {
            Arc::new(PgDatastore::connect(&config.database_url).await?)
        };

        Ok(Self::new(source, datastore, SnapshotStore::new(&config.snapshot_dir))
            .with_loader(BatchLoader::new(config.batch_size))
            .with_area(config.area)
            .with_region(config.default_city.clone(), config.default_state.clone())
            .with_category_delay(config.category_delay)
            .with_backoff(config.backoff()))
    }

    pub fn with_loader(mut self, loader: BatchLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_area(mut self, area: QueryArea) -> Self {
        self.area = area;
        self
    }

    pub fn with_region(mut self, city: impl Into<String>, state: impl Into<String>) -> Self {
        self.default_city = city.into();
        self.default_state = state.into();
        self
    }

    pub fn with_category_delay(mut self, delay: Duration) -> Self {
        self.category_delay = delay;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub async fn run(&self, mode: RunMode) -> Result<RunReport, SyncError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("poi_run", %run_id, %mode);
        self.run_inner(run_id, mode).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, mode: RunMode) -> Result<RunReport, SyncError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(source = self.source.name(), "run started");

        RunPhase::Connecting.enter();
        self.snapshots
            .ensure_writable()
            .await
            .map_err(|err| ConfigError::SnapshotDir {
                path: self.snapshots.root().to_path_buf(),
                reason: format!("{err:#}"),
            })?;
        let purged = match mode {
            RunMode::FreshIngest => Some(self.purge_pending().await?),
            RunMode::IngestAndLoad | RunMode::LoadExisting => None,
        };

        let ctx = NormalizeContext::new(
            self.default_city.clone(),
            self.default_state.clone(),
            self.area.center(),
        )
        .imported_at(started_at);

        let mut outcomes = Vec::with_capacity(Category::ALL.len());
        for (index, category) in Category::ALL.into_iter().enumerate() {
            if index > 0 && !self.category_delay.is_zero() {
                tokio::time::sleep(self.category_delay).await;
            }
            let outcome = self
                .run_category(mode, category, &ctx)
                .instrument(info_span!("category", %category))
                .await;
            match &outcome.result {
                Ok(stats) => info!(
                    %category,
                    total = stats.total,
                    inserted = stats.succeeded,
                    failed = stats.failed,
                    skipped = stats.skipped,
                    "category complete"
                ),
                Err(err) => warn!(%category, error = %err, "category failed"),
            }
            outcomes.push(outcome);
        }

        RunPhase::Reporting.enter();
        let report = RunReport {
            run_id,
            mode,
            started_at,
            finished_at: Utc::now(),
            duration: clock.elapsed(),
            purged,
            outcomes,
        };
        match self.snapshots.write_report(run_id, &report).await {
            Ok(path) => info!(path = %path.display(), "run report written"),
            Err(err) => warn!(error = %format!("{err:#}"), "could not persist run report"),
        }
        RunPhase::Done.enter();
        Ok(report)
    }

    async fn run_category(
        &self,
        mode: RunMode,
        category: Category,
        ctx: &NormalizeContext,
    ) -> CategoryOutcome {
        let mut outcome = CategoryOutcome::new(category);
        let result = self
            .process_category(mode, category, ctx, &mut outcome)
            .await;
        outcome.result = result;
        outcome
    }

    async fn process_category(
        &self,
        mode: RunMode,
        category: Category,
        ctx: &NormalizeContext,
        outcome: &mut CategoryOutcome,
    ) -> Result<LoadStatistics, CategoryError> {
        let entities = match mode {
            RunMode::LoadExisting => {
                let snapshot = self
                    .snapshots
                    .read_snapshot(category)
                    .await
                    .map_err(|err| CategoryError::Snapshot(format!("{err:#}")))?;
                let Some(entities) = snapshot else {
                    warn!(
                        %category,
                        path = %self.snapshots.snapshot_path(category).display(),
                        "no snapshot on disk, nothing to load"
                    );
                    outcome.snapshot_missing = true;
                    return Ok(LoadStatistics::default());
                };
                outcome.received = entities.len();
                entities
            }
            RunMode::IngestAndLoad | RunMode::FreshIngest => {
                let entities = self.ingest(category, ctx, outcome).await?;
                RunPhase::Snapshotting.enter();
                let stored = self
                    .snapshots
                    .write_snapshot(category, &entities)
                    .await
                    .map_err(|err| CategoryError::Snapshot(format!("{err:#}")))?;
                debug!(
                    %category,
                    sha256 = %stored.sha256,
                    records = stored.records,
                    "snapshot written"
                );
                outcome.snapshot = Some(stored);
                entities
            }
        };

        RunPhase::Loading.enter();
        let collection = self.datastore.collection(category);
        self.loader
            .load(collection.as_ref(), entities)
            .await
            .map_err(|LoadError { completed, source }| CategoryError::DuplicateCheck {
                partial: completed,
                source,
            })
    }

    async fn ingest(
        &self,
        category: Category,
        ctx: &NormalizeContext,
        outcome: &mut CategoryOutcome,
    ) -> Result<Vec<NormalizedEntity>, CategoryError> {
        if category.is_synthetic() {
            RunPhase::Normalizing.enter();
            let entities = synthesize(category, ctx);
            outcome.received = entities.len();
            return Ok(entities);
        }

        RunPhase::Fetching.enter();
        let records = self.fetch_with_retry(category).await?;
        outcome.received = records.len();

        RunPhase::Normalizing.enter();
        let batch = normalize_batch(&records, category, ctx);
        outcome.discarded = batch.discarded_total();
        info!(
            %category,
            received = records.len(),
            normalized = batch.entities.len(),
            discarded = outcome.discarded,
            "records normalized"
        );
        Ok(batch.entities)
    }

    async fn fetch_with_retry(&self, category: Category) -> Result<Vec<RawRecord>, CategoryError> {
        let Some(query) = build_query(category, &self.area) else {
            return Ok(Vec::new());
        };
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let result = self
                .source
                .fetch(category, &query)
                .instrument(info_span!("source_fetch", source = self.source.name(), attempt))
                .await;
            match result {
                Ok(records) => return Ok(records),
                Err(err) if err.is_retryable() && attempt <= self.backoff.max_retries => {
                    let delay = self.backoff.delay_for_attempt(attempt - 1);
                    warn!(
                        %category,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "source fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(source) => {
                    return Err(CategoryError::Fetch {
                        attempts: attempt,
                        source,
                    })
                }
            }
        }
    }

    /// Delete every pending record across all collections; moderated records are untouched.
    async fn purge_pending(&self) -> Result<u64, SyncError> {
        let mut total = 0;
        for category in Category::ALL {
            let removed = self
                .datastore
                .collection(category)
                .delete_many(&DocumentFilter::Status(ModerationStatus::Pending))
                .await
                .map_err(|source| SyncError::Purge {
                    collection: category.collection(),
                    source,
                })?;
            info!(%category, removed, "pending records purged");
            total += removed;
        }
        Ok(total)
    }
}

/// Build everything from the environment and run once.
pub async fn run_from_env(mode: RunMode) -> Result<RunReport, SyncError> {
    let config = SyncConfig::from_env()?;
    let pipeline = SyncPipeline::from_config(&config).await?;
    pipeline.run(mode).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_modes_use_cli_spelling() {
        assert_eq!(RunMode::FreshIngest.to_string(), "fresh-ingest");
        assert_eq!(
            serde_json::to_string(&RunMode::LoadExisting).unwrap(),
            "\"load-existing\""
        );
    }
}
