//! Run orchestration for the POI ingest pipeline: configuration, batch loading, the
//! three run modes and the end-of-run report.

mod config;
mod loader;
mod pipeline;
mod report;

pub use config::{ConfigError, SyncConfig, MEMORY_DATABASE_SCHEME};
pub use loader::{BatchLoader, LoadError, DEFAULT_BATCH_SIZE};
pub use pipeline::{run_from_env, CategoryError, RunMode, RunPhase, SyncError, SyncPipeline};
pub use report::{recommendations, render, CategoryOutcome, RunReport};
