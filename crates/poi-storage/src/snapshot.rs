use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use poi_core::{Category, NormalizedEntity};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

const MANIFEST_FILE: &str = "manifest.json";

/// Result of writing one category snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub category: Category,
    pub file: String,
    pub sha256: String,
    pub bytes: u64,
    pub records: usize,
    pub written_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub schema_version: u32,
    pub snapshots: BTreeMap<Category, StoredSnapshot>,
}

/// On-disk audit trail: one JSON array per category plus a digest manifest and run reports.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sha256_hex(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    pub fn snapshot_path(&self, category: Category) -> PathBuf {
        self.root.join(format!("{}.json", category.as_str()))
    }

    /// Create the directory and prove it accepts writes.
    pub async fn ensure_writable(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating snapshot directory {}", self.root.display()))?;
        let marker = self.root.join(format!(".write-check-{}", Uuid::new_v4()));
        fs::write(&marker, b"ok")
            .await
            .with_context(|| format!("writing test file in {}", self.root.display()))?;
        fs::remove_file(&marker)
            .await
            .with_context(|| format!("removing test file {}", marker.display()))?;
        Ok(())
    }

    pub async fn write_snapshot(
        &self,
        category: Category,
        entities: &[NormalizedEntity],
    ) -> anyhow::Result<StoredSnapshot> {
        let bytes = serde_json::to_vec_pretty(entities)
            .with_context(|| format!("serializing {category} snapshot"))?;
        let path = self.snapshot_path(category);
        self.write_atomic(&path, &bytes).await?;

        let stored = StoredSnapshot {
            category,
            file: format!("{}.json", category.as_str()),
            sha256: Self::sha256_hex(&bytes),
            bytes: bytes.len() as u64,
            records: entities.len(),
            written_at: Utc::now(),
        };
        self.record_in_manifest(&stored).await?;
        Ok(stored)
    }

    /// `Ok(None)` when the category has never been snapshotted.
    pub async fn read_snapshot(
        &self,
        category: Category,
    ) -> anyhow::Result<Option<Vec<NormalizedEntity>>> {
        let path = self.snapshot_path(category);
        if !fs::try_exists(&path)
            .await
            .with_context(|| format!("checking snapshot path {}", path.display()))?
        {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let entities = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(entities))
    }

    pub async fn read_manifest(&self) -> anyhow::Result<SnapshotManifest> {
        let path = self.root.join(MANIFEST_FILE);
        if !fs::try_exists(&path)
            .await
            .with_context(|| format!("checking {}", path.display()))?
        {
            return Ok(SnapshotManifest {
                schema_version: 1,
                snapshots: BTreeMap::new(),
            });
        }
        let text = fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Persist a serialized run report under `reports/<run_id>.json`.
    pub async fn write_report<T: Serialize>(
        &self,
        run_id: Uuid,
        report: &T,
    ) -> anyhow::Result<PathBuf> {
        let path = self.root.join("reports").join(format!("{run_id}.json"));
        let bytes = serde_json::to_vec_pretty(report).context("serializing run report")?;
        self.write_atomic(&path, &bytes).await?;
        Ok(path)
    }

    async fn record_in_manifest(&self, stored: &StoredSnapshot) -> anyhow::Result<()> {
        let mut manifest = self.read_manifest().await?;
        manifest.schema_version = 1;
        manifest.snapshots.insert(stored.category, stored.clone());
        let bytes = serde_json::to_vec_pretty(&manifest).context("serializing snapshot manifest")?;
        self.write_atomic(&self.root.join(MANIFEST_FILE), &bytes).await
    }

    /// Write through a temp file in the same directory and rename over the target.
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
        let parent = path.parent().unwrap_or(&self.root).to_path_buf();
        fs::create_dir_all(&parent)
            .await
            .with_context(|| format!("creating directory {}", parent.display()))?;

        let temp_path = parent.join(format!(".{}.{}.tmp", Uuid::new_v4(), bytes.len()));
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .with_context(|| format!("opening temp file {}", temp_path.display()))?;
        file.write_all(bytes)
            .await
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("flushing temp file {}", temp_path.display()))?;
        drop(file);

        if let Err(err) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(err).with_context(|| {
                format!(
                    "atomically renaming {} -> {}",
                    temp_path.display(),
                    path.display()
                )
            });
        }
        Ok(())
    }
}
