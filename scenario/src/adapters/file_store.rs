//! Scenario store writing one JSON record per save.
//!
//! ## Layout
//!
//! ```text
//! {dir}/{location_id}.json   { "summary": SaveSummary, "evaluation": ... }
//! ```
//!
//! The location URL is the `file://` URL of the record.

use crate::collaborators::{SaveReceipt, SaveSummary, ScenarioStore};
use crate::errors::{Result, ScenarioError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// On-disk record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedScenario {
    pub location_id: String,
    pub summary: SaveSummary,
    pub evaluation: serde_json::Value,
}

/// File-backed [`ScenarioStore`]
#[derive(Debug, Clone)]
pub struct FileScenarioStore {
    dir: PathBuf,
}

impl FileScenarioStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, location_id: &str) -> PathBuf {
        self.dir.join(format!("{location_id}.json"))
    }

    /// Atomically write `data` to `path` via a `.tmp` sibling.
    async fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, path).await
    }

    /// Read a saved record back
    pub async fn load(&self, location_id: &str) -> Result<SavedScenario> {
        let path = self.record_path(location_id);
        let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
            ScenarioError::persistence_with_source(format!("failed to read {}", path.display()), e)
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            ScenarioError::persistence_with_source(format!("failed to parse {}", path.display()), e)
        })
    }
}

#[async_trait]
impl ScenarioStore for FileScenarioStore {
    async fn save(
        &self,
        summary: &SaveSummary,
        evaluation: &serde_json::Value,
    ) -> Result<SaveReceipt> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            ScenarioError::persistence_with_source(
                format!("failed to create {}", self.dir.display()),
                e,
            )
        })?;

        let location_id = Uuid::new_v4().to_string();
        let record = SavedScenario {
            location_id: location_id.clone(),
            summary: summary.clone(),
            evaluation: evaluation.clone(),
        };
        let json = serde_json::to_vec_pretty(&record)
            .map_err(|e| ScenarioError::persistence_with_source("failed to encode record", e))?;

        let path = self.record_path(&location_id);
        Self::atomic_write(&path, &json).await.map_err(|e| {
            ScenarioError::persistence_with_source(format!("failed to write {}", path.display()), e)
        })?;

        let absolute = std::path::absolute(&path).unwrap_or_else(|_| path.clone());
        tracing::debug!(path = %absolute.display(), title = %summary.title, "Scenario record written");

        Ok(SaveReceipt {
            location_id,
            location_url: format!("file://{}", absolute.display()),
        })
    }
}
