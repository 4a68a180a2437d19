use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::SourceProvider;
use crate::Result;

/// Tag key resolving to the hash of the newest tag.
pub const LATEST_TAG_HASH: &str = "latest_tag_hash";
/// Tag key resolving to the name of the newest tag.
pub const LATEST_TAG_NAME: &str = "latest_tag_name";

/// Point-in-time view of the tracked branches and tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSnapshot {
    pub branches: BTreeMap<String, String>,
    pub tags: BTreeMap<String, String>,
    pub last_updated_at: DateTime<Utc>,
}

impl DetectionSnapshot {
    pub async fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, body).await?;
        Ok(())
    }

    pub async fn read_from(path: &Path) -> Result<Self> {
        let body = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

pub struct Detector<P> {
    provider: P,
    branches: Vec<String>,
    tags: Vec<String>,
}

impl<P: SourceProvider> Detector<P> {
    pub const fn new(provider: P, branches: Vec<String>, tags: Vec<String>) -> Self {
        Self {
            provider,
            branches,
            tags,
        }
    }

    /// Head commit of every configured branch. The first lookup failure
    /// aborts the whole detection.
    pub async fn branch_hashes(&self) -> Result<BTreeMap<String, String>> {
        let mut hashes = BTreeMap::new();
        for branch in &self.branches {
            let sha = self.provider.branch_head(branch).await?;
            tracing::debug!(branch = %branch, sha = %sha, "branch head");
            hashes.insert(branch.clone(), sha);
        }
        Ok(hashes)
    }

    /// Resolve every configured tag key against the repository's tags.
    ///
    /// [`LATEST_TAG_HASH`] and [`LATEST_TAG_NAME`] refer to the newest tag;
    /// any other key must match a tag name exactly and is skipped when it
    /// does not.
    pub async fn tag_hashes(&self) -> Result<BTreeMap<String, String>> {
        let mut resolved = BTreeMap::new();
        if self.tags.is_empty() {
            return Ok(resolved);
        }

        let tags = self.provider.list_tags().await?;
        let Some(newest) = tags.first() else {
            tracing::info!("repository has no tags");
            return Ok(resolved);
        };

        for key in &self.tags {
            let value = match key.as_str() {
                LATEST_TAG_HASH => Some(newest.sha.clone()),
                LATEST_TAG_NAME => Some(newest.name.clone()),
                name => tags.iter().find(|t| t.name == name).map(|t| t.sha.clone()),
            };
            match value {
                Some(value) => {
                    resolved.insert(key.clone(), value);
                }
                None => tracing::warn!(tag = %key, "tag not found"),
            }
        }
        Ok(resolved)
    }

    pub async fn snapshot(&self) -> Result<DetectionSnapshot> {
        Ok(DetectionSnapshot {
            branches: self.branch_hashes().await?,
            tags: self.tag_hashes().await?,
            last_updated_at: Utc::now(),
        })
    }

    pub async fn write_snapshot(&self, path: &Path) -> Result<DetectionSnapshot> {
        let snapshot = self.snapshot().await?;
        snapshot.write_to(path).await?;
        tracing::info!(
            path = %path.display(),
            branches = snapshot.branches.len(),
            tags = snapshot.tags.len(),
            "detection snapshot written"
        );
        Ok(snapshot)
    }
}
