//! Artifact storage.
//!
//! Session and upload state lives only on disk: directory contents and their
//! timestamps. [`ArtifactStore`] is the narrow interface the session manager
//! and sweeper use to touch that state, so an explicit index could replace
//! the filesystem without changing either of them.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use rc_core::Result;

/// One immediate entry of an artifact directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    pub path: PathBuf,
    pub is_dir: bool,
    /// Creation time where the platform reports it, modification time
    /// otherwise.
    pub timestamp: SystemTime,
}

/// List / create / delete / stat operations on artifact directories.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Immediate entries of `dir`. Entries that vanish while being listed
    /// are skipped.
    async fn list(&self, dir: &Path) -> Result<Vec<ArtifactEntry>>;

    /// Create `dir` and its parents. Succeeds if it already exists.
    async fn create_dir(&self, dir: &Path) -> Result<()>;

    /// Delete an entry, recursively for directories. Deleting something that
    /// is already gone succeeds.
    async fn remove(&self, entry: &ArtifactEntry) -> Result<()>;

    /// Whether anything exists at `path`.
    async fn exists(&self, path: &Path) -> bool;
}

/// [`ArtifactStore`] backed directly by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArtifactStore;

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn list(&self, dir: &Path) -> Result<Vec<ArtifactEntry>> {
        let mut out = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            // symlink_metadata so a link is judged (and removed) as itself.
            let meta = match tokio::fs::symlink_metadata(&path).await {
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!("Skipping {}: {e}", path.display());
                    continue;
                }
            };
            let timestamp = match meta.created().or_else(|_| meta.modified()) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!("No timestamp for {}: {e}", path.display());
                    continue;
                }
            };
            out.push(ArtifactEntry {
                path,
                is_dir: meta.is_dir(),
                timestamp,
            });
        }

        Ok(out)
    }

    async fn create_dir(&self, dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir).await?;
        Ok(())
    }

    async fn remove(&self, entry: &ArtifactEntry) -> Result<()> {
        let result = if entry.is_dir {
            tokio::fs::remove_dir_all(&entry.path).await
        } else {
            tokio::fs::remove_file(&entry.path).await
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}
