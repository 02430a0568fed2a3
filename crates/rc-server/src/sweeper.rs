//! Retention sweeper.
//!
//! Periodically deletes entries in the artifact directories (uploads,
//! published streams, transcode sessions) whose timestamp is older than the
//! retention window. Sessions are not tracked anywhere else, so an entry's
//! age on disk is the only signal. A session that is still being transcoded
//! but was created before the window is deleted too.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use rc_core::config::Config;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::storage::ArtifactStore;

/// Counts from one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Deletes artifact entries older than `max_age`.
pub struct Sweeper {
    store: Arc<dyn ArtifactStore>,
    dirs: Vec<PathBuf>,
    max_age: Duration,
}

impl Sweeper {
    pub fn new(store: Arc<dyn ArtifactStore>, dirs: Vec<PathBuf>, max_age: Duration) -> Self {
        Self {
            store,
            dirs,
            max_age,
        }
    }

    /// Sweep the uploads, streams and session directories named in `config`.
    pub fn from_config(config: &Config, store: Arc<dyn ArtifactStore>) -> Self {
        Self::new(
            store,
            vec![
                config.storage.uploads_dir.clone(),
                config.storage.streams_dir.clone(),
                config.streaming.temp_root.clone(),
            ],
            config.retention.max_age(),
        )
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(SystemTime::now()).await
    }

    /// Run one pass as if the current time were `now`.
    ///
    /// Missing directories are skipped. A failure on one entry is logged and
    /// counted; the pass continues with the rest.
    pub async fn sweep_at(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();

        for dir in &self.dirs {
            if !self.store.exists(dir).await {
                tracing::debug!("Sweep: {} does not exist, skipping", dir.display());
                continue;
            }

            let entries = match self.store.list(dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Sweep: failed to list {}: {e}", dir.display());
                    report.failed += 1;
                    continue;
                }
            };

            for entry in entries {
                report.scanned += 1;
                // A timestamp in the future counts as brand new.
                let age = now.duration_since(entry.timestamp).unwrap_or(Duration::ZERO);
                if age <= self.max_age {
                    continue;
                }

                match self.store.remove(&entry).await {
                    Ok(()) => {
                        tracing::info!(
                            "Sweep: removed {} (age {}s)",
                            entry.path.display(),
                            age.as_secs()
                        );
                        report.removed += 1;
                    }
                    Err(e) => {
                        tracing::warn!("Sweep: failed to remove {}: {e}", entry.path.display());
                        report.failed += 1;
                    }
                }
            }
        }

        report
    }
}

/// Run `sweeper` every `period` until `cancel` fires.
///
/// The first pass happens one period after start.
pub async fn run_sweeper(sweeper: Sweeper, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        "Retention sweeper started (interval {}s, max age {}s)",
        period.as_secs(),
        sweeper.max_age.as_secs()
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Retention sweeper stopped");
                return;
            }
            _ = ticker.tick() => {
                let report = sweeper.sweep().await;
                tracing::debug!(
                    scanned = report.scanned,
                    removed = report.removed,
                    failed = report.failed,
                    "Sweep complete"
                );
            }
        }
    }
}
