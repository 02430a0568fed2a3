//! Shared application context passed to every route handler.

use std::sync::Arc;

use rc_av::TranscodeEngine;
use rc_core::config::Config;

use crate::roots::RootRegistry;
use crate::sessions::SessionManager;
use crate::storage::{ArtifactStore, FsArtifactStore};

/// Application state shared across all handlers via Axum's `State` extractor.
///
/// Everything inside is immutable or internally synchronized, so cloning is
/// a handful of `Arc` bumps.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub roots: Arc<RootRegistry>,
    pub store: Arc<dyn ArtifactStore>,
    pub sessions: Arc<SessionManager>,
}

impl AppContext {
    /// Build a context over the local filesystem with the given engine.
    pub fn new(config: Config, engine: Arc<dyn TranscodeEngine>) -> Self {
        Self::with_store(config, engine, Arc::new(FsArtifactStore))
    }

    pub fn with_store(
        config: Config,
        engine: Arc<dyn TranscodeEngine>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        let roots = Arc::new(RootRegistry::new(config.roots.clone()));
        let sessions = Arc::new(SessionManager::new(
            roots.clone(),
            engine,
            store.clone(),
            config.streaming.clone(),
        ));
        Self {
            config: Arc::new(config),
            roots,
            store,
            sessions,
        }
    }
}
