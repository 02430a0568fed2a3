//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which lays out a media root and the artifact
//! directories in temporary directories and builds a full [`AppContext`].
//! The transcode engine is a [`ScriptEngine`] so sessions can be driven
//! without ffmpeg. [`TestHarness::serve`] starts Axum on a random port for
//! HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rc_av::{ToolCommand, TranscodeEngine, TranscodeJob};
use rc_core::config::{Config, MediaRoot};
use rc_server::context::AppContext;
use rc_server::router::build_router;
use tempfile::TempDir;

/// Name of the media root every harness configures.
pub const ROOT: &str = "Media";

/// Script that writes one segment and then the manifest listing it, then
/// keeps "transcoding".
pub const READY_SCRIPT: &str = r#"
printf 'segment-bytes' > "$2/stream0.ts"
printf '#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXTINF:6.0,\nstream0.ts\n' > "$3"
sleep 2
"#;

/// Script that never writes a manifest.
pub const SILENT_SCRIPT: &str = "sleep 5";

/// Script that exits with an error before writing anything.
pub const FAILING_SCRIPT: &str = "echo 'Invalid data found when processing input' >&2; exit 1";

/// Transcode engine running `sh -c <script> sh <input> <output_dir> <manifest>`.
pub struct ScriptEngine {
    script: String,
}

impl ScriptEngine {
    pub fn new(script: &str) -> Self {
        Self {
            script: script.to_string(),
        }
    }
}

impl TranscodeEngine for ScriptEngine {
    fn name(&self) -> &str {
        "script"
    }

    fn launch(&self, job: &TranscodeJob) -> rc_core::Result<tokio::process::Child> {
        ToolCommand::new(PathBuf::from("sh"))
            .args(["-c", self.script.as_str(), "sh"])
            .arg(job.input.to_string_lossy())
            .arg(job.output_dir.to_string_lossy())
            .arg(job.manifest.to_string_lossy())
            .spawn()
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`] over temporary
/// directories.
pub struct TestHarness {
    pub ctx: AppContext,
    pub media: TempDir,
    pub artifacts: TempDir,
}

impl TestHarness {
    /// Harness whose engine writes a manifest immediately.
    pub fn new() -> Self {
        Self::with_script(READY_SCRIPT)
    }

    pub fn with_script(script: &str) -> Self {
        Self::build(script, |_| {})
    }

    /// Harness with a custom engine script and config tweaks applied after
    /// the temporary paths are filled in.
    pub fn build(script: &str, tweak: impl FnOnce(&mut Config)) -> Self {
        let media = tempfile::tempdir().expect("failed to create media dir");
        let artifacts = tempfile::tempdir().expect("failed to create artifact dir");

        let mut config = Config::default();
        config.roots = vec![MediaRoot {
            name: ROOT.into(),
            path: media.path().to_path_buf(),
        }];
        config.streaming.temp_root = artifacts.path().join("stream");
        config.streaming.ready_poll_interval_ms = 50;
        config.streaming.ready_timeout_secs = 5;
        config.storage.uploads_dir = artifacts.path().join("uploads");
        config.storage.streams_dir = artifacts.path().join("streams");
        tweak(&mut config);

        for dir in [
            &config.streaming.temp_root,
            &config.storage.uploads_dir,
            &config.storage.streams_dir,
        ] {
            std::fs::create_dir_all(dir).expect("failed to create artifact subdir");
        }

        let ctx = AppContext::new(config, Arc::new(ScriptEngine::new(script)));
        Self {
            ctx,
            media,
            artifacts,
        }
    }

    /// Start an Axum server on a random port and return its address.
    pub async fn serve(&self) -> SocketAddr {
        let app = build_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        addr
    }

    /// Write a file under the media root, creating parent directories.
    pub fn add_media(&self, relative: &str, contents: &[u8]) -> PathBuf {
        let path = self.media.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create media subdir");
        }
        std::fs::write(&path, contents).expect("failed to write media file");
        path
    }

    pub fn temp_root(&self) -> &Path {
        &self.ctx.config.streaming.temp_root
    }

    /// Number of session directories currently on disk.
    pub fn session_dir_count(&self) -> usize {
        std::fs::read_dir(self.temp_root())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}
