//! On-demand HLS transcode sessions.
//!
//! Starting a session allocates a fresh id and output directory, launches the
//! transcode engine and waits (bounded) for the manifest to appear. Once the
//! caller has its stream URL the engine process keeps running on its own; a
//! detached task reaps it and logs the exit status. Nothing about a session
//! is kept in memory afterwards: its directory on disk is the only record,
//! and the retention sweeper removes it eventually.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rc_av::{forward_stderr, TranscodeEngine, TranscodeJob};
use rc_core::config::StreamingConfig;
use rc_core::{Error, Result, SessionId};
use serde::Serialize;
use tokio::process::Child;
use tokio::time::MissedTickBehavior;

use crate::roots::{RootRegistry, StreamTarget};
use crate::storage::ArtifactStore;

/// Lifecycle of a session as seen by the request that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Engine launched, manifest not yet seen.
    Pending,
    /// Manifest exists; playback can begin.
    Ready,
    /// Manifest never appeared: engine could not start, exited early or
    /// timed out.
    Failed,
}

/// One transcode session.
#[derive(Debug, Clone, Serialize)]
pub struct StreamSession {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub status: SessionStatus,
}

impl StreamSession {
    /// Pending -> Ready. Any other transition is ignored.
    pub fn mark_ready(&mut self) {
        if self.status == SessionStatus::Pending {
            self.status = SessionStatus::Ready;
        }
    }

    /// Pending -> Failed. Any other transition is ignored.
    pub fn mark_failed(&mut self) {
        if self.status == SessionStatus::Pending {
            self.status = SessionStatus::Failed;
        }
    }
}

/// A ready session plus the URL a player should load.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub session: StreamSession,
    pub stream_url: String,
}

enum Readiness {
    Ready,
    TimedOut,
    Exited(std::io::Result<ExitStatus>),
}

/// Creates sessions and maps artifact requests back to session files.
pub struct SessionManager {
    roots: Arc<RootRegistry>,
    engine: Arc<dyn TranscodeEngine>,
    store: Arc<dyn ArtifactStore>,
    settings: StreamingConfig,
}

impl SessionManager {
    pub fn new(
        roots: Arc<RootRegistry>,
        engine: Arc<dyn TranscodeEngine>,
        store: Arc<dyn ArtifactStore>,
        settings: StreamingConfig,
    ) -> Self {
        Self {
            roots,
            engine,
            store,
            settings,
        }
    }

    /// Validate `target` against the media roots, then start a session for it.
    pub async fn create(&self, target: &StreamTarget) -> Result<SessionHandle> {
        let input = self.roots.resolve_file(target).await?;
        self.start(input).await
    }

    /// Start a session for an already validated input file.
    ///
    /// Returns once the manifest exists. Fails with [`Error::Tool`] if the
    /// engine cannot be launched or exits first, and with [`Error::Timeout`]
    /// if the manifest does not appear in time. On timeout the engine is left
    /// running and the session directory is kept.
    pub async fn start(&self, input: PathBuf) -> Result<SessionHandle> {
        let id = SessionId::new();
        let output_dir = self.session_dir(&id);
        let manifest_path = output_dir.join(&self.settings.manifest_name);

        let mut session = StreamSession {
            id,
            created_at: Utc::now(),
            input_path: input,
            output_dir,
            manifest_path,
            status: SessionStatus::Pending,
        };

        self.store.create_dir(&session.output_dir).await?;

        let job = TranscodeJob {
            label: id.to_string(),
            input: session.input_path.clone(),
            output_dir: session.output_dir.clone(),
            manifest: session.manifest_path.clone(),
        };

        let mut child = match self.engine.launch(&job) {
            Ok(child) => child,
            Err(e) => {
                session.mark_failed();
                tracing::error!(session_id = %id, "Failed to launch {}: {e}", self.engine.name());
                return Err(e);
            }
        };
        forward_stderr(&mut child, id.to_string());

        match self.wait_for_manifest(&mut child, &session.manifest_path).await {
            Readiness::Ready => {
                session.mark_ready();
                tracing::info!(session_id = %id, "Stream ready: {}", session.manifest_path.display());
                spawn_reaper(child, id);
                Ok(SessionHandle {
                    stream_url: self.stream_url(&id),
                    session,
                })
            }
            Readiness::TimedOut => {
                session.mark_failed();
                let waited = self.settings.ready_timeout();
                tracing::warn!(session_id = %id, "No manifest after {waited:?}; leaving transcoder running");
                spawn_reaper(child, id);
                Err(Error::timeout("stream manifest", waited))
            }
            Readiness::Exited(status) => {
                session.mark_failed();
                let message = match status {
                    Ok(status) => format!("exited with {status} before producing a manifest"),
                    Err(e) => format!("failed waiting for process: {e}"),
                };
                tracing::error!(session_id = %id, "{} {message}", self.engine.name());
                Err(Error::tool(self.engine.name(), message))
            }
        }
    }

    /// Poll for the manifest until it appears, the deadline passes or the
    /// engine exits. The manifest wins any tie.
    async fn wait_for_manifest(&self, child: &mut Child, manifest: &Path) -> Readiness {
        let deadline = tokio::time::sleep(self.settings.ready_timeout());
        tokio::pin!(deadline);

        // interval() panics on a zero period.
        let period = self
            .settings
            .ready_poll_interval()
            .max(std::time::Duration::from_millis(1));
        let mut poll = tokio::time::interval(period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    if self.store.exists(manifest).await {
                        return Readiness::Ready;
                    }
                    return Readiness::TimedOut;
                }
                _ = poll.tick() => {
                    if self.store.exists(manifest).await {
                        return Readiness::Ready;
                    }
                }
                status = child.wait() => {
                    if self.store.exists(manifest).await {
                        return Readiness::Ready;
                    }
                    return Readiness::Exited(status);
                }
            }
        }
    }

    /// Output directory for a session.
    pub fn session_dir(&self, id: &SessionId) -> PathBuf {
        self.settings.temp_root.join(id.to_string())
    }

    /// Public URL of a session's manifest.
    pub fn stream_url(&self, id: &SessionId) -> String {
        format!("/stream/{id}/{}", self.settings.manifest_name)
    }

    /// Map an artifact request to a path inside a session directory.
    ///
    /// Only the manifest and plain `.ts` segment names are served. Anything
    /// else, including a malformed session id, is reported as not found.
    /// The returned path is not checked for existence.
    pub fn resolve_artifact(&self, session_id: &str, name: &str) -> Result<PathBuf> {
        let id: SessionId = session_id
            .parse()
            .map_err(|_| Error::not_found("session", session_id))?;

        if name != self.settings.manifest_name && !is_segment_name(name) {
            return Err(Error::not_found("artifact", name));
        }

        Ok(self.session_dir(&id).join(name))
    }

    pub fn manifest_name(&self) -> &str {
        &self.settings.manifest_name
    }
}

fn is_segment_name(name: &str) -> bool {
    name.len() > ".ts".len()
        && name.ends_with(".ts")
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}

/// Wait for a detached engine process so it never lingers as a zombie.
fn spawn_reaper(mut child: Child, id: SessionId) {
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) if status.success() => {
                tracing::info!(session_id = %id, "Transcoder finished");
            }
            Ok(status) => {
                tracing::warn!(session_id = %id, "Transcoder exited with {status}");
            }
            Err(e) => {
                tracing::error!(session_id = %id, "Failed to wait for transcoder: {e}");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsArtifactStore;
    use rc_av::ToolCommand;
    use rc_core::config::MediaRoot;

    /// Runs a shell script in place of a real transcoder. `$1` is the
    /// manifest path.
    struct ScriptEngine(&'static str);

    impl TranscodeEngine for ScriptEngine {
        fn name(&self) -> &str {
            "script"
        }

        fn launch(&self, job: &TranscodeJob) -> Result<Child> {
            ToolCommand::new(PathBuf::from("sh"))
                .args(["-c", self.0, "sh"])
                .arg(job.manifest.to_string_lossy())
                .spawn()
        }
    }

    struct FailingEngine;

    impl TranscodeEngine for FailingEngine {
        fn name(&self) -> &str {
            "missing"
        }

        fn launch(&self, _job: &TranscodeJob) -> Result<Child> {
            Err(Error::tool("missing", "binary not found"))
        }
    }

    fn manager(
        media: &Path,
        temp: &Path,
        engine: Arc<dyn TranscodeEngine>,
        timeout_secs: u64,
    ) -> SessionManager {
        let roots = RootRegistry::new(vec![MediaRoot {
            name: "Media".into(),
            path: media.to_path_buf(),
        }]);
        let settings = StreamingConfig {
            temp_root: temp.to_path_buf(),
            ready_poll_interval_ms: 20,
            ready_timeout_secs: timeout_secs,
            ..StreamingConfig::default()
        };
        SessionManager::new(Arc::new(roots), engine, Arc::new(FsArtifactStore), settings)
    }

    #[tokio::test]
    async fn start_returns_once_manifest_exists() {
        let media = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptEngine("sleep 0.1; echo '#EXTM3U' > \"$1\"; sleep 1"));
        let mgr = manager(media.path(), temp.path(), engine, 5);

        let handle = mgr.start(media.path().join("in.mp4")).await.unwrap();
        assert_eq!(handle.session.status, SessionStatus::Ready);
        assert!(handle.session.manifest_path.exists());
        assert_eq!(
            handle.stream_url,
            format!("/stream/{}/stream.m3u8", handle.session.id)
        );
        assert!(handle.session.output_dir.starts_with(temp.path()));
    }

    #[tokio::test]
    async fn timeout_keeps_session_dir() {
        let media = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptEngine("sleep 3"));
        let mgr = manager(media.path(), temp.path(), engine, 1);

        let err = mgr.start(media.path().join("in.mp4")).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn early_exit_is_engine_error() {
        let media = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptEngine("exit 3"));
        let mgr = manager(media.path(), temp.path(), engine, 5);

        let err = mgr.start(media.path().join("in.mp4")).await.unwrap_err();
        match err {
            Error::Tool { tool, message } => {
                assert_eq!(tool, "script");
                assert!(message.contains("before producing a manifest"));
            }
            other => panic!("expected tool error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn quick_exit_with_manifest_is_ready() {
        let media = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptEngine("echo '#EXTM3U' > \"$1\""));
        let mgr = manager(media.path(), temp.path(), engine, 5);

        let handle = mgr.start(media.path().join("in.mp4")).await.unwrap();
        assert_eq!(handle.session.status, SessionStatus::Ready);
    }

    #[tokio::test]
    async fn launch_failure_is_engine_error() {
        let media = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let mgr = manager(media.path(), temp.path(), Arc::new(FailingEngine), 5);

        let err = mgr.start(media.path().join("in.mp4")).await.unwrap_err();
        assert!(matches!(err, Error::Tool { .. }));
    }

    #[tokio::test]
    async fn create_rejects_traversal_without_launching() {
        let media = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let mgr = manager(media.path(), temp.path(), Arc::new(FailingEngine), 5);

        let target = StreamTarget {
            root: "Media".into(),
            directory: "../..".into(),
            filename: "etc/passwd".into(),
        };
        let err = mgr.create(&target).await.unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn concurrent_sessions_get_distinct_dirs() {
        let media = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptEngine("echo '#EXTM3U' > \"$1\""));
        let mgr = manager(media.path(), temp.path(), engine, 5);

        let input = media.path().join("in.mp4");
        let (a, b) = tokio::join!(mgr.start(input.clone()), mgr.start(input));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.session.id, b.session.id);
        assert_ne!(a.session.output_dir, b.session.output_dir);
    }

    #[test]
    fn status_only_leaves_pending() {
        let mut session = StreamSession {
            id: SessionId::new(),
            created_at: Utc::now(),
            input_path: PathBuf::from("/in.mp4"),
            output_dir: PathBuf::from("/tmp/x"),
            manifest_path: PathBuf::from("/tmp/x/stream.m3u8"),
            status: SessionStatus::Pending,
        };
        session.mark_ready();
        session.mark_failed();
        assert_eq!(session.status, SessionStatus::Ready);

        session.status = SessionStatus::Pending;
        session.mark_failed();
        session.mark_ready();
        assert_eq!(session.status, SessionStatus::Failed);
    }

    #[test]
    fn resolve_artifact_accepts_manifest_and_segments() {
        let temp = tempfile::tempdir().unwrap();
        let mgr = manager(temp.path(), temp.path(), Arc::new(FailingEngine), 5);
        let id = SessionId::new();

        let manifest = mgr.resolve_artifact(&id.to_string(), "stream.m3u8").unwrap();
        assert_eq!(manifest, temp.path().join(id.to_string()).join("stream.m3u8"));

        let segment = mgr.resolve_artifact(&id.to_string(), "stream3.ts").unwrap();
        assert!(segment.ends_with("stream3.ts"));
    }

    #[test]
    fn resolve_artifact_rejects_other_names() {
        let temp = tempfile::tempdir().unwrap();
        let mgr = manager(temp.path(), temp.path(), Arc::new(FailingEngine), 5);
        let id = SessionId::new().to_string();

        for name in ["other.m3u8", "..ts", ".ts", "a/b.ts", "x.mp4", "..\\x.ts"] {
            let err = mgr.resolve_artifact(&id, name).unwrap_err();
            assert!(matches!(err, Error::NotFound { .. }), "{name}");
        }

        let err = mgr.resolve_artifact("not-a-uuid", "stream.m3u8").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
