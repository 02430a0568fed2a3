//! Transcode engine adapter.
//!
//! A [`TranscodeEngine`] starts one external process that reads a source
//! file and writes a segmented stream (manifest plus chunks) into a
//! directory it owns. The process runs detached from the request that
//! started it; callers only observe its side effects on disk and, if they
//! choose, its exit status.

mod hls;

pub use hls::{FfmpegHlsEngine, HlsSettings};

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;

/// Everything an engine needs to produce one session's output.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    /// Label used in logs (the session id).
    pub label: String,
    /// Source media file.
    pub input: PathBuf,
    /// Directory the engine writes into. Must already exist.
    pub output_dir: PathBuf,
    /// Manifest path inside `output_dir`.
    pub manifest: PathBuf,
}

/// Starts the external process producing a session's segmented output.
///
/// `launch` must return as soon as the process is running. Failing to start
/// it (missing binary, spawn error) is reported as [`rc_core::Error::Tool`],
/// which callers keep distinct from "output not ready yet".
pub trait TranscodeEngine: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Spawn the process for `job`.
    fn launch(&self, job: &TranscodeJob) -> rc_core::Result<Child>;
}

/// Forward the child's stderr to the log, one line per event.
///
/// Returns `None` if stderr was not piped or was already taken.
pub fn forward_stderr(child: &mut Child, label: String) -> Option<JoinHandle<()>> {
    let stderr = child.stderr.take()?;
    Some(tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::trace!(session_id = %label, "transcoder: {line}");
        }
    }))
}
