//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! media roots plus all sub-configs for the server, streaming, storage,
//! retention and external tools. Every section defaults sensibly so a
//! completely empty `{}` file is valid.
//!
//! A `Config` is built once at start-up and shared read-only; nothing mutates
//! it afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub roots: Vec<MediaRoot>,
    pub library: LibraryConfig,
    pub streaming: StreamingConfig,
    pub storage: StorageConfig,
    pub retention: RetentionConfig,
    pub tools: ToolsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            roots: default_roots(),
            library: LibraryConfig::default(),
            streaming: StreamingConfig::default(),
            storage: StorageConfig::default(),
            retention: RetentionConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    ///
    /// Root paths starting with `~` are expanded against the home directory.
    pub fn from_json(json_str: &str) -> Result<Self> {
        let mut config: Config = serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))?;
        for root in &mut config.roots {
            root.path = expand_tilde(&root.path);
        }
        Ok(config)
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None`, the file does not exist, or it cannot be parsed.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Load configuration strictly: a missing or invalid file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.roots.is_empty() {
            warnings.push("no media roots configured; nothing can be browsed".into());
        }

        for (i, root) in self.roots.iter().enumerate() {
            if root.name.trim().is_empty() {
                warnings.push(format!("roots[{i}].name is empty"));
            }
            if !root.path.is_absolute() {
                warnings.push(format!(
                    "roots[{i}] '{}' path {} is not absolute",
                    root.name,
                    root.path.display()
                ));
            }
            if self.roots[..i].iter().any(|r| r.name == root.name) {
                warnings.push(format!(
                    "roots[{i}] duplicates name '{}'; only the first is reachable",
                    root.name
                ));
            }
        }

        if self.library.video_extensions.is_empty() {
            warnings.push("library.video_extensions is empty; no files will be listed".into());
        }

        if self.streaming.ready_poll_interval_ms == 0 {
            warnings.push("streaming.ready_poll_interval_ms is 0; polling will spin".into());
        }

        if self.streaming.ready_poll_interval() >= self.streaming.ready_timeout() {
            warnings.push(
                "streaming.ready_poll_interval_ms is not shorter than ready_timeout_secs".into(),
            );
        }

        if self.retention.enabled && self.retention.sweep_interval_secs == 0 {
            warnings.push("retention.sweep_interval_secs is 0; sweeper will not run".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Optional directory with a web UI, served as the router fallback.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            static_dir: None,
        }
    }
}

/// A named, browsable media directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRoot {
    pub name: String,
    pub path: PathBuf,
}

fn default_roots() -> Vec<MediaRoot> {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
    home.map(|h| {
        vec![MediaRoot {
            name: "Home".into(),
            path: PathBuf::from(h),
        }]
    })
    .unwrap_or_default()
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) if s.starts_with('~') => PathBuf::from(shellexpand::tilde(s).as_ref()),
        _ => path.to_path_buf(),
    }
}

/// Directory listing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Lowercase file extensions (without the dot) listed as videos.
    pub video_extensions: Vec<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            video_extensions: ["mp4", "mkv", "avi", "mov", "m4v"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Transcode session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Directory holding one subdirectory per transcode session.
    pub temp_root: PathBuf,
    /// File name of the HLS manifest inside a session directory.
    pub manifest_name: String,
    /// Target duration of each HLS segment.
    pub segment_duration_secs: u32,
    /// How often to check whether the manifest has appeared.
    pub ready_poll_interval_ms: u64,
    /// How long to wait for the manifest before giving up.
    pub ready_timeout_secs: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            temp_root: std::env::temp_dir().join("stream"),
            manifest_name: "stream.m3u8".into(),
            segment_duration_secs: 6,
            ready_poll_interval_ms: 500,
            ready_timeout_secs: 10,
        }
    }
}

impl StreamingConfig {
    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }
}

/// Locations of the persistent artifact directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub uploads_dir: PathBuf,
    pub streams_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            streams_dir: PathBuf::from("streams"),
        }
    }
}

/// Retention sweeper settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub enabled: bool,
    pub sweep_interval_secs: u64,
    /// Entries older than this are deleted by a sweep.
    pub max_age_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_secs: 3600,
            max_age_secs: 3600,
        }
    }
}

impl RetentionConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

/// External tool path overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
}
