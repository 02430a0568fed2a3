//! Live HLS output via ffmpeg.
//!
//! Produces a compatibility-oriented stream: H.264 baseline video and 44.1 kHz
//! stereo AAC, cut into MPEG-TS chunks. The manifest is a rolling live list:
//! ffmpeg appends entries as chunks are written and may delete old chunks.

use std::path::PathBuf;

use tokio::process::Child;

use super::{TranscodeEngine, TranscodeJob};
use crate::command::ToolCommand;

/// Encoding parameters for the HLS output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsSettings {
    pub segment_duration_secs: u32,
    pub video_profile: String,
    pub video_level: String,
    pub audio_sample_rate: u32,
    pub audio_bitrate: String,
    pub audio_channels: u8,
}

impl Default for HlsSettings {
    fn default() -> Self {
        Self {
            segment_duration_secs: 6,
            video_profile: "baseline".into(),
            video_level: "3.0".into(),
            audio_sample_rate: 44_100,
            audio_bitrate: "128k".into(),
            audio_channels: 2,
        }
    }
}

impl HlsSettings {
    /// Defaults with a custom segment duration.
    pub fn with_segment_duration(segment_duration_secs: u32) -> Self {
        Self {
            segment_duration_secs,
            ..Self::default()
        }
    }
}

/// [`TranscodeEngine`] that shells out to ffmpeg's HLS muxer.
#[derive(Debug, Clone)]
pub struct FfmpegHlsEngine {
    ffmpeg: PathBuf,
    settings: HlsSettings,
}

impl FfmpegHlsEngine {
    pub fn new(ffmpeg: PathBuf, settings: HlsSettings) -> Self {
        Self { ffmpeg, settings }
    }

    /// Build the ffmpeg invocation for `job`.
    pub fn command(&self, job: &TranscodeJob) -> ToolCommand {
        let s = &self.settings;
        let mut cmd = ToolCommand::new(self.ffmpeg.clone());
        cmd.args(["-hide_banner", "-nostdin", "-i"]);
        cmd.arg(job.input.to_string_lossy());
        cmd.args(["-c:v", "libx264"]);
        cmd.args(["-profile:v", s.video_profile.as_str()]);
        cmd.args(["-level", s.video_level.as_str()]);
        cmd.args(["-pix_fmt", "yuv420p"]);
        cmd.args(["-c:a", "aac"]);
        cmd.args(["-ar", &s.audio_sample_rate.to_string()]);
        cmd.args(["-b:a", s.audio_bitrate.as_str()]);
        cmd.args(["-ac", &s.audio_channels.to_string()]);
        cmd.args(["-hls_time", &s.segment_duration_secs.to_string()]);
        cmd.args(["-hls_list_size", "0"]);
        cmd.args(["-hls_segment_type", "mpegts"]);
        cmd.args(["-hls_flags", "delete_segments+append_list"]);
        cmd.args(["-start_number", "0"]);
        cmd.args(["-f", "hls"]);
        cmd.arg(job.manifest.to_string_lossy());
        cmd
    }
}

impl TranscodeEngine for FfmpegHlsEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn launch(&self, job: &TranscodeJob) -> rc_core::Result<Child> {
        tracing::info!(
            session_id = %job.label,
            "HLS transcode: {:?} -> {:?} (segment_duration={}s)",
            job.input,
            job.output_dir,
            self.settings.segment_duration_secs
        );
        self.command(job).spawn()
    }
}
