//! # rc-av
//!
//! External tool management and the transcode engine adapter.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache the path to
//!   ffmpeg, honoring a configured override.
//! - **Command execution** ([`ToolCommand`]) -- builder for running a tool to
//!   completion with a timeout, or spawning it as a detached process.
//! - **Transcode engines** ([`engine`]) -- the [`TranscodeEngine`] seam and
//!   the ffmpeg HLS implementation used for live session output.

pub mod command;
pub mod engine;
pub mod tools;

pub use command::{ToolCommand, ToolOutput};
pub use engine::{forward_stderr, FfmpegHlsEngine, HlsSettings, TranscodeEngine, TranscodeJob};
pub use tools::{ToolInfo, ToolRegistry};
