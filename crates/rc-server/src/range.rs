//! Byte-range file serving.
//!
//! Files are streamed in 64 KiB chunks through `ReaderStream`, so memory stays
//! bounded regardless of file size. A single `bytes=START-END` or
//! `bytes=START-` range is honored; anything else in the `Range` header is
//! ignored and the whole file is sent.

use std::io::SeekFrom;
use std::path::Path;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use rc_core::{Error, Result};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

const CHUNK_SIZE: usize = 64 * 1024;

/// Parse a `Range: bytes=START-END` header value.
///
/// Returns `(start, Option<end>)` where `end` is `None` for open-ended ranges
/// like `bytes=500-`. Suffix ranges and multi-range requests return `None`.
pub fn parse_range_header(value: &str) -> Option<(u64, Option<u64>)> {
    let byte_range = value.trim().strip_prefix("bytes=")?;
    if byte_range.contains(',') {
        return None;
    }
    let (start_str, end_str) = byte_range.split_once('-')?;

    let start: u64 = start_str.trim().parse().ok()?;
    let end_str = end_str.trim();
    let end = if end_str.is_empty() {
        None
    } else {
        Some(end_str.parse().ok()?)
    };

    Some((start, end))
}

/// Guess the MIME type from a file name's extension.
pub fn guess_content_type(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "ts" => "video/mp2t",
        "m3u8" => "application/vnd.apple.mpegurl",
        _ => "application/octet-stream",
    }
}

/// Clamp a parsed range against `file_size`.
///
/// An end past the last byte is clamped to it. Returns `None` when the range
/// cannot be satisfied (start at or past EOF, start after end, empty file).
pub fn resolve_range(start: u64, end: Option<u64>, file_size: u64) -> Option<(u64, u64)> {
    let last = file_size.checked_sub(1)?;
    let end = end.unwrap_or(last).min(last);
    (start <= end).then_some((start, end))
}

/// Serve `path` with range support.
///
/// Fails with [`Error::NotFound`] if the file cannot be opened.
pub async fn serve_file(
    path: &Path,
    content_type: &str,
    range_header: Option<&str>,
) -> Result<Response> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|_| Error::not_found("file", path.display()))?;
    let file_size = file.metadata().await?.len();

    let Some((start, end)) = range_header.and_then(parse_range_header) else {
        let body = Body::from_stream(ReaderStream::with_capacity(file, CHUNK_SIZE));
        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (header::CONTENT_LENGTH, file_size.to_string()),
                (header::ACCEPT_RANGES, "bytes".to_string()),
            ],
            body,
        )
            .into_response());
    };

    let Some((start, end)) = resolve_range(start, end, file_size) else {
        tracing::debug!("Unsatisfiable range {start}-{end:?} for {}", path.display());
        return Ok((
            StatusCode::RANGE_NOT_SATISFIABLE,
            [
                (header::CONTENT_RANGE, format!("bytes */{file_size}")),
                (header::ACCEPT_RANGES, "bytes".to_string()),
            ],
            Body::empty(),
        )
            .into_response());
    };

    let length = end - start + 1;
    file.seek(SeekFrom::Start(start)).await?;
    let body = Body::from_stream(ReaderStream::with_capacity(file.take(length), CHUNK_SIZE));

    Ok((
        StatusCode::PARTIAL_CONTENT,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_RANGE, format!("bytes {start}-{end}/{file_size}")),
            (header::CONTENT_LENGTH, length.to_string()),
            (header::ACCEPT_RANGES, "bytes".to_string()),
        ],
        body,
    )
        .into_response())
}
