//! Playback start and HLS session artifact handlers.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::AppError;
use crate::range;
use crate::roots::StreamTarget;
use crate::routes::direct::direct_stream_url;

const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
const SEGMENT_CONTENT_TYPE: &str = "video/mp2t";

/// Body of `POST /api/stream`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartStreamRequest {
    pub root: Option<String>,
    pub directory: Option<String>,
    pub filename: Option<String>,
    #[serde(default)]
    pub direct_stream: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartStreamResponse {
    pub stream_url: String,
    pub is_direct_stream: bool,
}

impl StartStreamRequest {
    fn target(self) -> Result<StreamTarget, rc_core::Error> {
        match (non_empty(self.root), non_empty(self.directory), non_empty(self.filename)) {
            (Some(root), Some(directory), Some(filename)) => Ok(StreamTarget {
                root,
                directory,
                filename,
            }),
            _ => Err(rc_core::Error::Validation(
                "root, directory and filename are required".into(),
            )),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// POST /api/stream
///
/// Direct mode only validates the target and hands back a range-capable URL.
/// Transcode mode starts a session and returns once its manifest exists.
pub async fn start_stream(
    State(ctx): State<AppContext>,
    Json(payload): Json<StartStreamRequest>,
) -> Result<Json<StartStreamResponse>, AppError> {
    let direct = payload.direct_stream;
    let target = payload.target()?;

    if direct {
        ctx.roots.resolve_file(&target).await?;
        return Ok(Json(StartStreamResponse {
            stream_url: direct_stream_url(&target),
            is_direct_stream: true,
        }));
    }

    let handle = ctx.sessions.create(&target).await?;
    tracing::info!(
        session_id = %handle.session.id,
        "Started session for {} -> {}",
        handle.session.input_path.display(),
        handle.session.output_dir.display()
    );

    Ok(Json(StartStreamResponse {
        stream_url: handle.stream_url,
        is_direct_stream: false,
    }))
}

/// GET /stream/{id}/{artifact}
///
/// Serves a session's manifest or one of its `.ts` segments.
pub async fn session_artifact(
    State(ctx): State<AppContext>,
    Path((id, artifact)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let path = ctx.sessions.resolve_artifact(&id, &artifact)?;

    if artifact == ctx.sessions.manifest_name() {
        // The manifest is rewritten as segments land; always read it fresh.
        let body = tokio::fs::read(&path)
            .await
            .map_err(|_| rc_core::Error::not_found("artifact", &artifact))?;
        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, MANIFEST_CONTENT_TYPE),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            body,
        )
            .into_response());
    }

    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    Ok(range::serve_file(&path, SEGMENT_CONTENT_TYPE, range_header).await?)
}
