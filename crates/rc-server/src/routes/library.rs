//! Media root browsing handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::context::AppContext;
use crate::error::AppError;
use crate::library;

/// One entry of `GET /api/roots`.
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub name: String,
    pub path: String,
}

/// GET /api/roots
///
/// Only roots that can currently be read are listed.
pub async fn list_roots(State(ctx): State<AppContext>) -> Json<Vec<RootResponse>> {
    let roots = ctx
        .roots
        .accessible()
        .await
        .into_iter()
        .map(|r| RootResponse {
            name: r.name,
            path: r.path.to_string_lossy().into_owned(),
        })
        .collect();
    Json(roots)
}

/// GET /api/directories/{root}
pub async fn list_directories(
    State(ctx): State<AppContext>,
    Path(root): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    let base = ctx.roots.get(&root)?.path.clone();
    let dirs = library::list_directories(&base).await.inspect_err(|e| {
        tracing::error!(root = %root, "Error reading directory {}: {e}", base.display());
    })?;
    Ok(Json(dirs))
}

/// GET /api/files/{root}/{directory}
pub async fn list_files(
    State(ctx): State<AppContext>,
    Path((root, directory)): Path<(String, String)>,
) -> Result<Json<Vec<String>>, AppError> {
    let dir = ctx.roots.resolve_dir(&root, &directory)?;
    let files = library::list_video_files(&dir, &ctx.config.library.video_extensions)
        .await
        .inspect_err(|e| {
            tracing::error!(root = %root, "Error reading directory {}: {e}", dir.display());
        })?;
    Ok(Json(files))
}
