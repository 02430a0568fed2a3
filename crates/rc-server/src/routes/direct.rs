//! Direct (untranscoded) playback of library files.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;

use crate::context::AppContext;
use crate::error::AppError;
use crate::range;
use crate::roots::StreamTarget;

/// GET /api/direct-stream/{root}/{directory}/{filename}
///
/// Serves the file bytes unchanged, honoring a single `Range`.
pub async fn direct_stream(
    State(ctx): State<AppContext>,
    Path((root, directory, filename)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let target = StreamTarget {
        root,
        directory,
        filename,
    };
    let path = ctx.roots.resolve_file(&target).await?;

    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let content_type = range::guess_content_type(&target.filename);

    tracing::debug!(
        "Direct stream {} (range: {})",
        path.display(),
        range_header.unwrap_or("none")
    );

    Ok(range::serve_file(&path, content_type, range_header).await?)
}

/// Public URL for direct playback of `target`, one encoded segment per part.
pub fn direct_stream_url(target: &StreamTarget) -> String {
    format!(
        "/api/direct-stream/{}/{}/{}",
        urlencoding::encode(&target.root),
        urlencoding::encode(&target.directory),
        urlencoding::encode(&target.filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_segments_are_percent_encoded() {
        let target = StreamTarget {
            root: "My Media".into(),
            directory: "Shows/S01".into(),
            filename: "ep 1 & 2.mkv".into(),
        };
        assert_eq!(
            direct_stream_url(&target),
            "/api/direct-stream/My%20Media/Shows%2FS01/ep%201%20%26%202.mkv"
        );
    }
}
