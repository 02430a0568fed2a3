//! Axum router construction.
//!
//! Builds the full application router with the API, session artifact routes,
//! static artifact hosting and the optional UI fallback.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/roots", get(routes::library::list_roots))
        .route("/directories/{root}", get(routes::library::list_directories))
        .route("/files/{root}/{directory}", get(routes::library::list_files))
        .route("/stream", post(routes::stream::start_stream))
        .route(
            "/direct-stream/{root}/{directory}/{filename}",
            get(routes::direct::direct_stream),
        );

    let config = ctx.config.clone();

    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api)
        .route(
            "/stream/{id}/{artifact}",
            get(routes::stream::session_artifact),
        )
        .nest_service("/uploads", ServeDir::new(&config.storage.uploads_dir))
        .nest_service("/streams", ServeDir::new(&config.storage.streams_dir))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    // Static file serving for a UI build.
    if let Some(dir) = &config.server.static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {}", dir.display());
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                ServeDir::new(dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(ServeFile::new(index_path)),
            );
        } else {
            tracing::warn!("Static directory {} does not exist", dir.display());
        }
    }

    app
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rc_av::{TranscodeEngine, TranscodeJob};
    use rc_core::config::{Config, MediaRoot};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct NoEngine;

    impl TranscodeEngine for NoEngine {
        fn name(&self) -> &str {
            "none"
        }

        fn launch(&self, _job: &TranscodeJob) -> rc_core::Result<tokio::process::Child> {
            Err(rc_core::Error::tool("none", "disabled"))
        }
    }

    fn app(media: &std::path::Path, artifacts: &std::path::Path) -> Router {
        let mut config = Config::default();
        config.roots = vec![MediaRoot {
            name: "Media".into(),
            path: media.to_path_buf(),
        }];
        config.streaming.temp_root = artifacts.join("tmp");
        config.storage.uploads_dir = artifacts.join("uploads");
        config.storage.streams_dir = artifacts.join("streams");
        build_router(AppContext::new(config, Arc::new(NoEngine)))
    }

    #[tokio::test]
    async fn health_ok_with_request_id_and_cors() {
        let media = tempfile::tempdir().unwrap();
        let artifacts = tempfile::tempdir().unwrap();
        let response = app(media.path(), artifacts.path())
            .oneshot(
                Request::get("/health")
                    .header("origin", "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn incoming_request_id_is_echoed() {
        let media = tempfile::tempdir().unwrap();
        let artifacts = tempfile::tempdir().unwrap();
        let response = app(media.path(), artifacts.path())
            .oneshot(
                Request::get("/health")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn uploads_are_served_statically() {
        let media = tempfile::tempdir().unwrap();
        let artifacts = tempfile::tempdir().unwrap();
        std::fs::create_dir(artifacts.path().join("uploads")).unwrap();
        std::fs::write(artifacts.path().join("uploads/clip.mp4"), b"clip").unwrap();

        let response = app(media.path(), artifacts.path())
            .oneshot(Request::get("/uploads/clip.mp4").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn engine_failure_maps_to_500() {
        let media = tempfile::tempdir().unwrap();
        let artifacts = tempfile::tempdir().unwrap();
        std::fs::create_dir(media.path().join("Movies")).unwrap();
        std::fs::write(media.path().join("Movies/a.mp4"), b"x").unwrap();

        let body = r#"{"root":"Media","directory":"Movies","filename":"a.mp4"}"#;
        let response = app(media.path(), artifacts.path())
            .oneshot(
                Request::post("/api/stream")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
