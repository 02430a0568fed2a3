//! rc-server: HTTP API, stream sessions, range serving and retention.
//!
//! This crate ties the rc-* crates together into a running server:
//!
//! - Axum HTTP API for browsing media roots and starting playback
//! - [`sessions::SessionManager`] for on-demand HLS transcode sessions
//! - [`range`] for byte-range direct playback
//! - [`sweeper`] background task reclaiming old artifacts
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod library;
pub mod middleware;
pub mod net;
pub mod range;
pub mod roots;
pub mod router;
pub mod routes;
pub mod sessions;
pub mod storage;
pub mod sweeper;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use rc_av::{FfmpegHlsEngine, HlsSettings, ToolRegistry, TranscodeEngine};
use rc_core::config::Config;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;
use crate::sweeper::Sweeper;

/// Start the reelcast server.
///
/// Discovers ffmpeg, prepares the artifact directories, spawns the retention
/// sweeper and serves HTTP until a shutdown signal is received.
pub async fn start(config: Config) -> rc_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let tools = ToolRegistry::discover(&config.tools);
    for info in tools.check_all().await {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!("Tool not found: {}; transcoding will fail", info.name);
        }
    }

    // Sessions still get created without ffmpeg; they fail at launch with an
    // engine error instead of refusing to start the server.
    let ffmpeg = tools
        .require("ffmpeg")
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|_| PathBuf::from("ffmpeg"));
    let engine: Arc<dyn TranscodeEngine> = Arc::new(FfmpegHlsEngine::new(
        ffmpeg,
        HlsSettings::with_segment_duration(config.streaming.segment_duration_secs),
    ));

    for dir in [
        &config.streaming.temp_root,
        &config.storage.uploads_dir,
        &config.storage.streams_dir,
    ] {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            tracing::warn!("Failed to create artifact directory {}: {e}", dir.display());
        }
    }

    let ctx = AppContext::new(config.clone(), engine);

    let cancel = CancellationToken::new();

    let sweeper_handle = if config.retention.enabled && config.retention.sweep_interval_secs > 0 {
        let sweeper = Sweeper::from_config(&config, ctx.store.clone());
        let interval = config.retention.sweep_interval();
        let sweeper_cancel = cancel.clone();
        Some(tokio::spawn(async move {
            sweeper::run_sweeper(sweeper, interval, sweeper_cancel).await;
        }))
    } else {
        tracing::info!("Retention sweeper disabled");
        None
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| rc_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let app = router::build_router(ctx.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| rc_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;
    let bound = listener.local_addr()?;

    log_banner(&ctx, bound).await;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    if let Some(handle) = sweeper_handle {
        let _ = handle.await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Print where the server can be reached and which roots are usable.
async fn log_banner(ctx: &AppContext, bound: SocketAddr) {
    let port = bound.port();
    let network_ip = net::local_ip();
    tracing::info!("Server running at:");
    tracing::info!("- Local:   http://localhost:{port}");
    tracing::info!("- Network: http://{network_ip}:{port}");

    tracing::info!("Configured media directories:");
    for root in ctx.roots.all() {
        let state = if roots::is_accessible(&root.path).await {
            "accessible"
        } else {
            "not accessible"
        };
        tracing::info!("- {}: {} ({state})", root.name, root.path.display());
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM) or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
