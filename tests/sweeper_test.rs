//! Integration tests for the retention sweeper over real session output.

mod common;

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use common::{TestHarness, ROOT};
use rc_server::roots::StreamTarget;
use rc_server::storage::FsArtifactStore;
use rc_server::sweeper::Sweeper;

const TWO_HOURS: Duration = Duration::from_secs(2 * 3600);

fn sweeper(h: &TestHarness) -> Sweeper {
    Sweeper::from_config(&h.ctx.config, Arc::new(FsArtifactStore))
}

#[tokio::test]
async fn sweep_removes_expired_session_and_upload() {
    let h = TestHarness::new();
    h.add_media("Movies/film.mkv", b"source");
    std::fs::write(
        h.ctx.config.storage.uploads_dir.join("upload.mp4"),
        b"uploaded",
    )
    .unwrap();
    std::fs::create_dir(h.ctx.config.storage.streams_dir.join("published")).unwrap();

    let handle = h
        .ctx
        .sessions
        .create(&StreamTarget {
            root: ROOT.into(),
            directory: "Movies".into(),
            filename: "film.mkv".into(),
        })
        .await
        .unwrap();
    assert!(handle.session.output_dir.exists());

    // Within the window nothing goes.
    let report = sweeper(&h).sweep().await;
    assert_eq!(report.removed, 0);
    assert_eq!(report.scanned, 3);

    let report = sweeper(&h).sweep_at(SystemTime::now() + TWO_HOURS).await;
    assert_eq!(report.removed, 3);
    assert_eq!(report.failed, 0);
    assert!(!handle.session.output_dir.exists());
    assert!(!h.ctx.config.storage.uploads_dir.join("upload.mp4").exists());
    assert!(!h.ctx.config.storage.streams_dir.join("published").exists());

    // The artifact directories themselves survive.
    assert!(h.ctx.config.storage.uploads_dir.exists());
    assert!(h.temp_root().exists());
}

#[tokio::test]
async fn sweep_is_idempotent() {
    let h = TestHarness::new();
    std::fs::write(h.ctx.config.storage.uploads_dir.join("a.mp4"), b"a").unwrap();

    let later = SystemTime::now() + TWO_HOURS;
    let first = sweeper(&h).sweep_at(later).await;
    assert_eq!(first.removed, 1);

    let second = sweeper(&h).sweep_at(later).await;
    assert_eq!(second.scanned, 0);
    assert_eq!(second.removed, 0);
    assert_eq!(second.failed, 0);
}

#[tokio::test]
async fn sweep_skips_missing_artifact_dirs() {
    let h = TestHarness::new();
    std::fs::remove_dir_all(&h.ctx.config.storage.streams_dir).unwrap();
    std::fs::write(h.ctx.config.storage.uploads_dir.join("a.mp4"), b"a").unwrap();

    let report = sweeper(&h).sweep_at(SystemTime::now() + TWO_HOURS).await;
    assert_eq!(report.removed, 1);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn deleted_session_artifacts_are_not_found() {
    let h = TestHarness::new();
    h.add_media("Movies/film.mkv", b"source");
    let addr = h.serve().await;

    let handle = h
        .ctx
        .sessions
        .create(&StreamTarget {
            root: ROOT.into(),
            directory: "Movies".into(),
            filename: "film.mkv".into(),
        })
        .await
        .unwrap();

    sweeper(&h).sweep_at(SystemTime::now() + TWO_HOURS).await;

    let resp = reqwest::get(format!("http://{addr}{}", handle.stream_url))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
