//! Directory browsing for media roots.
//!
//! Listings are flat (one level) and sorted by name. Dot-prefixed entries are
//! never listed.

use std::path::Path;

use rc_core::Result;

/// Names of the non-hidden subdirectories of `dir`.
pub async fn list_directories(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let Some(name) = visible_name(&entry) else {
            continue;
        };
        // metadata() follows symlinks, so linked directories are listed too.
        match tokio::fs::metadata(entry.path()).await {
            Ok(meta) if meta.is_dir() => names.push(name),
            Ok(_) => {}
            Err(e) => tracing::debug!("Error checking directory {}: {e}", entry.path().display()),
        }
    }

    names.sort();
    Ok(names)
}

/// Names of the non-hidden files in `dir` whose extension is in
/// `extensions` (compared case-insensitively, without the dot).
pub async fn list_video_files(dir: &Path, extensions: &[String]) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let Some(name) = visible_name(&entry) else {
            continue;
        };
        if !has_extension(&name, extensions) {
            continue;
        }
        match tokio::fs::metadata(entry.path()).await {
            Ok(meta) if !meta.is_dir() => names.push(name),
            Ok(_) => {}
            Err(e) => tracing::debug!("Error checking file {}: {e}", entry.path().display()),
        }
    }

    names.sort();
    Ok(names)
}

fn visible_name(entry: &tokio::fs::DirEntry) -> Option<String> {
    let name = entry.file_name().into_string().ok()?;
    (!name.starts_with('.')).then_some(name)
}

/// Whether `name` ends in one of `extensions`.
pub fn has_extension(name: &str, extensions: &[String]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
