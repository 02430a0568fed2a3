//! Media root registry and path confinement.
//!
//! Every client-supplied path is resolved here. Resolution is purely lexical
//! and happens before any filesystem access: a `..` that would climb above
//! the root's base path is rejected with [`Error::Forbidden`]. Only then is
//! the filesystem consulted to check that the target exists.

use std::path::{Component, Path, PathBuf};

use rc_core::config::MediaRoot;
use rc_core::{Error, Result};

/// A file addressed relative to a named media root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget {
    pub root: String,
    pub directory: String,
    pub filename: String,
}

/// Immutable lookup table of configured media roots.
#[derive(Debug, Clone)]
pub struct RootRegistry {
    roots: Vec<MediaRoot>,
}

impl RootRegistry {
    pub fn new(roots: Vec<MediaRoot>) -> Self {
        Self { roots }
    }

    /// All configured roots, accessible or not.
    pub fn all(&self) -> &[MediaRoot] {
        &self.roots
    }

    /// Roots whose directory can currently be read.
    pub async fn accessible(&self) -> Vec<MediaRoot> {
        let mut out = Vec::with_capacity(self.roots.len());
        for root in &self.roots {
            if is_accessible(&root.path).await {
                out.push(root.clone());
            } else {
                tracing::warn!(root = %root.name, "Directory {} is not accessible", root.path.display());
            }
        }
        out
    }

    /// Look up a root by name. The first root with a matching name wins.
    pub fn get(&self, name: &str) -> Result<&MediaRoot> {
        self.roots
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| Error::not_found("root", name))
    }

    /// Resolve a directory inside a root. The root itself is allowed.
    pub fn resolve_dir(&self, root: &str, directory: &str) -> Result<PathBuf> {
        let root = self.get(root)?;
        let (path, _) = confine(&root.path, &[directory])?;
        Ok(path)
    }

    /// Resolve `root/directory/filename` to an existing regular file.
    ///
    /// Fails with [`Error::NotFound`] for an unknown root, [`Error::Forbidden`]
    /// if the path escapes the root (checked before touching the filesystem)
    /// and [`Error::NotFound`] if no regular file exists there.
    pub async fn resolve_file(&self, target: &StreamTarget) -> Result<PathBuf> {
        let root = self.get(&target.root)?;
        let (path, depth) = confine(&root.path, &[&target.directory, &target.filename])?;
        if depth == 0 {
            return Err(Error::Forbidden(
                "path must name a file below the root".into(),
            ));
        }

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => Err(Error::not_found("file", &target.filename)),
        }
    }
}

/// Whether a root directory can be listed right now.
pub async fn is_accessible(path: &Path) -> bool {
    tokio::fs::read_dir(path).await.is_ok()
}

/// Lexically join `parts` onto `base`, refusing to climb above `base`.
///
/// Returns the joined path and its depth below `base`. Absolute components
/// and `..` segments that would leave `base` yield [`Error::Forbidden`].
pub fn confine(base: &Path, parts: &[&str]) -> Result<(PathBuf, usize)> {
    let mut path = base.to_path_buf();
    let mut depth = 0usize;

    for part in parts {
        for component in Path::new(part).components() {
            match component {
                Component::Normal(segment) => {
                    path.push(segment);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(Error::Forbidden(format!("'{part}' escapes the root")));
                    }
                    path.pop();
                    depth -= 1;
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(Error::Forbidden(format!("'{part}' is an absolute path")));
                }
            }
        }
    }

    Ok((path, depth))
}
