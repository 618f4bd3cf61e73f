//! Filesystem discovery of asset candidates.
//!
//! A root directory holds one entry per asset:
//!
//! ```text
//! root/
//! ├── metrics.toml          single-file unit (the file is the descriptor)
//! ├── web/                  directory unit
//! │   ├── asset.toml        embedded descriptor (or asset.json)
//! │   └── data/             private data directory
//! ├── storage/              directory unit with a sibling descriptor
//! └── storage.toml
//! ```
//!
//! Entries starting with `.` or `_` are ignored.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;

/// File names probed for an embedded descriptor inside a directory unit.
pub const EMBEDDED_DESCRIPTORS: [&str; 2] = ["asset.toml", "asset.json"];

/// Extensions recognized for single-file units and sibling descriptors.
pub const DESCRIPTOR_EXTENSIONS: [&str; 2] = ["toml", "json"];

/// Name of the per-asset private data directory.
pub const DATA_DIR_NAME: &str = "data";

/// Shape of a discovered unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitLayout {
    File,
    Directory,
}

/// A discovered asset location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Logical name (file stem or directory name).
    pub name: String,
    /// Path of the unit itself.
    pub path: PathBuf,
    pub layout: UnitLayout,
    /// Resolved descriptor file, if any.
    pub descriptor_path: Option<PathBuf>,
    /// Private data directory (`<root>/<name>/data`).
    pub data_dir: PathBuf,
}

impl Candidate {
    pub fn file(root: &Path, name: impl Into<String>, path: PathBuf) -> Self {
        let name = name.into();
        Self {
            data_dir: root.join(&name).join(DATA_DIR_NAME),
            descriptor_path: Some(path.clone()),
            name,
            path,
            layout: UnitLayout::File,
        }
    }

    pub fn directory(name: impl Into<String>, path: PathBuf, descriptor_path: Option<PathBuf>) -> Self {
        Self {
            data_dir: path.join(DATA_DIR_NAME),
            name: name.into(),
            path,
            layout: UnitLayout::Directory,
            descriptor_path,
        }
    }
}

fn is_ignored(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

fn descriptor_extension(path: &Path) -> Option<&str> {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|ext| DESCRIPTOR_EXTENSIONS.contains(ext))
}

async fn first_existing(paths: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    for path in paths {
        if tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return Some(path);
        }
    }
    None
}

/// Scan `root` for candidates, sorted by name.
///
/// A missing root is created and yields an empty list.
pub async fn discover(root: &Path) -> Result<Vec<Candidate>> {
    if !tokio::fs::try_exists(root).await.unwrap_or(false) {
        tokio::fs::create_dir_all(root).await?;
        debug!(category = "assets", root = %root.display(), "Created asset root directory");
        return Ok(Vec::new());
    }

    let mut dirs = Vec::new();
    let mut files = Vec::new();

    let mut entries = tokio::fs::read_dir(root).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
        else {
            continue;
        };
        if is_ignored(&file_name) {
            continue;
        }

        let file_type = entry.file_type().await?;
        if file_type.is_dir() {
            dirs.push((file_name, path));
        } else if descriptor_extension(&path).is_some() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                files.push((stem.to_string(), path));
            }
        }
    }

    let mut candidates = Vec::with_capacity(dirs.len() + files.len());
    let mut seen = HashSet::new();

    for (name, path) in dirs {
        let probes = EMBEDDED_DESCRIPTORS
            .iter()
            .map(|f| path.join(f))
            .chain(
                DESCRIPTOR_EXTENSIONS
                    .iter()
                    .map(|ext| root.join(format!("{}.{}", name, ext))),
            )
            .collect::<Vec<_>>();
        let descriptor_path = first_existing(probes).await;
        seen.insert(name.clone());
        candidates.push(Candidate::directory(name, path, descriptor_path));
    }

    // toml sorts before json, so it wins a name clash
    files.sort_by(|a, b| {
        a.0.cmp(&b.0).then_with(|| {
            let rank = |p: &Path| match descriptor_extension(p) {
                Some("toml") => 0,
                _ => 1,
            };
            rank(&a.1).cmp(&rank(&b.1))
        })
    });

    for (name, path) in files {
        if seen.contains(&name) {
            if !candidates.iter().any(|c| c.descriptor_path.as_deref() == Some(path.as_path())) {
                warn!(
                    category = "assets",
                    name = %name,
                    path = %path.display(),
                    "Ignoring duplicate asset unit"
                );
            }
            continue;
        }
        seen.insert(name.clone());
        candidates.push(Candidate::file(root, name, path));
    }

    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(category = "assets", root = %root.display(), count = candidates.len(), "Discovery finished");
    Ok(candidates)
}

/// Find the candidate for `name` under `root`.
pub async fn find(root: &Path, name: &str) -> Result<Option<Candidate>> {
    Ok(discover(root).await?.into_iter().find(|c| c.name == name))
}
