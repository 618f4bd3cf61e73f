//! Durable record of loaded and enabled assets.
//!
//! The state document is a JSON file:
//!
//! ```json
//! {
//!   "loaded": ["storage", "web"],
//!   "enabled": ["web"],
//!   "metadata": {
//!     "web": { "version": "1.0.0", "path": "plugins/web", "depends": ["storage"], "soft_depends": [] }
//!   }
//! }
//! ```
//!
//! It is recovery bookkeeping only; while the process runs, the manager's
//! in-memory maps are authoritative. Writes go to a temporary sibling file
//! which is then renamed over the target, so a crash never leaves a
//! half-written document behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{AssetError, Result};

/// What was known about an asset when it was loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRecord {
    #[serde(skip)]
    pub name: String,
    pub version: String,
    pub path: PathBuf,
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub soft_depends: Vec<String>,
}

/// Serialized form of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub loaded: Vec<String>,
    #[serde(default)]
    pub enabled: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, LoadRecord>,
}

/// JSON-file backed state store.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    doc: StateDocument,
}

impl StateStore {
    /// Open the store at `path`.
    ///
    /// A missing or unreadable document yields an empty store; the failure
    /// is logged, never returned.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let doc = match Self::read(&path).await {
            Ok(Some(doc)) => {
                debug!(
                    category = "assets",
                    path = %path.display(),
                    loaded = doc.loaded.len(),
                    enabled = doc.enabled.len(),
                    "Loaded asset state"
                );
                doc
            }
            Ok(None) => StateDocument::default(),
            Err(e) => {
                warn!(
                    category = "assets",
                    path = %path.display(),
                    error = %e,
                    "Asset state unreadable, starting empty"
                );
                StateDocument::default()
            }
        };
        Self { path, doc }
    }

    async fn read(path: &Path) -> Result<Option<StateDocument>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AssetError::Persistence(e.to_string())),
        };
        let mut doc: StateDocument = serde_json::from_slice(&bytes)?;
        for (name, record) in doc.metadata.iter_mut() {
            record.name = name.clone();
        }
        doc.normalize();
        Ok(Some(doc))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &StateDocument {
        &self.doc
    }

    /// Names recorded as loaded, in the order they were loaded.
    pub fn loaded(&self) -> &[String] {
        &self.doc.loaded
    }

    pub fn enabled(&self) -> &[String] {
        &self.doc.enabled
    }

    pub fn record(&self, name: &str) -> Option<&LoadRecord> {
        self.doc.metadata.get(name)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.doc.loaded.iter().any(|n| n == name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.doc.enabled.iter().any(|n| n == name)
    }

    /// Record a successful load. Re-adding a name replaces its metadata and
    /// keeps its position.
    pub fn add_loaded(&mut self, record: LoadRecord) {
        if !self.is_loaded(&record.name) {
            self.doc.loaded.push(record.name.clone());
        }
        self.doc.metadata.insert(record.name.clone(), record);
    }

    /// Move a loaded name to `index` in the load order (clamped to the end).
    pub fn reposition_loaded(&mut self, name: &str, index: usize) {
        if let Some(current) = self.doc.loaded.iter().position(|n| n == name) {
            let name = self.doc.loaded.remove(current);
            let index = index.min(self.doc.loaded.len());
            self.doc.loaded.insert(index, name);
        }
    }

    /// Forget a loaded asset. Also clears its enabled flag.
    pub fn remove_loaded(&mut self, name: &str) {
        self.doc.loaded.retain(|n| n != name);
        self.doc.enabled.retain(|n| n != name);
        self.doc.metadata.remove(name);
    }

    /// Set the enabled flag. Ignored for names that are not loaded.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        if enabled {
            if self.is_loaded(name) && !self.is_enabled(name) {
                self.doc.enabled.push(name.to_string());
            }
        } else {
            self.doc.enabled.retain(|n| n != name);
        }
    }

    /// Persist the document with write-to-temporary-then-rename.
    pub async fn save(&self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.doc)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AssetError::Persistence(format!("create {}: {}", parent.display(), e)))?;
        }

        let tmp = self.tmp_path();
        let write = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(&bytes).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &self.path).await
        };

        if let Err(e) = write.await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AssetError::Persistence(format!(
                "write {}: {}",
                self.path.display(),
                e
            )));
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state.json".to_string());
        self.path.with_file_name(format!(".{}.tmp", file_name))
    }
}

impl StateDocument {
    /// Drop duplicates, enabled names that are not loaded, and metadata
    /// for names that are not loaded.
    fn normalize(&mut self) {
        let mut seen = Vec::with_capacity(self.loaded.len());
        self.loaded.retain(|n| {
            if seen.contains(n) {
                false
            } else {
                seen.push(n.clone());
                true
            }
        });
        let loaded = &self.loaded;
        let mut enabled_seen: Vec<String> = Vec::new();
        self.enabled.retain(|n| {
            if !loaded.contains(n) || enabled_seen.contains(n) {
                false
            } else {
                enabled_seen.push(n.clone());
                true
            }
        });
        self.metadata.retain(|n, _| loaded.contains(n));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> LoadRecord {
        LoadRecord {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            path: PathBuf::from(format!("plugins/{}", name)),
            depends: Vec::new(),
            soft_depends: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::open(tmp.path().join("state.json")).await;
        assert!(store.loaded().is_empty());
        assert!(store.enabled().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = StateStore::open(&path).await;
        assert!(store.document() == &StateDocument::default());
    }

    #[test]
    fn test_reposition_loaded() {
        let mut store = StateStore {
            path: PathBuf::from("unused.json"),
            doc: StateDocument::default(),
        };
        for name in ["core", "net", "web"] {
            store.add_loaded(record(name));
        }
        store.remove_loaded("core");
        store.add_loaded(record("core"));
        assert_eq!(store.loaded(), ["net", "web", "core"]);

        store.reposition_loaded("core", 0);
        assert_eq!(store.loaded(), ["core", "net", "web"]);
        store.reposition_loaded("core", usize::MAX);
        assert_eq!(store.loaded(), ["net", "web", "core"]);
        store.reposition_loaded("ghost", 0);
        assert_eq!(store.loaded().len(), 3);
    }

    #[test]
    fn test_remove_loaded_clears_enabled() {
        let mut store = StateStore {
            path: PathBuf::from("unused.json"),
            doc: StateDocument::default(),
        };
        store.add_loaded(record("web"));
        store.set_enabled("web", true);
        assert!(store.is_enabled("web"));

        store.remove_loaded("web");
        assert!(!store.is_loaded("web"));
        assert!(!store.is_enabled("web"));
        assert!(store.record("web").is_none());
    }

    #[test]
    fn test_enable_requires_loaded() {
        let mut store = StateStore {
            path: PathBuf::from("unused.json"),
            doc: StateDocument::default(),
        };
        store.set_enabled("ghost", true);
        assert!(store.enabled().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("state.json");

        let mut store = StateStore::open(&path).await;
        store.add_loaded(record("storage"));
        store.add_loaded(record("web"));
        store.set_enabled("web", true);
        store.save().await.unwrap();

        assert!(!tmp.path().join("nested").join(".state.json.tmp").exists());

        let reopened = StateStore::open(&path).await;
        assert_eq!(reopened.loaded(), &["storage".to_string(), "web".to_string()]);
        assert_eq!(reopened.enabled(), &["web".to_string()]);
        assert_eq!(reopened.record("web"), Some(&record("web")));
    }

    #[tokio::test]
    async fn test_normalize_on_read() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"loaded": ["a", "a"], "enabled": ["a", "b"], "metadata": {}}"#,
        )
        .unwrap();

        let store = StateStore::open(&path).await;
        assert_eq!(store.loaded(), &["a".to_string()]);
        assert_eq!(store.enabled(), &["a".to_string()]);
    }
}
