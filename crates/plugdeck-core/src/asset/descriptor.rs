//! Asset descriptors.
//!
//! A descriptor is static metadata read from `asset.toml` / `asset.json`
//! inside a directory unit, from a sibling `<name>.toml` / `<name>.json`,
//! or from a single-file unit which *is* its own descriptor:
//!
//! ```toml
//! version = "1.2.0"
//! entry = "metrics"          # catalog entry, defaults to the name
//! depends = ["storage"]      # must already be loaded
//! soft_depends = ["cache"]   # ordering preference only
//! load_before = ["web"]
//!
//! [config]
//! interval_secs = 10
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AssetError, Result};

/// Static metadata describing an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Unique name within the asset kind.
    pub name: String,
    /// Asset version.
    pub version: semver::Version,
    /// Catalog entry used to instantiate the implementation.
    pub entry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Hard dependencies.
    #[serde(default)]
    pub depends: Vec<String>,
    /// Soft dependencies.
    #[serde(default)]
    pub soft_depends: Vec<String>,
    /// Assets this one should be loaded before.
    #[serde(default)]
    pub load_before: Vec<String>,
    /// Free-form configuration handed to the asset.
    #[serde(default)]
    pub config: serde_json::Value,
}

/// On-disk descriptor format.
#[derive(Debug, Deserialize)]
struct DescriptorFile {
    #[serde(default)]
    name: Option<String>,
    version: String,
    #[serde(default)]
    entry: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    depends: Vec<String>,
    #[serde(default)]
    soft_depends: Vec<String>,
    #[serde(default)]
    load_before: Vec<String>,
    #[serde(default)]
    config: serde_json::Value,
}

impl AssetDescriptor {
    pub fn new(name: impl Into<String>, version: semver::Version) -> Self {
        let name = name.into();
        Self {
            entry: name.clone(),
            name,
            version,
            description: None,
            author: None,
            depends: Vec::new(),
            soft_depends: Vec::new(),
            load_before: Vec::new(),
            config: serde_json::Value::Null,
        }
    }

    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = entry.into();
        self
    }

    pub fn with_depends<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_soft_depends<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.soft_depends = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_load_before<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.load_before = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    /// Read and validate a descriptor file.
    ///
    /// `expected_name` is the logical name derived from the candidate
    /// location; a `name` field in the file must agree with it.
    pub async fn from_file(path: &Path, expected_name: &str) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content, path, expected_name)
    }

    /// Parse descriptor content; the format is picked from `path`'s extension.
    pub fn parse(content: &str, path: &Path, expected_name: &str) -> Result<Self> {
        let invalid = |reason: String| AssetError::InvalidDescriptor {
            path: path.to_path_buf(),
            reason,
        };

        let raw: DescriptorFile = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(content).map_err(|e| invalid(e.to_string()))?,
            Some("json") => serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?,
            other => return Err(invalid(format!("unsupported descriptor format: {:?}", other))),
        };

        let name = raw.name.unwrap_or_else(|| expected_name.to_string());
        if name.trim().is_empty() {
            return Err(invalid("name cannot be empty".to_string()));
        }
        if name != expected_name {
            return Err(invalid(format!(
                "name '{}' does not match location name '{}'",
                name, expected_name
            )));
        }

        let version = semver::Version::parse(raw.version.trim())
            .map_err(|e| invalid(format!("bad version '{}': {}", raw.version, e)))?;

        let mentions_self = raw
            .depends
            .iter()
            .chain(&raw.soft_depends)
            .chain(&raw.load_before)
            .any(|dep| *dep == name);
        if mentions_self {
            return Err(invalid(format!("'{}' cannot depend on itself", name)));
        }

        Ok(Self {
            entry: raw.entry.unwrap_or_else(|| name.clone()),
            name,
            version,
            description: raw.description,
            author: raw.author,
            depends: dedup(raw.depends),
            soft_depends: dedup(raw.soft_depends),
            load_before: dedup(raw.load_before),
            config: raw.config,
        })
    }
}

fn dedup(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}
