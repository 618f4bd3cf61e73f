//! Manager configuration.
//!
//! Sources, lowest priority first:
//! 1. built-in defaults
//! 2. a TOML file (`plugdeck.toml`)
//! 3. environment variables (see [`env_vars`])

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::asset::AssetKind;
use crate::error::{AssetError, Result};

/// Default per-hook timeout.
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Default state file name, placed inside the asset root.
pub const DEFAULT_STATE_FILE: &str = ".plugdeck-state.json";

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "plugdeck.toml";

/// Environment variable names.
pub mod env_vars {
    pub const ROOT: &str = "PLUGDECK_ROOT";
    pub const KIND: &str = "PLUGDECK_KIND";
    pub const STATE_FILE: &str = "PLUGDECK_STATE_FILE";
    pub const HOOK_TIMEOUT_SECS: &str = "PLUGDECK_HOOK_TIMEOUT_SECS";
}

/// Configuration of one asset manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    /// Kind of asset governed by the manager.
    pub kind: AssetKind,
    /// Directory scanned by discovery.
    pub root_dir: PathBuf,
    /// Location of the persisted state document.
    pub state_file: PathBuf,
    /// Upper bound for a single hook invocation.
    pub hook_timeout: Duration,
}

/// `plugdeck.toml` layout. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    kind: Option<AssetKind>,
    root_dir: Option<PathBuf>,
    state_file: Option<PathBuf>,
    hook_timeout_secs: Option<u64>,
}

impl ManagerConfig {
    pub fn new(kind: AssetKind, root_dir: impl Into<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        Self {
            kind,
            state_file: root_dir.join(DEFAULT_STATE_FILE),
            root_dir,
            hook_timeout: DEFAULT_HOOK_TIMEOUT,
        }
    }

    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = path.into();
        self
    }

    /// Move the root directory. A state file still at its default location
    /// follows the root.
    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        if self.state_file == self.root_dir.join(DEFAULT_STATE_FILE) {
            self.state_file = root_dir.join(DEFAULT_STATE_FILE);
        }
        self.root_dir = root_dir;
        self
    }

    pub fn with_hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout = timeout;
        self
    }

    /// Load from `path` (if it exists) and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_kind(path, None)
    }

    /// Like [`load`](Self::load), with `kind` taking precedence over the
    /// file and environment. The default root follows the final kind.
    pub fn load_with_kind(path: &Path, kind: Option<AssetKind>) -> Result<Self> {
        let file = match std::fs::read_to_string(path) {
            Ok(content) => {
                info!(category = "config", "Loading config from: {}", path.display());
                Self::parse_file(&content)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ConfigFile::default(),
            Err(e) => {
                return Err(AssetError::Config(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        Self::from_parts(file, kind, |key| std::env::var(key).ok())
    }

    /// Parse TOML content without consulting the environment.
    pub fn from_toml(content: &str) -> Result<Self> {
        Self::from_parts(Self::parse_file(content)?, None, |_| None)
    }

    fn parse_file(content: &str) -> Result<ConfigFile> {
        toml::from_str(content).map_err(|e| AssetError::Config(e.to_string()))
    }

    fn from_parts(
        file: ConfigFile,
        kind: Option<AssetKind>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let kind = match (kind, env(env_vars::KIND)) {
            (Some(kind), _) => kind,
            (None, Some(value)) => AssetKind::parse(&value)
                .ok_or_else(|| AssetError::Config(format!("unknown asset kind '{}'", value)))?,
            (None, None) => file.kind.unwrap_or_default(),
        };

        let root_dir = env(env_vars::ROOT)
            .map(PathBuf::from)
            .or(file.root_dir)
            .unwrap_or_else(|| PathBuf::from(format!("{}s", kind.as_str())));

        let mut config = Self::new(kind, root_dir);

        if let Some(state_file) = env(env_vars::STATE_FILE).map(PathBuf::from).or(file.state_file) {
            config.state_file = state_file;
        }

        let timeout_secs = match env(env_vars::HOOK_TIMEOUT_SECS) {
            Some(value) => Some(value.trim().parse::<u64>().map_err(|_| {
                AssetError::Config(format!(
                    "{} must be a number of seconds, got '{}'",
                    env_vars::HOOK_TIMEOUT_SECS,
                    value
                ))
            })?),
            None => file.hook_timeout_secs,
        };
        if let Some(secs) = timeout_secs {
            if secs == 0 {
                return Err(AssetError::Config("hook timeout must be positive".to_string()));
            }
            config.hook_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}
