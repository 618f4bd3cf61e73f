//! Error types for the asset lifecycle manager.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::asset::HookPhase;

/// Result type for asset operations.
pub type Result<T> = std::result::Result<T, AssetError>;

/// Why a lifecycle hook did not complete successfully.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookFailure {
    /// The hook returned an error.
    #[error("{0}")]
    Failed(String),

    /// The hook did not finish within the configured timeout.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// The hook panicked.
    #[error("panicked: {0}")]
    Panicked(String),
}

/// Asset lifecycle errors.
#[derive(Debug, Error)]
pub enum AssetError {
    /// An asset with the same name is already registered.
    #[error("Asset already loaded: {0}")]
    Duplicate(String),

    /// No descriptor could be resolved for the asset.
    #[error("No descriptor found for asset '{name}' under {}", path.display())]
    MissingDescriptor { name: String, path: PathBuf },

    /// A descriptor exists but cannot be used.
    #[error("Invalid descriptor {}: {reason}", path.display())]
    InvalidDescriptor { path: PathBuf, reason: String },

    /// One or more hard dependencies are not loaded.
    #[error("Asset '{name}' has unsatisfied dependencies: {}", missing.join(", "))]
    UnsatisfiedDependency { name: String, missing: Vec<String> },

    /// The dependency graph contains a cycle.
    #[error("Cyclic dependency: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// The asset is not loaded.
    #[error("Asset not loaded: {0}")]
    NotLoaded(String),

    /// A lifecycle hook failed.
    #[error("Hook {phase} of asset '{name}' failed: {cause}")]
    HookExecution {
        name: String,
        phase: HookPhase,
        cause: HookFailure,
    },

    /// No implementation could be instantiated for the descriptor.
    #[error("Cannot instantiate asset '{name}': {reason}")]
    Instantiation { name: String, reason: String },

    /// The state store could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssetError {
    /// Whether the error was raised before any side effect took place.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Duplicate(_)
                | Self::MissingDescriptor { .. }
                | Self::InvalidDescriptor { .. }
                | Self::UnsatisfiedDependency { .. }
                | Self::CyclicDependency { .. }
                | Self::NotLoaded(_)
        )
    }
}

impl From<serde_json::Error> for AssetError {
    fn from(e: serde_json::Error) -> Self {
        AssetError::Persistence(e.to_string())
    }
}
