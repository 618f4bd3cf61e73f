//! The asset capability contract.
//!
//! Every asset implements [`Asset`]: five lifecycle hooks driven by the
//! manager. Implementations are linked into the host at build time and
//! looked up through the [`AssetCatalog`](crate::catalog::AssetCatalog).
//!
//! ```text
//!   UNLOADED ──load──▶ LOADED ──enable──▶ ENABLED
//!      ▲                 │  ◀──disable──     │
//!      └─────unload──────┘◀──unload (auto-disable)
//! ```

pub mod context;
pub mod descriptor;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use context::{AssetContext, HostHandle};
pub use descriptor::AssetDescriptor;

/// Result returned by lifecycle hooks.
pub type HookResult = anyhow::Result<()>;

/// Shared handle to a live asset implementation.
pub type DynAsset = Arc<tokio::sync::RwLock<Box<dyn Asset>>>;

/// Lifecycle hooks every asset provides.
///
/// Hooks may suspend (they are free to do I/O). The manager applies a
/// per-hook timeout and converts errors and panics into
/// [`HookFailure`](crate::error::HookFailure)s.
#[async_trait::async_trait]
pub trait Asset: Send + Sync {
    /// Called once after instantiation. An error aborts the load.
    async fn on_load(&mut self, ctx: &AssetContext) -> HookResult;

    /// Called on `LOADED -> ENABLED`. An error keeps the asset `LOADED`.
    async fn on_enable(&mut self, ctx: &AssetContext) -> HookResult;

    /// Called on `ENABLED -> LOADED`. Errors are logged, never blocking.
    async fn on_disable(&mut self, ctx: &AssetContext) -> HookResult;

    /// Called before the asset is dropped. Errors are logged, never blocking.
    async fn on_unload(&mut self, ctx: &AssetContext) -> HookResult;

    /// Called on the fresh instance after a reload has completed its load step.
    async fn on_reload(&mut self, _ctx: &AssetContext) -> HookResult {
        Ok(())
    }
}

/// The kind of asset a manager governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    #[default]
    Plugin,
    Component,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plugin => "plugin",
            Self::Component => "component",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plugin" | "plugins" => Some(Self::Plugin),
            "component" | "components" => Some(Self::Component),
            _ => None,
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a single asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetState {
    #[default]
    Unloaded,
    Loaded,
    Enabled,
}

impl AssetState {
    /// Whether the asset is registered (`LOADED` or `ENABLED`).
    pub fn is_loaded(&self) -> bool {
        !matches!(self, Self::Unloaded)
    }
}

impl std::fmt::Display for AssetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unloaded => write!(f, "UNLOADED"),
            Self::Loaded => write!(f, "LOADED"),
            Self::Enabled => write!(f, "ENABLED"),
        }
    }
}

/// Identifies a lifecycle hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPhase {
    Load,
    Enable,
    Disable,
    Unload,
    Reload,
}

impl HookPhase {
    pub fn hook_name(&self) -> &'static str {
        match self {
            Self::Load => "on_load",
            Self::Enable => "on_enable",
            Self::Disable => "on_disable",
            Self::Unload => "on_unload",
            Self::Reload => "on_reload",
        }
    }
}

impl std::fmt::Display for HookPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.hook_name())
    }
}
