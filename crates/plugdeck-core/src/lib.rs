//! Asset lifecycle management for long-running hosts.
//!
//! Discovers pluggable extension units ("assets") under a root directory,
//! loads them in dependency order, drives them through
//! `UNLOADED -> LOADED -> ENABLED` and persists which assets were loaded and
//! enabled so a restarted host can restore them.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use plugdeck_core::prelude::*;
//!
//! let catalog = AssetCatalog::new().with(AssetKind::Plugin, "metrics", |_| {
//!     Ok(Box::new(MetricsPlugin::default()) as Box<dyn Asset>)
//! });
//! let config = ManagerConfig::new(AssetKind::Plugin, "plugins");
//! let manager = Arc::new(AssetManager::new(config, catalog, Arc::new(host)).await);
//!
//! manager.load_all().await;
//! manager.enable_all().await;
//! ```

pub mod asset;
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod error;
pub mod loader;
pub mod manager;
pub mod ordering;
pub mod store;

pub use asset::{
    Asset, AssetContext, AssetDescriptor, AssetKind, AssetState, DynAsset, HookPhase, HookResult,
    HostHandle,
};
pub use catalog::{AssetCatalog, AssetFactory, AssetKey};
pub use config::ManagerConfig;
pub use discovery::{Candidate, UnitLayout};
pub use error::{AssetError, HookFailure, Result};
pub use manager::{AssetInfo, AssetManager, AssetStats, RestoreReport};
pub use store::{LoadRecord, StateDocument, StateStore};

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::asset::{
        Asset, AssetContext, AssetDescriptor, AssetKind, AssetState, HookPhase, HookResult,
        HostHandle,
    };
    pub use crate::catalog::AssetCatalog;
    pub use crate::config::ManagerConfig;
    pub use crate::error::{AssetError, HookFailure, Result};
    pub use crate::manager::{AssetInfo, AssetManager, AssetStats};
}
