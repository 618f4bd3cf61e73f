//! The asset manager façade.
//!
//! One [`AssetManager`] governs one asset kind rooted at one directory. It
//! owns the registry (instances, load order, enabled flags) and the state
//! store; nothing else mutates them. Construct it once at process start and
//! share it by handle (`Arc<AssetManager>`).
//!
//! Mutating operations on the same name are serialized by a per-name lock.
//! Bulk operations run asset by asset: forward load order for load/enable,
//! reverse load order for disable/unload.

mod lifecycle;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{error, info, warn};

use crate::asset::{AssetDescriptor, AssetKind, AssetState, DynAsset, HostHandle};
use crate::catalog::AssetCatalog;
use crate::config::ManagerConfig;
use crate::discovery::{self, Candidate};
use crate::error::{AssetError, Result};
use crate::loader::{AssetInstance, Loader};
use crate::ordering::dependency_order;
use crate::store::StateStore;

/// In-memory registry. Authoritative while the process runs.
#[derive(Default)]
struct Registry {
    instances: HashMap<String, AssetInstance>,
    load_order: Vec<String>,
}

impl Registry {
    fn get(&self, name: &str) -> Option<&AssetInstance> {
        self.instances.get(name)
    }

    fn state(&self, name: &str) -> AssetState {
        self.instances
            .get(name)
            .map(|i| i.state)
            .unwrap_or(AssetState::Unloaded)
    }

    fn insert(&mut self, instance: AssetInstance) {
        let name = instance.name().to_string();
        self.load_order.retain(|n| *n != name);
        self.load_order.push(name.clone());
        self.instances.insert(name, instance);
    }

    fn remove(&mut self, name: &str) -> Option<AssetInstance> {
        self.load_order.retain(|n| n != name);
        self.instances.remove(name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.load_order.iter().position(|n| n == name)
    }

    /// Move `name` to `index` in the load order (clamped to the end).
    fn reposition(&mut self, name: &str, index: usize) {
        if let Some(current) = self.position(name) {
            let name = self.load_order.remove(current);
            let index = index.min(self.load_order.len());
            self.load_order.insert(index, name);
        }
    }

    fn set_state(&mut self, name: &str, state: AssetState) {
        if let Some(instance) = self.instances.get_mut(name) {
            instance.state = state;
        }
    }
}

/// Read-only view of a registered asset.
#[derive(Debug, Clone, Serialize)]
pub struct AssetInfo {
    pub name: String,
    pub kind: AssetKind,
    pub state: AssetState,
    pub descriptor: AssetDescriptor,
    pub path: PathBuf,
    pub data_dir: PathBuf,
    pub loaded_at: DateTime<Utc>,
}

impl AssetInfo {
    fn from_instance(kind: AssetKind, instance: &AssetInstance) -> Self {
        Self {
            name: instance.name().to_string(),
            kind,
            state: instance.state,
            descriptor: instance.descriptor.as_ref().clone(),
            path: instance.candidate.path.clone(),
            data_dir: instance.candidate.data_dir.clone(),
            loaded_at: instance.loaded_at,
        }
    }
}

/// Counts returned by [`AssetManager::get_asset_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssetStats {
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
}

/// Outcome of [`AssetManager::restore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub loaded: Vec<String>,
    pub enabled: Vec<String>,
    pub failed: Vec<String>,
}

/// Orchestrates discovery, loading and persistence for one asset kind.
pub struct AssetManager {
    config: ManagerConfig,
    loader: Loader,
    registry: RwLock<Registry>,
    store: Mutex<StateStore>,
    name_locks: parking_lot::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AssetManager {
    /// Create a manager and open its state store.
    ///
    /// Nothing is loaded; call [`restore`](Self::restore) or
    /// [`load_all`](Self::load_all) next.
    pub async fn new(config: ManagerConfig, catalog: AssetCatalog, host: HostHandle) -> Self {
        let store = StateStore::open(config.state_file.clone()).await;
        let loader = Loader::new(config.kind, catalog, host, config.hook_timeout);
        info!(
            category = "assets",
            kind = %config.kind,
            root = %config.root_dir.display(),
            "Asset manager initialized"
        );
        Self {
            config,
            loader,
            registry: RwLock::new(Registry::default()),
            store: Mutex::new(store),
            name_locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn kind(&self) -> AssetKind {
        self.config.kind
    }

    async fn lock_name(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .name_locks
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Drop the lock entry for `name` unless someone holds or awaits it.
    fn release_name(&self, name: &str) {
        let mut locks = self.name_locks.lock();
        let idle = locks
            .get(name)
            .map(|lock| Arc::strong_count(lock) == 1)
            .unwrap_or(false);
        if idle {
            locks.remove(name);
        }
    }

    #[cfg(test)]
    fn tracked_names(&self) -> usize {
        self.name_locks.lock().len()
    }

    /// Save the state store; failures are logged and swallowed.
    async fn persist(&self) {
        let store = self.store.lock().await;
        if let Err(e) = store.save().await {
            error!(
                category = "assets",
                path = %store.path().display(),
                error = %e,
                "Failed to persist asset state"
            );
        }
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    /// Scan the root directory.
    pub async fn discover(&self) -> Result<Vec<Candidate>> {
        discovery::discover(&self.config.root_dir).await
    }

    /// Resolve descriptors and order candidates by dependencies.
    ///
    /// Candidates whose descriptor cannot be read, or which sit on a
    /// dependency cycle, are logged and returned in `failed`.
    async fn plan(
        &self,
        candidates: Vec<Candidate>,
    ) -> (Vec<(Candidate, AssetDescriptor)>, Vec<String>) {
        let mut failed = Vec::new();
        let mut resolved: Vec<(Candidate, AssetDescriptor)> = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            match self.loader.resolve_descriptor(&candidate).await {
                Ok(descriptor) => resolved.push((candidate, descriptor)),
                Err(e) => {
                    warn!(category = "assets", name = %candidate.name, error = %e, "Skipping asset");
                    failed.push(candidate.name);
                }
            }
        }

        loop {
            match dependency_order(resolved.iter().map(|(_, d)| d)) {
                Ok(order) => {
                    let mut by_name: HashMap<String, (Candidate, AssetDescriptor)> = resolved
                        .into_iter()
                        .map(|(c, d)| (d.name.clone(), (c, d)))
                        .collect();
                    let planned = order
                        .into_iter()
                        .filter_map(|name| by_name.remove(&name))
                        .collect();
                    return (planned, failed);
                }
                Err(AssetError::CyclicDependency { cycle }) => {
                    let err = AssetError::CyclicDependency { cycle: cycle.clone() };
                    for name in &cycle {
                        if let Some(pos) = resolved.iter().position(|(_, d)| d.name == *name) {
                            warn!(category = "assets", name = %name, error = %err, "Skipping asset");
                            resolved.remove(pos);
                            failed.push(name.clone());
                        }
                    }
                }
                Err(e) => {
                    // dependency_order only reports cycles
                    error!(category = "assets", error = %e, "Cannot order assets");
                    failed.extend(resolved.into_iter().map(|(_, d)| d.name));
                    return (Vec::new(), failed);
                }
            }
        }
    }

    // ========================================================================
    // Bulk operations
    // ========================================================================

    /// Discover and load every asset in dependency order.
    ///
    /// Individual failures are logged and skipped; assets that are already
    /// loaded are left alone. Returns the number of assets loaded.
    pub async fn load_all(&self) -> usize {
        let candidates = match self.discover().await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(category = "assets", error = %e, "Asset discovery failed");
                return 0;
            }
        };

        let pending: Vec<Candidate> = {
            let registry = self.registry.read().await;
            candidates
                .into_iter()
                .filter(|c| registry.get(&c.name).is_none())
                .collect()
        };

        let (plan, _) = self.plan(pending).await;
        let mut loaded = 0;
        for (candidate, descriptor) in plan {
            let name = candidate.name.clone();
            let _guard = self.lock_name(&name).await;
            match self.load_resolved(candidate, descriptor, false).await {
                Ok(()) => loaded += 1,
                Err(e) => warn!(category = "assets", name = %name, error = %e, "Failed to load asset"),
            }
        }

        self.persist().await;
        info!(category = "assets", kind = %self.kind(), loaded, "Loaded assets");
        loaded
    }

    /// Enable every loaded asset in load order. Returns the number enabled.
    pub async fn enable_all(&self) -> usize {
        let mut enabled = 0;
        for name in self.list_assets().await {
            let _guard = self.lock_name(&name).await;
            match self.enable_locked(&name, false).await {
                Ok(()) => enabled += 1,
                Err(e) => warn!(category = "assets", name = %name, error = %e, "Failed to enable asset"),
            }
        }
        self.persist().await;
        enabled
    }

    /// Disable every asset in reverse load order.
    pub async fn disable_all(&self) {
        for name in self.list_assets().await.into_iter().rev() {
            let _guard = self.lock_name(&name).await;
            if let Err(e) = self.disable_locked(&name, false).await {
                warn!(category = "assets", name = %name, error = %e, "Failed to disable asset");
            }
        }
        self.persist().await;
    }

    /// Unload every asset in reverse load order.
    pub async fn unload_all(&self) {
        for name in self.list_assets().await.into_iter().rev() {
            {
                let _guard = self.lock_name(&name).await;
                if let Err(e) = self.unload_locked(&name, false).await {
                    warn!(category = "assets", name = %name, error = %e, "Failed to unload asset");
                }
            }
            self.release_name(&name);
        }
        self.persist().await;
    }

    /// Reload what the state store recorded: load every recorded asset in
    /// dependency order, then enable those recorded as enabled.
    ///
    /// Recorded assets that cannot be loaded are dropped from the store.
    pub async fn restore(&self) -> RestoreReport {
        let (recorded, recorded_enabled) = {
            let store = self.store.lock().await;
            (store.loaded().to_vec(), store.enabled().to_vec())
        };
        let mut report = RestoreReport::default();
        if recorded.is_empty() {
            return report;
        }

        let candidates = match self.discover().await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(category = "assets", error = %e, "Asset discovery failed");
                return report;
            }
        };

        let mut pending = Vec::new();
        {
            let registry = self.registry.read().await;
            for name in &recorded {
                if registry.get(name).is_some() {
                    continue;
                }
                match candidates.iter().find(|c| c.name == *name) {
                    Some(candidate) => pending.push(candidate.clone()),
                    None => {
                        warn!(category = "assets", name = %name, "Recorded asset no longer present");
                        report.failed.push(name.clone());
                    }
                }
            }
        }

        let (plan, failed) = self.plan(pending).await;
        report.failed.extend(failed);

        for (candidate, descriptor) in plan {
            let name = candidate.name.clone();
            let _guard = self.lock_name(&name).await;
            match self.load_resolved(candidate, descriptor, false).await {
                Ok(()) => report.loaded.push(name),
                Err(e) => {
                    warn!(category = "assets", name = %name, error = %e, "Failed to restore asset");
                    report.failed.push(name);
                }
            }
        }

        {
            let mut store = self.store.lock().await;
            for name in &report.failed {
                store.remove_loaded(name);
            }
        }

        for name in recorded_enabled {
            if !self.is_loaded(&name).await {
                continue;
            }
            let _guard = self.lock_name(&name).await;
            match self.enable_locked(&name, false).await {
                Ok(()) => report.enabled.push(name),
                Err(e) => {
                    warn!(category = "assets", name = %name, error = %e, "Failed to re-enable asset");
                    self.store.lock().await.set_enabled(&name, false);
                }
            }
        }

        self.persist().await;
        info!(
            category = "assets",
            loaded = report.loaded.len(),
            enabled = report.enabled.len(),
            failed = report.failed.len(),
            "Restored asset state"
        );
        report
    }

    /// Unload everything and flush the state store.
    pub async fn shutdown(&self) {
        self.unload_all().await;
        info!(category = "assets", kind = %self.kind(), "Asset manager shut down");
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn is_loaded(&self, name: &str) -> bool {
        self.registry.read().await.state(name).is_loaded()
    }

    pub async fn is_enabled(&self, name: &str) -> bool {
        self.registry.read().await.state(name) == AssetState::Enabled
    }

    pub async fn state(&self, name: &str) -> AssetState {
        self.registry.read().await.state(name)
    }

    /// Snapshot of a registered asset.
    pub async fn get_asset(&self, name: &str) -> Option<AssetInfo> {
        let registry = self.registry.read().await;
        registry
            .get(name)
            .map(|i| AssetInfo::from_instance(self.kind(), i))
    }

    /// Handle to the live implementation of a registered asset.
    pub async fn get_instance(&self, name: &str) -> Option<DynAsset> {
        self.registry.read().await.get(name).map(|i| i.asset.clone())
    }

    /// Registered names in load order.
    pub async fn list_assets(&self) -> Vec<String> {
        self.registry.read().await.load_order.clone()
    }

    /// Snapshots of all registered assets in load order.
    pub async fn list_info(&self) -> Vec<AssetInfo> {
        let registry = self.registry.read().await;
        registry
            .load_order
            .iter()
            .filter_map(|name| registry.get(name))
            .map(|i| AssetInfo::from_instance(self.kind(), i))
            .collect()
    }

    pub async fn get_asset_stats(&self) -> AssetStats {
        let registry = self.registry.read().await;
        let total = registry.instances.len();
        let enabled = registry
            .instances
            .values()
            .filter(|i| i.state == AssetState::Enabled)
            .count();
        AssetStats {
            total,
            enabled,
            disabled: total - enabled,
        }
    }

    /// Loaded assets that hard-depend on `name`, in load order.
    pub async fn dependents(&self, name: &str) -> Vec<String> {
        let registry = self.registry.read().await;
        registry
            .load_order
            .iter()
            .filter_map(|n| registry.get(n))
            .filter(|i| i.descriptor.depends.iter().any(|d| d == name))
            .map(|i| i.name().to_string())
            .collect()
    }

    /// Copy of the persisted document as currently held in memory.
    pub async fn persisted_state(&self) -> crate::store::StateDocument {
        self.store.lock().await.document().clone()
    }
}
