//! Single-asset state transitions.
//!
//! `*_locked` methods assume the caller holds the per-name lock; `persist`
//! controls whether the state store is saved right away (bulk operations
//! save once at the end instead).

use tracing::{debug, info, warn};

use super::AssetManager;
use crate::asset::{AssetDescriptor, AssetState, HookPhase};
use crate::discovery::{self, Candidate};
use crate::error::{AssetError, Result};

impl AssetManager {
    /// Load the asset called `name` from the root directory.
    pub async fn load(&self, name: &str) -> Result<()> {
        let _guard = self.lock_name(name).await;
        if self.registry.read().await.get(name).is_some() {
            return Err(AssetError::Duplicate(name.to_string()));
        }

        let candidate = discovery::find(&self.config.root_dir, name)
            .await?
            .ok_or_else(|| AssetError::MissingDescriptor {
                name: name.to_string(),
                path: self.config.root_dir.clone(),
            })?;
        self.load_candidate_locked(candidate, true).await
    }

    /// Load a specific candidate location.
    pub async fn load_from(&self, candidate: Candidate) -> Result<()> {
        let _guard = self.lock_name(&candidate.name).await;
        self.load_candidate_locked(candidate, true).await
    }

    /// `LOADED -> ENABLED`; a no-op for enabled assets.
    pub async fn enable(&self, name: &str) -> Result<()> {
        let _guard = self.lock_name(name).await;
        self.enable_locked(name, true).await
    }

    /// `ENABLED -> LOADED`; a no-op for anything else.
    pub async fn disable(&self, name: &str) -> Result<()> {
        let _guard = self.lock_name(name).await;
        self.disable_locked(name, true).await
    }

    /// Tear the asset down, disabling it first if needed.
    pub async fn unload(&self, name: &str) -> Result<()> {
        let result = {
            let _guard = self.lock_name(name).await;
            self.unload_locked(name, true).await
        };
        self.release_name(name);
        result
    }

    /// Unload and load again from the original location, re-enabling the
    /// asset if it was enabled. The asset keeps its place in the load order.
    ///
    /// A failed load leaves the asset `UNLOADED`; a failed re-enable leaves
    /// it `LOADED`. Either failure is returned.
    pub async fn reload(&self, name: &str) -> Result<()> {
        let _guard = self.lock_name(name).await;

        let (candidate, was_enabled, position) = {
            let registry = self.registry.read().await;
            let instance = registry
                .get(name)
                .ok_or_else(|| AssetError::NotLoaded(name.to_string()))?;
            (
                instance.candidate.clone(),
                instance.state == AssetState::Enabled,
                registry.position(name).unwrap_or(usize::MAX),
            )
        };
        let stored_position = self
            .store
            .lock()
            .await
            .loaded()
            .iter()
            .position(|n| n == name)
            .unwrap_or(usize::MAX);

        self.unload_locked(name, false).await?;

        if let Err(e) = self.load_candidate_locked(candidate, false).await {
            warn!(category = "assets", name = %name, error = %e, "Reload failed, asset left unloaded");
            self.persist().await;
            return Err(e);
        }

        // dependents loaded after this asset must still be torn down first
        self.registry.write().await.reposition(name, position);
        self.store.lock().await.reposition_loaded(name, stored_position);

        let reloaded = self.registry.read().await.get(name).cloned();
        if let Some(instance) = reloaded {
            if let Err(e) = self.loader.invoke(&instance, HookPhase::Reload).await {
                warn!(category = "assets", name = %name, error = %e, "Reload hook failed");
            }
        }

        if was_enabled {
            if let Err(e) = self.enable_locked(name, false).await {
                self.persist().await;
                return Err(e);
            }
        }

        self.persist().await;
        info!(category = "assets", name = %name, "Asset reloaded");
        Ok(())
    }

    pub(super) async fn load_candidate_locked(&self, candidate: Candidate, persist: bool) -> Result<()> {
        if self.registry.read().await.get(&candidate.name).is_some() {
            return Err(AssetError::Duplicate(candidate.name));
        }
        let descriptor = self.loader.resolve_descriptor(&candidate).await?;
        self.load_resolved(candidate, descriptor, persist).await
    }

    /// Dependency check, instantiate, `on_load`, register, record.
    ///
    /// Nothing is registered unless every step succeeds.
    pub(super) async fn load_resolved(
        &self,
        candidate: Candidate,
        descriptor: AssetDescriptor,
        persist: bool,
    ) -> Result<()> {
        {
            let registry = self.registry.read().await;
            if registry.get(&descriptor.name).is_some() {
                return Err(AssetError::Duplicate(descriptor.name));
            }
            self.loader
                .check_dependencies(&descriptor, |dep| registry.state(dep).is_loaded())?;
        }

        let instance = self.loader.instantiate(candidate, descriptor)?;
        self.loader.invoke(&instance, HookPhase::Load).await?;

        let record = instance.load_record();
        let name = instance.name().to_string();
        let version = instance.descriptor.version.clone();
        self.registry.write().await.insert(instance);
        self.store.lock().await.add_loaded(record);
        if persist {
            self.persist().await;
        }

        info!(category = "assets", kind = %self.kind(), name = %name, version = %version, "Asset loaded");
        Ok(())
    }

    pub(super) async fn enable_locked(&self, name: &str, persist: bool) -> Result<()> {
        let instance = {
            let registry = self.registry.read().await;
            let instance = registry
                .get(name)
                .ok_or_else(|| AssetError::NotLoaded(name.to_string()))?;
            if instance.state == AssetState::Enabled {
                debug!(category = "assets", name = %name, "Asset already enabled");
                return Ok(());
            }
            instance.clone()
        };

        if let Err(e) = self.loader.invoke(&instance, HookPhase::Enable).await {
            warn!(category = "assets", name = %name, error = %e, "Enable failed, asset stays loaded");
            return Err(e);
        }

        self.registry.write().await.set_state(name, AssetState::Enabled);
        self.store.lock().await.set_enabled(name, true);
        if persist {
            self.persist().await;
        }
        info!(category = "assets", name = %name, "Asset enabled");
        Ok(())
    }

    pub(super) async fn disable_locked(&self, name: &str, persist: bool) -> Result<()> {
        let instance = {
            let registry = self.registry.read().await;
            match registry.get(name) {
                Some(instance) if instance.state == AssetState::Enabled => instance.clone(),
                _ => return Ok(()),
            }
        };

        if let Err(e) = self.loader.invoke(&instance, HookPhase::Disable).await {
            warn!(category = "assets", name = %name, error = %e, "Disable hook failed, disabling anyway");
        }

        self.registry.write().await.set_state(name, AssetState::Loaded);
        self.store.lock().await.set_enabled(name, false);
        if persist {
            self.persist().await;
        }
        info!(category = "assets", name = %name, "Asset disabled");
        Ok(())
    }

    pub(super) async fn unload_locked(&self, name: &str, persist: bool) -> Result<()> {
        let instance = self
            .registry
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AssetError::NotLoaded(name.to_string()))?;

        let dependents = self.dependents(name).await;
        if !dependents.is_empty() {
            warn!(
                category = "assets",
                name = %name,
                dependents = %dependents.join(", "),
                "Unloading asset that loaded assets depend on"
            );
        }

        if instance.state == AssetState::Enabled {
            if let Err(e) = self.disable_locked(name, false).await {
                warn!(category = "assets", name = %name, error = %e, "Disable before unload failed");
            }
        }

        if let Err(e) = self.loader.invoke(&instance, HookPhase::Unload).await {
            warn!(category = "assets", name = %name, error = %e, "Unload hook failed, unloading anyway");
        }

        self.registry.write().await.remove(name);
        self.store.lock().await.remove_loaded(name);
        if persist {
            self.persist().await;
        }
        info!(category = "assets", name = %name, "Asset unloaded");
        Ok(())
    }
}
