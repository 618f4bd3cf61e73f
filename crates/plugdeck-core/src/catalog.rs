//! Catalog of statically linked asset implementations.
//!
//! Implementations are compiled into the host and registered under an
//! [`AssetKey`]. A descriptor's `entry` selects which factory builds the
//! live instance.

use std::collections::HashMap;
use std::sync::Arc;

use crate::asset::{Asset, AssetDescriptor, AssetKind};
use crate::error::{AssetError, Result};

/// Builds an asset implementation for a descriptor.
pub type AssetFactory =
    Arc<dyn Fn(&AssetDescriptor) -> anyhow::Result<Box<dyn Asset>> + Send + Sync>;

/// Catalog key: asset kind plus entry name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey {
    pub kind: AssetKind,
    pub entry: String,
}

impl AssetKey {
    pub fn new(kind: AssetKind, entry: impl Into<String>) -> Self {
        Self {
            kind,
            entry: entry.into(),
        }
    }
}

/// Registry of known implementations.
#[derive(Default, Clone)]
pub struct AssetCatalog {
    factories: HashMap<AssetKey, AssetFactory>,
    fallback: HashMap<AssetKind, AssetFactory>,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `(kind, entry)`, replacing any previous one.
    pub fn register<F>(&mut self, kind: AssetKind, entry: impl Into<String>, factory: F)
    where
        F: Fn(&AssetDescriptor) -> anyhow::Result<Box<dyn Asset>> + Send + Sync + 'static,
    {
        self.factories
            .insert(AssetKey::new(kind, entry), Arc::new(factory));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<F>(mut self, kind: AssetKind, entry: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&AssetDescriptor) -> anyhow::Result<Box<dyn Asset>> + Send + Sync + 'static,
    {
        self.register(kind, entry, factory);
        self
    }

    /// Factory used for entries of `kind` without an explicit registration.
    pub fn set_fallback<F>(&mut self, kind: AssetKind, factory: F)
    where
        F: Fn(&AssetDescriptor) -> anyhow::Result<Box<dyn Asset>> + Send + Sync + 'static,
    {
        self.fallback.insert(kind, Arc::new(factory));
    }

    pub fn contains(&self, kind: AssetKind, entry: &str) -> bool {
        self.factories.contains_key(&AssetKey::new(kind, entry))
    }

    /// Instantiate the implementation for `descriptor`.
    pub fn instantiate(
        &self,
        kind: AssetKind,
        descriptor: &AssetDescriptor,
    ) -> Result<Box<dyn Asset>> {
        let factory = self
            .factories
            .get(&AssetKey::new(kind, descriptor.entry.as_str()))
            .or_else(|| self.fallback.get(&kind))
            .ok_or_else(|| AssetError::Instantiation {
                name: descriptor.name.clone(),
                reason: format!("no {} implementation registered for entry '{}'", kind, descriptor.entry),
            })?;

        factory(descriptor).map_err(|e| AssetError::Instantiation {
            name: descriptor.name.clone(),
            reason: format!("{:#}", e),
        })
    }
}

impl std::fmt::Debug for AssetCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.factories.keys().collect();
        keys.sort_by(|a, b| a.entry.cmp(&b.entry));
        f.debug_struct("AssetCatalog")
            .field("entries", &keys)
            .field("fallback_kinds", &self.fallback.keys().collect::<Vec<_>>())
            .finish()
    }
}
