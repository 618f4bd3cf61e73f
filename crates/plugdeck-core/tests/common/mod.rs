//! Shared fixtures for manager integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use plugdeck_core::prelude::*;

/// Ordered record of hook calls, as `"<hook>:<name>"`.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: String) {
        self.0.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Names that received `hook`, in call order.
    pub fn calls(&self, hook: &str) -> Vec<String> {
        let prefix = format!("{}:", hook);
        self.entries()
            .into_iter()
            .filter_map(|e| e.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Host services handed to assets.
pub struct TestHost {
    pub label: &'static str,
}

/// Asset whose behavior is driven by its descriptor's `config`:
///
/// ```toml
/// [config]
/// fail = ["enable"]      # hooks returning an error
/// panic = ["disable"]    # hooks panicking
/// stall = ["unload"]     # hooks that never finish
/// ```
pub struct Probe {
    journal: Journal,
    fail: Vec<String>,
    panic: Vec<String>,
    stall: Vec<String>,
}

impl Probe {
    fn from_descriptor(journal: Journal, descriptor: &AssetDescriptor) -> Self {
        let list = |key: &str| -> Vec<String> {
            descriptor.config[key]
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default()
        };
        Self {
            journal,
            fail: list("fail"),
            panic: list("panic"),
            stall: list("stall"),
        }
    }

    async fn hook(&self, hook: &str, ctx: &AssetContext) -> HookResult {
        self.journal.push(format!("{}:{}", hook, ctx.name()));
        if self.stall.iter().any(|h| h == hook) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.panic.iter().any(|h| h == hook) {
            panic!("{} panicked in {}", ctx.name(), hook);
        }
        if self.fail.iter().any(|h| h == hook) {
            anyhow::bail!("{} refused {}", ctx.name(), hook);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Asset for Probe {
    async fn on_load(&mut self, ctx: &AssetContext) -> HookResult {
        if let Some(host) = ctx.host::<TestHost>() {
            let dir = ctx.ensure_data_dir().await?;
            tokio::fs::write(dir.join("host.txt"), host.label).await?;
        }
        self.hook("load", ctx).await
    }

    async fn on_enable(&mut self, ctx: &AssetContext) -> HookResult {
        self.hook("enable", ctx).await
    }

    async fn on_disable(&mut self, ctx: &AssetContext) -> HookResult {
        self.hook("disable", ctx).await
    }

    async fn on_unload(&mut self, ctx: &AssetContext) -> HookResult {
        self.hook("unload", ctx).await
    }

    async fn on_reload(&mut self, ctx: &AssetContext) -> HookResult {
        self.hook("reload", ctx).await
    }
}

pub fn catalog(journal: &Journal) -> AssetCatalog {
    let mut catalog = AssetCatalog::new();
    let journal = journal.clone();
    catalog.set_fallback(AssetKind::Plugin, move |descriptor| {
        Ok(Box::new(Probe::from_descriptor(journal.clone(), descriptor)) as Box<dyn Asset>)
    });
    catalog
}

pub fn config(root: &Path) -> ManagerConfig {
    ManagerConfig::new(AssetKind::Plugin, root).with_hook_timeout(Duration::from_millis(200))
}

pub async fn manager(root: &Path, journal: &Journal) -> AssetManager {
    AssetManager::new(
        config(root),
        catalog(journal),
        Arc::new(TestHost { label: "test-host" }),
    )
    .await
}

/// Write `<root>/<name>.toml` with the given dependencies and extra TOML.
pub fn write_asset(root: &Path, name: &str, depends: &[&str], extra: &str) {
    std::fs::create_dir_all(root).unwrap();
    let depends = depends
        .iter()
        .map(|d| format!("\"{}\"", d))
        .collect::<Vec<_>>()
        .join(", ");
    let body = format!("version = \"1.0.0\"\ndepends = [{}]\n{}\n", depends, extra);
    std::fs::write(root.join(format!("{}.toml", name)), body).unwrap();
}
