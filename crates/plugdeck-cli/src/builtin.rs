//! Implementations linked into the `plugdeck` binary.

use chrono::Utc;
use plugdeck_core::prelude::*;
use tokio::io::AsyncWriteExt;

/// File inside an asset's data directory that receives hook calls.
pub const HOOK_LOG: &str = "hooks.log";

/// Asset that appends every hook call to `<data_dir>/hooks.log`.
///
/// Serves every entry that has no dedicated implementation, so any
/// descriptor dropped into the root can be driven from the command line.
#[derive(Debug, Default)]
pub struct HookLogAsset;

impl HookLogAsset {
    async fn record(&self, ctx: &AssetContext, phase: HookPhase) -> HookResult {
        let dir = ctx.ensure_data_dir().await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(HOOK_LOG))
            .await?;
        let line = format!(
            "{} {} {}\n",
            Utc::now().to_rfc3339(),
            phase.hook_name(),
            ctx.descriptor().version
        );
        file.write_all(line.as_bytes()).await?;
        tracing::debug!(category = "assets", name = %ctx.name(), hook = phase.hook_name(), "Hook recorded");
        Ok(())
    }
}

#[async_trait::async_trait]
impl Asset for HookLogAsset {
    async fn on_load(&mut self, ctx: &AssetContext) -> HookResult {
        self.record(ctx, HookPhase::Load).await
    }

    async fn on_enable(&mut self, ctx: &AssetContext) -> HookResult {
        self.record(ctx, HookPhase::Enable).await
    }

    async fn on_disable(&mut self, ctx: &AssetContext) -> HookResult {
        self.record(ctx, HookPhase::Disable).await
    }

    async fn on_unload(&mut self, ctx: &AssetContext) -> HookResult {
        self.record(ctx, HookPhase::Unload).await
    }

    async fn on_reload(&mut self, ctx: &AssetContext) -> HookResult {
        self.record(ctx, HookPhase::Reload).await
    }
}

/// Catalog shipped with the binary.
pub fn catalog() -> AssetCatalog {
    let mut catalog = AssetCatalog::new();
    for kind in [AssetKind::Plugin, AssetKind::Component] {
        catalog.set_fallback(kind, |_| Ok(Box::new(HookLogAsset) as Box<dyn Asset>));
    }
    catalog
}
