//! Per-asset context: host handle, private data directory, scoped logger.

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{AssetDescriptor, AssetKind};

/// Opaque handle to host services.
///
/// The manager only passes it through; assets downcast it with
/// [`AssetContext::host`].
pub type HostHandle = Arc<dyn Any + Send + Sync>;

/// Capabilities an asset receives from its host.
#[derive(Clone)]
pub struct AssetContext {
    kind: AssetKind,
    descriptor: Arc<AssetDescriptor>,
    data_dir: PathBuf,
    host: HostHandle,
    span: tracing::Span,
}

impl AssetContext {
    pub fn new(
        kind: AssetKind,
        descriptor: Arc<AssetDescriptor>,
        data_dir: PathBuf,
        host: HostHandle,
    ) -> Self {
        let span = tracing::info_span!(
            "asset",
            kind = %kind,
            name = %descriptor.name,
            version = %descriptor.version
        );
        Self {
            kind,
            descriptor,
            data_dir,
            host,
            span,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn descriptor(&self) -> &AssetDescriptor {
        &self.descriptor
    }

    /// The `config` table from the descriptor.
    pub fn config(&self) -> &serde_json::Value {
        &self.descriptor.config
    }

    /// Path of the private data directory. It may not exist yet.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Create the private data directory if needed and return its path.
    pub async fn ensure_data_dir(&self) -> std::io::Result<&Path> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        Ok(&self.data_dir)
    }

    /// Downcast the host handle.
    pub fn host<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.host.downcast_ref::<T>()
    }

    /// Span carrying this asset's identity; hooks run inside it.
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

impl std::fmt::Debug for AssetContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetContext")
            .field("kind", &self.kind)
            .field("name", &self.descriptor.name)
            .field("data_dir", &self.data_dir)
            .finish_non_exhaustive()
    }
}
