//! Turning a discovered candidate into a live asset instance.
//!
//! The loader resolves descriptors, checks hard dependencies, instantiates
//! implementations from the catalog and runs lifecycle hooks under a
//! timeout. It never touches the manager's registry; registration happens
//! only after `on_load` succeeded.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tracing::Instrument;

use crate::asset::{AssetContext, AssetDescriptor, AssetKind, AssetState, DynAsset, HookPhase, HostHandle};
use crate::catalog::AssetCatalog;
use crate::discovery::Candidate;
use crate::error::{AssetError, HookFailure, Result};
use crate::store::LoadRecord;

/// A registered, live asset.
#[derive(Clone)]
pub struct AssetInstance {
    pub descriptor: Arc<AssetDescriptor>,
    /// Location the asset was loaded from; reload uses it again.
    pub candidate: Candidate,
    pub context: AssetContext,
    pub asset: DynAsset,
    pub state: AssetState,
    pub loaded_at: DateTime<Utc>,
}

impl AssetInstance {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Bookkeeping entry for the state store.
    pub fn load_record(&self) -> LoadRecord {
        LoadRecord {
            name: self.descriptor.name.clone(),
            version: self.descriptor.version.to_string(),
            path: self.candidate.path.clone(),
            depends: self.descriptor.depends.clone(),
            soft_depends: self.descriptor.soft_depends.clone(),
        }
    }
}

/// Builds instances and runs their hooks.
pub struct Loader {
    kind: AssetKind,
    catalog: AssetCatalog,
    host: HostHandle,
    hook_timeout: Duration,
}

impl Loader {
    pub fn new(kind: AssetKind, catalog: AssetCatalog, host: HostHandle, hook_timeout: Duration) -> Self {
        Self {
            kind,
            catalog,
            host,
            hook_timeout,
        }
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn hook_timeout(&self) -> Duration {
        self.hook_timeout
    }

    /// Read the descriptor belonging to `candidate`.
    pub async fn resolve_descriptor(&self, candidate: &Candidate) -> Result<AssetDescriptor> {
        let Some(path) = candidate.descriptor_path.as_deref() else {
            return Err(AssetError::MissingDescriptor {
                name: candidate.name.clone(),
                path: candidate.path.clone(),
            });
        };

        match AssetDescriptor::from_file(path, &candidate.name).await {
            Err(AssetError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AssetError::MissingDescriptor {
                    name: candidate.name.clone(),
                    path: path.to_path_buf(),
                })
            }
            other => other,
        }
    }

    /// Fail unless every hard dependency satisfies `is_loaded`.
    pub fn check_dependencies(
        &self,
        descriptor: &AssetDescriptor,
        is_loaded: impl Fn(&str) -> bool,
    ) -> Result<()> {
        let missing: Vec<String> = descriptor
            .depends
            .iter()
            .filter(|dep| !is_loaded(dep))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AssetError::UnsatisfiedDependency {
                name: descriptor.name.clone(),
                missing,
            })
        }
    }

    /// Instantiate the implementation and build its context.
    ///
    /// The returned instance is not registered and `on_load` has not run.
    pub fn instantiate(&self, candidate: Candidate, descriptor: AssetDescriptor) -> Result<AssetInstance> {
        let asset = self.catalog.instantiate(self.kind, &descriptor)?;
        let descriptor = Arc::new(descriptor);
        let context = AssetContext::new(
            self.kind,
            descriptor.clone(),
            candidate.data_dir.clone(),
            self.host.clone(),
        );

        Ok(AssetInstance {
            descriptor,
            candidate,
            context,
            asset: Arc::new(tokio::sync::RwLock::new(asset)),
            state: AssetState::Loaded,
            loaded_at: Utc::now(),
        })
    }

    /// Run one hook with the configured timeout.
    ///
    /// Errors, timeouts and panics all surface as
    /// [`AssetError::HookExecution`].
    pub async fn invoke(&self, instance: &AssetInstance, phase: HookPhase) -> Result<()> {
        let ctx = instance.context.clone();
        let asset = instance.asset.clone();
        let span = ctx.span().clone();

        let hook = async move {
            let mut asset = asset.write().await;
            match phase {
                HookPhase::Load => asset.on_load(&ctx).await,
                HookPhase::Enable => asset.on_enable(&ctx).await,
                HookPhase::Disable => asset.on_disable(&ctx).await,
                HookPhase::Unload => asset.on_unload(&ctx).await,
                HookPhase::Reload => asset.on_reload(&ctx).await,
            }
        };

        let outcome = tokio::time::timeout(
            self.hook_timeout,
            AssertUnwindSafe(hook).catch_unwind().instrument(span),
        )
        .await;

        let cause = match outcome {
            Ok(Ok(Ok(()))) => return Ok(()),
            Ok(Ok(Err(e))) => HookFailure::Failed(format!("{:#}", e)),
            Ok(Err(panic)) => HookFailure::Panicked(panic_message(panic.as_ref())),
            Err(_) => HookFailure::TimedOut(self.hook_timeout),
        };

        Err(AssetError::HookExecution {
            name: instance.name().to_string(),
            phase,
            cause,
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
