//! Setup-time facade: register services and mounts, then hand out runners

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::context::TransportMeta;
use crate::mount::MountMap;
use crate::registry::{RegistryError, ServiceRegistry};
use crate::response::RunOutput;
use crate::runner::{ContextMode, Runner};
use crate::service::Service;

/// Owns the service registry and mount map while a server is being set up.
///
/// Registration takes `&mut self`, so it cannot race with request handling;
/// [`RpcServer::runner`] snapshots the current state for serving.
#[derive(Debug, Default)]
pub struct RpcServer {
    registry: ServiceRegistry,
    mounts: MountMap,
    mode: ContextMode,
}

impl RpcServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service under its own name
    pub fn register<S>(&mut self, service: S) -> Result<&mut Self, RegistryError>
    where
        S: Service + 'static,
    {
        let name = service.name().to_string();
        self.registry.register(service)?;
        info!(service = %name, "registered service");
        Ok(self)
    }

    /// Register a service under an explicit name
    pub fn register_as<S>(
        &mut self,
        name: impl Into<String>,
        service: S,
    ) -> Result<&mut Self, RegistryError>
    where
        S: Service + 'static,
    {
        let name = name.into();
        self.registry.register_as(name.clone(), service)?;
        info!(service = %name, "registered service");
        Ok(self)
    }

    pub fn unregister(&mut self, name: &str) -> Result<&mut Self, RegistryError> {
        self.registry.unregister(name)?;
        info!(service = %name, "unregistered service");
        Ok(self)
    }

    /// Merge context mounts; a key mounted twice keeps the latest factory
    pub fn mount(&mut self, mounts: MountMap) -> &mut Self {
        self.mounts.merge(mounts);
        self
    }

    pub fn set_context_mode(&mut self, mode: ContextMode) -> &mut Self {
        self.mode = mode;
        self
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn mounts(&self) -> &MountMap {
        &self.mounts
    }

    /// Snapshot the current registry and mounts into a runner
    pub fn runner(&self) -> Runner {
        Runner::new(
            Arc::new(self.registry.clone()),
            Arc::new(self.mounts.clone()),
        )
        .with_context_mode(self.mode)
    }

    /// Convenience for one-off runs against the current state
    pub async fn run(&self, payload: Option<Value>, transport: TransportMeta) -> Option<RunOutput> {
        self.runner().run(payload, transport).await
    }
}
