use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::service::Service;

/// Registry setup errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("service {0} already exist")]
    DuplicateService(String),

    #[error("service {0} is not registered")]
    UnknownService(String),

    #[error("service name '{0}' is ill-formed: must be non-empty and contain no '.'")]
    InvalidName(String),
}

/// Service name to service instance mapping.
///
/// Mutated only during setup; runners receive an `Arc` snapshot so requests
/// in flight never observe later registrations.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Arc<dyn Service>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the service's own name
    pub fn register<S>(&mut self, service: S) -> Result<(), RegistryError>
    where
        S: Service + 'static,
    {
        let name = service.name().to_string();
        self.register_arc(name, Arc::new(service))
    }

    /// Register under an explicit name
    pub fn register_as<S>(
        &mut self,
        name: impl Into<String>,
        service: S,
    ) -> Result<(), RegistryError>
    where
        S: Service + 'static,
    {
        self.register_arc(name.into(), Arc::new(service))
    }

    pub fn register_arc(
        &mut self,
        name: String,
        service: Arc<dyn Service>,
    ) -> Result<(), RegistryError> {
        if name.is_empty() || name.contains('.') {
            return Err(RegistryError::InvalidName(name));
        }
        if self.services.contains_key(&name) {
            return Err(RegistryError::DuplicateService(name));
        }
        self.services.insert(name, service);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Result<Arc<dyn Service>, RegistryError> {
        self.services
            .remove(name)
            .ok_or_else(|| RegistryError::UnknownService(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Service>> {
        self.services.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Registered service names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.keys().cloned().collect();
        names.sort();
        names
    }

    /// Every `service.action` method this registry can resolve, sorted
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self
            .services
            .iter()
            .flat_map(|(name, service)| {
                service
                    .actions()
                    .into_iter()
                    .map(move |action| format!("{}.{}", name, action))
            })
            .collect();
        methods.sort();
        methods
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.names())
            .finish()
    }
}
