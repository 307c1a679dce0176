//! `"service.action"` lookup

use std::sync::Arc;

use crate::registry::ServiceRegistry;
use crate::service::{Action, Service};

/// A method resolved to its owning service and action
#[derive(Clone)]
pub struct ResolvedMethod {
    pub service_name: String,
    pub action_name: String,
    pub service: Arc<dyn Service>,
    pub action: Arc<dyn Action>,
}

impl std::fmt::Debug for ResolvedMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedMethod")
            .field("service_name", &self.service_name)
            .field("action_name", &self.action_name)
            .finish()
    }
}

/// Splits `method` on its first `.` and looks both halves up. Returns
/// `None` when either half is empty or missing, the service is not
/// registered, or the service has no such action.
pub fn resolve(registry: &ServiceRegistry, method: &str) -> Option<ResolvedMethod> {
    let (service_name, action_name) = method.split_once('.')?;
    if service_name.is_empty() || action_name.is_empty() {
        return None;
    }

    let service = registry.get(service_name)?;
    let action = service.action(action_name)?;

    Some(ResolvedMethod {
        service_name: service_name.to_string(),
        action_name: action_name.to_string(),
        service: Arc::clone(service),
        action,
    })
}
