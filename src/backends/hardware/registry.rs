// SPDX-License-Identifier: GPL-3.0-only

//! Lookup of hardware providers by service name

use super::HardwareProvider;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves a provider service name to a live provider
///
/// This is the seam where a real deployment asks its service manager for the
/// hardware service. Returning `None` means the service is not running.
pub trait ProviderRegistry: Send + Sync {
    fn find(&self, name: &str) -> Option<Arc<dyn HardwareProvider>>;
}

/// Registry backed by a fixed name → provider map
#[derive(Default, Clone)]
pub struct StaticRegistry {
    providers: HashMap<String, Arc<dyn HardwareProvider>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under `name`, replacing any earlier registration
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn HardwareProvider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Builder-style variant of [`StaticRegistry::register`]
    pub fn with(mut self, name: impl Into<String>, provider: Arc<dyn HardwareProvider>) -> Self {
        self.register(name, provider);
        self
    }
}

impl ProviderRegistry for StaticRegistry {
    fn find(&self, name: &str) -> Option<Arc<dyn HardwareProvider>> {
        self.providers.get(name).cloned()
    }
}

impl std::fmt::Debug for StaticRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.providers.keys().collect();
        names.sort();
        f.debug_struct("StaticRegistry")
            .field("providers", &names)
            .finish()
    }
}
