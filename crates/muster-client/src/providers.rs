use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use muster_core::{Patch, ServiceName};

use crate::error::ClientError;

/// Provider URLs this service currently knows about, per service name.
///
/// Patches are applied as per-entry set operations keyed by URL, so the
/// order in which they arrive does not matter.
#[derive(Debug, Clone, Default)]
pub struct Providers {
    inner: Arc<RwLock<HashMap<ServiceName, Vec<String>>>>,
}

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, patch: &Patch) {
        let mut providers = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for entry in &patch.added {
            let urls = providers.entry(entry.name.clone()).or_default();
            if !urls.contains(&entry.url) {
                urls.push(entry.url.clone());
            }
        }
        for entry in &patch.removed {
            if let Some(urls) = providers.get_mut(&entry.name) {
                urls.retain(|url| url != &entry.url);
                if urls.is_empty() {
                    providers.remove(&entry.name);
                }
            }
        }
        tracing::debug!(
            added = patch.added.len(),
            removed = patch.removed.len(),
            "applied provider patch"
        );
    }

    /// Most recently added provider for `name`.
    pub fn resolve(&self, name: &ServiceName) -> Result<String, ClientError> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .and_then(|urls| urls.last().cloned())
            .ok_or_else(|| ClientError::NoProvider(name.clone()))
    }

    pub fn all(&self, name: &ServiceName) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}
