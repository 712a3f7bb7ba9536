use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use muster_core::{Registration, RegistryError};
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::notifier::{Change, Delivery, PatchNotifier};
use crate::resolver::DependencyResolver;

#[derive(Default)]
struct Table {
    live: Vec<Registration>,
    /// Instances taken out by the heartbeat monitor, keyed by URL, awaiting
    /// a successful probe.
    evicted: HashMap<String, Evicted>,
}

struct Evicted {
    registration: Registration,
    since: Instant,
}

/// The authoritative table of live service instances.
///
/// One reader/writer lock guards the table and the eviction ledger. Writers
/// hold it for the mutation and for planning the resulting patches; patches
/// are dispatched after the lock is released.
pub struct RegistrationStore {
    table: RwLock<Table>,
    notifier: Arc<PatchNotifier>,
}

impl RegistrationStore {
    pub fn new(notifier: Arc<PatchNotifier>) -> Self {
        Self {
            table: RwLock::new(Table::default()),
            notifier,
        }
    }

    /// Inserts `reg`, seeds it with its current providers, and tells every
    /// dependent about it. An explicit registration supersedes any eviction
    /// of the same URL.
    pub async fn add(&self, reg: Registration) -> Result<(), RegistryError> {
        reg.validate()?;
        let deliveries = {
            let mut table = self.table.write().await;
            if table.live.iter().any(|r| r.service_url == reg.service_url) {
                return Err(RegistryError::AlreadyExists(reg.service_url));
            }
            table.evicted.remove(&reg.service_url);
            Self::insert(&mut table, reg.clone())
        };
        tracing::info!(
            service = %reg.service_name,
            url = %reg.service_url,
            notified = deliveries.len(),
            "service registered"
        );

        self.notifier.dispatch(deliveries);
        Ok(())
    }

    /// Removes the instance at `url` and tells every dependent it is gone.
    ///
    /// An evicted instance is not in the table, so this reports `NotFound`
    /// for it, but its eviction is dropped and it will not be restored.
    pub async fn remove(&self, url: &str) -> Result<Registration, RegistryError> {
        let (removed, deliveries) = {
            let mut table = self.table.write().await;
            let Some(idx) = table.live.iter().position(|r| r.service_url == url) else {
                if table.evicted.remove(url).is_some() {
                    tracing::info!(url = %url, "evicted service deregistered, will not be restored");
                }
                return Err(RegistryError::NotFound(url.to_string()));
            };
            Self::take(&mut table, idx)
        };
        tracing::info!(
            service = %removed.service_name,
            url = %removed.service_url,
            notified = deliveries.len(),
            "service removed"
        );

        self.notifier.dispatch(deliveries);
        Ok(removed)
    }

    /// Takes the instance at `url` out of the table after failed heartbeats,
    /// remembering it for [`restore`](Self::restore).
    pub async fn evict(&self, url: &str) -> Result<Registration, RegistryError> {
        let (removed, deliveries) = {
            let mut table = self.table.write().await;
            let idx = table
                .live
                .iter()
                .position(|r| r.service_url == url)
                .ok_or_else(|| RegistryError::NotFound(url.to_string()))?;
            let (removed, deliveries) = Self::take(&mut table, idx);
            table.evicted.insert(
                url.to_string(),
                Evicted {
                    registration: removed.clone(),
                    since: Instant::now(),
                },
            );
            (removed, deliveries)
        };

        self.notifier.dispatch(deliveries);
        Ok(removed)
    }

    /// Puts an evicted instance back. `NotFound` if its eviction was dropped
    /// meanwhile (deregistered or expired); `AlreadyExists` if it was
    /// registered again explicitly.
    pub async fn restore(&self, url: &str) -> Result<Registration, RegistryError> {
        let (restored, deliveries) = {
            let mut table = self.table.write().await;
            let evicted = table
                .evicted
                .remove(url)
                .ok_or_else(|| RegistryError::NotFound(url.to_string()))?;
            if table.live.iter().any(|r| r.service_url == url) {
                return Err(RegistryError::AlreadyExists(url.to_string()));
            }
            let restored = evicted.registration;
            let deliveries = Self::insert(&mut table, restored.clone());
            (restored, deliveries)
        };

        self.notifier.dispatch(deliveries);
        Ok(restored)
    }

    /// Drops evictions older than `retention` and returns their URLs.
    pub async fn expire_evicted(&self, retention: Duration) -> Vec<String> {
        let mut table = self.table.write().await;
        let expired: Vec<String> = table
            .evicted
            .iter()
            .filter(|(_, e)| e.since.elapsed() >= retention)
            .map(|(url, _)| url.clone())
            .collect();
        for url in &expired {
            table.evicted.remove(url);
        }
        expired
    }

    pub async fn snapshot(&self) -> Vec<Registration> {
        self.table.read().await.live.clone()
    }

    pub async fn evicted(&self) -> Vec<Registration> {
        self.table
            .read()
            .await
            .evicted
            .values()
            .map(|e| e.registration.clone())
            .collect()
    }

    pub async fn is_evicted(&self, url: &str) -> bool {
        self.table.read().await.evicted.contains_key(url)
    }

    pub async fn get(&self, url: &str) -> Option<Registration> {
        self.table
            .read()
            .await
            .live
            .iter()
            .find(|r| r.service_url == url)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.live.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.live.is_empty()
    }

    fn insert(table: &mut Table, reg: Registration) -> Vec<Delivery> {
        table.live.push(reg.clone());
        metrics::gauge!("muster_registered_instances").set(table.live.len() as f64);

        let mut deliveries: Vec<Delivery> = DependencyResolver::seed(&reg, &table.live).into_iter().collect();
        deliveries.extend(PatchNotifier::plan(&Change::Added(reg.entry()), &table.live));
        deliveries
    }

    fn take(table: &mut Table, idx: usize) -> (Registration, Vec<Delivery>) {
        let removed = table.live.remove(idx);
        metrics::gauge!("muster_registered_instances").set(table.live.len() as f64);
        let deliveries = PatchNotifier::plan(&Change::Removed(removed.entry()), &table.live);
        (removed, deliveries)
    }
}
