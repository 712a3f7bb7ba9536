use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use muster_core::{HealthStatus, Registration, RegistryError};
use tokio::task::JoinHandle;

use crate::store::RegistrationStore;
use crate::transport::HealthProbe;

#[derive(Debug, Clone)]
pub struct HeartbeatSettings {
    /// Pause between the end of one tick and the start of the next.
    pub interval: Duration,
    /// Probes per registration per tick before it counts as unhealthy.
    pub attempts: u32,
    /// Pause between failed probes of the same registration.
    pub retry_delay: Duration,
    /// How long an evicted registration keeps being probed for recovery.
    pub eviction_retention: Duration,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            attempts: 3,
            retry_delay: Duration::from_secs(1),
            eviction_retention: Duration::from_secs(600),
        }
    }
}

/// Membership changes made by one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub evicted: Vec<String>,
    pub restored: Vec<String>,
    /// Evictions given up on after the retention period.
    pub expired: Vec<String>,
}

impl TickReport {
    pub fn is_quiet(&self) -> bool {
        self.evicted.is_empty() && self.restored.is_empty() && self.expired.is_empty()
    }
}

/// Polls every registration's heartbeat URL and keeps the store in line with
/// what answers.
///
/// Eviction needs every probe of a tick to fail; restoration needs one
/// success. The store remembers evicted registrations; they are probed on
/// every tick until they come back, are deregistered, or expire.
pub struct HeartbeatMonitor {
    store: Arc<RegistrationStore>,
    probe: Arc<dyn HealthProbe>,
    settings: HeartbeatSettings,
}

impl HeartbeatMonitor {
    pub fn new(
        store: Arc<RegistrationStore>,
        probe: Arc<dyn HealthProbe>,
        settings: HeartbeatSettings,
    ) -> Self {
        Self {
            store,
            probe,
            settings,
        }
    }

    /// Spawns the monitor loop. Consuming `self` means one loop per monitor.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                interval_secs = self.settings.interval.as_secs(),
                attempts = self.settings.attempts,
                "heartbeat monitor started"
            );
            loop {
                let report = self.tick().await;
                if !report.is_quiet() {
                    tracing::info!(
                        evicted = report.evicted.len(),
                        restored = report.restored.len(),
                        expired = report.expired.len(),
                        "heartbeat tick changed membership"
                    );
                }
                tokio::time::sleep(self.settings.interval).await;
            }
        })
    }

    /// Probes every live and evicted registration concurrently, then applies
    /// the resulting evictions and restorations.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        for url in self.store.expire_evicted(self.settings.eviction_retention).await {
            tracing::info!(url = %url, "service did not recover, forgetting eviction");
            report.expired.push(url);
        }

        let mut candidates: Vec<(Registration, bool)> = self
            .store
            .snapshot()
            .await
            .into_iter()
            .filter(|reg| {
                if reg.heartbeat_url.is_empty() {
                    tracing::debug!(url = %reg.service_url, "no heartbeat URL, not monitored");
                    return false;
                }
                true
            })
            .map(|reg| (reg, false))
            .collect();
        candidates.extend(self.store.evicted().await.into_iter().map(|reg| (reg, true)));

        let statuses = join_all(candidates.iter().map(|(reg, _)| self.check(reg))).await;

        for ((reg, was_evicted), status) in candidates.into_iter().zip(statuses) {
            match (was_evicted, status) {
                (false, HealthStatus::Unhealthy) => self.evict(&reg.service_url, &mut report).await,
                (true, HealthStatus::Healthy) => self.restore(&reg.service_url, &mut report).await,
                _ => {}
            }
        }
        report
    }

    async fn check(&self, reg: &Registration) -> HealthStatus {
        let attempts = self.settings.attempts.max(1);
        for attempt in 1..=attempts {
            match self.probe.probe(&reg.heartbeat_url).await {
                Ok(()) => {
                    tracing::debug!(service = %reg.service_name, url = %reg.service_url, attempt, "heartbeat check passed");
                    return HealthStatus::Healthy;
                }
                Err(e) => {
                    tracing::debug!(
                        service = %reg.service_name,
                        url = %reg.service_url,
                        attempt,
                        error = %e,
                        "heartbeat check failed"
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.settings.retry_delay).await;
                    }
                }
            }
        }
        HealthStatus::Unhealthy
    }

    async fn evict(&self, url: &str, report: &mut TickReport) {
        match self.store.evict(url).await {
            Ok(removed) => {
                metrics::counter!("muster_evictions_total").increment(1);
                tracing::warn!(
                    service = %removed.service_name,
                    url = %removed.service_url,
                    attempts = self.settings.attempts,
                    "heartbeat failed, evicting service"
                );
                report.evicted.push(removed.service_url);
            }
            Err(RegistryError::NotFound(_)) => {
                tracing::debug!(url = %url, "service left before eviction");
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "eviction failed");
            }
        }
    }

    async fn restore(&self, url: &str, report: &mut TickReport) {
        match self.store.restore(url).await {
            Ok(_) => {
                metrics::counter!("muster_restorations_total").increment(1);
                tracing::info!(url = %url, "heartbeat recovered, service restored");
                report.restored.push(url.to_string());
            }
            Err(RegistryError::NotFound(_)) => {
                tracing::debug!(url = %url, "eviction dropped before restoration");
            }
            Err(RegistryError::AlreadyExists(_)) => {
                tracing::debug!(url = %url, "service already re-registered");
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "restoration failed");
            }
        }
    }
}
