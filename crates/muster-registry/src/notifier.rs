use std::sync::Arc;

use muster_core::{Patch, PatchEntry, Registration};
use tokio::sync::Semaphore;

use crate::transport::PatchSink;

/// A single structural change to the membership table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added(PatchEntry),
    Removed(PatchEntry),
}

impl Change {
    pub fn entry(&self) -> &PatchEntry {
        match self {
            Change::Added(entry) | Change::Removed(entry) => entry,
        }
    }

    fn into_patch(self) -> Patch {
        match self {
            Change::Added(entry) => Patch::added(vec![entry]),
            Change::Removed(entry) => Patch::removed(vec![entry]),
        }
    }
}

/// A patch addressed to one consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// `serviceURL` of the consumer, for logging.
    pub consumer: String,
    /// The consumer's `serviceUpdateURL`.
    pub target: String,
    pub patch: Patch,
}

/// Fans membership changes out to dependents.
///
/// Delivery is best-effort and at-most-once: every patch is sent from its own
/// task, at most `max_in_flight` at a time, and failures are logged and
/// dropped. Callers never wait on delivery.
pub struct PatchNotifier {
    sink: Arc<dyn PatchSink>,
    permits: Arc<Semaphore>,
}

impl PatchNotifier {
    pub fn new(sink: Arc<dyn PatchSink>, max_in_flight: usize) -> Self {
        Self {
            sink,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Works out which registrations care about `change` and what each receives.
    pub fn plan(change: &Change, registrations: &[Registration]) -> Vec<Delivery> {
        let name = &change.entry().name;
        registrations
            .iter()
            .filter(|reg| reg.depends_on(name))
            .filter(|reg| {
                if reg.service_update_url.is_empty() {
                    tracing::debug!(
                        consumer = %reg.service_url,
                        "consumer has no update URL, skipping patch"
                    );
                    return false;
                }
                true
            })
            .map(|reg| Delivery {
                consumer: reg.service_url.clone(),
                target: reg.service_update_url.clone(),
                patch: change.clone().into_patch(),
            })
            .collect()
    }

    /// Plans and dispatches `change` against `registrations`. Returns the
    /// number of patches handed off.
    pub fn broadcast(&self, change: Change, registrations: &[Registration]) -> usize {
        let deliveries = Self::plan(&change, registrations);
        let count = deliveries.len();
        self.dispatch(deliveries);
        count
    }

    pub fn dispatch(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            let sink = self.sink.clone();
            let permits = self.permits.clone();
            tokio::spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                match sink.send(&delivery.target, &delivery.patch).await {
                    Ok(()) => {
                        metrics::counter!("muster_patches_delivered_total").increment(1);
                        tracing::debug!(
                            consumer = %delivery.consumer,
                            target = %delivery.target,
                            added = delivery.patch.added.len(),
                            removed = delivery.patch.removed.len(),
                            "patch delivered"
                        );
                    }
                    Err(e) => {
                        metrics::counter!("muster_patch_failures_total").increment(1);
                        tracing::warn!(
                            consumer = %delivery.consumer,
                            target = %delivery.target,
                            error = %e,
                            "patch delivery failed, dropping"
                        );
                    }
                }
            });
        }
    }
}
