#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use muster_core::{Patch, Registration, ServiceName};
use muster_registry::{
    HealthProbe, HeartbeatMonitor, HeartbeatSettings, PatchNotifier, PatchSink, RegistrationStore,
    TransportError,
};
use reqwest::StatusCode;

/// Records every patch instead of sending it.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(String, Patch)>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<(String, Patch)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, url: &str) -> Vec<Patch> {
        self.sent()
            .into_iter()
            .filter(|(target, _)| target == url)
            .map(|(_, patch)| patch)
            .collect()
    }

    /// Waits until at least `n` patches were recorded, then lets stragglers land.
    pub async fn wait_for(&self, n: usize) -> Vec<(String, Patch)> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while self.sent.lock().unwrap().len() < n && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        settle().await;
        self.sent()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl PatchSink for RecordingSink {
    async fn send(&self, url: &str, patch: &Patch) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push((url.to_string(), patch.clone()));
        Ok(())
    }
}

/// Answers probes from a per-URL script; unscripted probes succeed.
#[derive(Default)]
pub struct ScriptedProbe {
    script: Mutex<HashMap<String, VecDeque<bool>>>,
    down: Mutex<HashMap<String, bool>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedProbe {
    pub fn set_down(&self, url: &str, down: bool) {
        self.down.lock().unwrap().insert(url.to_string(), down);
    }

    pub fn push(&self, url: &str, outcomes: &[bool]) {
        self.script
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .extend(outcomes.iter().copied());
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn probe(&self, url: &str) -> Result<(), TransportError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        let scripted = self
            .script
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front);
        let healthy = scripted.unwrap_or_else(|| !self.down.lock().unwrap().get(url).copied().unwrap_or(false));
        if healthy {
            Ok(())
        } else {
            Err(TransportError::Status(StatusCode::SERVICE_UNAVAILABLE))
        }
    }
}

pub fn store_with(sink: Arc<RecordingSink>) -> Arc<RegistrationStore> {
    let notifier = Arc::new(PatchNotifier::new(sink, 16));
    Arc::new(RegistrationStore::new(notifier))
}

pub fn settings() -> HeartbeatSettings {
    HeartbeatSettings {
        interval: Duration::from_millis(20),
        attempts: 3,
        retry_delay: Duration::from_millis(1),
        eviction_retention: Duration::from_secs(60),
    }
}

pub fn monitor(store: Arc<RegistrationStore>, probe: Arc<ScriptedProbe>) -> HeartbeatMonitor {
    HeartbeatMonitor::new(store, probe, settings())
}

pub fn logger(url: &str) -> Registration {
    Registration::new(ServiceName::LOGGER, url).with_heartbeat_url(format!("{url}/heartbeat"))
}

pub fn grader(url: &str) -> Registration {
    Registration::new(ServiceName::GRADES, url)
        .requires(ServiceName::LOGGER)
        .with_update_url(format!("{url}/services"))
        .with_heartbeat_url(format!("{url}/heartbeat"))
}

/// Gives spawned delivery tasks a chance to run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
