mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{RecordingSink, ScriptedProbe, grader, logger, monitor, settings, store_with};
use muster_core::{Patch, PatchEntry, Registration, RegistryError, ServiceName};
use muster_registry::{HeartbeatMonitor, HeartbeatSettings};

#[tokio::test]
async fn healthy_registrations_are_left_alone() {
    let sink = Arc::new(RecordingSink::default());
    let store = store_with(sink.clone());
    let probe = Arc::new(ScriptedProbe::default());
    store.add(logger("http://l")).await.unwrap();
    let monitor = monitor(store.clone(), probe.clone());

    let report = monitor.tick().await;

    assert!(report.is_quiet());
    assert_eq!(probe.calls("http://l/heartbeat"), 1);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn two_failures_then_success_is_still_healthy() {
    let store = store_with(Arc::new(RecordingSink::default()));
    let probe = Arc::new(ScriptedProbe::default());
    probe.push("http://l/heartbeat", &[false, false, true]);
    store.add(logger("http://l")).await.unwrap();
    let monitor = monitor(store.clone(), probe.clone());

    let report = monitor.tick().await;

    assert!(report.is_quiet());
    assert_eq!(probe.calls("http://l/heartbeat"), 3);
    assert!(store.get("http://l").await.is_some());
}

#[tokio::test]
async fn three_failures_evict_and_notify_once() {
    let sink = Arc::new(RecordingSink::default());
    let store = store_with(sink.clone());
    let probe = Arc::new(ScriptedProbe::default());
    store.add(logger("http://l")).await.unwrap();
    store.add(grader("http://g")).await.unwrap();
    sink.wait_for(1).await;
    sink.clear();
    let monitor = monitor(store.clone(), probe.clone());

    probe.set_down("http://l/heartbeat", true);
    let report = monitor.tick().await;

    assert_eq!(report.evicted, vec!["http://l".to_string()]);
    assert_eq!(probe.calls("http://l/heartbeat"), 3);
    assert!(store.get("http://l").await.is_none());
    assert!(store.is_evicted("http://l").await);
    sink.wait_for(1).await;
    assert_eq!(
        sink.sent_to("http://g/services"),
        vec![Patch::removed(vec![PatchEntry::new(ServiceName::LOGGER, "http://l")])]
    );

    // Still down: no second eviction, no second patch.
    let report = monitor.tick().await;
    assert!(report.is_quiet());
    common::settle().await;
    assert_eq!(sink.sent_to("http://g/services").len(), 1);
}

#[tokio::test]
async fn single_success_restores_evicted_registration() {
    let sink = Arc::new(RecordingSink::default());
    let store = store_with(sink.clone());
    let probe = Arc::new(ScriptedProbe::default());
    store.add(logger("http://l")).await.unwrap();
    store.add(grader("http://g")).await.unwrap();
    let monitor = monitor(store.clone(), probe.clone());
    probe.set_down("http://l/heartbeat", true);
    monitor.tick().await;
    sink.wait_for(2).await;
    sink.clear();

    probe.set_down("http://l/heartbeat", false);
    let report = monitor.tick().await;

    assert_eq!(report.restored, vec!["http://l".to_string()]);
    assert!(!store.is_evicted("http://l").await);
    assert_eq!(
        store.snapshot().await.iter().filter(|r| r.service_url == "http://l").count(),
        1
    );
    sink.wait_for(1).await;
    assert_eq!(
        sink.sent_to("http://g/services"),
        vec![Patch::added(vec![PatchEntry::new(ServiceName::LOGGER, "http://l")])]
    );
}

#[tokio::test]
async fn explicit_reregistration_clears_eviction_without_duplicating() {
    let store = store_with(Arc::new(RecordingSink::default()));
    let probe = Arc::new(ScriptedProbe::default());
    store.add(logger("http://l")).await.unwrap();
    let monitor = monitor(store.clone(), probe.clone());
    probe.set_down("http://l/heartbeat", true);
    monitor.tick().await;

    probe.set_down("http://l/heartbeat", false);
    store.add(logger("http://l")).await.unwrap();
    let report = monitor.tick().await;

    assert!(report.restored.is_empty());
    assert!(!store.is_evicted("http://l").await);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn registrations_without_heartbeat_url_are_not_probed() {
    let store = store_with(Arc::new(RecordingSink::default()));
    let probe = Arc::new(ScriptedProbe::default());
    store.add(Registration::new(ServiceName::PORTAL, "http://p")).await.unwrap();
    let monitor = monitor(store.clone(), probe.clone());

    let report = monitor.tick().await;

    assert!(report.is_quiet());
    assert_eq!(probe.calls(""), 0);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn one_failing_instance_does_not_affect_others() {
    let store = store_with(Arc::new(RecordingSink::default()));
    let probe = Arc::new(ScriptedProbe::default());
    store.add(logger("http://l1")).await.unwrap();
    store.add(logger("http://l2")).await.unwrap();
    probe.set_down("http://l1/heartbeat", true);
    let monitor = monitor(store.clone(), probe.clone());

    let report = monitor.tick().await;

    assert_eq!(report.evicted, vec!["http://l1".to_string()]);
    assert!(store.get("http://l2").await.is_some());
}

#[tokio::test]
async fn started_loop_evicts_in_background() {
    let store = store_with(Arc::new(RecordingSink::default()));
    let probe = Arc::new(ScriptedProbe::default());
    store.add(logger("http://l")).await.unwrap();
    probe.set_down("http://l/heartbeat", true);

    let handle = monitor(store.clone(), probe.clone()).start();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !store.is_empty().await && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handle.abort();
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn deregistered_evicted_instance_is_not_restored() {
    let sink = Arc::new(RecordingSink::default());
    let store = store_with(sink.clone());
    let probe = Arc::new(ScriptedProbe::default());
    store.add(logger("http://l")).await.unwrap();
    store.add(grader("http://g")).await.unwrap();
    let monitor = monitor(store.clone(), probe.clone());
    probe.set_down("http://l/heartbeat", true);
    monitor.tick().await;
    sink.wait_for(2).await;
    sink.clear();

    let err = store.remove("http://l").await.unwrap_err();
    assert_eq!(err, RegistryError::NotFound("http://l".into()));
    assert!(!store.is_evicted("http://l").await);

    probe.set_down("http://l/heartbeat", false);
    let report = monitor.tick().await;

    assert!(report.restored.is_empty());
    assert!(store.get("http://l").await.is_none());
    assert_eq!(probe.calls("http://l/heartbeat"), 3);
    common::settle().await;
    assert!(sink.sent_to("http://g/services").is_empty());
}

#[tokio::test]
async fn evictions_expire_after_retention() {
    let store = store_with(Arc::new(RecordingSink::default()));
    let probe = Arc::new(ScriptedProbe::default());
    store.add(logger("http://l")).await.unwrap();
    probe.set_down("http://l/heartbeat", true);
    let monitor = HeartbeatMonitor::new(
        store.clone(),
        probe.clone(),
        HeartbeatSettings {
            eviction_retention: Duration::ZERO,
            ..settings()
        },
    );
    monitor.tick().await;
    assert!(store.is_evicted("http://l").await);

    let report = monitor.tick().await;

    assert_eq!(report.expired, vec!["http://l".to_string()]);
    assert!(!store.is_evicted("http://l").await);
    assert_eq!(probe.calls("http://l/heartbeat"), 3);

    probe.set_down("http://l/heartbeat", false);
    let report = monitor.tick().await;
    assert!(report.restored.is_empty());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn tick_probes_registrations_concurrently() {
    let store = store_with(Arc::new(RecordingSink::default()));
    let probe = Arc::new(ScriptedProbe::default());
    for i in 0..6 {
        let url = format!("http://l{i}");
        store.add(logger(&url)).await.unwrap();
        probe.set_down(&format!("{url}/heartbeat"), true);
    }
    let retry_delay = Duration::from_millis(150);
    let monitor = HeartbeatMonitor::new(
        store.clone(),
        probe.clone(),
        HeartbeatSettings {
            retry_delay,
            ..settings()
        },
    );

    let started = tokio::time::Instant::now();
    let report = monitor.tick().await;
    let elapsed = started.elapsed();

    assert_eq!(report.evicted.len(), 6);
    // One registration costs two retry delays; six in sequence would cost twelve.
    assert!(elapsed >= retry_delay * 2, "tick finished too early: {elapsed:?}");
    assert!(elapsed < retry_delay * 5, "probes ran in sequence: {elapsed:?}");
}
