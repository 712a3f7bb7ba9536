#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use muster_core::Patch;
use muster_registry::{PatchNotifier, PatchSink, RegistrationStore, TransportError};
use muster_server::{AppState, router};
use tower::ServiceExt;

#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(String, Patch)>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<(String, Patch)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PatchSink for RecordingSink {
    async fn send(&self, url: &str, patch: &Patch) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push((url.to_string(), patch.clone()));
        Ok(())
    }
}

pub fn app() -> (Router, Arc<RegistrationStore>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let notifier = Arc::new(PatchNotifier::new(sink.clone(), 16));
    let store = Arc::new(RegistrationStore::new(notifier));
    (router(AppState { store: store.clone() }), store, sink)
}

pub async fn send(router: Router, method: Method, uri: &str, body: impl Into<Body>) -> (StatusCode, String) {
    let response = router
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
