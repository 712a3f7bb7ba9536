use std::time::Duration;

use async_trait::async_trait;
use muster_core::Patch;
use reqwest::{Client, StatusCode};

use crate::error::TransportError;

/// Delivers a patch to a consumer's update URL.
#[async_trait]
pub trait PatchSink: Send + Sync {
    async fn send(&self, url: &str, patch: &Patch) -> Result<(), TransportError>;
}

/// Performs a single liveness probe.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<(), TransportError>;
}

pub struct HttpPatchSink {
    client: Client,
}

impl HttpPatchSink {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PatchSink for HttpPatchSink {
    async fn send(&self, url: &str, patch: &Patch) -> Result<(), TransportError> {
        let res = self.client.post(url).json(patch).send().await?;
        if res.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Status(res.status()))
        }
    }
}

pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self, url: &str) -> Result<(), TransportError> {
        let res = self.client.get(url).send().await?;
        // Only a plain 200 counts as alive.
        if res.status() == StatusCode::OK {
            Ok(())
        } else {
            Err(TransportError::Status(res.status()))
        }
    }
}
