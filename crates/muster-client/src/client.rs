use muster_core::{DEFAULT_SERVICES_URL, Registration};
use reqwest::{Client, Response};

use crate::error::ClientError;

/// Talks to the registry's `/services` resource.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: Client,
    services_url: String,
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICES_URL)
    }
}

impl RegistryClient {
    pub fn new(services_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            services_url: services_url.into(),
        }
    }

    pub fn services_url(&self) -> &str {
        &self.services_url
    }

    pub async fn register(&self, registration: &Registration) -> Result<(), ClientError> {
        let res = self
            .http
            .post(&self.services_url)
            .json(registration)
            .send()
            .await?;
        check(res).await?;
        tracing::info!(
            service = %registration.service_name,
            url = %registration.service_url,
            "registered with registry"
        );
        Ok(())
    }

    /// The body is the raw `serviceURL`, not JSON.
    pub async fn deregister(&self, service_url: &str) -> Result<(), ClientError> {
        let res = self
            .http
            .delete(&self.services_url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(service_url.to_string())
            .send()
            .await?;
        check(res).await?;
        tracing::info!(url = %service_url, "deregistered from registry");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Registration>, ClientError> {
        let res = self.http.get(&self.services_url).send().await?;
        Ok(check(res).await?.json().await?)
    }
}

async fn check(res: Response) -> Result<Response, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let message = res.text().await.unwrap_or_default();
    Err(ClientError::Rejected { status, message })
}
