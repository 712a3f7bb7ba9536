use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::RegistryError;
use crate::patch::PatchEntry;

/// Symbolic identity of a service. Not unique across instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceName(Cow<'static, str>);

impl ServiceName {
    pub const LOGGER: ServiceName = ServiceName(Cow::Borrowed("LoggerService"));
    pub const GRADES: ServiceName = ServiceName(Cow::Borrowed("GradeService"));
    pub const PORTAL: ServiceName = ServiceName(Cow::Borrowed("Portal"));

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ServiceName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// One service instance as known to the registry.
///
/// `service_url` is the primary key: the registry never holds two
/// registrations with the same URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Registration {
    #[serde(rename = "serviceName")]
    #[schema(value_type = String)]
    pub service_name: ServiceName,

    #[serde(rename = "serviceURL")]
    pub service_url: String,

    /// Names of the services this instance depends on, in declaration order.
    #[serde(rename = "requiredServices", default)]
    #[schema(value_type = Vec<String>)]
    pub required_services: Vec<ServiceName>,

    /// Webhook receiving dependency patches.
    #[serde(rename = "serviceUpdateURL", default)]
    pub service_update_url: String,

    /// Liveness endpoint polled by the registry.
    #[serde(rename = "heartbeatURL", default)]
    pub heartbeat_url: String,
}

impl Registration {
    pub fn new(service_name: impl Into<ServiceName>, service_url: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_url: service_url.into(),
            required_services: Vec::new(),
            service_update_url: String::new(),
            heartbeat_url: String::new(),
        }
    }

    /// Declares a dependency; repeated names are kept once.
    pub fn requires(mut self, name: impl Into<ServiceName>) -> Self {
        let name = name.into();
        if !self.required_services.contains(&name) {
            self.required_services.push(name);
        }
        self
    }

    pub fn with_update_url(mut self, url: impl Into<String>) -> Self {
        self.service_update_url = url.into();
        self
    }

    pub fn with_heartbeat_url(mut self, url: impl Into<String>) -> Self {
        self.heartbeat_url = url.into();
        self
    }

    pub fn depends_on(&self, name: &ServiceName) -> bool {
        self.required_services.contains(name)
    }

    pub fn entry(&self) -> PatchEntry {
        PatchEntry::new(self.service_name.clone(), self.service_url.clone())
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.service_url.trim().is_empty() {
            return Err(RegistryError::Malformed("serviceURL must not be empty".into()));
        }
        if self.service_name.as_str().trim().is_empty() {
            return Err(RegistryError::Malformed("serviceName must not be empty".into()));
        }
        Ok(())
    }
}
