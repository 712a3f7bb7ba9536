pub mod registration;
pub mod patch;
pub mod health;
pub mod errors;

pub use registration::{Registration, ServiceName};
pub use patch::{Patch, PatchEntry};
pub use health::HealthStatus;
pub use errors::RegistryError;

/// Well-known port the registry listens on.
pub const REGISTRY_PORT: u16 = 3000;

/// Path of the register/deregister resource on the registry.
pub const SERVICES_PATH: &str = "/services";

/// Default address of the registry's `/services` resource.
pub const DEFAULT_SERVICES_URL: &str = "http://localhost:3000/services";
