/// Failures the registry reports synchronously to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("service at {0} is already registered")]
    AlreadyExists(String),

    #[error("no service registered at {0}")]
    NotFound(String),

    #[error("malformed request: {0}")]
    Malformed(String),
}
