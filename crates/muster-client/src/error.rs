use muster_core::ServiceName;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("registry request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("registry responded with {status}: {message}")]
    Rejected {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("no provider known for {0}")]
    NoProvider(ServiceName),

    #[error("service I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
