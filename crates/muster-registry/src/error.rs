/// Outbound call failures. Never surfaced to registry callers, only logged.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("peer responded with {0}")]
    Status(reqwest::StatusCode),
}
