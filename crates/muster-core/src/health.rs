use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome of one probe round against an instance's heartbeat endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}
