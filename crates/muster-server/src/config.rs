use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use muster_registry::HeartbeatSettings;

#[derive(Debug, Clone, Parser)]
#[command(name = "muster-server")]
#[command(about = "Service registry with heartbeat-driven eviction", long_about = None)]
pub struct Config {
    /// Address the `/services` endpoint listens on
    #[arg(long, env = "MUSTER_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Pause between heartbeat ticks
    #[arg(long, env = "MUSTER_HEARTBEAT_INTERVAL_SECS", default_value_t = 10)]
    pub heartbeat_interval_secs: u64,

    /// Failed probes in one tick before an instance is evicted
    #[arg(long, env = "MUSTER_PROBE_ATTEMPTS", default_value_t = 3)]
    pub probe_attempts: u32,

    #[arg(long, env = "MUSTER_PROBE_RETRY_DELAY_MS", default_value_t = 1000)]
    pub probe_retry_delay_ms: u64,

    #[arg(long, env = "MUSTER_PROBE_TIMEOUT_MS", default_value_t = 2000)]
    pub probe_timeout_ms: u64,

    /// How long an evicted instance is probed for recovery before it is forgotten
    #[arg(long, env = "MUSTER_EVICTION_RETENTION_SECS", default_value_t = 600)]
    pub eviction_retention_secs: u64,

    /// Timeout for one patch delivery
    #[arg(long, env = "MUSTER_NOTIFY_TIMEOUT_MS", default_value_t = 5000)]
    pub notify_timeout_ms: u64,

    /// Patch deliveries allowed in flight at once
    #[arg(long, env = "MUSTER_MAX_IN_FLIGHT_PATCHES", default_value_t = 64)]
    pub max_in_flight_patches: usize,
}

impl Config {
    pub fn heartbeat_settings(&self) -> HeartbeatSettings {
        HeartbeatSettings {
            interval: Duration::from_secs(self.heartbeat_interval_secs),
            attempts: self.probe_attempts,
            retry_delay: Duration::from_millis(self.probe_retry_delay_ms),
            eviction_retention: Duration::from_secs(self.eviction_retention_secs),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }
}
