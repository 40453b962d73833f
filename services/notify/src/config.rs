use std::time::Duration;

use crate::registry::DEFAULT_STREAM_BUFFER;
use crate::relay::RelayConfig;

/// Notify service configuration loaded from environment variables.
#[derive(Debug)]
pub struct NotifyConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port to listen on (default 3120). Env var: `NOTIFY_PORT`.
    pub notify_port: u16,
    /// Relay tick interval in ms (default 2000). Env var: `OUTBOX_POLL_INTERVAL_MS`.
    pub poll_interval_ms: u64,
    /// Max outbox entries per tick (default 10). Env var: `OUTBOX_BATCH_SIZE`.
    pub batch_size: u64,
    /// Per-stream channel capacity (default 16). Env var: `STREAM_BUFFER`.
    pub stream_buffer: usize,
    /// How long shutdown waits for open connections (default 15). Env var: `SHUTDOWN_GRACE_SECS`.
    pub shutdown_grace_secs: u64,
}

impl NotifyConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            notify_port: env_or("NOTIFY_PORT", 3120),
            poll_interval_ms: env_or("OUTBOX_POLL_INTERVAL_MS", 2000),
            batch_size: env_or("OUTBOX_BATCH_SIZE", 10),
            stream_buffer: env_or("STREAM_BUFFER", DEFAULT_STREAM_BUFFER),
            shutdown_grace_secs: env_or("SHUTDOWN_GRACE_SECS", 15),
        }
    }

    pub fn relay(&self) -> RelayConfig {
        RelayConfig {
            // A zero period would make the ticker panic.
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            batch_size: self.batch_size.max(1),
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
