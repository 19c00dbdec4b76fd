//! Runtime configuration
//!
//! Limits and timeouts for the hub, with environment-variable overrides
//! (`PAIRCHAT_*`). Defaults mirror the production values: a 256-frame
//! outbound queue, 2000-character message cap, 60s idle read deadline,
//! 10s write deadline and a 54s transport ping.

use std::env;
use std::time::Duration;

/// Hub configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Listener bind address
    pub bind_addr: String,
    /// Capacity of each connection's outbound frame queue
    pub outbound_queue_capacity: usize,
    /// Capacity of the hub's command queue
    pub hub_queue_capacity: usize,
    /// Maximum message content length, in characters
    pub max_message_chars: usize,
    /// Inbound read deadline; the connection is torn down if no frame
    /// (including protocol pings) arrives within this window
    pub idle_timeout: Duration,
    /// Per-write deadline on the outbound loop
    pub write_timeout: Duration,
    /// Transport-level ping interval (shorter than `idle_timeout`)
    pub ping_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            outbound_queue_capacity: 256,
            hub_queue_capacity: 256,
            max_message_chars: 2000,
            idle_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(54),
        }
    }
}

impl Config {
    /// Build a config from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env::var("PAIRCHAT_ADDR").unwrap_or(defaults.bind_addr),
            outbound_queue_capacity: env_usize(
                "PAIRCHAT_QUEUE_CAPACITY",
                defaults.outbound_queue_capacity,
            ),
            hub_queue_capacity: env_usize("PAIRCHAT_HUB_CAPACITY", defaults.hub_queue_capacity),
            max_message_chars: env_usize("PAIRCHAT_MAX_MESSAGE_CHARS", defaults.max_message_chars),
            idle_timeout: env_secs("PAIRCHAT_IDLE_TIMEOUT_SECS", defaults.idle_timeout),
            write_timeout: env_secs("PAIRCHAT_WRITE_TIMEOUT_SECS", defaults.write_timeout),
            ping_interval: env_secs("PAIRCHAT_PING_INTERVAL_SECS", defaults.ping_interval),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
