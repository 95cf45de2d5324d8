//! Dashboard configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Dashboard server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Enable dashboard server.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Address to bind.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Interval in milliseconds between queue drains.
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    /// Maximum concurrent WebSocket connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Event queue capacity.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_enabled() -> bool {
    false
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_update_interval_ms() -> u64 {
    250
}

fn default_max_connections() -> usize {
    10
}

fn default_queue_capacity() -> usize {
    crate::queue::DEFAULT_QUEUE_CAPACITY
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            bind_address: default_bind_address(),
            port: default_port(),
            update_interval_ms: default_update_interval_ms(),
            max_connections: default_max_connections(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl DashboardConfig {
    /// `host:port` to bind.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Queue drain period, never zero.
    #[must_use]
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_bind_loopback() {
        let config = DashboardConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.address(), "127.0.0.1:8080");
        assert_eq!(config.update_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config: DashboardConfig = serde_json::from_str(r#"{"update_interval_ms": 0}"#).unwrap();
        assert_eq!(config.update_interval(), Duration::from_millis(1));
        assert_eq!(config.queue_capacity, crate::queue::DEFAULT_QUEUE_CAPACITY);
    }
}
