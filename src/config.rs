//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::time::Duration;

use crate::bus::BusTopology;
use crate::error::RelayError;

/// Which message bus adapter the broker consumes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusBackend {
    /// In-process exchange; only producers in the same process can publish.
    /// Refused by the standalone broker, which hosts no producer.
    Memory,
    /// Redis lists acting as durable queues.
    Redis,
}

impl std::str::FromStr for BusBackend {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(RelayError::Config(format!("unknown bus backend: {other}"))),
        }
    }
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// Route the WebSocket endpoint is mounted on.
    pub ws_path: String,

    /// Bus adapter selection.
    pub bus_backend: BusBackend,

    /// Redis connection string, used when `bus_backend` is `Redis`.
    pub redis_url: String,

    /// Exchange, routing key and queue names.
    pub topology: BusTopology,

    /// Delay between the first ping of a window and its batched pong.
    pub pong_delay: Duration,

    /// Per-connection outbound frame buffer.
    pub outbound_channel_capacity: usize,

    /// Blocking-pop timeout used by the Redis consumer.
    pub bus_poll_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            ws_path: "/workflowmanager".to_string(),
            bus_backend: BusBackend::Redis,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            topology: BusTopology::default(),
            pong_delay: Duration::from_secs(10),
            outbound_channel_capacity: 256,
            bus_poll_timeout_secs: 1,
        }
    }
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if `LISTEN_ADDR` cannot be parsed as a
    /// [`SocketAddr`], `WS_PATH` is not an absolute route, or `BUS_BACKEND`
    /// names an unknown adapter.
    pub fn from_env() -> Result<Self, RelayError> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e| RelayError::Config(format!("LISTEN_ADDR: {e}")))?;

        let ws_path = std::env::var("WS_PATH").unwrap_or_else(|_| "/workflowmanager".to_string());
        if !ws_path.starts_with('/') {
            return Err(RelayError::Config(format!(
                "WS_PATH must start with '/': {ws_path:?}"
            )));
        }

        let bus_backend = std::env::var("BUS_BACKEND")
            .unwrap_or_else(|_| "redis".to_string())
            .parse()?;

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let defaults = BusTopology::default();
        let topology = BusTopology {
            exchange: env_or("BUS_EXCHANGE", defaults.exchange),
            routing_key: env_or("BUS_ROUTING_KEY", defaults.routing_key),
            register_queue: env_or("BUS_REGISTER_QUEUE", defaults.register_queue),
            notify_queue: env_or("BUS_NOTIFY_QUEUE", defaults.notify_queue),
        };

        let pong_delay = Duration::from_millis(parse_env("PONG_DELAY_MS", 10_000));
        let outbound_channel_capacity = parse_env("OUTBOUND_CHANNEL_CAPACITY", 256).max(1);
        let bus_poll_timeout_secs = parse_env("BUS_POLL_TIMEOUT_SECS", 1).max(1);

        Ok(Self {
            listen_addr,
            ws_path,
            bus_backend,
            redis_url,
            topology,
            pong_delay,
            outbound_channel_capacity,
            bus_poll_timeout_secs,
        })
    }

    /// Checks that the configured bus can carry traffic from producers in
    /// other processes.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] for [`BusBackend::Memory`]: a
    /// standalone broker consuming an in-process bus would never receive
    /// anything.
    pub fn ensure_external_bus(&self) -> Result<(), RelayError> {
        match self.bus_backend {
            BusBackend::Redis => Ok(()),
            BusBackend::Memory => Err(RelayError::Config(
                "BUS_BACKEND=memory has no producers in a standalone broker; use redis".to_string(),
            )),
        }
    }
}

/// Returns the variable's value, or `default` when unset.
fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_backend_parses_case_insensitively() {
        assert_eq!("Redis".parse::<BusBackend>().ok(), Some(BusBackend::Redis));
        assert_eq!("memory".parse::<BusBackend>().ok(), Some(BusBackend::Memory));
        assert!("rabbit".parse::<BusBackend>().is_err());
    }

    #[test]
    fn default_backend_is_redis() {
        let config = RelayConfig::default();
        assert_eq!(config.bus_backend, BusBackend::Redis);
        assert!(config.ensure_external_bus().is_ok());
    }

    #[test]
    fn standalone_broker_refuses_memory_bus() {
        let config = RelayConfig {
            bus_backend: BusBackend::Memory,
            ..RelayConfig::default()
        };
        assert!(matches!(
            config.ensure_external_bus(),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn parse_env_falls_back_on_missing_key() {
        let value: u64 = parse_env("MUTATION_RELAY_TEST_SURELY_UNSET", 42);
        assert_eq!(value, 42);
    }
}
