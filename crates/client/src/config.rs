use pong_sync_net::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};
use tracing::warn;
use url::Url;

/// Default location of the client configuration.
pub const DEFAULT_CONFIG_PATH: &str = "config/client.toml";

/// Endpoints and timing, read from `config/client.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the session HTTP endpoints.
    pub http_base: String,
    /// Base URL of the real-time endpoint.
    pub ws_base: String,
    /// Readiness checks before a connection attempt gives up.
    pub connect_attempts: u32,
    /// Delay between readiness checks.
    pub connect_interval_ms: u64,
    /// Heartbeat period; also the snapshot age that suppresses a heartbeat.
    pub heartbeat_interval_ms: u64,
    /// Delay before a local session starts running.
    pub local_setup_delay_ms: u64,
    /// Timeout of one session request.
    pub request_timeout_ms: u64,
    /// Target frame duration of the driver loop (60 Hz by default).
    pub frame_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            http_base: "http://localhost:8080".to_string(),
            ws_base: "ws://localhost:8080".to_string(),
            connect_attempts: 10,
            connect_interval_ms: 100,
            heartbeat_interval_ms: 1000,
            local_setup_delay_ms: 2000,
            request_timeout_ms: 5000,
            frame_interval_ms: 16,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ClientConfig>(&contents) {
                Ok(cfg) => cfg.validated(),
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    ClientConfig::default()
                }
            },
            Err(err) => {
                if path != Path::new(DEFAULT_CONFIG_PATH)
                    || err.kind() != std::io::ErrorKind::NotFound
                {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else {
                    warn!(
                        "Client config not found at {}. Using defaults",
                        path.display()
                    );
                }
                ClientConfig::default()
            }
        }
    }

    /// Replace zero periods with their defaults; tokio intervals reject zero.
    pub fn validated(mut self) -> Self {
        let defaults = ClientConfig::default();
        if self.heartbeat_interval_ms == 0 {
            warn!(
                "heartbeat_interval_ms must be positive, using {}",
                defaults.heartbeat_interval_ms
            );
            self.heartbeat_interval_ms = defaults.heartbeat_interval_ms;
        }
        if self.frame_interval_ms == 0 {
            warn!(
                "frame_interval_ms must be positive, using {}",
                defaults.frame_interval_ms
            );
            self.frame_interval_ms = defaults.frame_interval_ms;
        }
        self
    }

    /// Parsed HTTP base URL.
    pub fn http_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.http_base)
    }

    /// Parsed real-time base URL.
    pub fn ws_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.ws_base)
    }

    /// Readiness polling for new channels.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.connect_attempts,
            Duration::from_millis(self.connect_interval_ms),
        )
    }

    /// Heartbeat period.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Local session setup delay.
    pub fn local_setup_delay(&self) -> Duration {
        Duration::from_millis(self.local_setup_delay_ms)
    }

    /// Session request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Driver frame period.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}
