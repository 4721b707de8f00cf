//! Configuration parsing for the xAPI client.
//!
//! Settings come from a single JSON file. Timing knobs default to the
//! server-documented values and rarely need overriding.
//!
//! # Example config
//!
//! ```json
//! {
//!   "url": "wss://ws.xapi.pro/demo",
//!   "user_id": "10649413",
//!   "password": "secret",
//!   "rate_limit_ms": 200,
//!   "session_timeout_secs": 600
//! }
//! ```

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

/// Client configuration, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct XapiConfig {
    /// WebSocket endpoint (e.g. `wss://ws.xapi.pro/demo`).
    pub url: String,

    /// Account id for `login`.
    pub user_id: Option<String>,

    /// Account password for `login`.
    pub password: Option<String>,

    /// Minimum spacing between consecutive command exchanges.
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Idle time after which the session is silently re-authenticated.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// How long to wait for a response frame before treating the connection
    /// as lost.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_rate_limit_ms() -> u64 {
    200
}

fn default_session_timeout_secs() -> u64 {
    600
}

fn default_request_timeout_secs() -> u64 {
    5
}

impl XapiConfig {
    /// A config pointing at `url` with all timing defaults.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user_id: None,
            password: None,
            rate_limit_ms: default_rate_limit_ms(),
            session_timeout_secs: default_session_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<XapiConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: XapiConfig = serde_json::from_str(&content)?;
    debug!("loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_applies_defaults() {
        let config: XapiConfig =
            serde_json::from_str(r#"{"url": "wss://ws.xapi.pro/demo"}"#).unwrap();
        assert_eq!(config.rate_limit(), Duration::from_millis(200));
        assert_eq!(config.session_timeout(), Duration::from_secs(600));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert!(config.user_id.is_none());
    }

    #[test]
    fn full_config_overrides_defaults() {
        let config: XapiConfig = serde_json::from_str(
            r#"{
                "url": "wss://ws.xapi.pro/real",
                "user_id": "1001",
                "password": "pw",
                "rate_limit_ms": 250,
                "session_timeout_secs": 300,
                "request_timeout_secs": 10
            }"#,
        )
        .unwrap();
        assert_eq!(config.user_id.as_deref(), Some("1001"));
        assert_eq!(config.rate_limit(), Duration::from_millis(250));
        assert_eq!(config.session_timeout(), Duration::from_secs(300));
    }
}
