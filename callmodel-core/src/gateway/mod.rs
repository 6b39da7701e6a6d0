//! # HTTP Gateway
//!
//! Exposes the action handler over HTTP so an orchestrating agent (or the
//! interactive front end) can post action events and receive reply envelopes.

mod server;

pub use server::{SharedDispatcher, router as gateway_router, run as run_gateway, shared};

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

impl GatewayConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_config_default() {
        let config = GatewayConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8787);
        assert_eq!(config.bind_addr(), "127.0.0.1:8787");
    }

    #[test]
    fn test_gateway_config_serialization() {
        let config = GatewayConfig {
            host: "0.0.0.0".into(),
            port: 9090,
        };
        let json = serde_json::to_string(&config).unwrap();
        let restored: GatewayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.host, "0.0.0.0");
        assert_eq!(restored.port, 9090);
    }
}
