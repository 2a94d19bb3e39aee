//! Runtime configuration.

use crate::error::ConfigError;
use crate::gateway::GatewayVersion;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// How the process receives HTTP traffic. Fixed for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Bind a socket and serve HTTP directly.
    StandaloneServer,
    /// Handle API Gateway V1 invocation events.
    GatewayV1,
    /// Handle API Gateway V2 invocation events.
    GatewayV2,
}

impl OperatingMode {
    /// Envelope version for the handler modes.
    pub fn gateway_version(&self) -> Option<GatewayVersion> {
        match self {
            OperatingMode::StandaloneServer => None,
            OperatingMode::GatewayV1 => Some(GatewayVersion::V1),
            OperatingMode::GatewayV2 => Some(GatewayVersion::V2),
        }
    }
}

impl Default for OperatingMode {
    fn default() -> Self {
        OperatingMode::GatewayV2
    }
}

impl FromStr for OperatingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "server" | "standalone" | "standalone_server" => Ok(OperatingMode::StandaloneServer),
            "v1" | "apigateway" | "gateway_v1" => Ok(OperatingMode::GatewayV1),
            "v2" | "apigatewayv2" | "gateway_v2" => Ok(OperatingMode::GatewayV2),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

/// Configuration for the bridge runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub mode: OperatingMode,
    /// Host address to bind to in standalone mode.
    pub host: String,
    /// Port to listen on in standalone mode.
    pub port: u16,
    /// Maximum request body size in bytes (standalone mode).
    pub max_body_size: usize,
    /// `host:port` of the invocation platform's runtime API.
    pub runtime_api: Option<String>,
    /// Environment copied into the application.
    pub env: HashMap<String, String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mode: OperatingMode::default(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            env: HashMap::new(),
            max_body_size: 6 * 1024 * 1024, // 6MB, the synchronous invocation payload limit
            runtime_api: None,
        }
    }
}

impl RuntimeConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from the process environment.
    ///
    /// `HOST_LAMBDA=1` forces standalone mode; otherwise `BRIDGE_MODE` picks
    /// the mode and defaults to API Gateway V2.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if lookup("HOST_LAMBDA").as_deref() == Some("1") {
            config.mode = OperatingMode::StandaloneServer;
        } else if let Some(mode) = lookup("BRIDGE_MODE") {
            config.mode = mode.parse()?;
        }

        if let Some(host) = lookup("BRIDGE_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("BRIDGE_PORT").or_else(|| lookup("PORT")) {
            config.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        }
        config.runtime_api = lookup("AWS_LAMBDA_RUNTIME_API");

        Ok(config)
    }

    pub fn mode(mut self, mode: OperatingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the host address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub fn runtime_api(mut self, addr: impl Into<String>) -> Self {
        self.runtime_api = Some(addr.into());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_defaults_to_gateway_v2() {
        let config = RuntimeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.mode, OperatingMode::GatewayV2);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert!(config.runtime_api.is_none());
    }

    #[test]
    fn test_host_lambda_forces_standalone() {
        let config =
            RuntimeConfig::from_lookup(lookup(&[("HOST_LAMBDA", "1"), ("BRIDGE_MODE", "v1")]))
                .unwrap();
        assert_eq!(config.mode, OperatingMode::StandaloneServer);
        assert_eq!(config.mode.gateway_version(), None);
    }

    #[test]
    fn test_mode_and_port_from_env() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("BRIDGE_MODE", "ApiGateway"),
            ("PORT", "9000"),
            ("AWS_LAMBDA_RUNTIME_API", "127.0.0.1:9001"),
        ]))
        .unwrap();
        assert_eq!(config.mode, OperatingMode::GatewayV1);
        assert_eq!(config.mode.gateway_version(), Some(GatewayVersion::V1));
        assert_eq!(config.port, 9000);
        assert_eq!(config.runtime_api.as_deref(), Some("127.0.0.1:9001"));
    }

    #[test]
    fn test_invalid_values() {
        let err = RuntimeConfig::from_lookup(lookup(&[("BRIDGE_MODE", "grpc")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidMode("grpc".into()));

        let err = RuntimeConfig::from_lookup(lookup(&[("BRIDGE_PORT", "http")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidPort("http".into()));
    }

    #[test]
    fn test_builder() {
        let config = RuntimeConfig::new()
            .mode(OperatingMode::StandaloneServer)
            .host("127.0.0.1")
            .port(0)
            .env("STAGE", "dev");
        assert_eq!(config.bind_addr(), "127.0.0.1:0");
        assert_eq!(config.env.get("STAGE").map(String::as_str), Some("dev"));
    }
}
