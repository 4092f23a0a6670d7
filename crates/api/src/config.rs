//! Server configuration, read once from the environment at startup.

use std::net::SocketAddr;

pub const BIND_ADDR_VAR: &str = "WAREFLOW_BIND_ADDR";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable values fall back
    /// to the default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(BIND_ADDR_VAR) {
            match raw.trim().parse::<SocketAddr>() {
                Ok(addr) => config.bind_addr = addr,
                Err(e) => tracing::warn!(
                    value = %raw,
                    error = %e,
                    "{BIND_ADDR_VAR} is not a socket address; using {DEFAULT_BIND_ADDR}"
                ),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = ApiConfig::from_lookup(|_| None);
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
    }

    #[test]
    fn reads_bind_addr() {
        let config = ApiConfig::from_lookup(|k| (k == BIND_ADDR_VAR).then(|| "127.0.0.1:9090".to_string()));
        assert_eq!(config.bind_addr.port(), 9090);
    }

    #[test]
    fn invalid_bind_addr_falls_back() {
        let config = ApiConfig::from_lookup(|_| Some("not-an-addr".to_string()));
        assert_eq!(config, ApiConfig::default());
    }
}
