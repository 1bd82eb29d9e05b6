//! Client configuration

use std::time::Duration;

/// Configuration for connecting to the pricing backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., "http://localhost:8000/api")
    pub base_url: String,

    /// Bearer token for authentication
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: 30,
        }
    }

    /// Load from environment
    ///
    /// - `RATE_API_BASE_URL` (default `http://localhost:8000`)
    /// - `RATE_API_TOKEN`
    /// - `RATE_API_TIMEOUT_SECS` (default 30)
    pub fn from_env() -> Self {
        let base_url = std::env::var("RATE_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        let token = std::env::var("RATE_API_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        let timeout = std::env::var("RATE_API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Self {
            base_url,
            token,
            timeout,
        }
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout in seconds
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8000")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("http://rates.local")
            .with_token("t0k")
            .with_timeout(5);
        assert_eq!(config.base_url, "http://rates.local");
        assert_eq!(config.token.as_deref(), Some("t0k"));
        assert_eq!(config.timeout_duration(), Duration::from_secs(5));
    }
}
