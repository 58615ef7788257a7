//! Client Configuration
//!
//! Per-instance options passed to the client at construction time. There is
//! no file or environment loading here: every knob travels with the client
//! object so multiple credentials can coexist in one process.

use std::time::Duration;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.battlemetrics.com";

/// Options controlling one client instance.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL for the API. Override to point at a mock or proxy.
    pub base_url: String,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Fallback pacing delay applied when the server signals exhaustion
    /// without a usable reset header.
    pub default_wait: Duration,

    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            default_wait: Duration::from_secs(60),
            user_agent: format!(
                "battlemetrics-rs/{} (+{})",
                env!("CARGO_PKG_VERSION"),
                env!("CARGO_PKG_REPOSITORY"),
            ),
        }
    }
}

impl ClientOptions {
    /// Create options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let url: String = base_url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the fallback pacing delay.
    pub fn with_default_wait(mut self, default_wait: Duration) -> Self {
        self.default_wait = default_wait;
        self
    }

    /// Override the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.base_url, DEFAULT_BASE_URL);
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.default_wait, Duration::from_secs(60));
        assert!(options.user_agent.starts_with("battlemetrics-rs/"));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let options = ClientOptions::new().with_base_url("http://localhost:8080/");
        assert_eq!(options.base_url, "http://localhost:8080");
    }
}
