//! Client configuration from environment variables.

use std::time::Duration;

/// Items requested per history page.
pub const PAGE_SIZE: usize = 20;

/// Fixed pause between live-channel reconnect attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(2000);

const DEFAULT_API_URL: &str = "http://localhost:8081";
const DEFAULT_WS_URL: &str = "ws://localhost:8081";

/// Server endpoints, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base for HTTP requests and image paths.
    pub api_url: String,
    /// Base for the live channel.
    pub ws_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, DEFAULT_WS_URL)
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>, ws_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            ws_url: ws_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Read configuration from the environment.
    ///
    /// Environment variables:
    /// - `SNAPFEED_API_URL`: HTTP base URL (default: "http://localhost:8081")
    /// - `SNAPFEED_WS_URL`: live channel base URL (default: "ws://localhost:8081")
    pub fn from_env() -> Self {
        let api_url =
            std::env::var("SNAPFEED_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let ws_url =
            std::env::var("SNAPFEED_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string());
        Self::new(api_url, ws_url)
    }

    pub fn feed_url(&self, offset: usize, limit: usize) -> String {
        format!("{}/api/feed?offset={offset}&limit={limit}", self.api_url)
    }

    pub fn upload_url(&self) -> String {
        format!("{}/api/upload", self.api_url)
    }

    pub fn live_url(&self) -> String {
        format!("{}/ws", self.ws_url)
    }

    /// Resolve a server-relative storage path for rendering.
    pub fn image_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{path}", self.api_url)
        } else {
            format!("{}/{path}", self.api_url)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_derived_from_bases() {
        let config = ClientConfig::new("http://feed.test/", "ws://feed.test/");
        assert_eq!(
            config.feed_url(40, PAGE_SIZE),
            "http://feed.test/api/feed?offset=40&limit=20"
        );
        assert_eq!(config.upload_url(), "http://feed.test/api/upload");
        assert_eq!(config.live_url(), "ws://feed.test/ws");
    }

    #[test]
    fn image_url_resolves_relative_paths() {
        let config = ClientConfig::default();
        assert_eq!(
            config.image_url("/uploads/a.jpg"),
            "http://localhost:8081/uploads/a.jpg"
        );
        assert_eq!(
            config.image_url("uploads/a.jpg"),
            "http://localhost:8081/uploads/a.jpg"
        );
        assert_eq!(
            config.image_url("https://cdn.test/a.jpg"),
            "https://cdn.test/a.jpg"
        );
    }

    #[test]
    fn reconnect_delay_is_two_seconds() {
        assert_eq!(RECONNECT_DELAY.as_millis(), 2000);
    }
}
