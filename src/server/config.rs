//! Server configuration

/// Default endpoint when none is given
pub const DEFAULT_ENDPOINT: &str = "tcp://127.0.0.1:5556";

/// Broadcast server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Endpoint to listen on (`scheme://host:port`)
    pub endpoint: String,

    /// Frames each subscriber may hold beyond the one being queued
    /// (0 = keep only the latest frame)
    pub high_water_mark: usize,

    /// Maximum concurrent subscribers (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            high_water_mark: 0,
            max_connections: 0, // Unlimited
            tcp_nodelay: true,  // Frames are small and latency matters
        }
    }
}

impl ServerConfig {
    /// Create a new config with a custom endpoint
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the per-subscriber high-water mark
    pub fn high_water_mark(mut self, hwm: usize) -> Self {
        self.high_water_mark = hwm;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.high_water_mark, 0);
        assert_eq!(config.max_connections, 0);
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_with_endpoint() {
        let config = ServerConfig::with_endpoint("tcp://*:7000");

        assert_eq!(config.endpoint, "tcp://*:7000");
        assert_eq!(config.high_water_mark, 0);
    }

    #[test]
    fn test_builder_chaining() {
        let config = ServerConfig::default()
            .endpoint("tcp://0.0.0.0:8080")
            .high_water_mark(3)
            .max_connections(50)
            .tcp_nodelay(false);

        assert_eq!(config.endpoint, "tcp://0.0.0.0:8080");
        assert_eq!(config.high_water_mark, 3);
        assert_eq!(config.max_connections, 50);
        assert!(!config.tcp_nodelay);
    }
}
