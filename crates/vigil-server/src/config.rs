//! HTTP server configuration.

/// Name reported by the root endpoint.
pub const DEFAULT_SERVICE_NAME: &str = "Vigil Alert Engine";

/// Configuration for the HTTP API.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Service name reported by `GET /`.
    pub service_name: String,
    /// CORS allowed origins (empty means all).
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Set the service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Add a CORS allowed origin.
    #[must_use]
    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origins.push(origin.into());
        self
    }
}
