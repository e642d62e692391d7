//! Client configuration.

use std::time::Duration;

/// Image compression settings.
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    /// Compress image attachments before upload.
    pub enabled: bool,
    /// Longest edge after resizing, in pixels.
    pub max_dimension: u32,
    /// JPEG quality (1-100).
    pub quality: u8,
    /// Attachments at or below this size are sent as they are.
    pub threshold: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_dimension: 1280,
            quality: 80,
            threshold: 500 * 1024,
        }
    }
}

/// Portal client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Portal base URL, without a trailing slash.
    pub base_url: String,
    /// Overall budget for one submission, compression included.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
    /// Size of each streamed upload chunk.
    pub chunk_size: usize,
    /// Image compression.
    pub compression: CompressionConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout: Duration::from_secs(90),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("osis-client/{}", env!("CARGO_PKG_VERSION")),
            chunk_size: 64 * 1024,
            compression: CompressionConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Absolute URL for an API path.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the portal base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the overall submission timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the upload chunk size.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size.max(1);
        self
    }

    /// Set the compression settings.
    pub fn compression(mut self, compression: CompressionConfig) -> Self {
        self.config.compression = compression;
        self
    }

    /// Turn image compression off.
    pub fn no_compression(mut self) -> Self {
        self.config.compression.enabled = false;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
