use std::time::Duration;
use crate::connection::SessionConfig;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Disable Nagle on the dialed socket
    pub tcp_nodelay: bool,

    /// Per-connection protocol settings
    pub session: SessionConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            connect_timeout: Duration::from_secs(10),
            tcp_nodelay: true,
            session: SessionConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(Error::config("Connect timeout must be non-zero"));
        }

        self.session.validate()
    }
}

/// Builder for ClientConfig
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create new builder
    pub fn new() -> Self {
        ClientConfigBuilder {
            config: ClientConfig::default(),
        }
    }

    /// Set connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.config.tcp_nodelay = enabled;
        self
    }

    /// Set the chunk size announced after connect
    pub fn chunk_size(mut self, size: u32) -> Self {
        self.config.session.chunk_size = size;
        self
    }

    /// Set the buffer length sent with SetBufferLength before play
    pub fn buffer_length(mut self, ms: u32) -> Self {
        self.config.session.buffer_length_ms = ms;
        self
    }

    pub fn flash_version(mut self, version: impl Into<String>) -> Self {
        self.config.session.flash_version = version.into();
        self
    }

    /// Use the plain (non-digest) handshake
    pub fn digest_handshake(mut self, enabled: bool) -> Self {
        self.config.session.digest_handshake = enabled;
        self
    }

    pub fn max_probe_messages(mut self, count: usize) -> Self {
        self.config.session.max_probe_messages = count;
        self
    }

    /// Build configuration
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.tcp_nodelay);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::builder()
            .connect_timeout(Duration::from_secs(3))
            .chunk_size(60000)
            .buffer_length(500)
            .digest_handshake(false)
            .build()
            .unwrap();

        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.session.chunk_size, 60000);
        assert_eq!(config.session.buffer_length_ms, 500);
        assert!(!config.session.digest_handshake);
    }

    #[test]
    fn test_invalid_config() {
        assert!(ClientConfig::builder().chunk_size(64).build().is_err());
        assert!(ClientConfig::builder().connect_timeout(Duration::ZERO).build().is_err());
        assert!(ClientConfig::builder().max_probe_messages(0).build().is_err());
    }
}
