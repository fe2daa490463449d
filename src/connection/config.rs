use crate::{DEFAULT_CHUNK_SIZE, DEFAULT_PEER_BANDWIDTH, DEFAULT_WINDOW_SIZE, Error, MAX_CHUNK_SIZE, Result};

/// Per-connection negotiation parameters
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Outbound chunk size announced via SetChunkSize
    pub chunk_size: u32,

    /// Window acknowledgement size announced to the peer
    pub window_ack_size: u32,

    /// Peer bandwidth announced to the peer (dynamic limit)
    pub peer_bandwidth: u32,

    /// Client SetBufferLength in milliseconds
    pub buffer_length_ms: u32,

    /// Client connect `flashVer`
    pub flash_version: String,

    /// Client sends a digest-bearing C1
    pub digest_handshake: bool,

    /// Media messages read while probing before giving up
    pub max_probe_messages: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            chunk_size: 4096,
            window_ack_size: DEFAULT_WINDOW_SIZE,
            peer_bandwidth: DEFAULT_PEER_BANDWIDTH,
            buffer_length_ms: 100,
            flash_version: "MAC 22,0,0,192".to_string(),
            digest_handshake: true,
            max_probe_messages: 20,
        }
    }
}

impl SessionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size < DEFAULT_CHUNK_SIZE || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::config(format!(
                "Chunk size must be within {}..={}",
                DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE
            )));
        }

        if self.window_ack_size == 0 {
            return Err(Error::config("Invalid window_ack_size: 0"));
        }

        if self.peer_bandwidth == 0 {
            return Err(Error::config("Invalid peer_bandwidth: 0"));
        }

        if self.max_probe_messages == 0 {
            return Err(Error::config("Invalid max_probe_messages: 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_chunk_size_bounds() {
        let mut config = SessionConfig::default();
        config.chunk_size = 127;
        assert!(config.validate().is_err());
        config.chunk_size = MAX_CHUNK_SIZE + 1;
        assert!(config.validate().is_err());
        config.chunk_size = MAX_CHUNK_SIZE;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = SessionConfig {
            window_ack_size: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let config = SessionConfig {
            peer_bandwidth: 0,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
