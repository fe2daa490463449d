use crate::client::config::ClientConfig;
use crate::connection::{Connection, PrepareMode, Stage};
use crate::processing::StreamDescriptor;
use crate::utils::url::{parse_rtmp_url, socket_addr};
use crate::{Error, Result};
use log::{debug, info, warn};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Dials RTMP servers and hands back negotiated connections
pub struct RtmpClient {
    config: ClientConfig,
}

impl RtmpClient {
    /// Create new client
    pub fn new() -> Self {
        RtmpClient::with_config(ClientConfig::default())
    }

    /// Create client with config
    pub fn with_config(config: ClientConfig) -> Self {
        RtmpClient { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Open a TCP connection to `url` and wrap it in a client session.
    ///
    /// Nothing is sent yet; the handshake happens on the first `prepare`.
    pub async fn dial(&self, url: &str) -> Result<Connection<TcpStream>> {
        let url = parse_rtmp_url(url)?;
        let addr = socket_addr(&url)?;

        let stream = match timeout(self.config.connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(Error::connection(format!("Failed to connect to {}: {}", addr, e))),
            Err(_) => return Err(Error::timeout(format!("Connection to {} timed out", addr))),
        };

        if self.config.tcp_nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                warn!("Failed to set TCP_NODELAY: {}", e);
            }
        }

        info!("Connected to {}", addr);
        Connection::client(stream, url, self.config.session.clone())
    }

    /// Dial and negotiate playback up to the point where codec data is known
    pub async fn play(&self, url: &str) -> Result<Connection<TcpStream>> {
        let mut conn = self.dial(url).await?;
        conn.prepare(Stage::CodecDataDone, PrepareMode::Reading).await?;
        debug!("play ready, {} streams", conn.streams().await?.len());
        Ok(conn)
    }

    /// Dial, negotiate publishing and send the metadata and sequence headers for `streams`
    pub async fn publish(&self, url: &str, streams: &[StreamDescriptor]) -> Result<Connection<TcpStream>> {
        let mut conn = self.dial(url).await?;
        conn.write_header(streams).await?;
        Ok(conn)
    }
}

impl Default for RtmpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_dial_rejects_bad_url() {
        let client = RtmpClient::new();
        let err = client.dial("not a url").await.err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_dial_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ClientConfig::builder()
            .connect_timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let client = RtmpClient::with_config(config);
        let err = client
            .dial(&format!("rtmp://127.0.0.1:{}/live/test", port))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Connection(_) | Error::Timeout(_)));
    }
}
