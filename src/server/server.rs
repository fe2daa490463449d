use crate::amf::Amf0Object;
use crate::connection::{Connection, PrepareMode, SessionConfig, Stage};
use crate::server::bind_server;
use crate::server::config::ServerConfig;
use crate::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

/// Receives each negotiated session
#[async_trait]
pub trait SessionHandler: Send + Sync + 'static {
    /// The peer published; read its media from `conn`
    async fn on_publish(&self, conn: Connection<TcpStream>) -> Result<()>;

    /// The peer wants to play; write media to `conn`
    async fn on_play(&self, conn: Connection<TcpStream>) -> Result<()>;

    /// Decide whether `action` ("publish" or "play") is allowed for these connect params
    fn check_access(&self, _action: &str, _connect_params: &Amf0Object) -> Result<()> {
        Ok(())
    }
}

pub struct RtmpServer<H> {
    /// Server configuration
    config: Arc<ServerConfig>,

    handler: Arc<H>,

    /// Active connections
    active: Arc<AtomicUsize>,

    shutdown: Arc<Notify>,
}

impl<H: SessionHandler> RtmpServer<H> {
    /// Create new server
    pub fn new(config: ServerConfig, handler: H) -> Self {
        RtmpServer {
            config: Arc::new(config),
            handler: Arc::new(handler),
            active: Arc::new(AtomicUsize::new(0)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address and accept connections
    pub async fn listen(&self) -> Result<()> {
        let listener = bind_server(&self.config).await?;
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener until `shutdown` is called
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!("RTMP server listening on {}", listener.local_addr()?);

        loop {
            let (stream, peer_addr) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("Accept error: {}", e);
                        continue;
                    }
                },
                _ = self.shutdown.notified() => break,
            };

            if self.active.load(Ordering::SeqCst) >= self.config.max_connections {
                warn!("Connection limit reached, rejecting {}", peer_addr);
                drop(stream);
                continue;
            }

            self.handle_connection(stream, peer_addr);
        }

        info!("RTMP server stopped");
        Ok(())
    }

    fn handle_connection(&self, stream: TcpStream, peer_addr: SocketAddr) {
        if self.config.tcp_nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                warn!("Failed to set TCP_NODELAY: {}", e);
            }
        }

        let guard = ActiveGuard::new(self.active.clone());
        let handler = self.handler.clone();
        let session = self.config.session.clone();

        tokio::spawn(async move {
            let _guard = guard;
            info!("New connection from {}", peer_addr);

            match run_session(stream, session, handler).await {
                Ok(()) => info!("Connection {} closed", peer_addr),
                Err(e) if e.is_disconnect() => info!("Connection {} disconnected: {}", peer_addr, e),
                Err(e) => warn!("Connection {} error: {}", peer_addr, e),
            }
        });
    }

    /// Stop accepting connections; sessions already running are left alone
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Get active connections count
    pub fn connection_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

async fn run_session<H: SessionHandler>(
    stream: TcpStream,
    session: SessionConfig,
    handler: Arc<H>,
) -> Result<()> {
    let checker = handler.clone();
    let mut conn = Connection::server(stream, session)?
        .with_access_check(move |action, params| checker.check_access(action, params));

    conn.prepare(Stage::CommandDone, PrepareMode::Reading).await?;
    debug!(
        "session negotiated: url={:?} publishing={} playing={}",
        conn.url().map(|u| u.as_str()),
        conn.is_publishing(),
        conn.is_playing()
    );

    if conn.is_publishing() {
        handler.on_publish(conn).await
    } else {
        handler.on_play(conn).await
    }
}

/// Decrements the active connection count when the session task ends
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        ActiveGuard(counter)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
