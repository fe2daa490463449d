use tokio::net::TcpListener;
use crate::{Error, Result};

mod server;
mod config;

pub use server::{RtmpServer, SessionHandler};
pub use config::{ServerConfig, ServerConfigBuilder};

/// Bind a listener for `config` with SO_REUSEADDR set
pub async fn bind_server(config: &ServerConfig) -> Result<TcpListener> {
    let addr = config.bind_addr();

    let socket = match addr.parse::<std::net::SocketAddr>() {
        Ok(addr) => {
            let socket = if addr.is_ipv4() {
                tokio::net::TcpSocket::new_v4()?
            } else {
                tokio::net::TcpSocket::new_v6()?
            };

            socket.set_reuseaddr(true)?;
            socket.bind(addr)?;
            socket
        }
        Err(e) => {
            return Err(Error::config(format!("Invalid address {}: {}", addr, e)));
        }
    };

    let listener = socket.listen(1024)?;
    Ok(listener)
}
