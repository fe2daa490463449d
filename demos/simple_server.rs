// Simple RTMP Server Example
//
// Accepts publishers and logs what they send. Players get a short
// synthetic AAC stream.
//
// Usage:
//   cargo run --example simple_server

use async_trait::async_trait;
use log::info;
use rtmp::{Connection, Packet, Result, RtmpServer, ServerConfig, SessionHandler, StreamDescriptor};
use std::sync::Arc;
use tokio::net::TcpStream;

struct LoggingHandler;

#[async_trait]
impl SessionHandler for LoggingHandler {
    async fn on_publish(&self, mut conn: Connection<TcpStream>) -> Result<()> {
        let name = conn.url().map(|u| u.path().to_string()).unwrap_or_default();
        let streams = conn.streams().await?;
        info!("{} publishing {:?}", name, streams.iter().map(|s| s.codec).collect::<Vec<_>>());

        let mut count = 0u64;
        loop {
            let packet = conn.read_packet().await?;
            count += 1;
            if count % 100 == 0 {
                info!("{}: {} packets, last at {} ms", name, count, packet.time);
            }
        }
    }

    async fn on_play(&self, mut conn: Connection<TcpStream>) -> Result<()> {
        // AAC LC, 44.1 kHz, stereo
        let stream = StreamDescriptor::aac(vec![0x12, 0x10])?;
        conn.write_header(&[stream]).await?;

        for frame in 0..200u32 {
            let packet = Packet {
                idx: 0,
                is_key_frame: false,
                composition_time: 0,
                time: frame * 23,
                data: vec![0x21; 32],
            };
            conn.write_packet(&packet).await?;
            tokio::time::sleep(std::time::Duration::from_millis(23)).await;
        }
        conn.write_trailer().await?;
        conn.close().await
    }

    fn check_access(&self, action: &str, params: &rtmp::Amf0Object) -> Result<()> {
        info!("{} requested, app={:?}", action, params.get("app"));
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = ServerConfig::builder()
        .host("0.0.0.0")
        .port(1935)
        .max_connections(100)
        .chunk_size(4096)
        .build()?;

    info!("Starting RTMP server on {}:{}", config.host, config.port);
    info!("  - Max connections: {}", config.max_connections);
    info!("  - Chunk size: {}", config.session.chunk_size);

    let server = Arc::new(RtmpServer::new(config, LoggingHandler));

    let server_clone = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down server...");
                server_clone.shutdown();
            }
            Err(err) => {
                eprintln!("Error setting up signal handler: {}", err);
            }
        }
    });

    info!("Press Ctrl+C to stop");
    server.listen().await
}
