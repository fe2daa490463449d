// Simple RTMP Client Example
//
// Usage:
//   # Publish synthetic H.264/AAC for ten seconds
//   cargo run --example simple_client -- rtmp://localhost/live/mystream publish
//
//   # Play and print packet stats
//   cargo run --example simple_client -- rtmp://localhost/live/mystream play

use log::{error, info};
use rtmp::{ClientConfig, Packet, Result, RtmpClient, StreamDescriptor};
use std::env;
use std::time::Duration;

/// Baseline 3.0 SPS/PPS, enough for a receiver to accept the stream
const AVC_RECORD: [u8; 19] = [
    0x01, 0x42, 0x00, 0x1E, 0xFF, 0xE1, 0x00, 0x04, 0x67, 0x42, 0x00, 0x1E, 0x01, 0x00, 0x04, 0x68,
    0xCE, 0x3C, 0x80,
];

const AAC_CONFIG: [u8; 2] = [0x12, 0x10];

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <url> <publish|play>", args[0]);
        std::process::exit(1);
    }
    let url = &args[1];

    let config = ClientConfig::builder()
        .connect_timeout(Duration::from_secs(5))
        .chunk_size(4096)
        .build()?;
    let client = RtmpClient::with_config(config);

    match args[2].as_str() {
        "publish" => {
            let streams = vec![
                StreamDescriptor::h264(AVC_RECORD.to_vec())?.with_dimensions(640, 480),
                StreamDescriptor::aac(AAC_CONFIG.to_vec())?,
            ];
            let mut conn = client.publish(url, &streams).await?;
            info!("Publishing to {}", url);

            for frame in 0..250u32 {
                let time = frame * 40;
                conn.write_packet(&Packet {
                    idx: 0,
                    is_key_frame: frame % 50 == 0,
                    composition_time: 0,
                    time,
                    data: vec![0x00, 0x00, 0x00, 0x02, 0x09, 0xF0],
                })
                .await?;
                conn.write_packet(&Packet {
                    idx: 1,
                    is_key_frame: false,
                    composition_time: 0,
                    time,
                    data: vec![0x21; 16],
                })
                .await?;
                tokio::time::sleep(Duration::from_millis(40)).await;
            }
            conn.write_trailer().await?;
            conn.close().await?;
            info!("Publishing completed");
        }
        "play" => {
            let mut conn = client.play(url).await?;
            let streams = conn.streams().await?;
            info!("Playing {} with {} stream(s)", url, streams.len());

            let mut counts = vec![0u64; streams.len()];
            loop {
                let packet = match conn.read_packet().await {
                    Ok(packet) => packet,
                    Err(e) if e.is_disconnect() => break,
                    Err(e) => return Err(e),
                };
                counts[packet.idx] += 1;
                if counts.iter().sum::<u64>() % 100 == 0 {
                    info!("received {:?} packets, at {} ms", counts, packet.time);
                }
            }
            info!("Stream ended after {:?} packets", counts);
        }
        mode => {
            error!("Invalid mode: {}. Use 'publish' or 'play'", mode);
            std::process::exit(1);
        }
    }

    Ok(())
}
