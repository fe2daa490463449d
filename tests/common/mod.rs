#![allow(dead_code)]

use rtmp::audio::{AudioTag, AAC_RAW, AAC_SEQUENCE_HEADER};
use rtmp::url::parse_rtmp_url;
use rtmp::video::VideoTag;
use rtmp::{
    build_metadata, client_handshake, server_handshake, ChunkReader, ChunkWriter, CodecType,
    Connection, ControlMessage, Message, Packet, Result, RtmpCommand, RtmpData, RtmpHeader,
    RtmpPacket, SessionConfig, StreamDescriptor, CHUNK_STREAM_COMMAND, CHUNK_STREAM_STATUS,
    CHUNK_STREAM_STREAM_COMMAND, HANDSHAKE_SIZE,
};
use tokio::io::{duplex, AsyncWriteExt, DuplexStream};

/// High profile, level 3.1, one SPS and one PPS
pub const AVC_RECORD: [u8; 19] = [
    0x01, 0x64, 0x00, 0x1F, 0xFF, 0xE1, 0x00, 0x04, 0x67, 0x64, 0x00, 0x1F, 0x01, 0x00, 0x04, 0x68,
    0xEE, 0x3C, 0x80,
];

/// AAC LC, 44.1 kHz, stereo
pub const AAC_CONFIG: [u8; 2] = [0x12, 0x10];

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn h264_stream() -> StreamDescriptor {
    StreamDescriptor::h264(AVC_RECORD.to_vec()).unwrap()
}

pub fn aac_stream() -> StreamDescriptor {
    StreamDescriptor::aac(AAC_CONFIG.to_vec()).unwrap()
}

pub fn video_packet(idx: usize, time: u32, key: bool, fill: u8) -> Packet {
    Packet {
        idx,
        is_key_frame: key,
        composition_time: if key { 0 } else { 40 },
        time,
        data: vec![fill; 300],
    }
}

pub fn audio_packet(idx: usize, time: u32, fill: u8) -> Packet {
    Packet {
        idx,
        is_key_frame: false,
        composition_time: 0,
        time,
        data: vec![fill; 64],
    }
}

/// A client and a server session joined by an in-memory pipe
pub fn session_pair(
    uri: &str,
    client_config: SessionConfig,
    server_config: SessionConfig,
) -> (Connection<DuplexStream>, Connection<DuplexStream>) {
    let (client_io, server_io) = duplex(1 << 20);
    let url = parse_rtmp_url(uri).unwrap();
    (
        Connection::client(client_io, url, client_config).unwrap(),
        Connection::server(server_io, server_config).unwrap(),
    )
}

/// Hand-driven end of a session, built from the wire-level pieces only.
/// Lets a test send exactly the messages it wants and see every message
/// the session under test sends back.
pub struct RawPeer {
    io: DuplexStream,
    reader: ChunkReader,
    writer: ChunkWriter,
    /// Bytes written so far, handshake included
    pub tx_bytes: u64,
    /// Every message read from the other side, in order
    pub received: Vec<Message>,
}

impl RawPeer {
    fn new(io: DuplexStream) -> Self {
        RawPeer {
            io,
            reader: ChunkReader::new(),
            writer: ChunkWriter::new(),
            tx_bytes: 0,
            received: Vec::new(),
        }
    }

    /// Answer the handshake as a server
    pub async fn accept(io: DuplexStream) -> Result<Self> {
        let mut peer = RawPeer::new(io);
        server_handshake(&mut peer.io).await?;
        peer.tx_bytes = (1 + 2 * HANDSHAKE_SIZE) as u64;
        Ok(peer)
    }

    /// Start the handshake as a client
    pub async fn dial(io: DuplexStream) -> Result<Self> {
        let mut peer = RawPeer::new(io);
        client_handshake(&mut peer.io, true).await?;
        // C0C1 then C2
        peer.tx_bytes = (1 + 2 * HANDSHAKE_SIZE) as u64;
        Ok(peer)
    }

    pub async fn send(&mut self, packet: &RtmpPacket) -> Result<()> {
        let bytes = self.writer.create_chunks(packet)?;
        self.io.write_all(&bytes).await?;
        self.io.flush().await?;
        self.tx_bytes += bytes.len() as u64;
        Ok(())
    }

    pub async fn send_control(&mut self, control: ControlMessage) -> Result<()> {
        self.send(&control.to_packet()).await
    }

    pub async fn send_command(&mut self, cs_id: u32, stream_id: u32, command: &RtmpCommand) -> Result<()> {
        let packet = RtmpPacket::new(RtmpHeader::command(cs_id, stream_id), command.encode()?);
        self.send(&packet).await
    }

    /// onMetaData announcing `streams`
    pub async fn send_metadata(&mut self, stream_id: u32, streams: &[StreamDescriptor]) -> Result<()> {
        let data = RtmpData::on_metadata(build_metadata(streams));
        let packet = RtmpPacket::new(RtmpHeader::data(CHUNK_STREAM_STATUS, stream_id), data.encode()?);
        self.send(&packet).await
    }

    pub async fn send_sequence_header(&mut self, stream_id: u32, stream: &StreamDescriptor) -> Result<()> {
        let packet = match stream.codec {
            CodecType::H264 => RtmpPacket::new(
                RtmpHeader::video(0, stream_id),
                VideoTag::avc_sequence_header(&stream.config).encode(),
            ),
            CodecType::Aac => RtmpPacket::new(
                RtmpHeader::audio(0, stream_id),
                AudioTag::aac(AAC_SEQUENCE_HEADER, 2, &stream.config).encode(),
            ),
        };
        self.send(&packet).await
    }

    /// One media frame; `packet.idx` is ignored, `codec` picks the message type
    pub async fn send_media(&mut self, stream_id: u32, packet: &Packet, codec: CodecType) -> Result<()> {
        let message = match codec {
            CodecType::H264 => RtmpPacket::new(
                RtmpHeader::video(packet.time, stream_id),
                VideoTag::avc_nalu(packet.is_key_frame, packet.composition_time, &packet.data).encode(),
            ),
            CodecType::Aac => RtmpPacket::new(
                RtmpHeader::audio(packet.time, stream_id),
                AudioTag::aac(AAC_RAW, 2, &packet.data).encode(),
            ),
        };
        self.send(&message).await
    }

    /// Next complete message; chunk size changes are applied before returning
    pub async fn recv(&mut self) -> Result<Message> {
        loop {
            let Some(packet) = self.reader.read_chunk(&mut self.io).await? else {
                continue;
            };
            let message = Message::dispatch(&packet)?;
            if let Message::Control(ControlMessage::SetChunkSize(size)) = &message {
                self.reader.set_chunk_size(*size as usize);
            }
            self.received.push(message.clone());
            return Ok(message);
        }
    }

    /// Read until a command called `name` arrives
    pub async fn expect_command(&mut self, name: &str) -> Result<RtmpCommand> {
        loop {
            if let Message::Command(command) = self.recv().await? {
                if command.name == name {
                    return Ok(command);
                }
            }
        }
    }

    /// Read whatever is left until the other side hangs up
    pub async fn drain(&mut self) {
        while self.recv().await.is_ok() {}
    }

    /// Server side of a play negotiation. Returns the stream id handed out.
    pub async fn serve_play(&mut self, window: Option<u32>) -> Result<u32> {
        let connect = self.expect_command("connect").await?;
        if let Some(window) = window {
            self.send_control(ControlMessage::WindowAckSize(window)).await?;
        }
        self.send_command(CHUNK_STREAM_COMMAND, 0, &RtmpCommand::connect_result(connect.transaction_id))
            .await?;

        let create = self.expect_command("createStream").await?;
        self.send_command(CHUNK_STREAM_COMMAND, 0, &RtmpCommand::create_stream_result(create.transaction_id, 1))
            .await?;

        self.expect_command("play").await?;
        Ok(1)
    }

    /// Client side of a publish negotiation. Returns the stream id to publish on.
    pub async fn publish(&mut self, app: &str, name: &str) -> Result<u32> {
        let tc_url = format!("rtmp://localhost/{}", app);
        self.send_command(CHUNK_STREAM_COMMAND, 0, &RtmpCommand::connect(app, &tc_url, "LNX 9,0,124,2"))
            .await?;
        self.expect_command("_result").await?;

        self.send_command(CHUNK_STREAM_COMMAND, 0, &RtmpCommand::create_stream(2.0)).await?;
        let reply = self.expect_command("_result").await?;
        let stream_id = reply
            .arguments
            .first()
            .and_then(|v| v.as_number())
            .unwrap_or_default() as u32;

        self.send_command(CHUNK_STREAM_STREAM_COMMAND, stream_id, &RtmpCommand::publish(3.0, name, "live"))
            .await?;
        self.expect_command("onStatus").await?;
        Ok(stream_id)
    }
}
