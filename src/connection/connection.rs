use crate::amf::Amf0Object;
use crate::chunk::{ChunkReader, ChunkWriter};
use crate::connection::config::SessionConfig;
use crate::connection::io::CountingStream;
use crate::connection::state::{PrepareMode, Role, Stage};
use crate::handshake::{HandshakeInfo, client_handshake, server_handshake};
use crate::message::Message;
use crate::processing::audio::{AAC_RAW, AAC_SEQUENCE_HEADER, AudioTag};
use crate::processing::video::VideoTag;
use crate::processing::{
    CodecType, Demuxer, MediaTag, Muxer, Packet, Prober, StreamDescriptor, StreamMap, build_metadata,
};
use crate::protocol::*;
use crate::utils::url::{create_url, split_path, tc_url};
use crate::{Error, Result};
use async_trait::async_trait;
use log::{debug, info, trace, warn};
use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use url::Url;

/// Stream id handed out by the server in reply to createStream
const SERVER_STREAM_ID: u32 = 1;

/// WindowAckSize a client sends back after receiving the server's
const CLIENT_WINDOW_ACK_REPLY: u32 = 0xFFFF_FFFF;

/// Called with `"publish"` or `"play"` and the peer's connect object
pub type AccessCheck = Box<dyn Fn(&str, &Amf0Object) -> Result<()> + Send + Sync>;

/// One RTMP session over a duplex byte stream
pub struct Connection<S> {
    /// Counts sit above the buffer so they reflect bytes consumed, not read ahead
    stream: CountingStream<BufStream<S>>,
    role: Role,
    stage: Stage,
    config: SessionConfig,
    url: Option<Url>,

    chunk_reader: ChunkReader,
    chunk_writer: ChunkWriter,

    /// Message stream id used for media and stream commands
    stream_id: u32,
    connect_params: Amf0Object,
    access_check: Option<AccessCheck>,
    handshake: Option<HandshakeInfo>,

    publishing: bool,
    playing: bool,
    reading: bool,
    writing: bool,

    /// Acknowledgement window set by the peer; 0 disables acks
    read_ack_window: u32,
    /// rx byte count when the last Ack was sent
    acked_bytes: u64,

    metadata: Option<Amf0Object>,
    prober: Option<Prober>,
    streams: Vec<StreamDescriptor>,
    stream_map: StreamMap,
    pending: VecDeque<Packet>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an accepted transport
    pub fn server(stream: S, config: SessionConfig) -> Result<Self> {
        Self::new(stream, Role::Server, None, config)
    }

    /// Wrap a dialed transport; `url` names the app and stream to use
    pub fn client(stream: S, url: Url, config: SessionConfig) -> Result<Self> {
        Self::new(stream, Role::Client, Some(url), config)
    }

    fn new(stream: S, role: Role, url: Option<Url>, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Connection {
            stream: CountingStream::new(BufStream::new(stream)),
            role,
            stage: Stage::Init,
            config,
            url,
            chunk_reader: ChunkReader::new(),
            chunk_writer: ChunkWriter::new(),
            stream_id: 0,
            connect_params: Amf0Object::new(),
            access_check: None,
            handshake: None,
            publishing: false,
            playing: false,
            reading: false,
            writing: false,
            read_ack_window: 0,
            acked_bytes: 0,
            metadata: None,
            prober: None,
            streams: Vec::new(),
            stream_map: StreamMap::default(),
            pending: VecDeque::new(),
        })
    }

    /// Install a hook consulted when the peer publishes or plays
    pub fn with_access_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&str, &Amf0Object) -> Result<()> + Send + Sync + 'static,
    {
        self.access_check = Some(Box::new(check));
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Session URL: the dialed URL, or on a server the one rebuilt from tcUrl/app/stream
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    /// The peer's `connect` command object (server role)
    pub fn connect_params(&self) -> &Amf0Object {
        &self.connect_params
    }

    pub fn handshake_info(&self) -> Option<&HandshakeInfo> {
        self.handshake.as_ref()
    }

    /// Last onMetaData received from the peer
    pub fn metadata(&self) -> Option<&Amf0Object> {
        self.metadata.as_ref()
    }

    pub fn is_publishing(&self) -> bool {
        self.publishing
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_reading(&self) -> bool {
        self.reading
    }

    pub fn is_writing(&self) -> bool {
        self.writing
    }

    /// Bytes consumed from the transport, handshake included
    pub fn rx_bytes(&self) -> u64 {
        self.stream.rx_bytes()
    }

    /// Bytes handed to the transport, handshake included
    pub fn tx_bytes(&self) -> u64 {
        self.stream.tx_bytes()
    }

    /// Drive the session forward until it reaches `stage`
    pub async fn prepare(&mut self, stage: Stage, mode: PrepareMode) -> Result<()> {
        while self.stage < stage {
            match self.stage {
                Stage::Init => {
                    let info = match self.role {
                        Role::Server => server_handshake(&mut self.stream).await?,
                        Role::Client => {
                            client_handshake(&mut self.stream, self.config.digest_handshake).await?
                        }
                    };
                    debug!(
                        "handshake done: peer version {:#010x}, digest {}",
                        info.peer_version, info.digest
                    );
                    self.handshake = Some(info);
                    self.advance();
                }
                Stage::HandshakeDone => match (self.role, mode) {
                    (Role::Server, _) => self.read_connect().await?,
                    (Role::Client, PrepareMode::Reading) => self.connect_play().await?,
                    (Role::Client, PrepareMode::Writing) => self.connect_publish().await?,
                },
                Stage::CommandDone => match mode {
                    PrepareMode::Reading => self.probe().await?,
                    PrepareMode::Writing => {
                        return Err(Error::invalid_state("call write_header() before write_packet()"));
                    }
                },
                Stage::CodecDataDone => break,
            }
        }
        Ok(())
    }

    fn advance(&mut self) {
        self.stage = self.stage.next();
        debug!("{:?} session reached {:?}", self.role, self.stage);
    }

    async fn read_connect(&mut self) -> Result<()> {
        let connect = self.poll_command().await?;
        if connect.name != CMD_CONNECT {
            return Err(Error::protocol(format!("first command is not connect: {}", connect.name)));
        }
        let params = connect
            .command_object
            .as_object()
            .cloned()
            .ok_or_else(|| Error::protocol("connect command object is not an object"))?;
        let app = params
            .get("app")
            .ok_or_else(|| Error::protocol("connect params missing app"))?
            .as_string()
            .unwrap_or_default()
            .to_string();
        let tc_url = params
            .get("tcUrl")
            .or_else(|| params.get("tcurl"))
            .and_then(|v| v.as_string())
            .unwrap_or_default()
            .to_string();
        debug!("< connect(app={:?}, tcUrl={:?})", app, tc_url);
        self.connect_params = params;

        self.write_basic_conf().await?;
        self.write_command(CHUNK_STREAM_COMMAND, 0, &RtmpCommand::connect_result(connect.transaction_id))
            .await?;
        self.flush().await?;

        loop {
            let command = self.poll_command().await?;
            match command.name.as_str() {
                CMD_CREATE_STREAM => {
                    self.stream_id = SERVER_STREAM_ID;
                    debug!("< createStream -> {}", self.stream_id);
                    let reply = RtmpCommand::create_stream_result(command.transaction_id, self.stream_id);
                    self.write_command(CHUNK_STREAM_COMMAND, 0, &reply).await?;
                    self.flush().await?;
                }
                CMD_PUBLISH => {
                    let path = command
                        .arguments
                        .first()
                        .ok_or_else(|| Error::protocol("publish params invalid"))?
                        .as_string()
                        .unwrap_or_default()
                        .to_string();
                    info!("< publish({:?})", path);

                    let checked = self.check_access(CMD_PUBLISH);
                    let reply = RtmpCommand::on_status(
                        command.transaction_id,
                        "status",
                        CODE_PUBLISH_START,
                        "Start publishing",
                    );
                    self.write_command(CHUNK_STREAM_STATUS, self.stream_id, &reply).await?;
                    self.flush().await?;
                    checked?;

                    self.url = Some(create_url(&tc_url, &app, &path)?);
                    self.publishing = true;
                    self.reading = true;
                    self.advance();
                    return Ok(());
                }
                CMD_PLAY => {
                    let path = command
                        .arguments
                        .first()
                        .ok_or_else(|| Error::protocol("play params invalid"))?
                        .as_string()
                        .unwrap_or_default()
                        .to_string();
                    info!("< play({:?})", path);
                    self.check_access(CMD_PLAY)?;

                    let begin = ControlMessage::UserControl(UserControlEvent::StreamBegin(self.stream_id));
                    self.write_control(begin).await?;
                    let reply = RtmpCommand::on_status(
                        command.transaction_id,
                        "status",
                        CODE_PLAY_START,
                        "Start live",
                    );
                    self.write_command(CHUNK_STREAM_STATUS, self.stream_id, &reply).await?;
                    self.write_data(CHUNK_STREAM_STATUS, self.stream_id, &RtmpData::sample_access())
                        .await?;
                    self.flush().await?;

                    self.url = Some(create_url(&tc_url, &app, &path)?);
                    self.playing = true;
                    self.writing = true;
                    self.advance();
                    return Ok(());
                }
                other => debug!("< {} ignored during negotiation", other),
            }
        }
    }

    fn check_access(&self, action: &str) -> Result<()> {
        match &self.access_check {
            Some(check) => check(action, &self.connect_params)
                .map_err(|e| Error::auth_failed(format!("{} rejected: {}", action, e))),
            None => Ok(()),
        }
    }

    fn session_url(&self) -> Result<&Url> {
        self.url
            .as_ref()
            .ok_or_else(|| Error::invalid_state("client connection has no URL"))
    }

    async fn write_connect(&mut self, app: &str) -> Result<()> {
        let tc_url = tc_url(self.session_url()?);
        self.write_basic_conf().await?;

        debug!("> connect(app={:?}, tcUrl={:?})", app, tc_url);
        let connect = RtmpCommand::connect(app, &tc_url, &self.config.flash_version);
        self.write_command(CHUNK_STREAM_COMMAND, 0, &connect).await?;
        self.flush().await?;

        loop {
            match self.poll_message().await? {
                Message::Command(command) if command.name == CMD_RESULT => {
                    return match command.info_code() {
                        Some(CODE_CONNECT_SUCCESS) => {
                            debug!("< _result of connect");
                            Ok(())
                        }
                        code => Err(Error::protocol(format!("connect failed: {:?}", code))),
                    };
                }
                Message::Command(command) if command.name == CMD_ERROR => {
                    return Err(Error::protocol(format!(
                        "connect rejected: {:?}",
                        command.info_code()
                    )));
                }
                Message::Control(ControlMessage::WindowAckSize(_)) => {
                    self.write_control(ControlMessage::WindowAckSize(CLIENT_WINDOW_ACK_REPLY))
                        .await?;
                    self.flush().await?;
                }
                Message::Data(data) => self.handle_data(&data),
                _ => {}
            }
        }
    }

    async fn wait_create_stream(&mut self) -> Result<u32> {
        loop {
            let command = self.poll_command().await?;
            match command.name.as_str() {
                CMD_RESULT => {
                    let id = command
                        .arguments
                        .first()
                        .ok_or_else(|| Error::protocol("createStream command failed"))?
                        .as_number()
                        .unwrap_or(0.0);
                    debug!("< _result of createStream: {}", id);
                    return Ok(id as u32);
                }
                CMD_ERROR => return Err(Error::protocol("createStream command failed")),
                other => debug!("< {} ignored while waiting for createStream", other),
            }
        }
    }

    async fn connect_play(&mut self) -> Result<()> {
        let (app, path) = split_path(self.session_url()?);
        self.write_connect(&app).await?;

        debug!("> createStream()");
        self.write_command(CHUNK_STREAM_COMMAND, 0, &RtmpCommand::create_stream(2.0)).await?;
        let buffer = UserControlEvent::SetBufferLength {
            stream_id: 0,
            buffer_ms: self.config.buffer_length_ms,
        };
        self.write_control(ControlMessage::UserControl(buffer)).await?;
        self.flush().await?;

        self.stream_id = self.wait_create_stream().await?;

        info!("> play({:?})", path);
        self.write_command(CHUNK_STREAM_STREAM_COMMAND, self.stream_id, &RtmpCommand::play(&path))
            .await?;
        self.flush().await?;

        self.reading = true;
        self.playing = true;
        self.advance();
        Ok(())
    }

    async fn connect_publish(&mut self) -> Result<()> {
        let (app, path) = split_path(self.session_url()?);
        self.write_connect(&app).await?;

        debug!("> createStream()");
        self.write_command(CHUNK_STREAM_COMMAND, 0, &RtmpCommand::create_stream(2.0)).await?;
        self.flush().await?;

        self.stream_id = self.wait_create_stream().await?;

        info!("> publish({:?})", path);
        let publish = RtmpCommand::publish(3.0, &path, "live");
        self.write_command(CHUNK_STREAM_STREAM_COMMAND, self.stream_id, &publish).await?;
        self.flush().await?;

        self.writing = true;
        self.publishing = true;
        self.advance();
        Ok(())
    }

    async fn probe(&mut self) -> Result<()> {
        let mut prober = Prober::new(self.config.max_probe_messages);
        if let Some(metadata) = &self.metadata {
            prober.set_metadata(metadata);
        }
        self.prober = Some(prober);

        while !self.prober.as_ref().is_some_and(|p| p.is_probed()) {
            let (tag, timestamp) = self.poll_media().await?;
            if let Some(prober) = self.prober.as_mut() {
                prober.push(tag, timestamp)?;
            }
        }

        let prober = self
            .prober
            .take()
            .ok_or_else(|| Error::invalid_state("prober missing"))?;
        let (streams, map, pending) = prober.finish();
        info!(
            "probed {} stream(s): {:?}",
            streams.len(),
            streams.iter().map(|s| s.codec).collect::<Vec<_>>()
        );
        self.streams = streams;
        self.stream_map = map;
        self.pending = pending;
        self.advance();
        Ok(())
    }

    /// Read chunks until one message is complete. Protocol control is applied here.
    async fn poll_message(&mut self) -> Result<Message> {
        loop {
            let packet = self.chunk_reader.read_chunk(&mut self.stream).await?;
            self.acknowledge().await?;

            let Some(packet) = packet else { continue };
            let message = Message::dispatch(&packet)?;
            if let Message::Control(control) = &message {
                self.handle_control(*control).await?;
            }
            return Ok(message);
        }
    }

    async fn poll_command(&mut self) -> Result<RtmpCommand> {
        loop {
            match self.poll_message().await? {
                Message::Command(command) => {
                    trace!("< command {:?}", command);
                    return Ok(command);
                }
                Message::Data(data) => self.handle_data(&data),
                Message::Control(_) => {}
                Message::Audio(_) | Message::Video(_) => warn!("media message before negotiation, ignored"),
                Message::Other(packet) => warn!("message type {} ignored", packet.message_type()),
            }
        }
    }

    async fn poll_media(&mut self) -> Result<(MediaTag, u32)> {
        loop {
            match self.poll_message().await? {
                Message::Audio(packet) | Message::Video(packet) => {
                    if let Some(tag) = MediaTag::from_packet(&packet)? {
                        return Ok((tag, packet.timestamp()));
                    }
                }
                Message::Data(data) => self.handle_data(&data),
                Message::Command(command) => debug!("< {} ignored while streaming", command.name),
                Message::Control(_) => {}
                Message::Other(packet) => warn!("message type {} ignored", packet.message_type()),
            }
        }
    }

    fn handle_data(&mut self, data: &RtmpData) {
        match data.metadata() {
            Some(metadata) => {
                debug!("< {} with {} key(s)", data.name, metadata.len());
                if let Some(prober) = self.prober.as_mut() {
                    prober.set_metadata(metadata);
                }
                self.metadata = Some(metadata.clone());
            }
            None => debug!("< data message {} ignored", data.name),
        }
    }

    async fn handle_control(&mut self, control: ControlMessage) -> Result<()> {
        match control {
            ControlMessage::SetChunkSize(size) => {
                if size == 0 {
                    return Err(Error::protocol("peer set chunk size to 0"));
                }
                debug!("< SetChunkSize({})", size);
                self.chunk_reader.set_chunk_size(size as usize);
            }
            ControlMessage::Abort(cs_id) => {
                debug!("< Abort(csid {})", cs_id);
                self.chunk_reader.abort(cs_id);
            }
            ControlMessage::WindowAckSize(size) => {
                debug!("< WindowAckSize({})", size);
                self.read_ack_window = size;
            }
            ControlMessage::UserControl(UserControlEvent::PingRequest(timestamp)) => {
                trace!("< PingRequest({})", timestamp);
                let pong = ControlMessage::UserControl(UserControlEvent::PingResponse(timestamp));
                self.write_control(pong).await?;
                self.flush().await?;
            }
            other => debug!("< {:?}", other),
        }
        Ok(())
    }

    async fn acknowledge(&mut self) -> Result<()> {
        let received = self.rx_bytes();
        if self.read_ack_window == 0 || received - self.acked_bytes <= self.read_ack_window as u64 {
            return Ok(());
        }
        // The sequence number is the total byte count and wraps at 32 bits
        let sequence = received as u32;
        trace!("> Ack({})", sequence);
        self.write_control(ControlMessage::Acknowledgement(sequence)).await?;
        self.flush().await?;
        self.acked_bytes = received;
        Ok(())
    }

    async fn write_basic_conf(&mut self) -> Result<()> {
        self.write_control(ControlMessage::WindowAckSize(self.config.window_ack_size)).await?;
        self.write_control(ControlMessage::SetPeerBandwidth {
            size: self.config.peer_bandwidth,
            limit_type: PEER_BW_LIMIT_DYNAMIC,
        })
        .await?;
        self.write_control(ControlMessage::SetChunkSize(self.config.chunk_size)).await?;
        self.chunk_writer.set_chunk_size(self.config.chunk_size as usize);
        Ok(())
    }

    async fn write_control(&mut self, control: ControlMessage) -> Result<()> {
        self.chunk_writer.write_packet(&control.to_packet(), &mut self.stream).await
    }

    async fn write_command(&mut self, cs_id: u32, stream_id: u32, command: &RtmpCommand) -> Result<()> {
        let packet = RtmpPacket::new(RtmpHeader::command(cs_id, stream_id), command.encode()?);
        self.chunk_writer.write_packet(&packet, &mut self.stream).await
    }

    async fn write_data(&mut self, cs_id: u32, stream_id: u32, data: &RtmpData) -> Result<()> {
        let packet = RtmpPacket::new(RtmpHeader::data(cs_id, stream_id), data.encode()?);
        self.chunk_writer.write_packet(&packet, &mut self.stream).await
    }

    async fn flush(&mut self) -> Result<()> {
        self.stream.flush().await?;
        Ok(())
    }

    /// Stream descriptors, probing the peer's media if needed
    pub async fn streams(&mut self) -> Result<Vec<StreamDescriptor>> {
        self.prepare(Stage::CodecDataDone, PrepareMode::Reading).await?;
        Ok(self.streams.clone())
    }

    /// Next media packet, replaying those cached while probing first
    pub async fn read_packet(&mut self) -> Result<Packet> {
        self.prepare(Stage::CodecDataDone, PrepareMode::Reading).await?;
        if let Some(packet) = self.pending.pop_front() {
            return Ok(packet);
        }
        loop {
            let (tag, timestamp) = self.poll_media().await?;
            if let Some(packet) = self.stream_map.to_packet(&tag, timestamp) {
                return Ok(packet);
            }
        }
    }

    /// Negotiate for writing, then send metadata and one sequence header per stream
    pub async fn write_header(&mut self, streams: &[StreamDescriptor]) -> Result<()> {
        self.prepare(Stage::CommandDone, PrepareMode::Writing).await?;
        if self.stage == Stage::CodecDataDone {
            return Err(Error::invalid_state("write_header() already called"));
        }

        let metadata = RtmpData::on_metadata(build_metadata(streams));
        self.write_data(CHUNK_STREAM_STATUS, self.stream_id, &metadata).await?;

        for stream in streams {
            let packet = match stream.codec {
                CodecType::H264 => RtmpPacket::new(
                    RtmpHeader::video(0, self.stream_id),
                    VideoTag::avc_sequence_header(&stream.config).encode(),
                ),
                CodecType::Aac => {
                    let channels = stream.aac_config().map(|c| c.channels()).unwrap_or(2);
                    RtmpPacket::new(
                        RtmpHeader::audio(0, self.stream_id),
                        AudioTag::aac(AAC_SEQUENCE_HEADER, channels, &stream.config).encode(),
                    )
                }
            };
            self.chunk_writer.write_packet(&packet, &mut self.stream).await?;
        }
        self.flush().await?;

        self.streams = streams.to_vec();
        self.advance();
        Ok(())
    }

    pub async fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        self.prepare(Stage::CodecDataDone, PrepareMode::Writing).await?;
        let stream = self
            .streams
            .get(packet.idx)
            .ok_or_else(|| Error::stream(format!("no stream #{}", packet.idx)))?;

        let rtmp_packet = match stream.codec {
            CodecType::H264 => RtmpPacket::new(
                RtmpHeader::video(packet.time, self.stream_id),
                VideoTag::avc_nalu(packet.is_key_frame, packet.composition_time, &packet.data).encode(),
            ),
            CodecType::Aac => {
                let channels = stream.aac_config().map(|c| c.channels()).unwrap_or(2);
                RtmpPacket::new(
                    RtmpHeader::audio(packet.time, self.stream_id),
                    AudioTag::aac(AAC_RAW, channels, &packet.data).encode(),
                )
            }
        };
        self.chunk_writer.write_packet(&rtmp_packet, &mut self.stream).await?;
        self.flush().await
    }

    pub async fn write_trailer(&mut self) -> Result<()> {
        self.flush().await
    }

    /// Flush and shut the transport down
    pub async fn close(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        info!(
            "{:?} session closed: {} bytes in, {} bytes out",
            self.role,
            self.rx_bytes(),
            self.tx_bytes()
        );
        Ok(())
    }
}

#[async_trait]
impl<S> Demuxer for Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn streams(&mut self) -> Result<Vec<StreamDescriptor>> {
        Connection::streams(self).await
    }

    async fn read_packet(&mut self) -> Result<Packet> {
        Connection::read_packet(self).await
    }
}

#[async_trait]
impl<S> Muxer for Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_header(&mut self, streams: &[StreamDescriptor]) -> Result<()> {
        Connection::write_header(self, streams).await
    }

    async fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        Connection::write_packet(self, packet).await
    }

    async fn write_trailer(&mut self) -> Result<()> {
        Connection::write_trailer(self).await
    }
}
