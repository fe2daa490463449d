use crate::Result;
use crate::processing::audio::AacConfig;
use crate::processing::video::AvcConfig;
use async_trait::async_trait;

pub mod audio;
pub mod video;
mod metadata;
mod probe;

pub use metadata::*;
pub use probe::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecType {
    H264,
    Aac,
}

impl CodecType {
    pub fn is_video(&self) -> bool {
        matches!(self, CodecType::H264)
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, CodecType::Aac)
    }
}

/// One elementary stream: codec plus its opaque configuration bytes.
///
/// For H.264 the config is an AVCDecoderConfigurationRecord, for AAC an
/// MPEG-4 AudioSpecificConfig. Both are validated on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    pub codec: CodecType,
    pub config: Vec<u8>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl StreamDescriptor {
    pub fn h264(record: Vec<u8>) -> Result<Self> {
        AvcConfig::parse(&record)?;
        Ok(StreamDescriptor {
            codec: CodecType::H264,
            config: record,
            width: None,
            height: None,
        })
    }

    pub fn aac(config: Vec<u8>) -> Result<Self> {
        AacConfig::parse(&config)?;
        Ok(StreamDescriptor {
            codec: CodecType::Aac,
            config,
            width: None,
            height: None,
        })
    }

    /// Attach picture dimensions decoded elsewhere (e.g. from the SPS)
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn avc_config(&self) -> Option<AvcConfig> {
        match self.codec {
            CodecType::H264 => AvcConfig::parse(&self.config).ok(),
            _ => None,
        }
    }

    pub fn aac_config(&self) -> Option<AacConfig> {
        match self.codec {
            CodecType::Aac => AacConfig::parse(&self.config).ok(),
            _ => None,
        }
    }
}

/// A demuxed media packet. `idx` is the position of its stream in the stream list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub idx: usize,
    pub is_key_frame: bool,
    /// Presentation minus decode time in ms, video only
    pub composition_time: i32,
    /// Decode timestamp in ms
    pub time: u32,
    pub data: Vec<u8>,
}

/// Source of media packets
#[async_trait]
pub trait Demuxer: Send {
    async fn streams(&mut self) -> Result<Vec<StreamDescriptor>>;
    async fn read_packet(&mut self) -> Result<Packet>;
}

/// Sink of media packets
#[async_trait]
pub trait Muxer: Send {
    async fn write_header(&mut self, streams: &[StreamDescriptor]) -> Result<()>;
    async fn write_packet(&mut self, packet: &Packet) -> Result<()>;
    async fn write_trailer(&mut self) -> Result<()>;
}
