use crate::{ByteBuffer, Error, Result};

/// AVC packet types carried in the second byte of an H.264 video message
pub const AVC_SEQUENCE_HEADER: u8 = 0;
pub const AVC_NALU: u8 = 1;
pub const AVC_END_OF_SEQUENCE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VideoCodec {
    /// Sorenson H.263
    H263,
    /// Screen video
    ScreenVideo,
    /// On2 VP6
    VP6,
    /// On2 VP6 with alpha
    VP6Alpha,
    /// Screen video v2
    ScreenVideo2,
    /// H.264 AVC
    H264,
    /// Unknown
    Unknown(u8),
}

impl VideoCodec {
    /// Parse from codec ID
    pub fn from_codec_id(id: u8) -> Self {
        match id {
            2 => VideoCodec::H263,
            3 => VideoCodec::ScreenVideo,
            4 => VideoCodec::VP6,
            5 => VideoCodec::VP6Alpha,
            6 => VideoCodec::ScreenVideo2,
            7 => VideoCodec::H264,
            _ => VideoCodec::Unknown(id),
        }
    }

    pub fn codec_id(&self) -> u8 {
        match self {
            VideoCodec::H263 => 2,
            VideoCodec::ScreenVideo => 3,
            VideoCodec::VP6 => 4,
            VideoCodec::VP6Alpha => 5,
            VideoCodec::ScreenVideo2 => 6,
            VideoCodec::H264 => 7,
            VideoCodec::Unknown(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameType {
    /// Keyframe (I-frame)
    Keyframe,
    /// Inter-frame (P-frame)
    InterFrame,
    /// Disposable inter-frame
    DisposableInterFrame,
    /// Generated keyframe
    GeneratedKeyframe,
    /// Video info/command frame
    VideoInfo,
    Reserved(u8),
}

impl FrameType {
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            1 => FrameType::Keyframe,
            2 => FrameType::InterFrame,
            3 => FrameType::DisposableInterFrame,
            4 => FrameType::GeneratedKeyframe,
            5 => FrameType::VideoInfo,
            other => FrameType::Reserved(other),
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            FrameType::Keyframe => 1,
            FrameType::InterFrame => 2,
            FrameType::DisposableInterFrame => 3,
            FrameType::GeneratedKeyframe => 4,
            FrameType::VideoInfo => 5,
            FrameType::Reserved(bits) => *bits,
        }
    }
}

/// Body of a video message
#[derive(Debug, Clone, PartialEq)]
pub struct VideoTag {
    pub frame_type: FrameType,
    pub codec: VideoCodec,
    /// Only meaningful for H.264
    pub avc_packet_type: u8,
    /// Composition time offset in ms, H.264 only
    pub composition_time: i32,
    pub data: Vec<u8>,
}

impl VideoTag {
    /// H.264 sequence header carrying an AVCDecoderConfigurationRecord
    pub fn avc_sequence_header(record: &[u8]) -> Self {
        VideoTag {
            frame_type: FrameType::Keyframe,
            codec: VideoCodec::H264,
            avc_packet_type: AVC_SEQUENCE_HEADER,
            composition_time: 0,
            data: record.to_vec(),
        }
    }

    /// H.264 NAL unit(s) in AVCC length-prefixed form
    pub fn avc_nalu(is_key_frame: bool, composition_time: i32, data: &[u8]) -> Self {
        VideoTag {
            frame_type: if is_key_frame { FrameType::Keyframe } else { FrameType::InterFrame },
            codec: VideoCodec::H264,
            avc_packet_type: AVC_NALU,
            composition_time,
            data: data.to_vec(),
        }
    }

    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut buffer = ByteBuffer::new(payload.to_vec());
        let tag_header = buffer.read_u8().map_err(|_| Error::protocol("empty video message"))?;
        let frame_type = FrameType::from_bits(tag_header >> 4);
        let codec = VideoCodec::from_codec_id(tag_header & 0x0F);

        let (avc_packet_type, composition_time) = if codec == VideoCodec::H264 {
            let packet_type = buffer
                .read_u8()
                .map_err(|_| Error::protocol("video message missing AVC packet type"))?;
            let cts = buffer
                .read_i24_be()
                .map_err(|_| Error::protocol("video message missing composition time"))?;
            (packet_type, cts)
        } else {
            (0, 0)
        };

        Ok(VideoTag {
            frame_type,
            codec,
            avc_packet_type,
            composition_time,
            data: buffer.read_remaining(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = ByteBuffer::with_capacity(self.data.len() + 5);
        buffer.write_u8((self.frame_type.bits() << 4) | (self.codec.codec_id() & 0x0F));
        if self.codec == VideoCodec::H264 {
            buffer.write_u8(self.avc_packet_type);
            buffer.write_i24_be(self.composition_time);
        }
        buffer.write_bytes(&self.data);
        buffer.into_vec()
    }

    pub fn is_key_frame(&self) -> bool {
        self.frame_type == FrameType::Keyframe
    }

    pub fn is_sequence_header(&self) -> bool {
        self.codec == VideoCodec::H264 && self.avc_packet_type == AVC_SEQUENCE_HEADER
    }
}

/// Parsed AVCDecoderConfigurationRecord
#[derive(Debug, Clone, PartialEq)]
pub struct AvcConfig {
    /// Configuration version
    pub version: u8,

    /// AVC profile
    pub profile: u8,

    /// AVC profile compatibility
    pub profile_compat: u8,

    /// AVC level
    pub level: u8,

    /// Size in bytes of the NALU length prefix
    pub length_size: u8,

    /// SPS (Sequence Parameter Sets)
    pub sps: Vec<Vec<u8>>,

    /// PPS (Picture Parameter Sets)
    pub pps: Vec<Vec<u8>>,
}

impl AvcConfig {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 7 {
            return Err(Error::stream("AVC config too short"));
        }
        let mut buffer = ByteBuffer::new(data.to_vec());
        let truncated = |_| Error::stream("AVC config truncated");

        let version = buffer.read_u8().map_err(truncated)?;
        let profile = buffer.read_u8().map_err(truncated)?;
        let profile_compat = buffer.read_u8().map_err(truncated)?;
        let level = buffer.read_u8().map_err(truncated)?;
        let length_size = (buffer.read_u8().map_err(truncated)? & 0x03) + 1;

        let num_sps = buffer.read_u8().map_err(truncated)? & 0x1F;
        let mut sps = Vec::with_capacity(num_sps as usize);
        for _ in 0..num_sps {
            let len = buffer.read_u16_be().map_err(truncated)? as usize;
            sps.push(buffer.read_bytes(len).map_err(truncated)?);
        }
        if sps.is_empty() {
            return Err(Error::stream("AVC config has no SPS"));
        }

        let num_pps = buffer.read_u8().map_err(truncated)?;
        let mut pps = Vec::with_capacity(num_pps as usize);
        for _ in 0..num_pps {
            let len = buffer.read_u16_be().map_err(truncated)? as usize;
            pps.push(buffer.read_bytes(len).map_err(truncated)?);
        }

        Ok(AvcConfig {
            version,
            profile,
            profile_compat,
            level,
            length_size,
            sps,
            pps,
        })
    }
}
