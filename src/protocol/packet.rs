use crate::protocol::constants::*;

/// One reassembled (or to-be-chunked) RTMP message
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpPacket {
    pub header: RtmpHeader,
    pub payload: Vec<u8>,
}

impl RtmpPacket {
    /// Create new packet; the header's length is taken from the payload
    pub fn new(mut header: RtmpHeader, payload: Vec<u8>) -> Self {
        header.message_length = payload.len() as u32;
        RtmpPacket { header, payload }
    }

    /// Get message type
    pub fn message_type(&self) -> u8 {
        self.header.message_type
    }

    /// Get message stream ID
    pub fn message_stream_id(&self) -> u32 {
        self.header.message_stream_id
    }

    /// Get chunk stream ID
    pub fn chunk_stream_id(&self) -> u32 {
        self.header.chunk_stream_id
    }

    /// Get timestamp
    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }

    /// Check if this is an audio packet
    pub fn is_audio(&self) -> bool {
        self.header.message_type == MSG_TYPE_AUDIO
    }

    /// Check if this is a video packet
    pub fn is_video(&self) -> bool {
        self.header.message_type == MSG_TYPE_VIDEO
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtmpHeader {
    pub timestamp: u32,
    pub message_length: u32,
    pub message_type: u8,
    pub message_stream_id: u32,
    pub chunk_stream_id: u32,
}

impl RtmpHeader {
    /// Create new header
    pub fn new(
        timestamp: u32,
        message_length: u32,
        message_type: u8,
        message_stream_id: u32,
        chunk_stream_id: u32,
    ) -> Self {
        RtmpHeader {
            timestamp,
            message_length,
            message_type,
            message_stream_id,
            chunk_stream_id,
        }
    }

    /// Protocol control and user control messages: csid 2, stream 0, time 0
    pub fn control(message_type: u8) -> Self {
        RtmpHeader::new(0, 0, message_type, 0, CHUNK_STREAM_PROTOCOL)
    }

    /// Header for audio message
    pub fn audio(timestamp: u32, stream_id: u32) -> Self {
        RtmpHeader::new(timestamp, 0, MSG_TYPE_AUDIO, stream_id, CHUNK_STREAM_AUDIO)
    }

    /// Header for video message
    pub fn video(timestamp: u32, stream_id: u32) -> Self {
        RtmpHeader::new(timestamp, 0, MSG_TYPE_VIDEO, stream_id, CHUNK_STREAM_VIDEO)
    }

    /// Header for an AMF0 command on the given chunk stream
    pub fn command(chunk_stream_id: u32, stream_id: u32) -> Self {
        RtmpHeader::new(0, 0, MSG_TYPE_COMMAND_AMF0, stream_id, chunk_stream_id)
    }

    /// Header for an AMF0 data message on the given chunk stream
    pub fn data(chunk_stream_id: u32, stream_id: u32) -> Self {
        RtmpHeader::new(0, 0, MSG_TYPE_DATA_AMF0, stream_id, chunk_stream_id)
    }

    /// Check if timestamp needs the extended field
    pub fn has_extended_timestamp(&self) -> bool {
        self.timestamp >= MAX_TIMESTAMP_FIELD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_creation() {
        let packet = RtmpPacket::new(RtmpHeader::audio(1000, 1), vec![0xAF, 0x01, 0x21]);

        assert!(packet.is_audio());
        assert!(!packet.is_video());
        assert_eq!(packet.timestamp(), 1000);
        assert_eq!(packet.message_stream_id(), 1);
        assert_eq!(packet.chunk_stream_id(), CHUNK_STREAM_AUDIO);
        assert_eq!(packet.header.message_length, 3);
    }

    #[test]
    fn test_extended_timestamp_threshold() {
        assert!(!RtmpHeader::video(0xFF_FFFE, 1).has_extended_timestamp());
        assert!(RtmpHeader::video(0xFF_FFFF, 1).has_extended_timestamp());
    }
}
