use crate::protocol::{RtmpHeader, RtmpPacket};

/// Read-side state of one chunk stream
#[derive(Debug, Clone)]
pub struct ChunkStreamContext {
    /// Header of the current (or last) message on this chunk stream
    pub header: RtmpHeader,

    /// Format of the last full header (0, 1 or 2)
    pub fmt: u8,

    /// Last timestamp delta, reapplied when a type-3 header starts a new message
    pub timestamp_delta: u32,

    /// Whether the last header carried an extended timestamp
    pub extended_timestamp: bool,

    /// Partial message being assembled
    pub message_buffer: Vec<u8>,

    /// Bytes remaining for current message
    pub bytes_remaining: usize,
}

impl ChunkStreamContext {
    pub fn new(header: RtmpHeader, fmt: u8, timestamp_delta: u32, extended_timestamp: bool) -> Self {
        ChunkStreamContext {
            header,
            fmt,
            timestamp_delta,
            extended_timestamp,
            message_buffer: Vec::new(),
            bytes_remaining: 0,
        }
    }

    /// Check if currently assembling a message
    pub fn is_assembling(&self) -> bool {
        self.bytes_remaining > 0
    }

    /// Start assembling the message described by `header`
    pub fn start_message(&mut self, header: RtmpHeader) {
        self.bytes_remaining = header.message_length as usize;
        // Grows with the chunks actually received, not the declared length
        self.message_buffer.clear();
        self.header = header;
    }

    /// Append chunk data, returning the packet once the declared length is reached
    pub fn add_chunk_data(&mut self, data: &[u8]) -> Option<RtmpPacket> {
        self.message_buffer.extend_from_slice(data);
        self.bytes_remaining = self.bytes_remaining.saturating_sub(data.len());

        if self.bytes_remaining > 0 {
            return None;
        }
        let payload = std::mem::take(&mut self.message_buffer);
        Some(RtmpPacket::new(self.header, payload))
    }

    /// Drop the in-progress message (Abort)
    pub fn discard(&mut self) {
        self.message_buffer.clear();
        self.bytes_remaining = 0;
    }
}
