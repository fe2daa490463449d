use crate::protocol::{RtmpHeader, RtmpPacket};
use crate::{ByteBuffer, Error, Result, DEFAULT_CHUNK_SIZE, MAX_TIMESTAMP_FIELD};
use log::trace;
use std::collections::HashMap;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Largest chunk stream id the 3-byte basic header can carry
pub const MAX_CHUNK_STREAM_ID: u32 = 65599;

/// Largest message length the 3-byte length field can carry
const MAX_MESSAGE_LENGTH: usize = 0xFF_FFFF;

/// Splits messages into chunks
pub struct ChunkWriter {
    /// Previous headers for each chunk stream
    prev_headers: HashMap<u32, RtmpHeader>,

    /// Current chunk size for writing
    chunk_size_out: usize,
}

impl Default for ChunkWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkWriter {
    /// Create new chunk writer
    pub fn new() -> Self {
        ChunkWriter {
            prev_headers: HashMap::new(),
            chunk_size_out: DEFAULT_CHUNK_SIZE as usize,
        }
    }

    /// Set outgoing chunk size
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size_out = size;
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size_out
    }

    /// Write packet as chunks. The caller flushes.
    pub async fn write_packet<W: AsyncWrite + Unpin>(
        &mut self,
        packet: &RtmpPacket,
        writer: &mut W,
    ) -> Result<()> {
        let chunks = self.create_chunks(packet)?;
        writer.write_all(&chunks).await?;
        Ok(())
    }

    /// Encode a packet into its chunk bytes, updating per-csid header state
    pub fn create_chunks(&mut self, packet: &RtmpPacket) -> Result<Vec<u8>> {
        let header = &packet.header;
        let cs_id = header.chunk_stream_id;
        let payload_len = packet.payload.len();
        if payload_len > MAX_MESSAGE_LENGTH {
            return Err(Error::chunk(format!("message of {} bytes is too long", payload_len)));
        }

        let mut buffer = ByteBuffer::with_capacity(payload_len + 18);

        let prev = self.prev_headers.get(&cs_id).copied();
        let relative = prev.filter(|p| {
            p.message_stream_id == header.message_stream_id && header.timestamp >= p.timestamp
        });

        let (fmt, time_field) = match relative {
            Some(p) => (1, header.timestamp - p.timestamp),
            None => (0, header.timestamp),
        };
        let extended = time_field >= MAX_TIMESTAMP_FIELD;

        encode_basic_header(&mut buffer, fmt, cs_id)?;
        buffer.write_u24_be(time_field.min(MAX_TIMESTAMP_FIELD));
        buffer.write_u24_be(payload_len as u32);
        buffer.write_u8(header.message_type);
        if fmt == 0 {
            buffer.write_u32_le(header.message_stream_id);
        }
        if extended {
            buffer.write_u32_be(time_field);
        }

        let mut chunks = packet.payload.chunks(self.chunk_size_out.max(1));
        if let Some(first) = chunks.next() {
            buffer.write_bytes(first);
        }
        for chunk in chunks {
            encode_basic_header(&mut buffer, 3, cs_id)?;
            if extended {
                buffer.write_u32_be(time_field);
            }
            buffer.write_bytes(chunk);
        }

        trace!(
            "write fmt={} csid={} type={} ts={} len={}",
            fmt, cs_id, header.message_type, header.timestamp, payload_len
        );

        let mut stored = *header;
        stored.message_length = payload_len as u32;
        self.prev_headers.insert(cs_id, stored);
        Ok(buffer.into_vec())
    }
}

/// Encode basic header
pub fn encode_basic_header(buffer: &mut ByteBuffer, fmt: u8, cs_id: u32) -> Result<()> {
    match cs_id {
        2..=63 => buffer.write_u8((fmt << 6) | cs_id as u8),
        64..=319 => {
            buffer.write_u8(fmt << 6);
            buffer.write_u8((cs_id - 64) as u8);
        }
        320..=MAX_CHUNK_STREAM_ID => {
            buffer.write_u8((fmt << 6) | 1);
            buffer.write_u16_be((cs_id - 64) as u16);
        }
        _ => return Err(Error::chunk(format!("invalid chunk stream id {}", cs_id))),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkReader;
    use crate::protocol::{RtmpHeader, MSG_TYPE_VIDEO};

    async fn round_trip(writer: &mut ChunkWriter, reader: &mut ChunkReader, packet: &RtmpPacket) -> RtmpPacket {
        let bytes = writer.create_chunks(packet).unwrap();
        let mut input = &bytes[..];
        loop {
            if let Some(out) = reader.read_chunk(&mut input).await.unwrap() {
                assert!(input.is_empty());
                return out;
            }
        }
    }

    #[tokio::test]
    async fn test_round_trip_sizes() {
        for chunk_size in [128usize, 4096] {
            let mut writer = ChunkWriter::new();
            let mut reader = ChunkReader::new();
            writer.set_chunk_size(chunk_size);
            reader.set_chunk_size(chunk_size);

            let sizes = [0, 1, chunk_size - 1, chunk_size, chunk_size + 1, 10 * chunk_size + 7];
            for (i, size) in sizes.into_iter().enumerate() {
                let payload: Vec<u8> = (0..size).map(|b| b as u8).collect();
                let packet = RtmpPacket::new(RtmpHeader::video(i as u32 * 40, 1), payload);
                let out = round_trip(&mut writer, &mut reader, &packet).await;

                assert_eq!(out.payload, packet.payload);
                assert_eq!(out.timestamp(), packet.timestamp());
                assert_eq!(out.message_type(), MSG_TYPE_VIDEO);
                assert_eq!(out.message_stream_id(), 1);
            }
        }
    }

    #[tokio::test]
    async fn test_extended_timestamp_round_trip() {
        let mut writer = ChunkWriter::new();
        let mut reader = ChunkReader::new();

        for ts in [0xFF_FFFF, 0x0100_0000, 0x0200_0000] {
            let packet = RtmpPacket::new(RtmpHeader::video(ts, 1), vec![7u8; 300]);
            let out = round_trip(&mut writer, &mut reader, &packet).await;
            assert_eq!(out.timestamp(), ts);
            assert_eq!(out.payload.len(), 300);
        }
    }

    #[tokio::test]
    async fn test_large_chunk_stream_ids() {
        let mut writer = ChunkWriter::new();
        let mut reader = ChunkReader::new();

        for cs_id in [63, 64, 319, 320, 1000, MAX_CHUNK_STREAM_ID] {
            let mut header = RtmpHeader::video(0, 1);
            header.chunk_stream_id = cs_id;
            let packet = RtmpPacket::new(header, vec![1, 2, 3]);
            let out = round_trip(&mut writer, &mut reader, &packet).await;
            assert_eq!(out.chunk_stream_id(), cs_id);
        }
    }

    #[test]
    fn test_header_selection() {
        let mut writer = ChunkWriter::new();

        let first = writer.create_chunks(&RtmpPacket::new(RtmpHeader::audio(100, 1), vec![0])).unwrap();
        assert_eq!(first[0] >> 6, 0);

        let next = writer.create_chunks(&RtmpPacket::new(RtmpHeader::audio(120, 1), vec![0])).unwrap();
        assert_eq!(next[0] >> 6, 1);
        assert_eq!(&next[1..4], &[0, 0, 20]);

        let backwards = writer.create_chunks(&RtmpPacket::new(RtmpHeader::audio(50, 1), vec![0])).unwrap();
        assert_eq!(backwards[0] >> 6, 0);

        let other_stream = writer.create_chunks(&RtmpPacket::new(RtmpHeader::audio(60, 2), vec![0])).unwrap();
        assert_eq!(other_stream[0] >> 6, 0);
    }

    #[test]
    fn test_invalid_chunk_stream_id() {
        let mut buffer = ByteBuffer::new(Vec::new());
        assert!(encode_basic_header(&mut buffer, 0, 1).is_err());
        assert!(encode_basic_header(&mut buffer, 0, MAX_CHUNK_STREAM_ID + 1).is_err());
    }
}
