use crate::chunk::stream::ChunkStreamContext;
use crate::protocol::{RtmpHeader, RtmpPacket};
use crate::{Error, Result, DEFAULT_CHUNK_SIZE, MAX_TIMESTAMP_FIELD};
use log::trace;
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reassembles chunks into messages, one chunk per call
pub struct ChunkReader {
    /// Chunk streams by ID
    chunk_streams: HashMap<u32, ChunkStreamContext>,

    /// Current chunk size for reading
    chunk_size_in: usize,
}

impl Default for ChunkReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkReader {
    /// Create new chunk reader
    pub fn new() -> Self {
        ChunkReader {
            chunk_streams: HashMap::new(),
            chunk_size_in: DEFAULT_CHUNK_SIZE as usize,
        }
    }

    /// Set incoming chunk size
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size_in = size;
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size_in
    }

    /// Discard the in-progress message on a chunk stream
    pub fn abort(&mut self, cs_id: u32) {
        if let Some(ctx) = self.chunk_streams.get_mut(&cs_id) {
            ctx.discard();
        }
    }

    /// Read one chunk. Returns the message once its last chunk has arrived.
    pub async fn read_chunk<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
    ) -> Result<Option<RtmpPacket>> {
        let first_byte = reader.read_u8().await?;
        let fmt = first_byte >> 6;
        let cs_id = match first_byte & 0x3F {
            0 => reader.read_u8().await? as u32 + 64,
            1 => reader.read_u16().await? as u32 + 64,
            n => n as u32,
        };

        match fmt {
            0 => {
                let timestamp = read_u24(reader).await?;
                let length = read_u24(reader).await?;
                let message_type = reader.read_u8().await?;
                let stream_id = reader.read_u32_le().await?;
                let (timestamp, extended) = read_extended(reader, timestamp).await?;

                let header = RtmpHeader::new(timestamp, length, message_type, stream_id, cs_id);
                self.start(cs_id, header, 0, 0, extended)?;
            }
            1 | 2 => {
                let delta = read_u24(reader).await?;
                let fields = if fmt == 1 {
                    let length = read_u24(reader).await?;
                    Some((length, reader.read_u8().await?))
                } else {
                    None
                };
                let (delta, extended) = read_extended(reader, delta).await?;

                let prev = self
                    .chunk_streams
                    .get(&cs_id)
                    .map(|ctx| ctx.header)
                    .ok_or_else(|| Error::chunk(format!("type {} header on unknown csid {}", fmt, cs_id)))?;
                let (length, message_type) = fields.unwrap_or((prev.message_length, prev.message_type));
                let header = RtmpHeader::new(
                    prev.timestamp.wrapping_add(delta),
                    length,
                    message_type,
                    prev.message_stream_id,
                    cs_id,
                );
                self.start(cs_id, header, fmt, delta, extended)?;
            }
            _ => {
                let ctx = self
                    .chunk_streams
                    .get_mut(&cs_id)
                    .ok_or_else(|| Error::chunk(format!("orphan continuation on csid {}", cs_id)))?;

                if ctx.is_assembling() {
                    if ctx.extended_timestamp {
                        reader.read_u32().await?;
                    }
                } else {
                    // A type-3 header after a complete message starts a new one with the same header
                    let mut header = ctx.header;
                    if ctx.extended_timestamp {
                        let value = reader.read_u32().await?;
                        if ctx.fmt == 0 {
                            header.timestamp = value;
                        } else {
                            ctx.timestamp_delta = value;
                            header.timestamp = header.timestamp.wrapping_add(value);
                        }
                    } else if ctx.fmt != 0 {
                        header.timestamp = header.timestamp.wrapping_add(ctx.timestamp_delta);
                    }
                    ctx.start_message(header);
                }
            }
        }

        let chunk_size = self.chunk_size_in;
        let ctx = self
            .chunk_streams
            .get_mut(&cs_id)
            .ok_or_else(|| Error::chunk(format!("csid {} vanished", cs_id)))?;

        let size = ctx.bytes_remaining.min(chunk_size);
        let mut chunk_data = vec![0u8; size];
        reader.read_exact(&mut chunk_data).await?;

        trace!(
            "chunk fmt={} csid={} type={} len={} +{} remaining={}",
            fmt,
            cs_id,
            ctx.header.message_type,
            ctx.header.message_length,
            size,
            ctx.bytes_remaining - size
        );
        Ok(ctx.add_chunk_data(&chunk_data))
    }

    fn start(&mut self, cs_id: u32, header: RtmpHeader, fmt: u8, delta: u32, extended: bool) -> Result<()> {
        match self.chunk_streams.get_mut(&cs_id) {
            Some(ctx) => {
                if ctx.is_assembling() {
                    return Err(Error::chunk(format!(
                        "type {} header while csid {} still has {} bytes pending",
                        fmt, cs_id, ctx.bytes_remaining
                    )));
                }
                ctx.fmt = fmt;
                ctx.timestamp_delta = delta;
                ctx.extended_timestamp = extended;
                ctx.start_message(header);
            }
            None => {
                let mut ctx = ChunkStreamContext::new(header, fmt, delta, extended);
                ctx.start_message(header);
                self.chunk_streams.insert(cs_id, ctx);
            }
        }
        Ok(())
    }
}

async fn read_u24<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u32> {
    let mut bytes = [0u8; 3];
    reader.read_exact(&mut bytes).await?;
    Ok(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
}

async fn read_extended<R: AsyncRead + Unpin>(reader: &mut R, field: u32) -> Result<(u32, bool)> {
    if field == MAX_TIMESTAMP_FIELD {
        Ok((reader.read_u32().await?, true))
    } else {
        Ok((field, false))
    }
}
