use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Growable byte buffer with a read cursor.
///
/// Writes always append; reads consume from the cursor and fail with
/// `UnexpectedEof` without moving it when too few bytes remain.
#[derive(Debug, Clone, Default)]
pub struct ByteBuffer {
    buffer: Vec<u8>,
    cursor: usize,
}

impl ByteBuffer {
    /// Create a new ByteBuffer from bytes
    pub fn new(data: Vec<u8>) -> Self {
        ByteBuffer {
            buffer: data,
            cursor: 0,
        }
    }

    /// Create an empty ByteBuffer with capacity
    pub fn with_capacity(capacity: usize) -> Self {
        ByteBuffer {
            buffer: Vec::with_capacity(capacity),
            cursor: 0,
        }
    }

    /// Get current cursor position
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Set cursor position
    pub fn set_position(&mut self, pos: usize) -> IoResult<()> {
        if pos > self.buffer.len() {
            return Err(IoError::new(ErrorKind::InvalidInput, "Position out of bounds"));
        }
        self.cursor = pos;
        Ok(())
    }

    /// Get remaining bytes from current position
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.cursor)
    }

    /// Check if buffer has at least n bytes remaining
    pub fn has_remaining(&self, n: usize) -> bool {
        self.remaining() >= n
    }

    fn take(&mut self, len: usize) -> IoResult<&[u8]> {
        if !self.has_remaining(len) {
            return Err(IoError::new(
                ErrorKind::UnexpectedEof,
                format!("Need {} bytes, {} remaining", len, self.remaining()),
            ));
        }
        let start = self.cursor;
        self.cursor += len;
        Ok(&self.buffer[start..start + len])
    }

    /// Read `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> IoResult<Vec<u8>> {
        Ok(self.take(len)?.to_vec())
    }

    /// Read everything after the cursor
    pub fn read_remaining(&mut self) -> Vec<u8> {
        let rest = self.buffer[self.cursor..].to_vec();
        self.cursor = self.buffer.len();
        rest
    }

    pub fn read_u8(&mut self) -> IoResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16_be(&mut self) -> IoResult<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn read_i16_be(&mut self) -> IoResult<i16> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    /// Read 24-bit unsigned (big endian)
    pub fn read_u24_be(&mut self) -> IoResult<u32> {
        Ok(BigEndian::read_u24(self.take(3)?))
    }

    /// Read 24-bit signed (big endian), used by composition time offsets
    pub fn read_i24_be(&mut self) -> IoResult<i32> {
        Ok(BigEndian::read_i24(self.take(3)?))
    }

    pub fn read_u32_be(&mut self) -> IoResult<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    /// Read u32 (little endian), used by the message stream id
    pub fn read_u32_le(&mut self) -> IoResult<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_f64_be(&mut self) -> IoResult<f64> {
        Ok(BigEndian::read_f64(self.take(8)?))
    }

    /// Append raw bytes
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_u16_be(&mut self, value: u16) {
        let mut bytes = [0u8; 2];
        BigEndian::write_u16(&mut bytes, value);
        self.write_bytes(&bytes);
    }

    pub fn write_i16_be(&mut self, value: i16) {
        let mut bytes = [0u8; 2];
        BigEndian::write_i16(&mut bytes, value);
        self.write_bytes(&bytes);
    }

    /// Write the low 24 bits of `value` (big endian)
    pub fn write_u24_be(&mut self, value: u32) {
        let mut bytes = [0u8; 3];
        BigEndian::write_u24(&mut bytes, value & 0x00FF_FFFF);
        self.write_bytes(&bytes);
    }

    /// Write a signed 24-bit value (big endian), clamped to the representable range
    pub fn write_i24_be(&mut self, value: i32) {
        let mut bytes = [0u8; 3];
        BigEndian::write_i24(&mut bytes, value.clamp(-0x80_0000, 0x7F_FFFF));
        self.write_bytes(&bytes);
    }

    pub fn write_u32_be(&mut self, value: u32) {
        let mut bytes = [0u8; 4];
        BigEndian::write_u32(&mut bytes, value);
        self.write_bytes(&bytes);
    }

    pub fn write_u32_le(&mut self, value: u32) {
        let mut bytes = [0u8; 4];
        LittleEndian::write_u32(&mut bytes, value);
        self.write_bytes(&bytes);
    }

    pub fn write_f64_be(&mut self, value: f64) {
        let mut bytes = [0u8; 8];
        BigEndian::write_f64(&mut bytes, value);
        self.write_bytes(&bytes);
    }

    /// Get all bytes as Vec
    pub fn to_vec(&self) -> Vec<u8> {
        self.buffer.clone()
    }

    /// Consume the buffer, returning its bytes
    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }

    /// Get slice of underlying buffer
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get length of buffer
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
