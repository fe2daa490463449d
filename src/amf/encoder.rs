use crate::amf::amf0::{markers, Amf0Object, Amf0Value, MAX_SHORT_STRING_LEN};
use crate::{ByteBuffer, Error, Result};

/// Appends AMF0-encoded values to an internal buffer.
///
/// A failed `encode` leaves the buffer exactly as it was before the call.
pub struct Amf0Encoder {
    buffer: ByteBuffer,
}

impl Default for Amf0Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Amf0Encoder {
    pub fn new() -> Self {
        Amf0Encoder {
            buffer: ByteBuffer::with_capacity(256),
        }
    }

    pub fn encode(&mut self, value: &Amf0Value) -> Result<()> {
        let mut scratch = ByteBuffer::with_capacity(64);
        write_value(&mut scratch, value)?;
        self.buffer.write_bytes(scratch.as_slice());
        Ok(())
    }

    pub fn get_bytes(&self) -> Vec<u8> {
        self.buffer.to_vec()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.into_vec()
    }
}

fn write_value(buf: &mut ByteBuffer, value: &Amf0Value) -> Result<()> {
    match value {
        Amf0Value::Number(n) => {
            buf.write_u8(markers::NUMBER);
            buf.write_f64_be(*n);
        }
        Amf0Value::Boolean(b) => {
            buf.write_u8(markers::BOOLEAN);
            buf.write_u8(u8::from(*b));
        }
        Amf0Value::String(s) => write_string(buf, s)?,
        Amf0Value::Object(obj) => {
            buf.write_u8(markers::OBJECT);
            write_properties(buf, obj)?;
        }
        Amf0Value::Null => buf.write_u8(markers::NULL),
        Amf0Value::Undefined => buf.write_u8(markers::UNDEFINED),
        Amf0Value::EcmaArray(obj) => {
            buf.write_u8(markers::ECMA_ARRAY);
            buf.write_u32_be(obj.len() as u32);
            write_properties(buf, obj)?;
        }
        Amf0Value::Array(items) => {
            buf.write_u8(markers::STRICT_ARRAY);
            buf.write_u32_be(items.len() as u32);
            for item in items {
                write_value(buf, item)?;
            }
        }
        Amf0Value::Date(millis, timezone) => {
            buf.write_u8(markers::DATE);
            buf.write_f64_be(*millis);
            buf.write_i16_be(*timezone);
        }
        Amf0Value::LongString(s) => write_long_string(buf, s)?,
    }
    Ok(())
}

fn write_string(buf: &mut ByteBuffer, s: &str) -> Result<()> {
    let len = s.len();
    if len > MAX_SHORT_STRING_LEN {
        return write_long_string(buf, s);
    }
    // The short form's boundary is inclusive of 65536, which a u16 cannot hold.
    let short_len = u16::try_from(len)
        .map_err(|_| Error::amf_encode(format!("String of {} bytes has no AMF0 short encoding", len)))?;
    buf.write_u8(markers::STRING);
    buf.write_u16_be(short_len);
    buf.write_bytes(s.as_bytes());
    Ok(())
}

fn write_long_string(buf: &mut ByteBuffer, s: &str) -> Result<()> {
    let len = u32::try_from(s.len())
        .map_err(|_| Error::amf_encode(format!("String of {} bytes is too long", s.len())))?;
    buf.write_u8(markers::LONG_STRING);
    buf.write_u32_be(len);
    buf.write_bytes(s.as_bytes());
    Ok(())
}

/// Key/value pairs followed by the 3-byte end marker. Empty keys would read as the
/// terminator, so they are skipped.
fn write_properties(buf: &mut ByteBuffer, obj: &Amf0Object) -> Result<()> {
    for (key, value) in obj {
        if key.is_empty() {
            continue;
        }
        let key_len = u16::try_from(key.len())
            .map_err(|_| Error::amf_encode(format!("Property name of {} bytes is too long", key.len())))?;
        buf.write_u16_be(key_len);
        buf.write_bytes(key.as_bytes());
        write_value(buf, value)?;
    }
    buf.write_u16_be(0);
    buf.write_u8(markers::OBJECT_END);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &Amf0Value) -> Result<Vec<u8>> {
        let mut encoder = Amf0Encoder::new();
        encoder.encode(value)?;
        Ok(encoder.into_bytes())
    }

    #[test]
    fn test_number_layout() {
        let bytes = encode(&Amf0Value::Number(1.0)).unwrap();
        assert_eq!(bytes, vec![0x00, 0x3F, 0xF0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_object_end_marker() {
        let bytes = encode(&Amf0Value::object([("a", Amf0Value::Null)])).unwrap();
        assert_eq!(bytes, vec![0x03, 0x00, 0x01, b'a', 0x05, 0x00, 0x00, 0x09]);
    }

    #[test]
    fn test_string_length_boundary() {
        let short = "x".repeat(65535);
        let bytes = encode(&Amf0Value::String(short)).unwrap();
        assert_eq!(bytes[0], markers::STRING);
        assert_eq!(&bytes[1..3], &[0xFF, 0xFF]);

        let exact = "x".repeat(65536);
        assert!(matches!(encode(&Amf0Value::String(exact)), Err(Error::AmfEncode(_))));

        let long = "x".repeat(65537);
        let bytes = encode(&Amf0Value::String(long)).unwrap();
        assert_eq!(bytes[0], markers::LONG_STRING);
        assert_eq!(&bytes[1..5], &[0x00, 0x01, 0x00, 0x01]);
    }

    #[test]
    fn test_failed_encode_leaves_buffer_untouched() {
        let mut encoder = Amf0Encoder::new();
        encoder.encode(&Amf0Value::Null).unwrap();
        let bad = Amf0Value::Array(vec![Amf0Value::from(1.0), Amf0Value::String("y".repeat(65536))]);
        assert!(encoder.encode(&bad).is_err());
        assert_eq!(encoder.get_bytes(), vec![markers::NULL]);
    }
}
