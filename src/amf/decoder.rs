use std::collections::HashMap;
use crate::amf::amf0::{markers, Amf0Object, Amf0Value};
use crate::{ByteBuffer, Error, Result};

/// Nesting limit for objects and arrays
const MAX_DEPTH: usize = 64;

/// Reads AMF0 values from a `ByteBuffer`.
///
/// On error the buffer cursor is rewound to where the failed value started.
pub struct Amf0Decoder<'a> {
    buffer: &'a mut ByteBuffer,
}

impl<'a> Amf0Decoder<'a> {
    pub fn new(buffer: &'a mut ByteBuffer) -> Self {
        Amf0Decoder { buffer }
    }

    /// Check if decoder has remaining data to decode
    pub fn has_remaining(&self) -> bool {
        self.buffer.remaining() > 0
    }

    pub fn decode(&mut self) -> Result<Amf0Value> {
        let start = self.buffer.position();
        let result = self.decode_at_depth(0);
        if result.is_err() {
            // start was a valid position before the attempt
            let _ = self.buffer.set_position(start);
        }
        result
    }

    fn decode_at_depth(&mut self, depth: usize) -> Result<Amf0Value> {
        if depth > MAX_DEPTH {
            return Err(Error::amf_decode("Nesting too deep"));
        }

        let marker = self.buffer.read_u8().map_err(eof("marker"))?;
        match marker {
            markers::NUMBER => Ok(Amf0Value::Number(self.buffer.read_f64_be().map_err(eof("number"))?)),
            markers::BOOLEAN => Ok(Amf0Value::Boolean(self.buffer.read_u8().map_err(eof("boolean"))? != 0)),
            markers::STRING => {
                let len = self.buffer.read_u16_be().map_err(eof("string length"))? as usize;
                Ok(Amf0Value::String(self.read_utf8(len, "string")?))
            }
            markers::OBJECT => Ok(Amf0Value::Object(self.decode_properties(depth)?)),
            markers::NULL => Ok(Amf0Value::Null),
            markers::UNDEFINED => Ok(Amf0Value::Undefined),
            markers::ECMA_ARRAY => {
                // The count is advisory; the end marker terminates
                self.buffer.read_u32_be().map_err(eof("ecma array count"))?;
                Ok(Amf0Value::EcmaArray(self.decode_properties(depth)?))
            }
            markers::STRICT_ARRAY => {
                let count = self.buffer.read_u32_be().map_err(eof("strict array count"))? as usize;
                let mut items = Vec::with_capacity(count.min(self.buffer.remaining()));
                for _ in 0..count {
                    items.push(self.decode_at_depth(depth + 1)?);
                }
                Ok(Amf0Value::Array(items))
            }
            markers::DATE => {
                let millis = self.buffer.read_f64_be().map_err(eof("date"))?;
                let timezone = self.buffer.read_i16_be().map_err(eof("date timezone"))?;
                Ok(Amf0Value::Date(millis, timezone))
            }
            markers::LONG_STRING => {
                let len = self.buffer.read_u32_be().map_err(eof("long string length"))? as usize;
                Ok(Amf0Value::LongString(self.read_utf8(len, "long string")?))
            }
            markers::OBJECT_END => Err(Error::amf_decode("Unexpected object end marker")),
            other => Err(Error::amf_decode(format!("Unsupported AMF0 marker: 0x{:02x}", other))),
        }
    }

    /// Properties up to a zero-length key, then the one-byte end marker.
    fn decode_properties(&mut self, depth: usize) -> Result<Amf0Object> {
        let mut object = HashMap::new();
        loop {
            let key_len = self.buffer.read_u16_be().map_err(eof("property name length"))? as usize;
            if key_len == 0 {
                self.buffer.read_u8().map_err(eof("object end"))?;
                return Ok(object);
            }
            let key = self.read_utf8(key_len, "property name")?;
            let value = self.decode_at_depth(depth + 1)?;
            object.insert(key, value);
        }
    }

    fn read_utf8(&mut self, len: usize, what: &'static str) -> Result<String> {
        let bytes = self.buffer.read_bytes(len).map_err(eof(what))?;
        String::from_utf8(bytes)
            .map_err(|e| Error::amf_decode(format!("Invalid UTF-8 in {}: {}", what, e)))
    }
}

fn eof(what: &'static str) -> impl Fn(std::io::Error) -> Error {
    move |e| Error::amf_decode(format!("Truncated {}: {}", what, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_object_any_key_order() {
        let bytes = vec![
            0x03,
            0x00, 0x01, b'b', 0x01, 0x01,
            0x00, 0x01, b'a', 0x05,
            0x00, 0x00, 0x09,
        ];
        let mut buffer = ByteBuffer::new(bytes);
        let value = Amf0Decoder::new(&mut buffer).decode().unwrap();
        assert_eq!(value.get_property("a"), Some(&Amf0Value::Null));
        assert_eq!(value.get_property("b"), Some(&Amf0Value::Boolean(true)));
        assert_eq!(buffer.remaining(), 0);
    }

    #[test]
    fn test_failed_decode_rewinds() {
        // A number followed by a truncated string
        let mut buffer = ByteBuffer::new(vec![0x00, 0, 0, 0, 0, 0, 0, 0, 0, 0x02, 0x00, 0x05, b'a']);
        let mut decoder = Amf0Decoder::new(&mut buffer);
        assert_eq!(decoder.decode().unwrap(), Amf0Value::Number(0.0));
        assert!(decoder.decode().is_err());
        assert_eq!(buffer.position(), 9);
    }

    #[test]
    fn test_unsupported_marker() {
        let mut buffer = ByteBuffer::new(vec![markers::TYPED_OBJECT, 0x00]);
        let err = Amf0Decoder::new(&mut buffer).decode().unwrap_err();
        assert!(matches!(err, Error::AmfDecode(_)));
    }

    #[test]
    fn test_depth_limit() {
        let mut bytes = vec![markers::STRICT_ARRAY, 0, 0, 0, 1].repeat(MAX_DEPTH + 2);
        bytes.push(markers::NULL);
        let mut buffer = ByteBuffer::new(bytes);
        assert!(Amf0Decoder::new(&mut buffer).decode().is_err());
    }
}
