mod amf0;
mod encoder;
mod decoder;

pub use amf0::*;
pub use encoder::*;
pub use decoder::*;

use crate::{ByteBuffer, Result};

/// Encode a sequence of values back to back, as command and data bodies are laid out.
pub fn encode_values(values: &[Amf0Value]) -> Result<Vec<u8>> {
    let mut encoder = Amf0Encoder::new();
    for value in values {
        encoder.encode(value)?;
    }
    Ok(encoder.into_bytes())
}

/// Decode a single value from the front of `bytes`, returning it with the number of bytes consumed.
pub fn decode_value(bytes: &[u8]) -> Result<(Amf0Value, usize)> {
    let mut buffer = ByteBuffer::new(bytes.to_vec());
    let value = Amf0Decoder::new(&mut buffer).decode()?;
    Ok((value, buffer.position()))
}

/// Decode values until `bytes` is exhausted. Any trailing garbage is an error.
pub fn decode_all(bytes: &[u8]) -> Result<Vec<Amf0Value>> {
    let mut buffer = ByteBuffer::new(bytes.to_vec());
    let mut decoder = Amf0Decoder::new(&mut buffer);
    let mut values = Vec::new();
    while decoder.has_remaining() {
        values.push(decoder.decode()?);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn round_trip(value: Amf0Value) {
        let bytes = encode_values(std::slice::from_ref(&value)).unwrap();
        let (decoded, consumed) = decode_value(&bytes).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn test_round_trip_scalars() {
        round_trip(Amf0Value::Number(3.5));
        round_trip(Amf0Value::Number(-0.25));
        round_trip(Amf0Value::String("NetConnection.Connect.Success".into()));
        round_trip(Amf0Value::String(String::new()));
        round_trip(Amf0Value::Boolean(true));
        round_trip(Amf0Value::Boolean(false));
        round_trip(Amf0Value::Null);
        round_trip(Amf0Value::Undefined);
        round_trip(Amf0Value::Date(1_700_000_000_000.0, 0));
    }

    #[test]
    fn test_round_trip_nested_map() {
        let mut inner = HashMap::new();
        inner.insert("level".to_string(), Amf0Value::from("status"));
        inner.insert("objectEncoding".to_string(), Amf0Value::from(3.0));

        let mut outer = HashMap::new();
        outer.insert("info".to_string(), Amf0Value::Object(inner.clone()));
        outer.insert("list".to_string(), Amf0Value::Array(vec![Amf0Value::Null, Amf0Value::from(true)]));
        outer.insert("meta".to_string(), Amf0Value::EcmaArray(inner));

        round_trip(Amf0Value::Object(outer));
    }

    #[test]
    fn test_decode_all_sequence() {
        let values = vec![
            Amf0Value::from("_result"),
            Amf0Value::from(1.0),
            Amf0Value::Null,
            Amf0Value::from(1.0),
        ];
        let bytes = encode_values(&values).unwrap();
        assert_eq!(decode_all(&bytes).unwrap(), values);
    }

    #[test]
    fn test_truncated_input_fails() {
        let bytes = encode_values(&[Amf0Value::object([
            ("app", Amf0Value::from("live")),
            ("tcUrl", Amf0Value::from("rtmp://localhost/live")),
        ])])
        .unwrap();

        for cut in 0..bytes.len() {
            assert!(decode_value(&bytes[..cut]).is_err(), "cut at {} decoded", cut);
        }
    }
}
