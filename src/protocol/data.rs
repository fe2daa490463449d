use crate::amf::{Amf0Decoder, Amf0Encoder, Amf0Object, Amf0Value};
use crate::{ByteBuffer, Error, Result};

pub const DATA_ON_METADATA: &str = "onMetaData";
pub const DATA_SET_DATA_FRAME: &str = "@setDataFrame";
pub const DATA_SAMPLE_ACCESS: &str = "|RtmpSampleAccess";

/// AMF0 data message: a name followed by values
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpData {
    pub name: String,
    pub values: Vec<Amf0Value>,
}

impl RtmpData {
    /// Create new data message
    pub fn new(name: impl Into<String>) -> Self {
        RtmpData {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Create onMetaData message
    pub fn on_metadata(metadata: Amf0Object) -> Self {
        let mut data = RtmpData::new(DATA_ON_METADATA);
        data.values.push(Amf0Value::Object(metadata));
        data
    }

    /// `|RtmpSampleAccess true true`, sent to players after play starts
    pub fn sample_access() -> Self {
        let mut data = RtmpData::new(DATA_SAMPLE_ACCESS);
        data.values.push(Amf0Value::Boolean(true));
        data.values.push(Amf0Value::Boolean(true));
        data
    }

    /// Encode data message to bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut encoder = Amf0Encoder::new();
        encoder.encode(&Amf0Value::String(self.name.clone()))?;
        for value in &self.values {
            encoder.encode(value)?;
        }
        Ok(encoder.into_bytes())
    }

    /// Decode data message from bytes
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut buffer = ByteBuffer::new(data.to_vec());
        let mut decoder = Amf0Decoder::new(&mut buffer);

        let name = decoder
            .decode()?
            .as_string()
            .ok_or_else(|| Error::protocol("data message name must be a string"))?
            .to_string();

        let mut values = Vec::new();
        while decoder.has_remaining() {
            values.push(decoder.decode()?);
        }

        Ok(RtmpData { name, values })
    }

    /// Metadata object carried by `onMetaData` or `@setDataFrame onMetaData`
    pub fn metadata(&self) -> Option<&Amf0Object> {
        match self.name.as_str() {
            DATA_ON_METADATA => self.values.iter().find_map(|v| v.as_object()),
            DATA_SET_DATA_FRAME => {
                let mut iter = self.values.iter();
                match iter.next().and_then(|v| v.as_string()) {
                    Some(DATA_ON_METADATA) => iter.find_map(|v| v.as_object()),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}
