use std::collections::HashMap;

/// Key/value body shared by AMF0 objects and ECMA arrays
pub type Amf0Object = HashMap<String, Amf0Value>;

/// AMF0 data types
#[derive(Debug, Clone, PartialEq)]
pub enum Amf0Value {
    Number(f64),              // 0x00
    Boolean(bool),            // 0x01
    String(String),           // 0x02
    Object(Amf0Object),       // 0x03
    Null,                     // 0x05
    Undefined,                // 0x06
    EcmaArray(Amf0Object),    // 0x08
    Array(Vec<Amf0Value>),    // 0x0A (strict array)
    Date(f64, i16),           // 0x0B, milliseconds since epoch + timezone
    LongString(String),       // 0x0C
}

// AMF0 type markers
pub mod markers {
    pub const NUMBER: u8 = 0x00;
    pub const BOOLEAN: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const OBJECT: u8 = 0x03;
    pub const MOVIE_CLIP: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const UNDEFINED: u8 = 0x06;
    pub const REFERENCE: u8 = 0x07;
    pub const ECMA_ARRAY: u8 = 0x08;
    pub const OBJECT_END: u8 = 0x09;
    pub const STRICT_ARRAY: u8 = 0x0A;
    pub const DATE: u8 = 0x0B;
    pub const LONG_STRING: u8 = 0x0C;
    pub const UNSUPPORTED: u8 = 0x0D;
    pub const RECORDSET: u8 = 0x0E;
    pub const XML_DOCUMENT: u8 = 0x0F;
    pub const TYPED_OBJECT: u8 = 0x10;
    pub const AVMPLUS_OBJECT: u8 = 0x11;
}

/// Longest string written with the 2-byte length form; anything longer is a long string.
pub const MAX_SHORT_STRING_LEN: usize = 65536;

impl Amf0Value {
    /// Build an object from key/value pairs
    pub fn object<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Amf0Value)>,
    {
        Amf0Value::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build an ECMA array from key/value pairs
    pub fn ecma_array<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Amf0Value)>,
    {
        Amf0Value::EcmaArray(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Extract number value
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Amf0Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract string reference
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Amf0Value::String(s) | Amf0Value::LongString(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Extract boolean value
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Amf0Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract object reference (objects and ECMA arrays alike)
    pub fn as_object(&self) -> Option<&Amf0Object> {
        match self {
            Amf0Value::Object(obj) | Amf0Value::EcmaArray(obj) => Some(obj),
            _ => None,
        }
    }

    /// Extract array reference
    pub fn as_array(&self) -> Option<&Vec<Amf0Value>> {
        match self {
            Amf0Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Get property from object
    pub fn get_property(&self, key: &str) -> Option<&Amf0Value> {
        self.as_object().and_then(|obj| obj.get(key))
    }

    /// Check if null or undefined
    pub fn is_null(&self) -> bool {
        matches!(self, Amf0Value::Null | Amf0Value::Undefined)
    }
}

impl From<f64> for Amf0Value {
    fn from(n: f64) -> Self {
        Amf0Value::Number(n)
    }
}

impl From<u32> for Amf0Value {
    fn from(n: u32) -> Self {
        Amf0Value::Number(n as f64)
    }
}

impl From<bool> for Amf0Value {
    fn from(b: bool) -> Self {
        Amf0Value::Boolean(b)
    }
}

impl From<&str> for Amf0Value {
    fn from(s: &str) -> Self {
        Amf0Value::String(s.to_string())
    }
}

impl From<String> for Amf0Value {
    fn from(s: String) -> Self {
        Amf0Value::String(s)
    }
}

impl From<Amf0Object> for Amf0Value {
    fn from(obj: Amf0Object) -> Self {
        Amf0Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let value = Amf0Value::object([
            ("code", Amf0Value::from("NetStream.Play.Start")),
            ("capabilities", Amf0Value::from(31u32)),
        ]);

        assert_eq!(
            value.get_property("code").and_then(|v| v.as_string()),
            Some("NetStream.Play.Start")
        );
        assert_eq!(value.get_property("capabilities").and_then(|v| v.as_number()), Some(31.0));
        assert!(value.get_property("missing").is_none());
        assert!(Amf0Value::Undefined.is_null());
        assert_eq!(Amf0Value::LongString("x".into()).as_string(), Some("x"));
    }
}
