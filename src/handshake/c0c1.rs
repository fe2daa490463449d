use crate::handshake::digest::{self, CLIENT_PARTIAL_KEY, DIGEST_SIZE};
use crate::utils::{current_timestamp, fill_random};
use crate::{ByteBuffer, Error, Result};

/// RTMP version
pub const RTMP_VERSION: u8 = 3;

/// Handshake packet size (C1/S1/C2/S2)
pub const HANDSHAKE_SIZE: usize = 1536;

/// Version field a digest-capable client advertises in C1
pub const CLIENT_VERSION: u32 = 0x8000_0702;

/// Client handshake (C0 + C1)
#[derive(Debug, Clone)]
pub struct C0C1 {
    /// RTMP version (C0)
    pub version: u8,

    /// The whole 1536-byte C1 block: time, version, payload
    pub c1: Vec<u8>,
}

impl C0C1 {
    /// Parse C0+C1 from bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() != 1 + HANDSHAKE_SIZE {
            return Err(Error::handshake(format!(
                "C0+C1 is {} bytes, expected {}",
                data.len(),
                1 + HANDSHAKE_SIZE
            )));
        }

        let version = data[0];
        if version != RTMP_VERSION {
            return Err(Error::handshake(format!(
                "Unsupported RTMP version: {}, expected {}",
                version, RTMP_VERSION
            )));
        }

        Ok(C0C1 {
            version,
            c1: data[1..].to_vec(),
        })
    }

    /// Create C0+C1 for a client. With `with_digest` the block carries a
    /// client-key digest; otherwise it takes the legacy version-0 form.
    pub fn create_client(with_digest: bool) -> Result<Self> {
        let mut c1 = vec![0u8; HANDSHAKE_SIZE];
        fill_random(&mut c1[8..]);

        let mut header = ByteBuffer::with_capacity(8);
        header.write_u32_be(current_timestamp());
        header.write_u32_be(if with_digest { CLIENT_VERSION } else { 0 });
        c1[..8].copy_from_slice(header.as_slice());

        if with_digest {
            digest::embed_digest(&mut c1, CLIENT_PARTIAL_KEY, 8)?;
        }

        Ok(C0C1 {
            version: RTMP_VERSION,
            c1,
        })
    }

    /// C1 time field
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.c1[0], self.c1[1], self.c1[2], self.c1[3]])
    }

    /// C1 version field; zero selects the legacy handshake
    pub fn peer_version(&self) -> u32 {
        u32::from_be_bytes([self.c1[4], self.c1[5], self.c1[6], self.c1[7]])
    }

    /// Whether this C1 is expected to carry a digest
    pub fn uses_digest(&self) -> bool {
        self.peer_version() != 0
    }

    /// Locate the client digest, trying base 772 then base 8.
    pub fn client_digest(&self) -> Result<[u8; DIGEST_SIZE]> {
        digest::locate_digest(&self.c1, CLIENT_PARTIAL_KEY)?
            .ok_or_else(|| Error::handshake("C1 digest not found at either offset"))
    }

    /// Encode to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(1 + HANDSHAKE_SIZE);
        result.push(self.version);
        result.extend_from_slice(&self.c1);
        result
    }
}
