use crate::handshake::c0c1::{C0C1, HANDSHAKE_SIZE, RTMP_VERSION};
use crate::handshake::digest::{self, SERVER_FULL_KEY, SERVER_PARTIAL_KEY};
use crate::utils::fill_random;
use crate::{ByteBuffer, Error, Result};

/// Version field the server advertises in a digest S1
pub const SERVER_VERSION: u32 = 0x0d0e_0a0d;

/// Server handshake (S0 + S1 + S2)
#[derive(Debug, Clone)]
pub struct S0S1S2 {
    /// RTMP version (S0)
    pub version: u8,

    /// S1 block
    pub s1: Vec<u8>,

    /// S2 block
    pub s2: Vec<u8>,
}

impl S0S1S2 {
    /// Build the reply to a client's C0+C1.
    ///
    /// A digest C1 gets a digest S1 (server partial key) and an S2 whose trailer is
    /// keyed by the client digest. A version-0 C1 is echoed back as both S1 and S2.
    pub fn respond(c0c1: &C0C1) -> Result<Self> {
        if !c0c1.uses_digest() {
            return Ok(S0S1S2 {
                version: RTMP_VERSION,
                s1: c0c1.c1.clone(),
                s2: c0c1.c1.clone(),
            });
        }

        let client_digest = c0c1.client_digest()?;
        let key = digest::response_key(SERVER_FULL_KEY, &client_digest)?;

        let mut s1 = vec![0u8; HANDSHAKE_SIZE];
        fill_random(&mut s1[8..]);
        let mut header = ByteBuffer::with_capacity(8);
        header.write_u32_be(c0c1.timestamp());
        header.write_u32_be(SERVER_VERSION);
        s1[..8].copy_from_slice(header.as_slice());
        digest::embed_digest(&mut s1, SERVER_PARTIAL_KEY, 8)?;

        let mut s2 = vec![0u8; HANDSHAKE_SIZE];
        digest::create_response_block(&mut s2, &key)?;

        Ok(S0S1S2 {
            version: RTMP_VERSION,
            s1,
            s2,
        })
    }

    /// Parse S0+S1+S2 as read by a client
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() != 1 + 2 * HANDSHAKE_SIZE {
            return Err(Error::handshake(format!(
                "S0+S1+S2 is {} bytes, expected {}",
                data.len(),
                1 + 2 * HANDSHAKE_SIZE
            )));
        }
        if data[0] != RTMP_VERSION {
            return Err(Error::handshake(format!(
                "Server answered with RTMP version {}",
                data[0]
            )));
        }

        Ok(S0S1S2 {
            version: data[0],
            s1: data[1..1 + HANDSHAKE_SIZE].to_vec(),
            s2: data[1 + HANDSHAKE_SIZE..].to_vec(),
        })
    }

    /// S1 version field
    pub fn server_version(&self) -> u32 {
        u32::from_be_bytes([self.s1[4], self.s1[5], self.s1[6], self.s1[7]])
    }

    /// Client-side check of a reply to our own C0+C1.
    ///
    /// Only digest exchanges are verifiable; legacy servers are taken at their word.
    pub fn verify(&self, c0c1: &C0C1) -> Result<()> {
        if !c0c1.uses_digest() || self.server_version() == 0 {
            return Ok(());
        }

        if digest::locate_digest(&self.s1, SERVER_PARTIAL_KEY)?.is_none() {
            return Err(Error::handshake("S1 digest not found at either offset"));
        }

        let key = digest::response_key(SERVER_FULL_KEY, &c0c1.client_digest()?)?;
        if !digest::verify_response_block(&self.s2, &key)? {
            return Err(Error::handshake("S2 digest mismatch"));
        }
        Ok(())
    }

    /// Encode to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(1 + HANDSHAKE_SIZE * 2);
        result.push(self.version);
        result.extend_from_slice(&self.s1);
        result.extend_from_slice(&self.s2);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_reply_verifies() {
        let c0c1 = C0C1::create_client(true).unwrap();
        let reply = S0S1S2::respond(&c0c1).unwrap();

        assert_eq!(reply.server_version(), SERVER_VERSION);
        assert_eq!(&reply.s1[..4], &c0c1.c1[..4]);

        let parsed = S0S1S2::parse(&reply.encode()).unwrap();
        parsed.verify(&c0c1).unwrap();
    }

    #[test]
    fn test_legacy_reply_echoes() {
        let c0c1 = C0C1::create_client(false).unwrap();
        let reply = S0S1S2::respond(&c0c1).unwrap();
        assert_eq!(reply.s1, c0c1.c1);
        assert_eq!(reply.s2, c0c1.c1);
    }

    #[test]
    fn test_tampered_s2_rejected() {
        let c0c1 = C0C1::create_client(true).unwrap();
        let mut reply = S0S1S2::respond(&c0c1).unwrap();
        reply.s2[10] ^= 0x01;
        assert!(matches!(reply.verify(&c0c1), Err(Error::Handshake(_))));
    }

    #[test]
    fn test_digest_c1_without_digest_rejected() {
        let mut c0c1 = C0C1::create_client(true).unwrap();
        // Keep a non-zero version but destroy the payload the digest covers
        for b in c0c1.c1[8..].iter_mut() {
            *b = 0;
        }
        assert!(matches!(S0S1S2::respond(&c0c1), Err(Error::Handshake(_))));
    }
}
