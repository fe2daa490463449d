use hmac::{Hmac, Mac};
use rand::{RngCore, rng};
use sha2::Sha256;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Overwrite `buf` with random bytes
pub fn fill_random(buf: &mut [u8]) {
    rng().fill_bytes(buf);
}

/// HMAC-SHA256 over the concatenation of `parts`, without copying them together.
pub fn hmac_sha256_parts(key: &[u8], parts: &[&[u8]]) -> Result<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::handshake(format!("Invalid HMAC key: {}", e)))?;
    for part in parts {
        mac.update(part);
    }

    let mut output = [0u8; 32];
    output.copy_from_slice(&mac.finalize().into_bytes());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_random() {
        let mut first = [0u8; 32];
        let mut second = [0u8; 32];
        fill_random(&mut first);
        fill_random(&mut second);
        assert_ne!(first, second);
    }

    #[test]
    fn test_hmac_sha256() {
        let key = b"key";
        let data = b"The quick brown fox jumps over the lazy dog";
        let hmac = hmac_sha256_parts(key, &[data]).unwrap();

        // Known test vector
        let expected = [
            0xf7, 0xbc, 0x83, 0xf4, 0x30, 0x53, 0x84, 0x24,
            0xb1, 0x32, 0x98, 0xe6, 0xaa, 0x6f, 0xb1, 0x43,
            0xef, 0x4d, 0x59, 0xa1, 0x49, 0x46, 0x17, 0x59,
            0x97, 0x47, 0x9d, 0xbc, 0x2d, 0x1a, 0x3c, 0xd8
        ];

        assert_eq!(hmac, expected);
    }

    #[test]
    fn test_hmac_parts_match_contiguous() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let whole = hmac_sha256_parts(b"key", &[data]).unwrap();
        let split = hmac_sha256_parts(b"key", &[&data[..10], &data[10..]]).unwrap();
        assert_eq!(whole, split);
    }
}
