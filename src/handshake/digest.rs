//! HMAC-SHA256 digest scheme embedded in C1/S1 and trailing C2/S2.

use crate::utils::{fill_random, hmac_sha256_parts};
use crate::Result;

/// Length of an embedded digest
pub const DIGEST_SIZE: usize = 32;

/// The two candidate bases a digest position is derived from, in search order
pub const DIGEST_BASES: [usize; 2] = [772, 8];

/// "Genuine Adobe Flash Player 001" followed by 32 fixed bytes
pub const CLIENT_FULL_KEY: &[u8] = b"Genuine Adobe Flash Player 001\
\xF0\xEE\xC2\x4A\x80\x68\xBE\xE8\x2E\x00\xD0\xD1\x02\x9E\x7E\x57\
\x6E\xEC\x5D\x2D\x29\x80\x6F\xAB\x93\xB8\xE6\x36\xCF\xEB\x31\xAE";

/// "Genuine Adobe Flash Media Server 001" followed by the same 32 bytes
pub const SERVER_FULL_KEY: &[u8] = b"Genuine Adobe Flash Media Server 001\
\xF0\xEE\xC2\x4A\x80\x68\xBE\xE8\x2E\x00\xD0\xD1\x02\x9E\x7E\x57\
\x6E\xEC\x5D\x2D\x29\x80\x6F\xAB\x93\xB8\xE6\x36\xCF\xEB\x31\xAE";

/// Client key used for C1 digests (text part only)
pub const CLIENT_PARTIAL_KEY: &[u8] = CLIENT_FULL_KEY.split_at(30).0;

/// Server key used for S1 digests (text part only)
pub const SERVER_PARTIAL_KEY: &[u8] = SERVER_FULL_KEY.split_at(36).0;

/// Digest position inside a 1536-byte block: sum of the 4 bytes at `base`, mod 728, past them.
pub fn digest_offset(block: &[u8], base: usize) -> usize {
    let sum: usize = block[base..base + 4].iter().map(|&b| b as usize).sum();
    sum % 728 + base + 4
}

/// HMAC over `block` with the 32-byte window at `gap` left out.
pub fn make_digest(key: &[u8], block: &[u8], gap: Option<usize>) -> Result<[u8; DIGEST_SIZE]> {
    match gap {
        Some(pos) => hmac_sha256_parts(key, &[&block[..pos], &block[pos + DIGEST_SIZE..]]),
        None => hmac_sha256_parts(key, &[block]),
    }
}

/// Position of a valid digest derived from `base`, if the block carries one there.
pub fn find_digest(block: &[u8], key: &[u8], base: usize) -> Result<Option<usize>> {
    let pos = digest_offset(block, base);
    let expected = make_digest(key, block, Some(pos))?;
    Ok((block[pos..pos + DIGEST_SIZE] == expected).then_some(pos))
}

/// Search both bases (772 first, then 8) and return the embedded digest.
pub fn locate_digest(block: &[u8], key: &[u8]) -> Result<Option<[u8; DIGEST_SIZE]>> {
    for base in DIGEST_BASES {
        if let Some(pos) = find_digest(block, key, base)? {
            let mut digest = [0u8; DIGEST_SIZE];
            digest.copy_from_slice(&block[pos..pos + DIGEST_SIZE]);
            return Ok(Some(digest));
        }
    }
    Ok(None)
}

/// Write a digest of the rest of `block` at the position derived from `base`.
pub fn embed_digest(block: &mut [u8], key: &[u8], base: usize) -> Result<usize> {
    let pos = digest_offset(block, base);
    let digest = make_digest(key, block, Some(pos))?;
    block[pos..pos + DIGEST_SIZE].copy_from_slice(&digest);
    Ok(pos)
}

/// Key for the C2/S2 trailer: HMAC of `full_key` over the peer's digest.
pub fn response_key(full_key: &[u8], peer_digest: &[u8; DIGEST_SIZE]) -> Result<[u8; DIGEST_SIZE]> {
    make_digest(full_key, peer_digest, None)
}

/// Random block whose last 32 bytes are an HMAC of the leading bytes.
pub fn create_response_block(block: &mut [u8], key: &[u8]) -> Result<()> {
    fill_random(block);
    let gap = block.len() - DIGEST_SIZE;
    let digest = make_digest(key, &block[..gap], None)?;
    block[gap..].copy_from_slice(&digest);
    Ok(())
}

/// Check the trailer written by `create_response_block`.
pub fn verify_response_block(block: &[u8], key: &[u8]) -> Result<bool> {
    let gap = block.len() - DIGEST_SIZE;
    let digest = make_digest(key, &block[..gap], None)?;
    Ok(block[gap..] == digest)
}
