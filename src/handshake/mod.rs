//! RTMP handshake: C0/C1/C2 from the initiator, S0/S1/S2 from the responder.

mod c0c1;
mod s0s1s2;
pub mod digest;

pub use c0c1::*;
pub use s0s1s2::*;

use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::Result;

/// What a completed handshake learned about the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeInfo {
    /// Peer's C1/S1 version field
    pub peer_version: u32,

    /// Peer's C1/S1 time field
    pub peer_time: u32,

    /// True when the digest scheme was used
    pub digest: bool,
}

/// Responder side: read C0C1, send S0S1S2, read C2.
pub async fn server_handshake<S>(stream: &mut S) -> Result<HandshakeInfo>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut c0c1_bytes = vec![0u8; 1 + HANDSHAKE_SIZE];
    stream.read_exact(&mut c0c1_bytes).await?;
    let c0c1 = C0C1::parse(&c0c1_bytes)?;
    trace!("< C0C1 version={:#010x}", c0c1.peer_version());

    let reply = S0S1S2::respond(&c0c1)?;
    stream.write_all(&reply.encode()).await?;
    stream.flush().await?;

    let mut c2 = vec![0u8; HANDSHAKE_SIZE];
    stream.read_exact(&mut c2).await?;
    if c2 != reply.s1 {
        trace!("C2 does not mirror S1, accepting anyway");
    }

    let info = HandshakeInfo {
        peer_version: c0c1.peer_version(),
        peer_time: c0c1.timestamp(),
        digest: c0c1.uses_digest(),
    };
    debug!("server handshake done: {:?}", info);
    Ok(info)
}

/// Initiator side: send C0C1, read S0S1S2, send C2 mirroring S1.
pub async fn client_handshake<S>(stream: &mut S, with_digest: bool) -> Result<HandshakeInfo>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let c0c1 = C0C1::create_client(with_digest)?;
    stream.write_all(&c0c1.encode()).await?;
    stream.flush().await?;

    let mut reply_bytes = vec![0u8; 1 + 2 * HANDSHAKE_SIZE];
    stream.read_exact(&mut reply_bytes).await?;
    let reply = S0S1S2::parse(&reply_bytes)?;
    trace!("< S0S1S2 server version={:#010x}", reply.server_version());
    reply.verify(&c0c1)?;

    stream.write_all(&reply.s1).await?;
    stream.flush().await?;

    let info = HandshakeInfo {
        peer_version: reply.server_version(),
        peer_time: u32::from_be_bytes([reply.s1[0], reply.s1[1], reply.s1[2], reply.s1[3]]),
        digest: with_digest && reply.server_version() != 0,
    };
    debug!("client handshake done: {:?}", info);
    Ok(info)
}
