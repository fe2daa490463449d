/// Session progress. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Nothing exchanged yet
    Init,

    /// Handshake complete
    HandshakeDone,

    /// connect / createStream / publish or play negotiated
    CommandDone,

    /// Stream descriptors known (probed or written)
    CodecDataDone,
}

impl Stage {
    pub fn next(&self) -> Stage {
        match self {
            Stage::Init => Stage::HandshakeDone,
            Stage::HandshakeDone => Stage::CommandDone,
            Stage::CommandDone | Stage::CodecDataDone => Stage::CodecDataDone,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Accepted the transport; answers connect/publish/play
    Server,

    /// Dialed the transport; sends connect
    Client,
}

/// Which direction a `prepare` call is heading towards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareMode {
    Reading,
    Writing,
}
