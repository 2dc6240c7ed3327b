//! Wire-level error types

use thiserror::Error;

/// Errors from message encoding, handshaking and packet framing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum P2pError {
    /// Remote speaks a different network
    #[error("network id mismatch: ours {ours}, theirs {theirs}")]
    NetworkMismatch {
        /// Our network id
        ours: u64,
        /// The remote's network id
        theirs: u64,
    },

    /// Remote runs on a different genesis block
    #[error("genesis mismatch")]
    GenesisMismatch,

    /// No protocol version overlap
    #[error("incompatible protocol version {0}")]
    IncompatibleVersion(u32),

    /// Unknown message code on the wire
    #[error("invalid message code {0:#04x}")]
    InvalidMsgCode(u8),

    /// Packet smaller than its frame
    #[error("packet too small")]
    PacketTooSmall,

    /// Packet larger than the datagram limit
    #[error("packet too large: {0} bytes")]
    PacketTooLarge(usize),

    /// Frame hash does not cover the packet content
    #[error("bad packet hash")]
    BadHash,

    /// Packet signature failed recovery
    #[error("bad packet signature")]
    BadSignature,

    /// Packet expiration lies in the past
    #[error("expired packet")]
    Expired,

    /// Unknown discovery packet type byte
    #[error("unknown discovery packet type {0}")]
    UnknownPacketType(u8),

    /// RLP payload failed to decode
    #[error("malformed payload: {0}")]
    Malformed(String),
}
