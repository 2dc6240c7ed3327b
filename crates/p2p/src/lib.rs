//! The `aqua` wire protocol surface and the UDP discovery framing.
//!
//! This crate defines what the chain core requires from the transport:
//! the message codes and payload encodings of the block/transaction
//! exchange protocol, the status handshake acceptance rules, and the
//! hash-then-signature framing of discovery packets. The byte transport
//! and its encryption live below this layer.

pub mod discover;
pub mod error;
pub mod protocol;

pub use discover::{
    decode_packet, encode_packet, DiscoverPacket, Endpoint, NodeId, PacketFormat,
    MAX_PACKET_SIZE, RESP_TIMEOUT,
};
pub use error::P2pError;
pub use protocol::{
    negotiate, GetBlockHeaders, HashOrNumber, MsgCode, NewBlock, NewBlockHash, Status,
    PROTOCOL_NAME, PROTOCOL_VERSION,
};

/// Result type for wire-level operations.
pub type Result<T> = std::result::Result<T, P2pError>;
