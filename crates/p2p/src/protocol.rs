//! The `aqua` block exchange protocol: message codes, payloads and the
//! status handshake.

use alloy_primitives::{B256, U256};
use alloy_rlp::{BufMut, Decodable, Encodable, RlpDecodable, RlpEncodable};
use aquachain_types::Block;

use crate::{P2pError, Result};

/// Protocol name advertised in the devp2p capability set.
pub const PROTOCOL_NAME: &str = "aqua";

/// Highest protocol version this node speaks.
pub const PROTOCOL_VERSION: u32 = 64;

/// Oldest protocol version this node still accepts.
pub const MIN_PROTOCOL_VERSION: u32 = 63;

/// Message codes of the aqua protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MsgCode {
    /// Handshake status exchange.
    Status = 0x00,
    /// Announcement of new block hashes.
    NewBlockHashes = 0x01,
    /// Transaction broadcast.
    Tx = 0x02,
    /// Header request.
    GetBlockHeaders = 0x03,
    /// Header response.
    BlockHeaders = 0x04,
    /// Body request.
    GetBlockBodies = 0x05,
    /// Body response.
    BlockBodies = 0x06,
    /// Full block propagation.
    NewBlock = 0x07,
    /// Receipt request.
    GetReceipts = 0x0d,
    /// Receipt response.
    Receipts = 0x0e,
}

impl MsgCode {
    /// Parse a wire code byte.
    pub fn from_byte(code: u8) -> Result<Self> {
        Ok(match code {
            0x00 => MsgCode::Status,
            0x01 => MsgCode::NewBlockHashes,
            0x02 => MsgCode::Tx,
            0x03 => MsgCode::GetBlockHeaders,
            0x04 => MsgCode::BlockHeaders,
            0x05 => MsgCode::GetBlockBodies,
            0x06 => MsgCode::BlockBodies,
            0x07 => MsgCode::NewBlock,
            0x0d => MsgCode::GetReceipts,
            0x0e => MsgCode::Receipts,
            other => return Err(P2pError::InvalidMsgCode(other)),
        })
    }
}

/// The handshake payload exchanged on connect.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct Status {
    /// Advertised protocol version.
    pub protocol_version: u32,
    /// Network (chain) id.
    pub network_id: u64,
    /// Total difficulty of the advertised head.
    pub td: U256,
    /// Hash of the advertised head block.
    pub current_block: B256,
    /// Hash of the genesis block.
    pub genesis_block: B256,
}

/// Validate a remote status against ours and negotiate the protocol
/// version: both sides use the lower of the two.
pub fn negotiate(ours: &Status, theirs: &Status) -> Result<u32> {
    if theirs.network_id != ours.network_id {
        return Err(P2pError::NetworkMismatch {
            ours: ours.network_id,
            theirs: theirs.network_id,
        });
    }
    if theirs.genesis_block != ours.genesis_block {
        return Err(P2pError::GenesisMismatch);
    }
    let version = ours.protocol_version.min(theirs.protocol_version);
    if version < MIN_PROTOCOL_VERSION {
        return Err(P2pError::IncompatibleVersion(theirs.protocol_version));
    }
    Ok(version)
}

/// One entry of a `NewBlockHashes` announcement.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct NewBlockHash {
    /// Hash of the announced block.
    pub hash: B256,
    /// Its number.
    pub number: u64,
}

/// A `NewBlock` propagation: the block plus its total difficulty.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct NewBlock {
    /// The propagated block.
    pub block: Block,
    /// Total difficulty including the block.
    pub td: U256,
}

/// Origin of a header request: a hash or a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashOrNumber {
    /// Request anchored at a block hash.
    Hash(B256),
    /// Request anchored at a block number.
    Number(u64),
}

impl Encodable for HashOrNumber {
    fn encode(&self, out: &mut dyn BufMut) {
        match self {
            HashOrNumber::Hash(hash) => hash.encode(out),
            HashOrNumber::Number(number) => number.encode(out),
        }
    }

    fn length(&self) -> usize {
        match self {
            HashOrNumber::Hash(hash) => hash.length(),
            HashOrNumber::Number(number) => number.length(),
        }
    }
}

impl Decodable for HashOrNumber {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        // a hash is a 32-byte string (prefix 0xa0); anything shorter is
        // a number
        match buf.first() {
            Some(&0xa0) => Ok(HashOrNumber::Hash(B256::decode(buf)?)),
            _ => Ok(HashOrNumber::Number(u64::decode(buf)?)),
        }
    }
}

/// A `GetBlockHeaders` request.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct GetBlockHeaders {
    /// Block the query starts from.
    pub origin: HashOrNumber,
    /// Maximum headers to return.
    pub amount: u64,
    /// Blocks to skip between consecutive headers.
    pub skip: u64,
    /// Walk towards genesis instead of the head.
    pub reverse: bool,
}
