//! Block header and its versioned hashing.
//!
//! The canonical hash of a version-1 header is the Keccak-256 of its
//! full RLP encoding. From version 2 (the Argon2id era) the canonical
//! hash *is* the proof-of-work digest: the versioned hash of the
//! 40-byte seed `hash_no_nonce || little_endian(nonce)`. The version is
//! not serialized; importers stamp it from the chain config before
//! hashing.

use alloy_primitives::{keccak256, Address, Bloom, Bytes, B256, B64, U256};
use alloy_rlp::{BufMut, Decodable, Encodable, Header as RlpHeader};
use aquachain_crypto::HashKind;
use aquachain_params::HeaderVersion;

/// 8-byte proof-of-work nonce, stored big-endian like the original.
pub type BlockNonce = B64;

/// Keccak-256 of the RLP encoding of an empty header list; the
/// uncle-hash of a block without uncles.
pub const EMPTY_UNCLE_HASH: B256 = alloy_primitives::b256!(
    "1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347"
);

/// A block header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Hash of the parent block.
    pub parent_hash: B256,
    /// Hash of the uncle list.
    pub uncle_hash: B256,
    /// Address credited with the block reward.
    pub coinbase: Address,
    /// State trie root after executing this block.
    pub state_root: B256,
    /// Transaction trie root.
    pub tx_root: B256,
    /// Receipt trie root.
    pub receipt_root: B256,
    /// Union of the bloom filters of all logs in the block.
    pub bloom: Bloom,
    /// Proof-of-work difficulty.
    pub difficulty: U256,
    /// Block number.
    pub number: u64,
    /// Gas limit for the block.
    pub gas_limit: u64,
    /// Total gas used by all transactions.
    pub gas_used: u64,
    /// Unix timestamp in seconds.
    pub time: u64,
    /// Arbitrary extra data, at most 32 bytes.
    pub extra_data: Bytes,
    /// Must be all-zero from version 2; not covered by the PoW seed.
    pub mix_digest: B256,
    /// Proof-of-work nonce.
    pub nonce: BlockNonce,
    /// Hash function version, derived from the chain config at this
    /// header's number. Not part of the RLP encoding.
    pub version: HeaderVersion,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            parent_hash: B256::ZERO,
            uncle_hash: EMPTY_UNCLE_HASH,
            coinbase: Address::ZERO,
            state_root: B256::ZERO,
            tx_root: B256::ZERO,
            receipt_root: B256::ZERO,
            bloom: Bloom::ZERO,
            difficulty: U256::ZERO,
            number: 0,
            gas_limit: 0,
            gas_used: 0,
            time: 0,
            extra_data: Bytes::new(),
            mix_digest: B256::ZERO,
            nonce: BlockNonce::ZERO,
            version: HeaderVersion::Keccak256,
        }
    }
}

impl Header {
    /// Stamp the fork-derived hash version onto this header.
    pub fn with_version(mut self, version: HeaderVersion) -> Self {
        self.version = version;
        self
    }

    /// The proof-of-work nonce as an integer.
    pub fn nonce_u64(&self) -> u64 {
        u64::from_be_bytes(self.nonce.0)
    }

    /// Set the nonce from an integer, stored big-endian.
    pub fn set_nonce(&mut self, nonce: u64) {
        self.nonce = B64::from(nonce.to_be_bytes());
    }

    /// The canonical hash of this header at its stamped version.
    pub fn hash(&self) -> B256 {
        match self.version {
            HeaderVersion::Keccak256 => keccak256(alloy_rlp::encode(self)),
            v => HashKind::from_version(v.as_u8())
                .expect("every HeaderVersion maps to a hash kind")
                .hash(&self.pow_seed()),
        }
    }

    /// Keccak-256 of the RLP of the header with mix-digest and nonce
    /// omitted; the first 32 bytes of the proof-of-work seed.
    pub fn hash_no_nonce(&self) -> B256 {
        let payload_length = self.fields_length(false);
        let mut out = Vec::with_capacity(payload_length + 3);
        RlpHeader {
            list: true,
            payload_length,
        }
        .encode(&mut out);
        self.encode_fields(&mut out, false);
        keccak256(&out)
    }

    /// The 40-byte seed hashed by the versioned proof-of-work:
    /// `hash_no_nonce || little_endian(nonce)`.
    pub fn pow_seed(&self) -> [u8; 40] {
        let mut seed = [0u8; 40];
        seed[..32].copy_from_slice(self.hash_no_nonce().as_slice());
        seed[32..].copy_from_slice(&self.nonce_u64().to_le_bytes());
        seed
    }

    fn fields_length(&self, with_seal: bool) -> usize {
        let mut len = self.parent_hash.length()
            + self.uncle_hash.length()
            + self.coinbase.length()
            + self.state_root.length()
            + self.tx_root.length()
            + self.receipt_root.length()
            + self.bloom.length()
            + self.difficulty.length()
            + self.number.length()
            + self.gas_limit.length()
            + self.gas_used.length()
            + self.time.length()
            + self.extra_data.length();
        if with_seal {
            len += self.mix_digest.length() + self.nonce.length();
        }
        len
    }

    fn encode_fields(&self, out: &mut dyn BufMut, with_seal: bool) {
        self.parent_hash.encode(out);
        self.uncle_hash.encode(out);
        self.coinbase.encode(out);
        self.state_root.encode(out);
        self.tx_root.encode(out);
        self.receipt_root.encode(out);
        self.bloom.encode(out);
        self.difficulty.encode(out);
        self.number.encode(out);
        self.gas_limit.encode(out);
        self.gas_used.encode(out);
        self.time.encode(out);
        self.extra_data.encode(out);
        if with_seal {
            self.mix_digest.encode(out);
            self.nonce.encode(out);
        }
    }
}

impl Encodable for Header {
    fn encode(&self, out: &mut dyn BufMut) {
        let payload_length = self.fields_length(true);
        RlpHeader {
            list: true,
            payload_length,
        }
        .encode(out);
        self.encode_fields(out, true);
    }

    fn length(&self) -> usize {
        let payload_length = self.fields_length(true);
        RlpHeader {
            list: true,
            payload_length,
        }
        .length()
            + payload_length
    }
}

impl Decodable for Header {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let rlp_head = RlpHeader::decode(buf)?;
        if !rlp_head.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        let started_len = buf.len();
        let this = Self {
            parent_hash: Decodable::decode(buf)?,
            uncle_hash: Decodable::decode(buf)?,
            coinbase: Decodable::decode(buf)?,
            state_root: Decodable::decode(buf)?,
            tx_root: Decodable::decode(buf)?,
            receipt_root: Decodable::decode(buf)?,
            bloom: Decodable::decode(buf)?,
            difficulty: Decodable::decode(buf)?,
            number: Decodable::decode(buf)?,
            gas_limit: Decodable::decode(buf)?,
            gas_used: Decodable::decode(buf)?,
            time: Decodable::decode(buf)?,
            extra_data: Decodable::decode(buf)?,
            mix_digest: Decodable::decode(buf)?,
            nonce: Decodable::decode(buf)?,
            version: HeaderVersion::Keccak256,
        };
        let consumed = started_len - buf.len();
        if consumed != rlp_head.payload_length {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: rlp_head.payload_length,
                got: consumed,
            });
        }
        Ok(this)
    }
}
