//! Blocks and block bodies.

use alloy_primitives::B256;
use alloy_rlp::{BufMut, Decodable, Encodable, Header as RlpHeader, RlpDecodable, RlpEncodable};
use once_cell::sync::OnceCell;

use crate::header::{Header, EMPTY_UNCLE_HASH};
use crate::transaction::Transaction;
use crate::trie::{derive_root, rlp_list_hash, EMPTY_ROOT_HASH};

/// The transactions and uncles of a block, as exchanged on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct Body {
    /// Included transactions.
    pub transactions: Vec<Transaction>,
    /// Included uncle headers.
    pub uncles: Vec<Header>,
}

impl Body {
    /// Root of the transaction trie for this body.
    pub fn tx_root(&self) -> B256 {
        if self.transactions.is_empty() {
            EMPTY_ROOT_HASH
        } else {
            derive_root(&self.transactions)
        }
    }

    /// Hash of the uncle list for this body.
    pub fn uncle_hash(&self) -> B256 {
        if self.uncles.is_empty() {
            EMPTY_UNCLE_HASH
        } else {
            rlp_list_hash(&self.uncles)
        }
    }

    /// Whether this body matches the roots a header commits to.
    pub fn matches_header(&self, header: &Header) -> bool {
        self.tx_root() == header.tx_root && self.uncle_hash() == header.uncle_hash
    }
}

/// A complete block.
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// The block header.
    pub header: Header,
    /// Transactions and uncles.
    pub body: Body,

    hash: OnceCell<B256>,
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header && self.body == other.body
    }
}

impl Eq for Block {}

impl Block {
    /// Assemble a block from a header and body.
    pub fn new(header: Header, body: Body) -> Self {
        Self {
            header,
            body,
            hash: OnceCell::new(),
        }
    }

    /// The canonical hash of the block at the header's stamped version,
    /// memoized because the Argon2id variants are not free.
    pub fn hash(&self) -> B256 {
        *self.hash.get_or_init(|| self.header.hash())
    }

    /// Block number shorthand.
    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// The included transactions.
    pub fn transactions(&self) -> &[Transaction] {
        &self.body.transactions
    }

    /// The included uncle headers.
    pub fn uncles(&self) -> &[Header] {
        &self.body.uncles
    }

    /// Re-stamp the header version, invalidating the memoized hash.
    pub fn with_version(mut self, version: aquachain_params::HeaderVersion) -> Self {
        self.header.version = version;
        self.hash = OnceCell::new();
        self
    }
}

impl Encodable for Block {
    fn encode(&self, out: &mut dyn BufMut) {
        let payload_length = self.header.length()
            + self.body.transactions.length()
            + self.body.uncles.length();
        RlpHeader {
            list: true,
            payload_length,
        }
        .encode(out);
        self.header.encode(out);
        self.body.transactions.encode(out);
        self.body.uncles.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.header.length()
            + self.body.transactions.length()
            + self.body.uncles.length();
        RlpHeader {
            list: true,
            payload_length,
        }
        .length()
            + payload_length
    }
}

impl Decodable for Block {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let rlp_head = RlpHeader::decode(buf)?;
        if !rlp_head.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        let started_len = buf.len();
        let header = Header::decode(buf)?;
        let transactions = Vec::<Transaction>::decode(buf)?;
        let uncles = Vec::<Header>::decode(buf)?;
        let consumed = started_len - buf.len();
        if consumed != rlp_head.payload_length {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: rlp_head.payload_length,
                got: consumed,
            });
        }
        Ok(Self::new(
            header,
            Body {
                transactions,
                uncles,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, U256};
    use aquachain_crypto::SecretKey;
    use crate::transaction::Signer;
    use rand::rngs::OsRng;

    fn sample_block() -> Block {
        let key = SecretKey::generate(&mut OsRng);
        let tx = Transaction::new(
            0,
            U256::from(1),
            21_000,
            Some(Address::repeat_byte(0x01)),
            U256::from(5),
            Bytes::new(),
        )
        .sign(&Signer::Homestead, &key)
        .unwrap();
        let body = Body {
            transactions: vec![tx],
            uncles: vec![],
        };
        let header = Header {
            number: 1,
            tx_root: body.tx_root(),
            uncle_hash: body.uncle_hash(),
            ..Default::default()
        };
        Block::new(header, body)
    }

    #[test]
    fn test_rlp_roundtrip() {
        let block = sample_block();
        let encoded = alloy_rlp::encode(&block);
        let decoded = Block::decode(&mut encoded.as_slice()).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn test_body_matches_header() {
        let block = sample_block();
        assert!(block.body.matches_header(&block.header));

        let mut other = block.body.clone();
        other.transactions.clear();
        assert!(!other.matches_header(&block.header));
    }

    #[test]
    fn test_empty_body_roots() {
        let body = Body::default();
        assert_eq!(body.tx_root(), EMPTY_ROOT_HASH);
        assert_eq!(body.uncle_hash(), EMPTY_UNCLE_HASH);
    }
}
