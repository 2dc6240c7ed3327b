//! Transaction receipts and logs.

use alloy_primitives::{Address, Bloom, BloomInput, Bytes, B256};
use alloy_rlp::{BufMut, Decodable, Encodable, Header as RlpHeader, RlpDecodable, RlpEncodable};

/// A log emitted during transaction execution.
///
/// Only `address`, `topics` and `data` are consensus fields covered by
/// the receipt encoding; the rest is derived context filled in when the
/// containing block is known, and `removed` is set when a reorg undoes
/// the block that carried the log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Log {
    /// Address that emitted the log.
    pub address: Address,
    /// Indexed topics.
    pub topics: Vec<B256>,
    /// Unindexed payload.
    pub data: Bytes,

    /// Number of the block carrying the log.
    pub block_number: u64,
    /// Hash of the transaction that emitted the log.
    pub tx_hash: B256,
    /// Index of that transaction within its block.
    pub tx_index: u64,
    /// Hash of the block carrying the log.
    pub block_hash: B256,
    /// Index of the log within the block.
    pub index: u64,
    /// True when the log was undone by a chain reorganization.
    pub removed: bool,
}

impl Log {
    fn fields_length(&self) -> usize {
        self.address.length() + self.topics.length() + self.data.length()
    }
}

impl Encodable for Log {
    fn encode(&self, out: &mut dyn BufMut) {
        let payload_length = self.fields_length();
        RlpHeader {
            list: true,
            payload_length,
        }
        .encode(out);
        self.address.encode(out);
        self.topics.encode(out);
        self.data.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.fields_length();
        RlpHeader {
            list: true,
            payload_length,
        }
        .length()
            + payload_length
    }
}

impl Decodable for Log {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let rlp_head = RlpHeader::decode(buf)?;
        if !rlp_head.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        let started_len = buf.len();
        let address = Decodable::decode(buf)?;
        let topics = Decodable::decode(buf)?;
        let data = Decodable::decode(buf)?;
        let consumed = started_len - buf.len();
        if consumed != rlp_head.payload_length {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: rlp_head.payload_length,
                got: consumed,
            });
        }
        Ok(Self {
            address,
            topics,
            data,
            ..Default::default()
        })
    }
}

/// The result of executing one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct Receipt {
    /// Execution status: 1 success, 0 failure.
    pub status: u64,
    /// Total gas used in the block up to and including this transaction.
    pub cumulative_gas_used: u64,
    /// Bloom filter of this receipt's logs.
    pub bloom: Bloom,
    /// Logs emitted by the transaction.
    pub logs: Vec<Log>,
}

impl Receipt {
    /// Build a receipt, deriving its bloom from the logs.
    pub fn new(status: u64, cumulative_gas_used: u64, logs: Vec<Log>) -> Self {
        let bloom = logs_bloom(&logs);
        Self {
            status,
            cumulative_gas_used,
            bloom,
            logs,
        }
    }
}

/// Bloom filter over a set of logs: each log contributes its address
/// and every topic.
pub fn logs_bloom(logs: &[Log]) -> Bloom {
    let mut bloom = Bloom::ZERO;
    for log in logs {
        bloom.accrue(BloomInput::Raw(log.address.as_slice()));
        for topic in &log.topics {
            bloom.accrue(BloomInput::Raw(topic.as_slice()));
        }
    }
    bloom
}

/// The header bloom: union of all receipt blooms in the block.
pub fn create_bloom(receipts: &[Receipt]) -> Bloom {
    let mut bloom = Bloom::ZERO;
    for receipt in receipts {
        bloom |= receipt.bloom;
    }
    bloom
}
