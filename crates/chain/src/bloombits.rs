//! Bloom-bits indexing and log filtering.
//!
//! The chain is partitioned into sections of
//! [`aquachain_params::protocol::BLOOM_BITS_BLOCKS`] blocks. For each
//! section, the 2048 bloom bits are rotated into per-bit bitsets (one
//! bit per block in the section), compressed and stored keyed by
//! `(bit, section, section_head_hash)`. A filter query reduces to
//! bitwise ANDs and ORs over those bitsets instead of touching every
//! header.

use alloy_primitives::{keccak256, Address, Bloom, B256};
use aquachain_params::protocol::BLOOM_BITS_BLOCKS;
use aquachain_storage::{rawdb, schema, KeyValue};
use aquachain_types::{Log, Receipt};
use tracing::{debug, info};

use crate::blockchain::Blockchain;
use crate::{ChainError, Result};

/// Number of bits in a bloom filter.
pub const BLOOM_BIT_LENGTH: usize = 2048;

/// Whether bit `bit` is set in `bloom` (same bit order the filter
/// accrual uses).
fn bloom_bit(bloom: &Bloom, bit: usize) -> bool {
    bloom.0[255 - bit / 8] & (1 << (bit % 8)) != 0
}

/// The three bloom bit positions lit by a value.
pub fn bloom_positions(value: &[u8]) -> [usize; 3] {
    let digest = keccak256(value);
    let mut positions = [0usize; 3];
    for (i, position) in positions.iter_mut().enumerate() {
        *position =
            (((digest[2 * i] as usize) << 8) | digest[2 * i + 1] as usize) % BLOOM_BIT_LENGTH;
    }
    positions
}

/// Rotates section blooms into per-bit bitsets.
pub struct BloomBitsGenerator {
    bitsets: Vec<Vec<u8>>,
    section_size: u64,
    next: u64,
}

impl BloomBitsGenerator {
    /// Generator for one section of `section_size` blocks.
    pub fn new(section_size: u64) -> Self {
        Self {
            bitsets: vec![vec![0u8; (section_size as usize).div_ceil(8)]; BLOOM_BIT_LENGTH],
            section_size,
            next: 0,
        }
    }

    /// Add the bloom of the block at `index` within the section.
    /// Blooms must arrive in order.
    pub fn add_bloom(&mut self, index: u64, bloom: &Bloom) {
        assert_eq!(index, self.next, "section blooms must be added in order");
        assert!(index < self.section_size, "index beyond section");
        for (bit, bitset) in self.bitsets.iter_mut().enumerate() {
            if bloom_bit(bloom, bit) {
                bitset[(index / 8) as usize] |= 0x80 >> (index % 8);
            }
        }
        self.next += 1;
    }

    /// The bitset of one bloom bit across the section. Valid once every
    /// block of the section was added.
    pub fn bitset(&self, bit: usize) -> &[u8] {
        assert_eq!(self.next, self.section_size, "section incomplete");
        &self.bitsets[bit]
    }
}

/// Compress a bitset: a recursive bitmap of non-zero bytes followed by
/// the non-zero bytes themselves. All-zero input compresses to empty.
pub fn compress_bytes(data: &[u8]) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    if data.len() == 1 {
        return if data[0] == 0 {
            Vec::new()
        } else {
            data.to_vec()
        };
    }
    let mut nonzero_bitmap = vec![0u8; data.len().div_ceil(8)];
    let mut nonzero_bytes = Vec::new();
    for (i, b) in data.iter().enumerate() {
        if *b != 0 {
            nonzero_bitmap[i / 8] |= 0x80 >> (i % 8);
            nonzero_bytes.push(*b);
        }
    }
    if nonzero_bytes.is_empty() {
        return Vec::new();
    }
    let mut out = compress_bytes(&nonzero_bitmap);
    out.extend_from_slice(&nonzero_bytes);
    out
}

/// Expand a compressed bitset back to `target_len` bytes.
pub fn decompress_bytes(data: &[u8], target_len: usize) -> Result<Vec<u8>> {
    let (out, consumed) = decompress_inner(data, target_len)?;
    if consumed != data.len() {
        return Err(ChainError::Storage(aquachain_storage::StorageError::Database(
            "excess data in compressed bitset".to_string(),
        )));
    }
    Ok(out)
}

fn decompress_inner(data: &[u8], target_len: usize) -> Result<(Vec<u8>, usize)> {
    if data.is_empty() {
        return Ok((vec![0u8; target_len], 0));
    }
    if target_len == 1 {
        let out = vec![data[0]];
        return Ok((out, 1));
    }
    let (bitmap, consumed) = decompress_inner(data, target_len.div_ceil(8))?;
    let mut out = vec![0u8; target_len];
    let mut cursor = consumed;
    for (i, chunk) in bitmap.iter().enumerate() {
        for bit in 0..8 {
            if chunk & (0x80 >> bit) != 0 {
                let index = i * 8 + bit;
                if index >= target_len || cursor >= data.len() {
                    return Err(ChainError::Storage(
                        aquachain_storage::StorageError::Database(
                            "truncated compressed bitset".to_string(),
                        ),
                    ));
                }
                out[index] = data[cursor];
                cursor += 1;
            }
        }
    }
    Ok((out, cursor))
}

/// Maintains the per-section bloom-bits index.
pub struct BloomIndexer {
    section_size: u64,
}

impl Default for BloomIndexer {
    fn default() -> Self {
        Self::new(BLOOM_BITS_BLOCKS)
    }
}

impl BloomIndexer {
    /// Indexer over sections of `section_size` blocks.
    pub fn new(section_size: u64) -> Self {
        Self { section_size }
    }

    /// Section length in blocks.
    pub fn section_size(&self) -> u64 {
        self.section_size
    }

    /// Number of sections indexed so far.
    pub fn indexed_sections<K: KeyValue>(&self, chain: &Blockchain<K>) -> Result<u64> {
        let raw = chain.db().get(schema::BLOOM_SECTIONS_KEY)?;
        Ok(raw
            .and_then(|r| r.as_slice().try_into().ok().map(u64::from_be_bytes))
            .unwrap_or(0))
    }

    /// Index every section completed by the current canonical head.
    pub fn run<K: KeyValue>(&self, chain: &Blockchain<K>) -> Result<u64> {
        let head = chain.current_block().number();
        let complete = (head + 1) / self.section_size;
        let mut section = self.indexed_sections(chain)?;
        while section < complete {
            self.process_section(chain, section)?;
            section += 1;
            chain
                .db()
                .put(schema::BLOOM_SECTIONS_KEY, &section.to_be_bytes())?;
        }
        Ok(section)
    }

    /// Build and store the bitsets of one section.
    pub fn process_section<K: KeyValue>(
        &self,
        chain: &Blockchain<K>,
        section: u64,
    ) -> Result<()> {
        let mut generator = BloomBitsGenerator::new(self.section_size);
        let mut head = B256::ZERO;
        for index in 0..self.section_size {
            let number = section * self.section_size + index;
            let header = chain
                .header_by_number(number)?
                .ok_or(ChainError::MissingCanonical(number))?;
            head = header.hash();
            generator.add_bloom(index, &header.bloom);
        }
        for bit in 0..BLOOM_BIT_LENGTH {
            let compressed = compress_bytes(generator.bitset(bit));
            rawdb::write_bloom_bits(
                chain.db().as_ref(),
                bit as u32,
                section,
                &head,
                &compressed,
            )?;
        }
        debug!(section, head = %head, "indexed bloom section");
        Ok(())
    }
}

/// A log filter over a block range.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    /// First block of the range (inclusive).
    pub from_block: u64,
    /// Last block of the range (inclusive).
    pub to_block: u64,
    /// Addresses to match; empty matches any.
    pub addresses: Vec<Address>,
    /// Topic groups: position `i` must match one of `topics[i]`; an
    /// empty group matches any topic.
    pub topics: Vec<Vec<B256>>,
}

impl LogFilter {
    /// Whether a header bloom could contain a match.
    pub fn bloom_possible(&self, bloom: &Bloom) -> bool {
        fn group_hits(bloom: &Bloom, values: &[&[u8]]) -> bool {
            if values.is_empty() {
                return true;
            }
            values.iter().any(|v| {
                bloom_positions(v)
                    .iter()
                    .all(|&bit| bloom_bit(bloom, bit))
            })
        }
        let addresses: Vec<&[u8]> = self.addresses.iter().map(|a| a.as_slice()).collect();
        if !group_hits(bloom, &addresses) {
            return false;
        }
        for group in &self.topics {
            let topics: Vec<&[u8]> = group.iter().map(|t| t.as_slice()).collect();
            if !group_hits(bloom, &topics) {
                return false;
            }
        }
        true
    }

    /// Whether a concrete log matches.
    pub fn matches_log(&self, log: &Log) -> bool {
        if !self.addresses.is_empty() && !self.addresses.contains(&log.address) {
            return false;
        }
        for (i, group) in self.topics.iter().enumerate() {
            if group.is_empty() {
                continue;
            }
            match log.topics.get(i) {
                Some(topic) if group.contains(topic) => {}
                _ => return false,
            }
        }
        true
    }

    /// Run the filter over the chain, using the bloom-bits index for
    /// fully indexed sections and header blooms for the tail.
    pub fn run<K: KeyValue>(
        &self,
        chain: &Blockchain<K>,
        indexer: &BloomIndexer,
    ) -> Result<Vec<Log>> {
        let indexed = indexer.indexed_sections(chain)?;
        let section_size = indexer.section_size();
        let indexed_until = indexed * section_size; // exclusive

        let mut matches = Vec::new();
        let mut number = self.from_block;
        while number <= self.to_block {
            let section = number / section_size;
            if number < indexed_until && number % section_size == 0 {
                // whole section is indexed; match it at the bit level
                let candidates = self.match_section(chain, section, section_size)?;
                for index in candidates {
                    let candidate = section * section_size + index;
                    if candidate >= self.from_block && candidate <= self.to_block {
                        self.collect_block_logs(chain, candidate, &mut matches)?;
                    }
                }
                number = (section + 1) * section_size;
            } else {
                if let Some(header) = chain.header_by_number(number)? {
                    if self.bloom_possible(&header.bloom) {
                        self.collect_block_logs(chain, number, &mut matches)?;
                    }
                }
                number += 1;
            }
        }
        info!(
            from = self.from_block,
            to = self.to_block,
            matched = matches.len(),
            "log filter run"
        );
        Ok(matches)
    }

    /// The in-section block indices whose blooms can match, via the
    /// stored bitsets: OR within a group, AND across groups.
    fn match_section<K: KeyValue>(
        &self,
        chain: &Blockchain<K>,
        section: u64,
        section_size: u64,
    ) -> Result<Vec<u64>> {
        let head_number = section * section_size + section_size - 1;
        let head = chain
            .header_by_number(head_number)?
            .ok_or(ChainError::MissingCanonical(head_number))?
            .hash();
        let len = (section_size as usize).div_ceil(8);

        let load_bit = |bit: usize| -> Result<Vec<u8>> {
            let raw = rawdb::read_bloom_bits(chain.db().as_ref(), bit as u32, section, &head)?
                .unwrap_or_default();
            decompress_bytes(&raw, len)
        };
        let match_value = |value: &[u8]| -> Result<Vec<u8>> {
            let mut acc = vec![0xffu8; len];
            for bit in bloom_positions(value) {
                let bits = load_bit(bit)?;
                for (a, b) in acc.iter_mut().zip(bits) {
                    *a &= b;
                }
            }
            Ok(acc)
        };
        let match_group = |values: Vec<&[u8]>| -> Result<Vec<u8>> {
            if values.is_empty() {
                return Ok(vec![0xffu8; len]);
            }
            let mut acc = vec![0u8; len];
            for value in values {
                let bits = match_value(value)?;
                for (a, b) in acc.iter_mut().zip(bits) {
                    *a |= b;
                }
            }
            Ok(acc)
        };

        let mut acc = match_group(self.addresses.iter().map(|a| a.as_slice()).collect())?;
        for group in &self.topics {
            let bits = match_group(group.iter().map(|t| t.as_slice()).collect())?;
            for (a, b) in acc.iter_mut().zip(bits) {
                *a &= b;
            }
        }

        let mut indices = Vec::new();
        for index in 0..section_size {
            if acc[(index / 8) as usize] & (0x80 >> (index % 8)) != 0 {
                indices.push(index);
            }
        }
        Ok(indices)
    }

    fn collect_block_logs<K: KeyValue>(
        &self,
        chain: &Blockchain<K>,
        number: u64,
        out: &mut Vec<Log>,
    ) -> Result<()> {
        let Some(block) = chain.block_by_number(number)? else {
            return Ok(());
        };
        let hash = block.hash();
        let receipts: Vec<Receipt> =
            rawdb::read_receipts(chain.db().as_ref(), number, &hash)?.unwrap_or_default();
        let mut log_index = 0u64;
        for (tx_index, receipt) in receipts.iter().enumerate() {
            for log in &receipt.logs {
                if self.matches_log(log) {
                    let mut log = log.clone();
                    log.block_number = number;
                    log.block_hash = hash;
                    log.tx_index = tx_index as u64;
                    log.tx_hash = block
                        .transactions()
                        .get(tx_index)
                        .map(|tx| tx.hash())
                        .unwrap_or_default();
                    log.index = log_index;
                    out.push(log);
                }
                log_index += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::BloomInput;

    #[test]
    fn test_compress_roundtrip() {
        let cases: Vec<Vec<u8>> = vec![
            vec![],
            vec![0u8; 64],
            vec![0xff; 64],
            {
                let mut v = vec![0u8; 512];
                v[3] = 0x20;
                v[509] = 0x01;
                v
            },
        ];
        for case in cases {
            let compressed = compress_bytes(&case);
            let restored = decompress_bytes(&compressed, case.len()).unwrap();
            assert_eq!(restored, case);
        }
    }

    #[test]
    fn test_compress_sparse_is_small() {
        let mut data = vec![0u8; 512];
        data[100] = 0xab;
        let compressed = compress_bytes(&data);
        assert!(compressed.len() < 20, "got {}", compressed.len());
    }

    #[test]
    fn test_generator_rotates_bits() {
        let mut bloom = Bloom::ZERO;
        bloom.accrue(BloomInput::Raw(b"hello"));
        let positions = bloom_positions(b"hello");

        let mut generator = BloomBitsGenerator::new(8);
        for i in 0..8u64 {
            if i == 3 || i == 5 {
                generator.add_bloom(i, &bloom);
            } else {
                generator.add_bloom(i, &Bloom::ZERO);
            }
        }
        for &bit in &positions {
            let bitset = generator.bitset(bit);
            assert_eq!(bitset[0], (0x80 >> 3) | (0x80 >> 5));
        }
        // an unrelated bit stays clear
        let clear = (0..BLOOM_BIT_LENGTH)
            .find(|b| !positions.contains(b))
            .unwrap();
        assert_eq!(generator.bitset(clear)[0], 0);
    }

    #[test]
    fn test_filter_matches_log() {
        let address = Address::repeat_byte(0x11);
        let topic = B256::repeat_byte(0x22);
        let log = Log {
            address,
            topics: vec![topic],
            ..Default::default()
        };

        let filter = LogFilter {
            addresses: vec![address],
            topics: vec![vec![topic]],
            ..Default::default()
        };
        assert!(filter.matches_log(&log));

        let wrong_topic = LogFilter {
            addresses: vec![address],
            topics: vec![vec![B256::repeat_byte(0x33)]],
            ..Default::default()
        };
        assert!(!wrong_topic.matches_log(&log));

        let any = LogFilter::default();
        assert!(any.matches_log(&log));
    }

    #[test]
    fn test_bloom_possible_consistent_with_accrual() {
        let address = Address::repeat_byte(0x44);
        let mut bloom = Bloom::ZERO;
        bloom.accrue(BloomInput::Raw(address.as_slice()));

        let hit = LogFilter {
            addresses: vec![address],
            ..Default::default()
        };
        assert!(hit.bloom_possible(&bloom));

        let miss = LogFilter {
            addresses: vec![Address::repeat_byte(0x45)],
            ..Default::default()
        };
        assert!(!miss.bloom_possible(&bloom));
    }
}
