//! Transactions, signing and sender recovery.
//!
//! Senders are never stored; they are recovered from the v/r/s
//! signature under either the pre-EIP-155 rules (v in 27/28) or the
//! chain-id-bound EIP-155 rules, selected by the fork schedule. The
//! recovered sender is memoized per transaction because recovery is the
//! expensive step on both the pool admission and block execution paths.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{BufMut, Decodable, Encodable, Header as RlpHeader, EMPTY_STRING_CODE};
use aquachain_crypto::{ecrecover, validate_signature_values, SecretKey};
use aquachain_params::{protocol, ChainConfig};
use once_cell::sync::OnceCell;

use crate::error::TypesError;

/// A signed (or yet-unsigned) transaction.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    /// Sender account nonce.
    pub nonce: u64,
    /// Price per unit of gas, in wei.
    pub gas_price: U256,
    /// Gas limit for execution.
    pub gas: u64,
    /// Recipient; `None` creates a contract.
    pub to: Option<Address>,
    /// Transferred value in wei.
    pub value: U256,
    /// Call data or init code.
    pub data: Bytes,
    /// Signature v value (raw, including chain-id encoding).
    pub v: U256,
    /// Signature r value.
    pub r: U256,
    /// Signature s value.
    pub s: U256,

    hash: OnceCell<B256>,
    sender: OnceCell<Address>,
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.nonce == other.nonce
            && self.gas_price == other.gas_price
            && self.gas == other.gas
            && self.to == other.to
            && self.value == other.value
            && self.data == other.data
            && self.v == other.v
            && self.r == other.r
            && self.s == other.s
    }
}

impl Eq for Transaction {}

impl Transaction {
    /// Build an unsigned transaction.
    pub fn new(
        nonce: u64,
        gas_price: U256,
        gas: u64,
        to: Option<Address>,
        value: U256,
        data: Bytes,
    ) -> Self {
        Self {
            nonce,
            gas_price,
            gas,
            to,
            value,
            data,
            ..Default::default()
        }
    }

    /// Sign with `key` under `signer`'s rules, consuming the unsigned
    /// transaction.
    pub fn sign(mut self, signer: &Signer, key: &SecretKey) -> crate::Result<Self> {
        let sig = key.sign_hash(&signer.sig_hash(&self))?;
        let r = U256::from_be_slice(&sig[..32]);
        let s = U256::from_be_slice(&sig[32..64]);
        let v = match signer {
            Signer::Homestead => U256::from(27 + sig[64] as u64),
            Signer::Eip155 { chain_id } => U256::from(chain_id * 2 + 35 + sig[64] as u64),
        };
        self.v = v;
        self.r = r;
        self.s = s;
        self.hash = OnceCell::new();
        self.sender = OnceCell::new();
        Ok(self)
    }

    /// The transaction hash: Keccak-256 of the signed RLP encoding.
    pub fn hash(&self) -> B256 {
        *self
            .hash
            .get_or_init(|| keccak256(alloy_rlp::encode(self)))
    }

    /// True if this is a contract creation.
    pub fn is_creation(&self) -> bool {
        self.to.is_none()
    }

    /// True if the signature is bound to a chain id (EIP-155).
    pub fn is_protected(&self) -> bool {
        let v = self.v;
        !(v == U256::from(27) || v == U256::from(28))
    }

    /// The chain id encoded in a protected signature, or zero.
    pub fn chain_id(&self) -> u64 {
        if !self.is_protected() {
            return 0;
        }
        let v: u64 = self.v.saturating_to();
        if v < 35 {
            return 0;
        }
        (v - 35) / 2
    }

    /// Maximum wei this transaction can cost: `gas * gas_price + value`.
    pub fn cost(&self) -> U256 {
        self.gas_price
            .saturating_mul(U256::from(self.gas))
            .saturating_add(self.value)
    }

    /// Recover (and memoize) the sender under `signer`'s rules.
    pub fn sender(&self, signer: &Signer) -> crate::Result<Address> {
        if let Some(addr) = self.sender.get() {
            return Ok(*addr);
        }
        let addr = signer.sender(self)?;
        let _ = self.sender.set(addr);
        Ok(addr)
    }

    /// Gas consumed before any execution: the base fee of the
    /// transaction plus its data cost.
    pub fn intrinsic_gas(&self, homestead: bool) -> crate::Result<u64> {
        let mut gas = if self.is_creation() && homestead {
            protocol::TX_GAS_CONTRACT_CREATION
        } else {
            protocol::TX_GAS
        };
        let zeros = self.data.iter().filter(|b| **b == 0).count() as u64;
        let nonzeros = self.data.len() as u64 - zeros;
        gas = nonzeros
            .checked_mul(protocol::TX_DATA_NON_ZERO_GAS)
            .and_then(|g| g.checked_add(gas))
            .ok_or(TypesError::IntrinsicGasOverflow)?;
        gas = zeros
            .checked_mul(protocol::TX_DATA_ZERO_GAS)
            .and_then(|g| g.checked_add(gas))
            .ok_or(TypesError::IntrinsicGasOverflow)?;
        Ok(gas)
    }

    fn fields_length(&self, with_signature: bool) -> usize {
        let mut len = self.nonce.length()
            + self.gas_price.length()
            + self.gas.length()
            + to_length(&self.to)
            + self.value.length()
            + self.data.length();
        if with_signature {
            len += self.v.length() + self.r.length() + self.s.length();
        }
        len
    }

    fn encode_fields(&self, out: &mut dyn BufMut, with_signature: bool) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas.encode(out);
        encode_to(&self.to, out);
        self.value.encode(out);
        self.data.encode(out);
        if with_signature {
            self.v.encode(out);
            self.r.encode(out);
            self.s.encode(out);
        }
    }
}

fn to_length(to: &Option<Address>) -> usize {
    match to {
        Some(addr) => addr.length(),
        None => 1,
    }
}

fn encode_to(to: &Option<Address>, out: &mut dyn BufMut) {
    match to {
        Some(addr) => addr.encode(out),
        None => out.put_u8(EMPTY_STRING_CODE),
    }
}

impl Encodable for Transaction {
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

impl Decodable for Transaction {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let rlp_head = RlpHeader::decode(buf)?;
        if !rlp_head.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        let started_len = buf.len();
        let nonce = Decodable::decode(buf)?;
        let gas_price = Decodable::decode(buf)?;
        let gas = Decodable::decode(buf)?;
        let to = if buf.first() == Some(&EMPTY_STRING_CODE) {
            *buf = &buf[1..];
            None
        } else {
            Some(Decodable::decode(buf)?)
        };
        let value = Decodable::decode(buf)?;
        let data = Decodable::decode(buf)?;
        let v = Decodable::decode(buf)?;
        let r = Decodable::decode(buf)?;
        let s = Decodable::decode(buf)?;
        let consumed = started_len - buf.len();
        if consumed != rlp_head.payload_length {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: rlp_head.payload_length,
                got: consumed,
            });
        }
        Ok(Self {
            nonce,
            gas_price,
            gas,
            to,
            value,
            data,
            v,
            r,
            s,
            hash: OnceCell::new(),
            sender: OnceCell::new(),
        })
    }
}

/// Signature rules in force at a given block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signer {
    /// Pre-EIP-155: v is 27 or 28, no replay protection.
    Homestead,
    /// EIP-155: v encodes the chain id, `chain_id * 2 + 35 + parity`.
    Eip155 {
        /// The chain id signatures must be bound to.
        chain_id: u64,
    },
}

impl Signer {
    /// The signer demanded by `config` at block `number`.
    pub fn for_block(config: &ChainConfig, number: u64) -> Self {
        if config.is_eip155(number) {
            Signer::Eip155 {
                chain_id: config.chain_id,
            }
        } else {
            Signer::Homestead
        }
    }

    /// The digest the sender signed.
    pub fn sig_hash(&self, tx: &Transaction) -> B256 {
        match self {
            Signer::Homestead => sig_hash_fields(tx, None),
            Signer::Eip155 { chain_id } => {
                if tx.is_protected() {
                    sig_hash_fields(tx, Some(*chain_id))
                } else {
                    // legacy signatures remain valid after the fork
                    sig_hash_fields(tx, None)
                }
            }
        }
    }

    /// Recover the sending address.
    pub fn sender(&self, tx: &Transaction) -> crate::Result<Address> {
        let (parity, homestead_rules) = match self {
            Signer::Homestead => (legacy_parity(tx)?, true),
            Signer::Eip155 { chain_id } => {
                if !tx.is_protected() {
                    (legacy_parity(tx)?, true)
                } else {
                    let got = tx.chain_id();
                    if got != *chain_id {
                        return Err(TypesError::WrongChainId {
                            expected: *chain_id,
                            got,
                        });
                    }
                    let v: u64 = tx.v.saturating_to();
                    let parity = v
                        .checked_sub(35 + chain_id * 2)
                        .filter(|p| *p <= 1)
                        .ok_or(TypesError::InvalidV)?;
                    (parity as u8, true)
                }
            }
        };
        if parity > 1 {
            return Err(TypesError::InvalidV);
        }
        if !validate_signature_values(parity, &tx.r, &tx.s, homestead_rules) {
            return Err(TypesError::InvalidSignature);
        }
        ecrecover(&self.sig_hash(tx), &tx.r, &tx.s, parity == 1)
            .map_err(|_| TypesError::InvalidSignature)
    }
}

fn legacy_parity(tx: &Transaction) -> crate::Result<u8> {
    let v: u64 = tx.v.saturating_to();
    if v != 27 && v != 28 {
        return Err(TypesError::InvalidV);
    }
    Ok((v - 27) as u8)
}

fn sig_hash_fields(tx: &Transaction, chain_id: Option<u64>) -> B256 {
    let mut payload_length = tx.fields_length(false);
    if let Some(id) = chain_id {
        payload_length += id.length() + 1 + 1;
    }
    let mut out = Vec::with_capacity(payload_length + 3);
    RlpHeader {
        list: true,
        payload_length,
    }
    .encode(&mut out);
    tx.encode_fields(&mut out, false);
    if let Some(id) = chain_id {
        id.encode(&mut out);
        0u8.encode(&mut out);
        0u8.encode(&mut out);
    }
    keccak256(&out)
}
