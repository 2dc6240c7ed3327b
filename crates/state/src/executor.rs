//! The transaction execution seam.
//!
//! The chain engine drives execution through the [`Executor`] trait and
//! treats the implementation as an external collaborator. The bundled
//! [`TransferExecutor`] covers plain value transfers (nonce, funds and
//! intrinsic-gas accounting with fees paid to the coinbase), which is
//! enough for the engine's own tests; a full EVM plugs in behind the
//! same trait.

use alloy_primitives::keccak256;
use aquachain_params::ChainConfig;
use aquachain_types::{Header, Log, Signer, Transaction};

use crate::statedb::StateDb;
use crate::{Result, StateError};

/// The result of executing one transaction.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    /// Gas consumed by this transaction.
    pub gas_used: u64,
    /// Execution status: 1 success, 0 failure.
    pub status: u64,
    /// Logs emitted during execution.
    pub logs: Vec<Log>,
}

/// Executes transactions against a state.
pub trait Executor: Send + Sync + 'static {
    /// Execute `tx` against `state` in the context of `header`,
    /// drawing gas from the block `gas_pool`.
    fn execute(
        &self,
        config: &ChainConfig,
        header: &Header,
        tx: &Transaction,
        state: &mut StateDb,
        gas_pool: &mut u64,
    ) -> Result<ExecutionOutcome>;
}

/// Minimal executor: validates the sender, moves value, charges the
/// intrinsic gas and credits fees to the coinbase.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferExecutor;

impl Executor for TransferExecutor {
    fn execute(
        &self,
        config: &ChainConfig,
        header: &Header,
        tx: &Transaction,
        state: &mut StateDb,
        gas_pool: &mut u64,
    ) -> Result<ExecutionOutcome> {
        let signer = Signer::for_block(config, header.number);
        let sender = tx.sender(&signer)?;

        let account_nonce = state.nonce(&sender);
        if tx.nonce < account_nonce {
            return Err(StateError::NonceTooLow {
                address: sender,
                tx_nonce: tx.nonce,
                account_nonce,
            });
        }
        if tx.nonce > account_nonce {
            return Err(StateError::NonceTooHigh {
                address: sender,
                tx_nonce: tx.nonce,
                account_nonce,
            });
        }

        let intrinsic = tx.intrinsic_gas(config.is_homestead(header.number))?;
        if tx.gas < intrinsic {
            return Err(StateError::IntrinsicGasTooLow {
                limit: tx.gas,
                need: intrinsic,
            });
        }
        if *gas_pool < tx.gas {
            return Err(StateError::GasPoolExhausted {
                pool: *gas_pool,
                need: tx.gas,
            });
        }

        let cost = tx.cost();
        let have = state.balance(&sender);
        if have < cost {
            return Err(StateError::InsufficientFunds {
                address: sender,
                have,
                need: cost,
            });
        }

        // the intrinsic portion is what a pure transfer consumes
        let gas_used = intrinsic;
        let fee = tx.gas_price.saturating_mul(alloy_primitives::U256::from(gas_used));

        state.sub_balance(sender, tx.value.saturating_add(fee))?;
        state.increment_nonce(sender);

        let recipient = match tx.to {
            Some(to) => to,
            None => create_address(&sender, tx.nonce),
        };
        state.add_balance(recipient, tx.value);
        state.add_balance(header.coinbase, fee);

        *gas_pool -= gas_used;

        Ok(ExecutionOutcome {
            gas_used,
            status: 1,
            logs: Vec::new(),
        })
    }
}

/// The address a creation transaction deploys to:
/// `keccak256(rlp([sender, nonce]))[12..]`.
pub fn create_address(sender: &alloy_primitives::Address, nonce: u64) -> alloy_primitives::Address {
    use alloy_rlp::Encodable;

    let mut payload = Vec::new();
    alloy_rlp::Header {
        list: true,
        payload_length: sender.length() + nonce.length(),
    }
    .encode(&mut payload);
    sender.encode(&mut payload);
    nonce.encode(&mut payload);
    alloy_primitives::Address::from_slice(&keccak256(&payload)[12..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, U256};
    use aquachain_crypto::SecretKey;
    use rand::rngs::OsRng;

    fn setup() -> (SecretKey, StateDb, Header, &'static ChainConfig) {
        let key = SecretKey::generate(&mut OsRng);
        let mut state = StateDb::new();
        state.add_balance(key.address(), U256::from(10_000_000_000u64));
        let header = Header {
            number: 1,
            gas_limit: 4_712_388,
            coinbase: Address::repeat_byte(0xc0),
            ..Default::default()
        };
        (key, state, header, aquachain_params::dev())
    }

    fn transfer(key: &SecretKey, cfg: &ChainConfig, nonce: u64, value: u64) -> Transaction {
        Transaction::new(
            nonce,
            U256::from(10),
            21_000,
            Some(Address::repeat_byte(0xee)),
            U256::from(value),
            Bytes::new(),
        )
        .sign(&Signer::for_block(cfg, 1), key)
        .unwrap()
    }

    #[test]
    fn test_transfer_moves_value_and_fees() {
        let (key, mut state, header, cfg) = setup();
        let tx = transfer(&key, cfg, 0, 1000);
        let mut pool = header.gas_limit;

        let outcome = TransferExecutor
            .execute(cfg, &header, &tx, &mut state, &mut pool)
            .unwrap();
        assert_eq!(outcome.gas_used, 21_000);
        assert_eq!(outcome.status, 1);

        let fee = U256::from(21_000u64 * 10);
        assert_eq!(state.balance(&Address::repeat_byte(0xee)), U256::from(1000));
        assert_eq!(state.balance(&header.coinbase), fee);
        assert_eq!(
            state.balance(&key.address()),
            U256::from(10_000_000_000u64) - U256::from(1000) - fee
        );
        assert_eq!(state.nonce(&key.address()), 1);
        assert_eq!(pool, header.gas_limit - 21_000);
    }

    #[test]
    fn test_nonce_gap_rejected() {
        let (key, mut state, header, cfg) = setup();
        let tx = transfer(&key, cfg, 3, 1);
        let mut pool = header.gas_limit;
        let err = TransferExecutor
            .execute(cfg, &header, &tx, &mut state, &mut pool)
            .unwrap_err();
        assert!(matches!(err, StateError::NonceTooHigh { .. }));
    }

    #[test]
    fn test_insufficient_funds_rejected() {
        let (key, mut state, header, cfg) = setup();
        let tx = transfer(&key, cfg, 0, u64::MAX);
        let mut pool = header.gas_limit;
        let err = TransferExecutor
            .execute(cfg, &header, &tx, &mut state, &mut pool)
            .unwrap_err();
        assert!(matches!(err, StateError::InsufficientFunds { .. }));
    }

    #[test]
    fn test_gas_pool_exhaustion() {
        let (key, mut state, header, cfg) = setup();
        let tx = transfer(&key, cfg, 0, 1);
        let mut pool = 20_000;
        let err = TransferExecutor
            .execute(cfg, &header, &tx, &mut state, &mut pool)
            .unwrap_err();
        assert!(matches!(err, StateError::GasPoolExhausted { .. }));
    }
}
