//! Secp256k1 ECDSA with public key recovery.
//!
//! Addresses are the last 20 bytes of `keccak256(uncompressed_pubkey[1..])`.
//! Signatures are 65 bytes `r || s || recovery_id` with the recovery id
//! in `0..=1`; transaction types layer the legacy 27/28 and EIP-155
//! encodings on top of this.

use alloy_primitives::{keccak256, Address, B256, U256};
use k256::{
    ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
};
use rand::{CryptoRng, RngCore};

use crate::error::CryptoError;

/// Length of a recoverable signature: 32-byte r, 32-byte s, 1-byte recovery id.
pub const SIGNATURE_LENGTH: usize = 65;

/// secp256k1 group order.
const SECP256K1_N: U256 = U256::from_limbs([
    0xbfd25e8cd0364141,
    0xbaaedce6af48a03b,
    0xfffffffffffffffe,
    0xffffffffffffffff,
]);

/// A secp256k1 secret key.
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl SecretKey {
    /// Generate a fresh random key.
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        Self(SigningKey::random(rng))
    }

    /// Load from a 32-byte scalar.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        SigningKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidSecretKey)
    }

    /// Serialize to the 32-byte scalar.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes().into()
    }

    /// The uncompressed public key (65 bytes, 0x04 prefix).
    pub fn public_key(&self) -> [u8; 65] {
        let point = self.0.verifying_key().to_encoded_point(false);
        let mut out = [0u8; 65];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// The address derived from this key's public key.
    pub fn address(&self) -> Address {
        pubkey_to_address(&self.public_key())
    }

    /// Sign a 32-byte digest, returning `r || s || recovery_id`.
    pub fn sign_hash(&self, hash: &B256) -> Result<[u8; SIGNATURE_LENGTH], CryptoError> {
        let (sig, recid) = self
            .0
            .sign_prehash_recoverable(hash.as_slice())
            .map_err(|_| CryptoError::InvalidSignature)?;
        let mut out = [0u8; SIGNATURE_LENGTH];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = recid.to_byte();
        Ok(out)
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Recover the uncompressed public key (65 bytes, 0x04 prefix) that
/// produced `sig` over `hash`.
pub fn recover_pubkey(
    hash: &B256,
    sig: &[u8; SIGNATURE_LENGTH],
) -> Result<[u8; 65], CryptoError> {
    let signature =
        EcdsaSignature::from_slice(&sig[..64]).map_err(|_| CryptoError::InvalidSignature)?;
    let recid = RecoveryId::from_byte(sig[64]).ok_or(CryptoError::InvalidRecoveryId(sig[64]))?;
    let key = VerifyingKey::recover_from_prehash(hash.as_slice(), &signature, recid)
        .map_err(|_| CryptoError::RecoveryFailed)?;

    let point = key.to_encoded_point(false);
    let mut out = [0u8; 65];
    out.copy_from_slice(point.as_bytes());
    Ok(out)
}

/// Recover the signer address from a 65-byte recoverable signature.
pub fn recover_address(
    hash: &B256,
    sig: &[u8; SIGNATURE_LENGTH],
) -> Result<Address, CryptoError> {
    Ok(pubkey_to_address(&recover_pubkey(hash, sig)?))
}

/// Recover the signer address from raw `r`/`s` values and the parity bit.
pub fn ecrecover(hash: &B256, r: &U256, s: &U256, odd_y: bool) -> Result<Address, CryptoError> {
    let mut sig = [0u8; SIGNATURE_LENGTH];
    sig[..32].copy_from_slice(&r.to_be_bytes::<32>());
    sig[32..64].copy_from_slice(&s.to_be_bytes::<32>());
    sig[64] = odd_y as u8;
    recover_address(hash, &sig)
}

/// Check that r/s are in range for the given rules. Homestead and later
/// reject the malleable upper half of the s range.
pub fn validate_signature_values(v: u8, r: &U256, s: &U256, homestead: bool) -> bool {
    if r.is_zero() || s.is_zero() {
        return false;
    }
    if v != 0 && v != 1 {
        return false;
    }
    if homestead && *s > SECP256K1_N >> 1 {
        return false;
    }
    *r < SECP256K1_N && *s < SECP256K1_N
}

/// Derive the address for an uncompressed public key.
pub fn pubkey_to_address(pubkey: &[u8; 65]) -> Address {
    let digest = keccak256(&pubkey[1..]);
    Address::from_slice(&digest[12..])
}
