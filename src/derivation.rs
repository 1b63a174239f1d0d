//! The derivation kernel: one master secret in, distinct per-chain key
//! material out.
//!
//! Derivation is intentionally not BIP32. Every (scope, user, chain, index)
//! tuple is hashed independently through HMAC-SHA-512, so compromising the
//! entropy for one tuple reveals nothing about any other — there is no
//! parent/child relationship to walk. See [`derive_entropy`].

use std::fmt;

use hmac::{Hmac, Mac};
use schnorrkel::{ExpansionMode, MiniSecretKey};
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::error::WalletError;
use crate::types::DeriveParams;

type HmacSha512 = Hmac<Sha512>;

/// The root secret every derivation is rooted in. Never implements
/// `Serialize`; `Debug` never prints the bytes.
#[derive(Clone)]
pub struct MasterSeed(Zeroizing<Vec<u8>>);

impl MasterSeed {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, WalletError> {
        Ok(Self::new(hex::decode(hex_str)?))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for MasterSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MasterSeed").field(&"..").finish()
    }
}

/// 64 bytes of HMAC-SHA-512 output for one derivation tuple. The first 32
/// bytes are the canonical raw secret; the last 32 are reserved entropy a
/// future curve conversion can draw on without re-deriving.
pub struct DerivedEntropy(Zeroizing<[u8; 64]>);

impl DerivedEntropy {
    pub fn seed(&self) -> &[u8; 32] {
        self.0[..32].try_into().expect("first 32 bytes of a 64-byte array")
    }

    pub fn reserved(&self) -> &[u8] {
        &self.0[32..]
    }
}

impl fmt::Debug for DerivedEntropy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DerivedEntropy").field(&"..").finish()
    }
}

/// Derive the 64 bytes of entropy for one (scope, user, chain, index)
/// tuple. Pure function of its inputs: same tuple, same seed, always the
/// same output.
pub fn derive_entropy(master_seed: &MasterSeed, params: &DeriveParams) -> Result<DerivedEntropy, WalletError> {
    params.validate()?;

    let mut mac = HmacSha512::new_from_slice(master_seed.as_bytes())
        .map_err(|e| WalletError::signature_failure(format!("HMAC key setup failed: {e}")))?;
    mac.update(&params.mac_message());
    let result = mac.finalize().into_bytes();

    let mut out = [0u8; 64];
    out.copy_from_slice(&result);
    Ok(DerivedEntropy(Zeroizing::new(out)))
}

/// Convert raw entropy into a valid secp256k1 scalar. Rejects entropy that
/// maps to zero or to a value `>= n` rather than silently re-deriving —
/// callers that hit this should treat it as a hard failure for that tuple.
pub fn secp256k1_from_raw(entropy: &DerivedEntropy) -> Result<secp256k1::SecretKey, WalletError> {
    secp256k1::SecretKey::from_slice(entropy.seed())
        .map_err(|e| WalletError::signature_failure(format!("derived entropy is not a valid secp256k1 scalar: {e}")))
}

/// Convert raw entropy into an ed25519 signing key. Every 32-byte seed is a
/// valid ed25519 seed, so this never fails.
pub fn ed25519_from_raw(entropy: &DerivedEntropy) -> ed25519_dalek::SigningKey {
    ed25519_dalek::SigningKey::from_bytes(entropy.seed())
}

/// Convert raw entropy into an sr25519 (schnorrkel) keypair. Every 32-byte
/// seed is a valid mini-secret, so this never fails.
pub fn sr25519_from_raw(entropy: &DerivedEntropy) -> schnorrkel::Keypair {
    MiniSecretKey::from_bytes(entropy.seed())
        .expect("MiniSecretKey::from_bytes never fails on a 32-byte input")
        .expand_to_keypair(ExpansionMode::Ed25519)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chain;

    fn params(chain: Chain, index: &str) -> DeriveParams {
        DeriveParams::new("wallet", "user-1", chain, index).unwrap()
    }

    #[test]
    fn derivation_is_deterministic() {
        let seed = MasterSeed::new(vec![7u8; 32]);
        let a = derive_entropy(&seed, &params(Chain::Bitcoin, "0")).unwrap();
        let b = derive_entropy(&seed, &params(Chain::Bitcoin, "0")).unwrap();
        assert_eq!(a.seed(), b.seed());
    }

    #[test]
    fn distinct_index_yields_distinct_entropy() {
        let seed = MasterSeed::new(vec![7u8; 32]);
        let a = derive_entropy(&seed, &params(Chain::Bitcoin, "0")).unwrap();
        let b = derive_entropy(&seed, &params(Chain::Bitcoin, "1")).unwrap();
        assert_ne!(a.seed(), b.seed());
    }

    #[test]
    fn distinct_chain_yields_distinct_entropy() {
        let seed = MasterSeed::new(vec![7u8; 32]);
        let a = derive_entropy(&seed, &params(Chain::Bitcoin, "0")).unwrap();
        let b = derive_entropy(&seed, &params(Chain::Ethereum, "0")).unwrap();
        assert_ne!(a.seed(), b.seed());
    }

    #[test]
    fn distinct_user_yields_distinct_entropy() {
        let seed = MasterSeed::new(vec![7u8; 32]);
        let a = DeriveParams::new("wallet", "user-1", Chain::Bitcoin, "0").unwrap();
        let b = DeriveParams::new("wallet", "user-2", Chain::Bitcoin, "0").unwrap();
        assert_ne!(derive_entropy(&seed, &a).unwrap().seed(), derive_entropy(&seed, &b).unwrap().seed());
    }

    #[test]
    fn distinct_seed_yields_distinct_entropy() {
        let a = derive_entropy(&MasterSeed::new(vec![1u8; 32]), &params(Chain::Bitcoin, "0")).unwrap();
        let b = derive_entropy(&MasterSeed::new(vec![2u8; 32]), &params(Chain::Bitcoin, "0")).unwrap();
        assert_ne!(a.seed(), b.seed());
    }

    #[test]
    fn secp256k1_conversion_succeeds_on_real_entropy() {
        let seed = MasterSeed::new(vec![9u8; 32]);
        let entropy = derive_entropy(&seed, &params(Chain::Ethereum, "0")).unwrap();
        assert!(secp256k1_from_raw(&entropy).is_ok());
    }

    #[test]
    fn ed25519_conversion_never_fails() {
        let seed = MasterSeed::new(vec![0u8; 32]);
        let entropy = derive_entropy(&seed, &params(Chain::Solana, "0")).unwrap();
        let _ = ed25519_from_raw(&entropy);
    }

    #[test]
    fn sr25519_conversion_never_fails() {
        let seed = MasterSeed::new(vec![3u8; 32]);
        let entropy = derive_entropy(&seed, &params(Chain::Polkadot, "0")).unwrap();
        let _ = sr25519_from_raw(&entropy);
    }
}
