//! Chain-validity checks against each chain's bit-exact address format:
//! one regex-shaped predicate per chain family, used both as a
//! post-condition on `ChainAdapter::derive_address` in tests and as a
//! standalone helper for hosts validating a `to` address before calling
//! `send`.
//!
//! Validates the closed set of encodings this crate's adapters actually
//! produce (bech32/bech32m, Base58Check, EIP-55 hex) rather than
//! attempting best-effort multi-network detection.

use crate::error::WalletError;
use crate::types::{Chain, ChainCategory};

/// `true` if `address` matches the canonical format for `chain`.
pub fn is_valid_address(address: &str, chain: Chain) -> bool {
    match chain {
        c if c.category() == ChainCategory::Evm => is_valid_evm(address),
        Chain::Bitcoin => is_valid_bitcoin_taproot(address),
        Chain::Solana => is_valid_solana(address),
        Chain::Tron => is_valid_tron(address),
        Chain::Aptos => is_valid_aptos(address),
        Chain::Sui => is_valid_sui(address),
        Chain::Ton => is_valid_ton(address),
        Chain::Polkadot => is_valid_ss58(address),
        Chain::Cardano => address.starts_with("addr1") && address.len() > 10,
        Chain::Near => address.len() == 64 && address.chars().all(|c| c.is_ascii_hexdigit()),
    }
}

/// Same check, returning `InvalidAddress` on failure so callers can use
/// `?` directly before a `send`.
pub fn require_valid_address(address: &str, chain: Chain) -> Result<(), WalletError> {
    if is_valid_address(address, chain) {
        Ok(())
    } else {
        Err(WalletError::invalid_address(format!("'{address}' is not a valid {} address", chain.as_str())))
    }
}

/// `0x` + 40 hex chars, with an EIP-55 checksum that must match if the
/// address is mixed case (all-lowercase/all-uppercase addresses carry no
/// checksum and are accepted as-is, matching most EVM tooling).
fn is_valid_evm(address: &str) -> bool {
    let Some(hex_part) = address.strip_prefix("0x") else { return false };
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }

    let has_mixed_case = hex_part.chars().any(|c| c.is_ascii_uppercase()) && hex_part.chars().any(|c| c.is_ascii_lowercase());
    if !has_mixed_case {
        return true;
    }

    let Ok(bytes) = hex::decode(hex_part.to_lowercase()) else { return false };
    crate::utils::crypto::to_checksum_address(&bytes) == address
}

/// bech32m P2TR, HRP `bc`, 62 characters total.
fn is_valid_bitcoin_taproot(address: &str) -> bool {
    if !address.starts_with("bc1p") || address.len() != 62 {
        return false;
    }
    matches!(bech32::decode(address), Ok((hrp, _, bech32::Variant::Bech32m)) if hrp == "bc")
}

/// Base58 (not Base58Check — Solana public keys carry no checksum byte),
/// 32–44 characters.
fn is_valid_solana(address: &str) -> bool {
    if address.len() < 32 || address.len() > 44 {
        return false;
    }
    matches!(bs58::decode(address).into_vec(), Ok(bytes) if bytes.len() == 32)
}

/// Base58Check starting with `T`, 34 characters: version byte 0x41
/// plus a 20-byte hash plus a 4-byte checksum.
fn is_valid_tron(address: &str) -> bool {
    if !address.starts_with('T') || address.len() != 34 {
        return false;
    }
    let Ok(decoded) = bs58::decode(address).into_vec() else { return false };
    if decoded.len() != 25 || decoded[0] != 0x41 {
        return false;
    }
    let (payload, checksum) = decoded.split_at(21);
    let digest = sha256d(payload);
    &digest[..4] == checksum
}

fn sha256d(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let once = Sha256::digest(data);
    Sha256::digest(once).into()
}

/// `0x` + 64 hex chars.
fn is_valid_aptos(address: &str) -> bool {
    address.strip_prefix("0x").is_some_and(|hex_part| hex_part.len() == 64 && hex_part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// `0x` + 64 hex chars — same shape as Aptos, distinct derivation.
fn is_valid_sui(address: &str) -> bool {
    is_valid_aptos(address)
}

/// User-friendly base64url, 48 characters.
fn is_valid_ton(address: &str) -> bool {
    use base64::Engine;
    if address.len() != 48 {
        return false;
    }
    base64::engine::general_purpose::URL_SAFE.decode(address).is_ok()
}

/// Minimal SS58 structural check: Base58 alphabet, network-prefix byte
/// plus a 32-byte account id plus a 2-byte checksum, with the checksum
/// itself verified the way [`super::super::chains::simple_account`]
/// constructs it.
fn is_valid_ss58(address: &str) -> bool {
    let Ok(decoded) = bs58::decode(address).into_vec() else { return false };
    if decoded.len() != 35 {
        return false;
    }
    let (body, checksum) = decoded.split_at(33);
    let mut preimage = b"SS58PRE".to_vec();
    preimage.extend_from_slice(body);

    use blake2::digest::{Update, VariableOutput};
    use blake2::Blake2bVar;
    let mut hasher = Blake2bVar::new(64).expect("64 is a valid blake2b output length");
    hasher.update(&preimage);
    let mut digest = [0u8; 64];
    hasher.finalize_variable(&mut digest).expect("64-byte buffer matches requested output length");

    &digest[..2] == checksum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evm_checksummed_address_is_valid() {
        assert!(is_valid_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed", Chain::Ethereum));
    }

    #[test]
    fn evm_all_lowercase_is_accepted_without_checksum() {
        assert!(is_valid_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed", Chain::Ethereum));
    }

    #[test]
    fn evm_wrong_checksum_is_rejected() {
        assert!(!is_valid_address("0x5aAeb6053f3E94C9b9A09f33669435E7Ef1BeAed", Chain::Ethereum));
    }

    #[test]
    fn evm_wrong_length_is_rejected() {
        assert!(!is_valid_address("0x1234", Chain::Ethereum));
    }

    #[test]
    fn aptos_and_sui_require_64_hex_chars() {
        let addr = format!("0x{}", "ab".repeat(32));
        assert!(is_valid_address(&addr, Chain::Aptos));
        assert!(is_valid_address(&addr, Chain::Sui));
        assert!(!is_valid_address("0xabc", Chain::Aptos));
    }

    #[test]
    fn near_requires_64_hex_chars_no_prefix() {
        assert!(is_valid_address(&"ab".repeat(32), Chain::Near));
        assert!(!is_valid_address("0xabc", Chain::Near));
    }

    #[test]
    fn garbage_is_rejected_for_every_chain() {
        for chain in crate::types::ALL_CHAINS {
            assert!(!is_valid_address("not-an-address", *chain));
        }
    }
}
