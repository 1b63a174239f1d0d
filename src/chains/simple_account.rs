//! Shared adapter for account-model chains with no native broadcaster yet
//! (Polkadot, Cardano, Near). `derive_address` and
//! `balance` are mandatory and implemented per chain; `send` is left at
//! the trait's default `MethodNotImplemented` until each chain's signed
//! extrinsic/transaction format is built out.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::derivation::{self, MasterSeed};
use crate::error::{WalletError, WalletResult};
use crate::types::{Chain, DeriveParams};
use crate::utils::http;

use super::{AdapterContext, ChainAdapter};

/// SS58 network prefix for Polkadot mainnet.
const POLKADOT_SS58_PREFIX: u16 = 0;

pub struct SimpleAccountAdapter {
    ctx: AdapterContext,
}

impl SimpleAccountAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn derive_polkadot(&self, master_seed: &MasterSeed, params: &DeriveParams) -> WalletResult<String> {
        let entropy = derivation::derive_entropy(master_seed, params)?;
        let keypair = derivation::sr25519_from_raw(&entropy);
        Ok(ss58_encode(POLKADOT_SS58_PREFIX, &keypair.public.to_bytes()))
    }

    fn derive_cardano(&self, master_seed: &MasterSeed, params: &DeriveParams) -> WalletResult<String> {
        let entropy = derivation::derive_entropy(master_seed, params)?;
        let signing_key = derivation::ed25519_from_raw(&entropy);
        let public = signing_key.verifying_key().to_bytes();
        // Shelley-era enterprise address: header byte 0x61 (payment key hash,
        // mainnet) over the blake2b-224 hash of the public key, bech32'd.
        let hash = blake2b_224(&public);
        let mut payload = vec![0x61u8];
        payload.extend_from_slice(&hash);
        bech32_encode("addr", &payload)
    }

    fn derive_near(&self, master_seed: &MasterSeed, params: &DeriveParams) -> WalletResult<String> {
        let entropy = derivation::derive_entropy(master_seed, params)?;
        let signing_key = derivation::ed25519_from_raw(&entropy);
        // NEAR implicit accounts are the raw public key, lowercase hex.
        Ok(hex::encode(signing_key.verifying_key().to_bytes()))
    }

    async fn rpc_call(&self, method: &str, params: Value) -> WalletResult<Value> {
        let body = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
        let response = http::post_json(&self.ctx.config.endpoints.http, &body).await?;
        let parsed: Value = response.json().await.map_err(WalletError::from)?;
        if let Some(error) = parsed.get("error") {
            return Err(WalletError::rpc_error(format!("{method} failed: {error}")));
        }
        parsed.get("result").cloned().ok_or_else(|| WalletError::rpc_error(format!("{method}: missing result field")))
    }
}

fn blake2b_224(data: &[u8]) -> [u8; 28] {
    use blake2::digest::{Update, VariableOutput};
    use blake2::Blake2bVar;
    let mut hasher = Blake2bVar::new(28).expect("28 is a valid blake2b output length");
    hasher.update(data);
    let mut out = [0u8; 28];
    hasher.finalize_variable(&mut out).expect("28-byte buffer matches requested output length");
    out
}

fn bech32_encode(hrp: &str, payload: &[u8]) -> WalletResult<String> {
    use bech32::ToBase32;
    bech32::encode(hrp, payload.to_base32(), bech32::Variant::Bech32)
        .map_err(|e| WalletError::signature_failure(format!("bech32 encoding failed: {e}")))
}

/// Minimal SS58 encoding: network prefix byte, 32-byte account id, and the
/// first 2 bytes of a blake2b-512 checksum over `b"SS58PRE" ++ prefix ++ id`.
fn ss58_encode(network_prefix: u16, account_id: &[u8; 32]) -> String {
    use blake2::digest::{Update, VariableOutput};
    use blake2::Blake2bVar;

    let mut body = vec![network_prefix as u8];
    body.extend_from_slice(account_id);

    let mut preimage = b"SS58PRE".to_vec();
    preimage.extend_from_slice(&body);
    let mut hasher = Blake2bVar::new(64).expect("64 is a valid blake2b output length");
    hasher.update(&preimage);
    let mut checksum = [0u8; 64];
    hasher.finalize_variable(&mut checksum).expect("64-byte buffer matches requested output length");

    body.extend_from_slice(&checksum[..2]);
    bs58::encode(body).into_string()
}

#[async_trait]
impl ChainAdapter for SimpleAccountAdapter {
    fn chain(&self) -> Chain {
        self.ctx.chain
    }

    fn derive_address(&self, master_seed: &MasterSeed, params: &DeriveParams) -> WalletResult<String> {
        match self.ctx.chain {
            Chain::Polkadot => self.derive_polkadot(master_seed, params),
            Chain::Cardano => self.derive_cardano(master_seed, params),
            Chain::Near => self.derive_near(master_seed, params),
            other => Err(WalletError::unsupported_chain(other.as_str())),
        }
    }

    async fn balance(&self, address: &str) -> WalletResult<Decimal> {
        match self.ctx.chain {
            Chain::Near => {
                let result = self.rpc_call("query", json!({ "request_type": "view_account", "finality": "final", "account_id": address })).await?;
                let yocto: u128 = result.get("amount").and_then(Value::as_str).and_then(|s| s.parse().ok()).unwrap_or(0);
                Ok(Decimal::from(yocto) / Decimal::from(10u128.pow(24)))
            }
            Chain::Polkadot => {
                let result = self.rpc_call("system_account", json!([address])).await?;
                let planck: u128 = result.get("data").and_then(|d| d.get("free")).and_then(Value::as_str).and_then(|s| s.parse().ok()).unwrap_or(0);
                Ok(Decimal::from(planck) / Decimal::from(10u128.pow(10)))
            }
            Chain::Cardano => {
                let result = self.rpc_call("addresses/balance", json!({ "address": address })).await?;
                let lovelace: u128 = result.get("balance").and_then(Value::as_str).and_then(|s| s.parse().ok()).unwrap_or(0);
                Ok(Decimal::from(lovelace) / Decimal::from(1_000_000u64))
            }
            other => Err(WalletError::unsupported_chain(other.as_str())),
        }
    }

    async fn send(
        &self,
        _master_seed: &MasterSeed,
        _params: &DeriveParams,
        _to: &str,
        _amount: Decimal,
        _config: Option<&crate::types::TransactionConfig>,
    ) -> WalletResult<crate::types::TransactionResponse> {
        Err(WalletError::method_not_implemented("send"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfigCatalog;
    use crate::metrics::Metrics;
    use std::sync::Arc;

    fn adapter(chain: Chain) -> SimpleAccountAdapter {
        let catalog = ChainConfigCatalog::new();
        SimpleAccountAdapter::new(AdapterContext { chain, config: catalog.get(chain), metrics: Arc::new(Metrics::new()) })
    }

    #[test]
    fn polkadot_address_is_ss58_base58() {
        let seed = MasterSeed::new(vec![71u8; 32]);
        let params = DeriveParams::new("wallet", "u", Chain::Polkadot, "0").unwrap();
        let address = adapter(Chain::Polkadot).derive_address(&seed, &params).unwrap();
        assert!(address.chars().all(|c| bs58::alphabet::BITCOIN.contains(&(c as u8))));
    }

    #[test]
    fn near_address_is_raw_public_key_hex() {
        let seed = MasterSeed::new(vec![72u8; 32]);
        let params = DeriveParams::new("wallet", "u", Chain::Near, "0").unwrap();
        let address = adapter(Chain::Near).derive_address(&seed, &params).unwrap();
        assert_eq!(address.len(), 64);
        assert!(address.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn cardano_address_is_bech32_with_addr_prefix() {
        let seed = MasterSeed::new(vec![73u8; 32]);
        let params = DeriveParams::new("wallet", "u", Chain::Cardano, "0").unwrap();
        let address = adapter(Chain::Cardano).derive_address(&seed, &params).unwrap();
        assert!(address.starts_with("addr1"));
    }

    #[tokio::test]
    async fn send_is_not_implemented() {
        let seed = MasterSeed::new(vec![74u8; 32]);
        let params = DeriveParams::new("wallet", "u", Chain::Near, "0").unwrap();
        let result = adapter(Chain::Near).send(&seed, &params, "x", Decimal::ZERO, None).await;
        assert_eq!(result.unwrap_err().code, crate::error::ErrorCode::MethodNotImplemented);
    }
}
