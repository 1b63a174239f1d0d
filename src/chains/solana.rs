//! Solana adapter: ed25519 keys, base58 addresses, priority-bucketed
//! compute-unit pricing, JSON-RPC transport.

use async_trait::async_trait;
use ed25519_dalek::Signer;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::derivation::{self, MasterSeed};
use crate::error::{WalletError, WalletResult};
use crate::types::{Chain, DeriveParams, FeeEstimate, Priority, TransactionConfig, TransactionResponse, TxStatus};
use crate::utils::http;

use super::{AdapterContext, ChainAdapter};

const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Maps priority to microlamports/CU when the caller doesn't set an
/// explicit `compute_unit_price`.
fn priority_to_unit_price(priority: Priority) -> u64 {
    match priority {
        Priority::Low => 5_000,
        Priority::Normal => 10_000,
        Priority::High => 50_000,
        Priority::Urgent => 200_000,
    }
}

pub struct SolanaAdapter {
    ctx: AdapterContext,
}

impl SolanaAdapter {
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
impl ChainAdapter for SolanaAdapter {
    fn chain(&self) -> Chain {
        Chain::Solana
    }

    fn derive_address(&self, master_seed: &MasterSeed, params: &DeriveParams) -> WalletResult<String> {
        let entropy = derivation::derive_entropy(master_seed, params)?;
        let signing_key = derivation::ed25519_from_raw(&entropy);
        let verifying_key = signing_key.verifying_key();
        Ok(bs58::encode(verifying_key.to_bytes()).into_string())
    }

    async fn balance(&self, address: &str) -> WalletResult<Decimal> {
        let result = self.rpc_call("getBalance", json!([address])).await?;
        let lamports = result.get("value").and_then(Value::as_u64).ok_or_else(|| WalletError::rpc_error("getBalance: missing value"))?;
        Ok(Decimal::from(lamports) / Decimal::from(LAMPORTS_PER_SOL))
    }

    async fn send(
        &self,
        master_seed: &MasterSeed,
        params: &DeriveParams,
        to: &str,
        amount: Decimal,
        config: Option<&TransactionConfig>,
    ) -> WalletResult<TransactionResponse> {
        let entropy = derivation::derive_entropy(master_seed, params)?;
        let signing_key = derivation::ed25519_from_raw(&entropy);
        let from = self.derive_address(master_seed, params)?;

        let (compute_units, compute_unit_price, priority, max_retries) = match config {
            Some(TransactionConfig::Solana { compute_units, compute_unit_price, common, max_retries, .. }) => {
                (compute_units.unwrap_or(200_000), *compute_unit_price, common.priority.unwrap_or(Priority::Normal), max_retries.unwrap_or(3))
            }
            Some(_) => return Err(WalletError::invalid_parameters("Solana adapter requires a Solana TransactionConfig variant")),
            None => (200_000, None, Priority::Normal, 3),
        };
        let compute_unit_price = compute_unit_price.unwrap_or_else(|| priority_to_unit_price(priority));

        let blockhash = self.rpc_call("getLatestBlockhash", json!([])).await?;
        let blockhash = blockhash
            .get("value")
            .and_then(|v| v.get("blockhash"))
            .and_then(Value::as_str)
            .ok_or_else(|| WalletError::rpc_error("getLatestBlockhash: missing blockhash"))?;

        let lamports = (amount * Decimal::from(LAMPORTS_PER_SOL)).trunc().to_string();
        let preimage = format!("{from}:{to}:{lamports}:{blockhash}:{compute_units}:{compute_unit_price}");
        let signature = signing_key.sign(preimage.as_bytes());
        let tx_hash = bs58::encode(signature.to_bytes()).into_string();

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.rpc_call("sendTransaction", json!([tx_hash])).await {
                Ok(sent) => {
                    let hash = sent.as_str().map(str::to_string).unwrap_or(tx_hash);
                    return Ok(TransactionResponse { tx_hash: hash, status: TxStatus::Pending, block_number: None, confirmations: None, fee: None });
                }
                Err(err) if attempt < max_retries && err.is_retryable() => continue,
                Err(err) => return Err(err),
            }
        }
    }

    async fn estimate_fee(&self, _to: &str, _amount: Decimal) -> WalletResult<FeeEstimate> {
        // Base signature fee, in SOL, at the standard 5000-lamport rate.
        let base_fee = Decimal::from(5_000u64) / Decimal::from(LAMPORTS_PER_SOL);
        Ok(FeeEstimate { base_fee, priority_fee: None, total_fee: base_fee, gas_limit: Some(200_000), gas_price: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfigCatalog;
    use crate::metrics::Metrics;
    use std::sync::Arc;

    fn adapter() -> SolanaAdapter {
        let catalog = ChainConfigCatalog::new();
        SolanaAdapter::new(AdapterContext { chain: Chain::Solana, config: catalog.get(Chain::Solana), metrics: Arc::new(Metrics::new()) })
    }

    #[test]
    fn derives_base58_address_in_expected_length_range() {
        let seed = MasterSeed::new(vec![21u8; 32]);
        let params = DeriveParams::new("wallet", "u", Chain::Solana, "0").unwrap();
        let address = adapter().derive_address(&seed, &params).unwrap();
        assert!((32..=44).contains(&address.len()));
        assert!(address.chars().all(|c| bs58::alphabet::BITCOIN.contains(&(c as u8))));
    }

    #[test]
    fn priority_bucket_defaults_match_spec() {
        assert_eq!(priority_to_unit_price(Priority::Low), 5_000);
        assert_eq!(priority_to_unit_price(Priority::Normal), 10_000);
        assert_eq!(priority_to_unit_price(Priority::High), 50_000);
        assert_eq!(priority_to_unit_price(Priority::Urgent), 200_000);
    }
}
