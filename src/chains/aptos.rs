//! Aptos adapter: ed25519 keys, SHA3-256 address derivation, BCS-style
//! JSON-RPC submission against the REST API's simple transaction encoding.

use async_trait::async_trait;
use ed25519_dalek::Signer;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sha3::{Digest, Sha3_256};

use crate::derivation::{self, MasterSeed};
use crate::error::{WalletError, WalletResult};
use crate::types::{Chain, DeriveParams, FeeEstimate, TransactionConfig, TransactionResponse, TxStatus};
use crate::utils::http;

use super::{AdapterContext, ChainAdapter};

const OCTAS_PER_APT: u64 = 100_000_000;
/// Single-signer scheme discriminator Aptos appends before hashing the
/// public key into an account address.
const ED25519_SCHEME: u8 = 0x00;

pub struct AptosAdapter {
    ctx: AdapterContext,
}

impl AptosAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    async fn get(&self, path: &str) -> WalletResult<Value> {
        let url = format!("{}{}", self.ctx.config.endpoints.http, path);
        let response = http::get(&url).await?;
        response.json::<Value>().await.map_err(WalletError::from)
    }

    async fn post(&self, path: &str, body: Value) -> WalletResult<Value> {
        let url = format!("{}{}", self.ctx.config.endpoints.http, path);
        let response = http::post_json(&url, &body).await?;
        response.json::<Value>().await.map_err(WalletError::from)
    }
}

#[async_trait]
impl ChainAdapter for AptosAdapter {
    fn chain(&self) -> Chain {
        Chain::Aptos
    }

    fn derive_address(&self, master_seed: &MasterSeed, params: &DeriveParams) -> WalletResult<String> {
        let entropy = derivation::derive_entropy(master_seed, params)?;
        let signing_key = derivation::ed25519_from_raw(&entropy);
        let verifying_key = signing_key.verifying_key();

        let mut preimage = verifying_key.to_bytes().to_vec();
        preimage.push(ED25519_SCHEME);
        let address = Sha3_256::digest(&preimage);
        Ok(format!("0x{}", hex::encode(address)))
    }

    async fn balance(&self, address: &str) -> WalletResult<Decimal> {
        let path = format!(
            "/v1/accounts/{address}/resource/0x1::coin::CoinStore%3C0x1::aptos_coin::AptosCoin%3E"
        );
        let resource = self.get(&path).await?;
        let octas: u64 = resource
            .get("data")
            .and_then(|d| d.get("coin"))
            .and_then(|c| c.get("value"))
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        Ok(Decimal::from(octas) / Decimal::from(OCTAS_PER_APT))
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

        let (gas_unit_price, max_gas_amount, expiration) = match config {
            Some(TransactionConfig::Aptos { gas_unit_price, max_gas_amount, expiration_timestamp_secs, .. }) => {
                (gas_unit_price.unwrap_or(100), max_gas_amount.unwrap_or(2_000), *expiration_timestamp_secs)
            }
            Some(_) => return Err(WalletError::invalid_parameters("Aptos adapter requires an Aptos TransactionConfig variant")),
            None => (100, 2_000, None),
        };

        let account = self.get(&format!("/v1/accounts/{from}")).await?;
        let sequence_number = account.get("sequence_number").and_then(Value::as_str).unwrap_or("0").to_string();

        let octas = (amount * Decimal::from(OCTAS_PER_APT)).trunc().to_string();
        let payload = json!({
            "type": "entry_function_payload",
            "function": "0x1::coin::transfer",
            "type_arguments": ["0x1::aptos_coin::AptosCoin"],
            "arguments": [to, octas],
        });

        let expiration = expiration.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs() + 300)
                .unwrap_or(300)
        });
        let raw_tx = json!({
            "sender": from,
            "sequence_number": sequence_number,
            "max_gas_amount": max_gas_amount.to_string(),
            "gas_unit_price": gas_unit_price.to_string(),
            "expiration_timestamp_secs": expiration.to_string(),
            "payload": payload,
        });

        let preimage = serde_json::to_vec(&raw_tx).map_err(WalletError::from)?;
        let signature = signing_key.sign(&preimage);

        let signed = json!({
            "sender": from,
            "sequence_number": sequence_number,
            "max_gas_amount": max_gas_amount.to_string(),
            "gas_unit_price": gas_unit_price.to_string(),
            "expiration_timestamp_secs": expiration.to_string(),
            "payload": payload,
            "signature": {
                "type": "ed25519_signature",
                "public_key": format!("0x{}", hex::encode(signing_key.verifying_key().to_bytes())),
                "signature": format!("0x{}", hex::encode(signature.to_bytes())),
            },
        });

        let submitted = self.post("/v1/transactions", signed).await?;
        let tx_hash = submitted.get("hash").and_then(Value::as_str).map(str::to_string).ok_or_else(|| WalletError::broadcast_failure("missing tx hash in submission response"))?;

        Ok(TransactionResponse { tx_hash, status: TxStatus::Pending, block_number: None, confirmations: None, fee: None })
    }

    async fn estimate_fee(&self, _to: &str, _amount: Decimal) -> WalletResult<FeeEstimate> {
        let base_fee = Decimal::from(100u64) / Decimal::from(OCTAS_PER_APT) * Decimal::from(2_000u64);
        Ok(FeeEstimate { base_fee, priority_fee: None, total_fee: base_fee, gas_limit: Some(2_000), gas_price: Some(Decimal::from(100u64)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfigCatalog;
    use crate::metrics::Metrics;
    use std::sync::Arc;

    fn adapter() -> AptosAdapter {
        let catalog = ChainConfigCatalog::new();
        AptosAdapter::new(AdapterContext { chain: Chain::Aptos, config: catalog.get(Chain::Aptos), metrics: Arc::new(Metrics::new()) })
    }

    #[test]
    fn derives_64_hex_char_address() {
        let seed = MasterSeed::new(vec![41u8; 32]);
        let params = DeriveParams::new("wallet", "u", Chain::Aptos, "0").unwrap();
        let address = adapter().derive_address(&seed, &params).unwrap();
        assert!(address.starts_with("0x"));
        assert_eq!(address.len(), 66);
    }

    #[test]
    fn derivation_is_deterministic_and_index_sensitive() {
        let seed = MasterSeed::new(vec![41u8; 32]);
        let a = adapter().derive_address(&seed, &DeriveParams::new("wallet", "u", Chain::Aptos, "0").unwrap()).unwrap();
        let b = adapter().derive_address(&seed, &DeriveParams::new("wallet", "u", Chain::Aptos, "1").unwrap()).unwrap();
        assert_ne!(a, b);
    }
}
