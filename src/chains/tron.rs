//! Tron adapter: secp256k1 keys, keccak256-derived addresses in
//! Base58Check `T...` form, TRC-20-free native-TRX transfers only.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::derivation::{self, MasterSeed};
use crate::error::{WalletError, WalletResult};
use crate::types::{Chain, DeriveParams, FeeEstimate, TransactionConfig, TransactionResponse, TxStatus};
use crate::utils::crypto::keccak256;
use crate::utils::http;

use super::{AdapterContext, ChainAdapter};

const TRON_ADDRESS_PREFIX: u8 = 0x41;
const SUN_PER_TRX: u64 = 1_000_000;

/// Base58Check-encode a 21-byte Tron address (prefix ++ 20-byte hash),
/// appending the first 4 bytes of the double-SHA-256 checksum.
fn base58check(payload: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let first = Sha256::digest(payload);
    let second = Sha256::digest(first);
    let mut full = payload.to_vec();
    full.extend_from_slice(&second[..4]);
    bs58::encode(full).into_string()
}

pub struct TronAdapter {
    ctx: AdapterContext,
}

impl TronAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    async fn rpc_call(&self, path: &str, body: Value) -> WalletResult<Value> {
        let url = format!("{}{}", self.ctx.config.endpoints.http, path);
        let response = http::post_json(&url, &body).await?;
        response.json::<Value>().await.map_err(WalletError::from)
    }
}

#[async_trait]
impl ChainAdapter for TronAdapter {
    fn chain(&self) -> Chain {
        Chain::Tron
    }

    fn derive_address(&self, master_seed: &MasterSeed, params: &DeriveParams) -> WalletResult<String> {
        let entropy = derivation::derive_entropy(master_seed, params)?;
        let secret = derivation::secp256k1_from_raw(&entropy)?;
        let secp = secp256k1::Secp256k1::new();
        let public = secp256k1::PublicKey::from_secret_key(&secp, &secret);
        let uncompressed = public.serialize_uncompressed();
        let hash = keccak256(&uncompressed[1..]);

        let mut payload = Vec::with_capacity(21);
        payload.push(TRON_ADDRESS_PREFIX);
        payload.extend_from_slice(&hash[12..]);
        Ok(base58check(&payload))
    }

    async fn balance(&self, address: &str) -> WalletResult<Decimal> {
        let result = self.rpc_call("/wallet/getaccount", json!({ "address": address, "visible": true })).await?;
        let sun = result.get("balance").and_then(Value::as_u64).unwrap_or(0);
        Ok(Decimal::from(sun) / Decimal::from(SUN_PER_TRX))
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
                return Err(WalletError::invalid_parameters("Tron adapter only accepts Plain TransactionConfig"));
            }
        }

        let entropy = derivation::derive_entropy(master_seed, params)?;
        let secret = derivation::secp256k1_from_raw(&entropy)?;
        let from = self.derive_address(master_seed, params)?;
        let sun = (amount * Decimal::from(SUN_PER_TRX)).trunc().to_string();

        let built = self
            .rpc_call(
                "/wallet/createtransaction",
                json!({ "owner_address": from, "to_address": to, "amount": sun.parse::<u64>().unwrap_or(0), "visible": true }),
            )
            .await?;
        let tx_id = built.get("txID").and_then(Value::as_str).map(str::to_string).unwrap_or_default();

        let secp = secp256k1::Secp256k1::new();
        let digest = keccak256(tx_id.as_bytes());
        let message = secp256k1::Message::from_digest(digest);
        let signature = secp.sign_ecdsa(&message, &secret);
        let signed = self
            .rpc_call("/wallet/broadcasttransaction", json!({ "raw_data": built.get("raw_data"), "txID": tx_id, "signature": [hex::encode(signature.serialize_compact())] }))
            .await?;

        let broadcast_hash = signed.get("txid").and_then(Value::as_str).map(str::to_string).unwrap_or(tx_id);
        Ok(TransactionResponse { tx_hash: broadcast_hash, status: TxStatus::Pending, block_number: None, confirmations: None, fee: None })
    }

    async fn estimate_fee(&self, _to: &str, _amount: Decimal) -> WalletResult<FeeEstimate> {
        // Native TRX transfers to an already-activated account cost
        // no bandwidth fee beyond the free daily allowance in the common case.
        Ok(FeeEstimate { base_fee: Decimal::ZERO, priority_fee: None, total_fee: Decimal::ZERO, gas_limit: None, gas_price: None })
    }
}
