//! EVM-family adapter: one implementation parameterised by chain id and
//! RPC URL, shared by every EVM-category chain tag.
//!
//! Signing goes through `ethers-signers`' `LocalWallet`, building either
//! an `Eip1559TransactionRequest` or a legacy `TransactionRequest`
//! depending on which fee fields are present.

use std::str::FromStr;

use async_trait::async_trait;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address as EthAddress, Eip1559TransactionRequest, TransactionRequest, U256};
use ethers_signers::{LocalWallet, Signer};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::derivation::{self, MasterSeed};
use crate::error::{WalletError, WalletResult};
use crate::types::{Chain, DeriveParams, FeeEstimate, TransactionConfig, TransactionResponse, TxStatus};
use crate::utils::crypto::{keccak256, to_checksum_address};
use crate::utils::http;

use super::{AdapterContext, ChainAdapter};

pub struct EvmAdapter {
    ctx: AdapterContext,
}

impl EvmAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn rpc_url(&self) -> &str {
        &self.ctx.config.endpoints.http
    }

    async fn rpc_call(&self, method: &str, params: Value) -> WalletResult<Value> {
        let body = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
        let response = http::post_json(self.rpc_url(), &body).await?;
        let parsed: Value = response.json().await.map_err(WalletError::from)?;

        if let Some(error) = parsed.get("error") {
            return Err(WalletError::rpc_error(format!("{method} failed: {error}")));
        }
        parsed.get("result").cloned().ok_or_else(|| WalletError::rpc_error(format!("{method}: missing result field")))
    }
}

#[async_trait]
impl ChainAdapter for EvmAdapter {
    fn chain(&self) -> Chain {
        self.ctx.chain
    }

    fn derive_address(&self, master_seed: &MasterSeed, params: &DeriveParams) -> WalletResult<String> {
        let entropy = derivation::derive_entropy(master_seed, params)?;
        let secret = derivation::secp256k1_from_raw(&entropy)?;
        let secp = secp256k1::Secp256k1::new();
        let public = secp256k1::PublicKey::from_secret_key(&secp, &secret);
        let uncompressed = public.serialize_uncompressed();
        // Skip the 0x04 prefix byte: address is keccak256 of the raw X||Y coordinates.
        let hash = keccak256(&uncompressed[1..]);
        Ok(to_checksum_address(&hash[12..]))
    }

    async fn balance(&self, address: &str) -> WalletResult<Decimal> {
        let result = self.rpc_call("eth_getBalance", json!([address, "latest"])).await?;
        let hex_wei = result.as_str().ok_or_else(|| WalletError::rpc_error("eth_getBalance: non-string result"))?;
        let wei = u128::from_str_radix(hex_wei.trim_start_matches("0x"), 16)
            .map_err(|e| WalletError::rpc_error(format!("malformed balance hex: {e}")))?;
        Ok(Decimal::from(wei) / Decimal::from(10u64.pow(18)))
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
        let secret = derivation::secp256k1_from_raw(&entropy)?;
        let from = self.derive_address(master_seed, params)?;

        let evm_config = match config {
            Some(TransactionConfig::Evm { .. }) | None => config,
            Some(_) => return Err(WalletError::invalid_parameters("EVM adapter requires an Evm TransactionConfig variant")),
        };

        let (gas_limit, gas_price, max_fee, max_priority_fee, nonce, chain_id, tx_type) = match evm_config {
            Some(TransactionConfig::Evm { gas_limit, gas_price, max_fee_per_gas, max_priority_fee_per_gas, nonce, chain_id, tx_type, .. }) => {
                (*gas_limit, *gas_price, *max_fee_per_gas, *max_priority_fee_per_gas, *nonce, *chain_id, *tx_type)
            }
            _ => (None, None, None, None, None, None, None),
        };

        let nonce = match nonce {
            Some(n) => n,
            None => {
                let result = self.rpc_call("eth_getTransactionCount", json!([from, "pending"])).await?;
                let hex_nonce = result.as_str().ok_or_else(|| WalletError::rpc_error("eth_getTransactionCount: non-string result"))?;
                u64::from_str_radix(hex_nonce.trim_start_matches("0x"), 16).map_err(|e| WalletError::rpc_error(e.to_string()))?
            }
        };

        let gas_limit = match gas_limit {
            Some(g) => g,
            None => {
                let value_wei = (amount * Decimal::from(10u64.pow(18))).to_string();
                let estimate = self
                    .rpc_call("eth_estimateGas", json!([{ "from": from, "to": to, "value": format!("0x{:x}", value_wei.parse::<u128>().unwrap_or(0)) }]))
                    .await?;
                let hex_gas = estimate.as_str().ok_or_else(|| WalletError::rpc_error("eth_estimateGas: non-string result"))?;
                let base = u64::from_str_radix(hex_gas.trim_start_matches("0x"), 16).map_err(|e| WalletError::rpc_error(e.to_string()))?;
                base.saturating_mul(12) / 10 // +20% safety multiplier
            }
        };

        let chain_id = chain_id.or_else(|| self.ctx.chain.evm_chain_id()).unwrap_or(1);

        // Type 2 (or both EIP-1559 fields present) selects the 1559
        // envelope; everything else falls back to a legacy transaction.
        let use_eip1559 = tx_type == Some(2) || (max_fee.is_some() && max_priority_fee.is_some());

        let wallet = LocalWallet::from_bytes(&secret.secret_bytes())
            .map_err(|e| WalletError::signature_failure(format!("wallet construction failed: {e}")))?
            .with_chain_id(chain_id);
        let to_address = EthAddress::from_str(to).map_err(|e| WalletError::invalid_address(format!("invalid EVM recipient: {e}")))?;
        let value = U256::from_dec_str(&(amount * Decimal::from(10u64.pow(18))).trunc().to_string())
            .map_err(|e| WalletError::invalid_parameters(format!("amount out of range: {e}")))?;

        let typed_tx: TypedTransaction = if use_eip1559 {
            let max_fee = max_fee.map(U256::from).unwrap_or_else(|| U256::from(30_000_000_000u64));
            let max_priority_fee = max_priority_fee.map(U256::from).unwrap_or_else(|| U256::from(1_500_000_000u64));
            Eip1559TransactionRequest::new()
                .to(to_address)
                .value(value)
                .gas(gas_limit)
                .max_fee_per_gas(max_fee)
                .max_priority_fee_per_gas(max_priority_fee)
                .chain_id(chain_id)
                .nonce(nonce)
                .into()
        } else {
            TransactionRequest::new()
                .to(to_address)
                .value(value)
                .gas(gas_limit)
                .gas_price(gas_price.map(U256::from).unwrap_or_else(|| U256::from(20_000_000_000u64)))
                .chain_id(chain_id)
                .nonce(nonce)
                .into()
        };

        let signature = wallet.sign_transaction(&typed_tx).await.map_err(|e| WalletError::signature_failure(e.to_string()))?;
        let raw = format!("0x{}", hex::encode(typed_tx.rlp_signed(&signature)));
        let tx_hash = format!("0x{}", hex::encode(keccak256(&hex::decode(raw.trim_start_matches("0x")).unwrap_or_default())));

        let sent = self.rpc_call("eth_sendRawTransaction", json!([raw])).await?;
        let broadcast_hash = sent.as_str().map(str::to_string).unwrap_or(tx_hash);

        Ok(TransactionResponse { tx_hash: broadcast_hash, status: TxStatus::Pending, block_number: None, confirmations: None, fee: None })
    }

    async fn estimate_fee(&self, _to: &str, _amount: Decimal) -> WalletResult<FeeEstimate> {
        let base_fee_result = self.rpc_call("eth_gasPrice", json!([])).await?;
        let hex_price = base_fee_result.as_str().ok_or_else(|| WalletError::rpc_error("eth_gasPrice: non-string result"))?;
        let wei = u128::from_str_radix(hex_price.trim_start_matches("0x"), 16).map_err(|e| WalletError::rpc_error(e.to_string()))?;
        let gwei = Decimal::from(wei) / Decimal::from(10u64.pow(9));

        Ok(FeeEstimate {
            base_fee: gwei,
            priority_fee: Some(Decimal::new(15, 1)),
            total_fee: gwei,
            gas_limit: Some(21_000),
            gas_price: Some(gwei),
        })
    }
}
