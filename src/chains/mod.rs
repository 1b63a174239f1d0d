//! The uniform chain-adapter protocol and the per-chain implementations
//! that satisfy it.
//!
//! `ChainAdapter` is an async trait: one `chain()` accessor plus a
//! handful of async operations every member of the trait object table
//! must answer for.

pub mod aptos;
pub mod bitcoin;
pub mod evm;
pub mod simple_account;
pub mod solana;
pub mod sui;
pub mod ton;
pub mod tron;

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::config::ChainConfigCatalog;
use crate::derivation::MasterSeed;
use crate::error::{WalletError, WalletResult};
use crate::types::{Chain, DeriveParams, FeeEstimate, IncomingTransaction, TransactionConfig, TransactionHistoryEntry, TransactionResponse};

const DEFAULT_SEEN_CAP: usize = 1000;

/// FIFO-bounded set of transaction hashes already delivered to a
/// subscriber for one watched address.
#[derive(Default)]
pub struct SeenHashes {
    order: Mutex<VecDeque<String>>,
    set: Mutex<HashSet<String>>,
    cap: usize,
}

impl SeenHashes {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SEEN_CAP)
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self { order: Mutex::new(VecDeque::new()), set: Mutex::new(HashSet::new()), cap }
    }

    /// Returns `true` if `tx_hash` had not been seen before, recording it
    /// as seen either way it matters: the caller only acts on `true`.
    pub fn mark_if_new(&self, tx_hash: &str) -> bool {
        let mut set = self.set.lock().expect("seen-hash set lock poisoned");
        if !set.insert(tx_hash.to_string()) {
            return false;
        }

        let mut order = self.order.lock().expect("seen-hash order lock poisoned");
        order.push_back(tx_hash.to_string());
        if order.len() > self.cap {
            if let Some(evicted) = order.pop_front() {
                set.remove(&evicted);
            }
        }
        true
    }
}

/// Shared construction context every adapter factory receives: the master
/// seed, the resolved chain config, and ambient services.
pub struct AdapterContext {
    pub chain: Chain,
    pub config: crate::types::ChainConfig,
    pub metrics: std::sync::Arc<crate::metrics::Metrics>,
}

/// Every chain implementation satisfies this contract. Required:
/// `derive_address`, `balance`, `send`. The rest default to
/// `MethodNotImplemented` so a partial adapter (e.g. account-only chains
/// with no native send SDK yet) still satisfies the trait object table.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    fn chain(&self) -> Chain;

    /// Pure and deterministic given the derivation entropy.
    fn derive_address(&self, master_seed: &MasterSeed, params: &DeriveParams) -> WalletResult<String>;

    async fn balance(&self, address: &str) -> WalletResult<Decimal>;

    async fn send(
        &self,
        master_seed: &MasterSeed,
        params: &DeriveParams,
        to: &str,
        amount: Decimal,
        config: Option<&TransactionConfig>,
    ) -> WalletResult<TransactionResponse>;

    async fn estimate_fee(&self, _to: &str, _amount: Decimal) -> WalletResult<FeeEstimate> {
        Err(WalletError::method_not_implemented("estimate_fee"))
    }

    async fn get_history(&self, _address: &str, _limit: usize) -> WalletResult<Vec<TransactionHistoryEntry>> {
        Err(WalletError::method_not_implemented("get_history"))
    }

    /// Polling primitive backing the subscription engine: return incoming
    /// transactions for `address` not already in `seen`.
    async fn get_incoming_transactions(&self, _address: &str, _seen: &SeenHashes) -> WalletResult<Vec<IncomingTransaction>> {
        Err(WalletError::method_not_implemented("get_incoming_transactions"))
    }

    async fn initialize(&self) -> WalletResult<()> {
        Ok(())
    }

    async fn shutdown(&self) -> WalletResult<()> {
        Ok(())
    }
}

/// Construct the adapter for one chain, wiring in its resolved config.
/// The one place the closed chain-tag set is matched against concrete
/// types.
pub fn build_adapter(chain: Chain, catalog: &ChainConfigCatalog, metrics: std::sync::Arc<crate::metrics::Metrics>) -> Box<dyn ChainAdapter> {
    let config = catalog.get(chain);
    let ctx = AdapterContext { chain, config, metrics };

    match chain.category() {
        crate::types::ChainCategory::Evm => Box::new(evm::EvmAdapter::new(ctx)),
        crate::types::ChainCategory::Utxo => Box::new(bitcoin::BitcoinAdapter::new(ctx)),
        crate::types::ChainCategory::Account | crate::types::ChainCategory::Other => match chain {
            Chain::Solana => Box::new(solana::SolanaAdapter::new(ctx)),
            Chain::Tron => Box::new(tron::TronAdapter::new(ctx)),
            Chain::Aptos => Box::new(aptos::AptosAdapter::new(ctx)),
            Chain::Sui => Box::new(sui::SuiAdapter::new(ctx)),
            Chain::Ton => Box::new(ton::TonAdapter::new(ctx)),
            _ => Box::new(simple_account::SimpleAccountAdapter::new(ctx)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seen_hashes_delivers_each_tx_at_most_once() {
        let seen = SeenHashes::new();
        assert!(seen.mark_if_new("0xabc"));
        assert!(!seen.mark_if_new("0xabc"));
        assert!(seen.mark_if_new("0xdef"));
    }

    #[test]
    fn seen_hashes_evicts_oldest_past_capacity() {
        let seen = SeenHashes::with_capacity(2);
        assert!(seen.mark_if_new("a"));
        assert!(seen.mark_if_new("b"));
        assert!(seen.mark_if_new("c"));
        // "a" evicted, so it can be seen as new again
        assert!(seen.mark_if_new("a"));
    }
}
