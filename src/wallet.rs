//! HD Wallet Facade: the callable surface applications hold onto.
//!
//! A `Wallet` is cheap to clone — every field is an `Arc` shared with the
//! [`crate::sdk::Sdk`] that minted it — so `batch_balance` can fan work out
//! across cloned handles without re-threading the registry or event bus.

pub mod address_validation;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::error::{WalletError, WalletResult};
use crate::events::{now_ms, ChainEvent, EventBus, EventFilter, EventKind, Unsubscribe};
use crate::metrics::Metrics;
use crate::registry::AdapterRegistry;
use crate::subscription::{Subscription, SubscriptionEngine};
use crate::types::{Chain, DeriveParams, FeeEstimate, IncomingTransaction, TransactionConfig, TransactionHistoryEntry, TransactionResponse, ALL_CHAINS};

/// Handle returned by [`Wallet::subscribe`]. Dropping it leaves the
/// polling loop and the bus subscription running; call
/// [`Self::unsubscribe`] to tear both down.
pub struct WalletSubscription {
    bus_unsub: Option<Unsubscribe>,
    polling: Option<Subscription>,
}

impl WalletSubscription {
    pub fn unsubscribe(mut self) {
        if let Some(unsub) = self.bus_unsub.take() {
            unsub.unsubscribe();
        }
        if let Some(polling) = self.polling.take() {
            polling.cancel();
        }
    }
}

/// Thin facade delegating to the [`AdapterRegistry`]. Every public
/// method validates [`DeriveParams`] up front and emits `wallet.<op>` /
/// `wallet.<op>.error` counters.
#[derive(Clone)]
pub struct Wallet {
    registry: Arc<AdapterRegistry>,
    bus: Arc<EventBus>,
    subscriptions: Arc<SubscriptionEngine>,
    metrics: Arc<Metrics>,
    shut_down: Arc<AtomicBool>,
}

impl Wallet {
    pub(crate) fn new(
        registry: Arc<AdapterRegistry>,
        bus: Arc<EventBus>,
        subscriptions: Arc<SubscriptionEngine>,
        metrics: Arc<Metrics>,
        shut_down: Arc<AtomicBool>,
    ) -> Self {
        Self { registry, bus, subscriptions, metrics, shut_down }
    }

    fn guard(&self) -> WalletResult<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(WalletError::sdk_shutdown());
        }
        Ok(())
    }

    fn count<T>(&self, op: &str, result: &WalletResult<T>) {
        self.metrics.incr(&format!("wallet.{op}"));
        if result.is_err() {
            self.metrics.incr(&format!("wallet.{op}.error"));
        }
    }

    /// Pure and deterministic given the derivation entropy.
    pub async fn derive_address(&self, params: &DeriveParams) -> WalletResult<String> {
        self.guard()?;
        params.validate()?;
        let result = self.derive_address_inner(params).await;
        self.count("derive_address", &result);
        result
    }

    async fn derive_address_inner(&self, params: &DeriveParams) -> WalletResult<String> {
        let adapter = self.registry.load(params.chain).await?;
        let seed = self.registry.current_seed();
        adapter.derive_address(&seed, params)
    }

    /// Spendable native-unit balance as an arbitrary-precision decimal —
    /// never a floating-point number.
    pub async fn balance(&self, params: &DeriveParams) -> WalletResult<Decimal> {
        self.guard()?;
        params.validate()?;
        let result = self.balance_inner(params).await;
        self.count("balance", &result);
        result
    }

    async fn balance_inner(&self, params: &DeriveParams) -> WalletResult<Decimal> {
        let adapter = self.registry.load(params.chain).await?;
        let seed = self.registry.current_seed();
        let address = adapter.derive_address(&seed, params)?;
        adapter.balance(&address).await
    }

    /// Returns as soon as the transaction is accepted by the RPC (status
    /// `pending`); honours `config.timeout_ms` by racing the send against
    /// a deadline and raising `Timeout` if it's exceeded.
    pub async fn send(&self, params: &DeriveParams, to: &str, amount: Decimal, config: Option<TransactionConfig>) -> WalletResult<TransactionResponse> {
        self.guard()?;
        params.validate()?;
        let result = self.send_inner(params, to, amount, config.as_ref()).await;
        self.count("send", &result);
        result
    }

    async fn send_inner(&self, params: &DeriveParams, to: &str, amount: Decimal, config: Option<&TransactionConfig>) -> WalletResult<TransactionResponse> {
        let adapter = self.registry.load(params.chain).await?;
        let seed = self.registry.current_seed();
        let timeout_ms = config.and_then(|c| c.common().timeout_ms);

        let send_future = adapter.send(&seed, params, to, amount, config);
        let response = match timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), send_future)
                .await
                .map_err(|_| WalletError::timeout(format!("send timed out after {ms}ms")))??,
            None => send_future.await?,
        };

        let from = adapter.derive_address(&seed, params).unwrap_or_default();
        self.bus.publish(ChainEvent::Transaction {
            chain: params.chain,
            source_adapter: "wallet.send",
            timestamp_ms: now_ms(),
            tx_hash: response.tx_hash.clone(),
            from,
            to: to.to_string(),
            amount,
        });

        Ok(response)
    }

    pub async fn estimate_fee(&self, params: &DeriveParams, to: &str, amount: Decimal) -> WalletResult<FeeEstimate> {
        self.guard()?;
        params.validate()?;
        let result = self.estimate_fee_inner(params, to, amount).await;
        self.count("estimate_fee", &result);
        result
    }

    async fn estimate_fee_inner(&self, params: &DeriveParams, to: &str, amount: Decimal) -> WalletResult<FeeEstimate> {
        let adapter = self.registry.load(params.chain).await?;
        adapter.estimate_fee(to, amount).await
    }

    pub async fn get_history(&self, params: &DeriveParams, limit: usize) -> WalletResult<Vec<TransactionHistoryEntry>> {
        self.guard()?;
        params.validate()?;
        let result = self.get_history_inner(params, limit).await;
        self.count("get_history", &result);
        result
    }

    async fn get_history_inner(&self, params: &DeriveParams, limit: usize) -> WalletResult<Vec<TransactionHistoryEntry>> {
        let adapter = self.registry.load(params.chain).await?;
        let seed = self.registry.current_seed();
        let address = adapter.derive_address(&seed, params)?;
        adapter.get_history(&address, limit).await
    }

    /// Starts a polling subscription for `params`'s derived address and
    /// forwards each new transaction to `handler`, at most once per
    /// subscriber.
    pub async fn subscribe(&self, params: &DeriveParams, handler: impl Fn(&IncomingTransaction) + Send + Sync + 'static) -> WalletResult<WalletSubscription> {
        self.guard()?;
        params.validate()?;

        let adapter = self.registry.load(params.chain).await?;
        let seed = self.registry.current_seed();
        let address = adapter.derive_address(&seed, params)?;

        let filter = EventFilter::new().chain(params.chain).kind(EventKind::Transaction).address(address.clone());
        let bus_unsub = self.bus.subscribe(filter, move |event| {
            if let ChainEvent::Transaction { tx_hash, from, to, amount, .. } = event {
                handler(&IncomingTransaction {
                    tx_hash: tx_hash.clone(),
                    from: from.clone(),
                    to: to.clone(),
                    amount: *amount,
                    block_number: None,
                    timestamp: None,
                    token_contract: None,
                });
            }
        });
        let polling = self.subscriptions.subscribe(adapter, address);

        self.metrics.incr("wallet.subscribe");
        Ok(WalletSubscription { bus_unsub: Some(bus_unsub), polling: Some(polling) })
    }

    /// Best-effort: loads every chain in `chains`, logging (not raising)
    /// individual failures.
    pub async fn preload_adapters(&self, chains: &[Chain]) {
        for &chain in chains {
            if let Err(err) = self.registry.load(chain).await {
                log::warn!(target: "wallet::facade", "preload of {} failed: {}", chain.as_str(), err.message);
            }
        }
    }

    /// Runs every balance lookup concurrently, isolating failures
    /// per-request rather than failing the whole batch.
    pub async fn batch_balance(&self, params: Vec<DeriveParams>) -> Vec<WalletResult<Decimal>> {
        let handles: Vec<_> = params
            .into_iter()
            .map(|p| {
                let wallet = self.clone();
                tokio::spawn(async move { wallet.balance(&p).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await.unwrap_or_else(|e| Err(WalletError::network_error(format!("batch_balance task panicked: {e}")))));
        }
        results
    }

    /// `true` if `chain` parses as one of the closed set of supported
    /// chain tags.
    pub fn has_chain(&self, chain: &str) -> bool {
        chain.parse::<Chain>().is_ok()
    }

    pub fn get_supported_chains(&self) -> &'static [Chain] {
        ALL_CHAINS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfigCatalog;
    use crate::derivation::MasterSeed;

    fn wallet() -> Wallet {
        let catalog = Arc::new(ChainConfigCatalog::new());
        let metrics = Arc::new(Metrics::new());
        let bus = EventBus::new();
        let registry = AdapterRegistry::new(MasterSeed::new(vec![5u8; 32]), catalog, metrics.clone());
        let subscriptions = SubscriptionEngine::with_poll_interval(bus.clone(), Duration::from_millis(50));
        Wallet::new(registry, bus, subscriptions, metrics, Arc::new(AtomicBool::new(false)))
    }

    #[tokio::test]
    async fn derive_address_is_deterministic_through_the_facade() {
        let wallet = wallet();
        let params = DeriveParams::new("wallet", "user-1", Chain::Ethereum, "0").unwrap();
        let a = wallet.derive_address(&params).await.unwrap();
        let b = wallet.derive_address(&params).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn invalid_params_are_rejected_before_touching_the_registry() {
        let wallet = wallet();
        let bad = DeriveParams { scope: String::new(), user_id: "u".into(), chain: Chain::Ethereum, index: "0".into() };
        let err = wallet.derive_address(&bad).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidParameters);
    }

    #[tokio::test]
    async fn shutdown_rejects_subsequent_calls() {
        let wallet = wallet();
        wallet.shut_down.store(true, Ordering::SeqCst);
        let params = DeriveParams::new("wallet", "user-1", Chain::Ethereum, "0").unwrap();
        let err = wallet.derive_address(&params).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::SdkShutdown);
    }

    #[tokio::test]
    async fn batch_balance_isolates_per_request_failures() {
        let wallet = wallet();
        let good = DeriveParams::new("wallet", "user-1", Chain::Bitcoin, "0").unwrap();
        let bad = DeriveParams { scope: String::new(), user_id: "u".into(), chain: Chain::Bitcoin, index: "0".into() };

        // Both chains resolve to the Bitcoin adapter, which has no RPC
        // reachable in tests, so the "good" request fails on network I/O
        // while the "bad" one fails validation — both isolated, neither
        // panics the batch.
        let results = wallet.batch_balance(vec![good, bad]).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_err()));
    }

    #[tokio::test]
    async fn preload_adapters_warms_the_registry_cache() {
        let _ = env_logger::builder().is_test(true).try_init();

        let wallet = wallet();
        assert!(!wallet.registry.has_cached(Chain::Ethereum));
        wallet.preload_adapters(&[Chain::Ethereum, Chain::Bitcoin]).await;
        assert!(wallet.registry.has_cached(Chain::Ethereum));
        assert!(wallet.registry.has_cached(Chain::Bitcoin));
    }

    #[tokio::test]
    async fn has_chain_reflects_the_closed_chain_set() {
        let wallet = wallet();
        assert!(wallet.has_chain("ethereum"));
        assert!(!wallet.has_chain("dogecoin"));
    }

    #[test]
    fn get_supported_chains_covers_every_chain() {
        let wallet = wallet();
        assert_eq!(wallet.get_supported_chains().len(), ALL_CHAINS.len());
    }
}
