//! Top-level SDK entry point: owns the shared services — registry,
//! config catalog, metrics, event bus, subscription engine — and hands out
//! [`Wallet`] handles that all share them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::chains::ChainAdapter;
use crate::config::ChainConfigCatalog;
use crate::derivation::MasterSeed;
use crate::error::{WalletError, WalletResult};
use crate::events::{ChainEvent, EventBus, EventFilter, Unsubscribe};
use crate::metrics::Metrics;
use crate::registry::AdapterRegistry;
use crate::subscription::SubscriptionEngine;
use crate::types::Chain;
use crate::wallet::Wallet;

const DEFAULT_EVENT_HISTORY: usize = 1000;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Builds an [`Sdk`] from a master seed plus optional tuning knobs,
/// mirroring the `new SDK({...})` constructor shape.
pub struct SdkBuilder {
    seed: MasterSeed,
    event_history_capacity: usize,
    poll_interval: Duration,
    preload: Vec<Chain>,
}

impl SdkBuilder {
    fn new(seed: MasterSeed) -> Self {
        Self {
            seed,
            event_history_capacity: DEFAULT_EVENT_HISTORY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            preload: Vec::new(),
        }
    }

    /// Bound on the event bus's replay history.
    pub fn event_history_capacity(mut self, capacity: usize) -> Self {
        self.event_history_capacity = capacity;
        self
    }

    /// Cadence the subscription engine polls each watched address at.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Chains to eagerly load during [`Self::build`] instead of on first
    /// use.
    pub fn preload(mut self, chains: impl IntoIterator<Item = Chain>) -> Self {
        self.preload.extend(chains);
        self
    }

    pub async fn build(self) -> WalletResult<Sdk> {
        let catalog = Arc::new(ChainConfigCatalog::new());
        let metrics = Arc::new(Metrics::new());
        let bus = EventBus::with_capacity(self.event_history_capacity);
        let registry = AdapterRegistry::new(self.seed, catalog.clone(), metrics.clone());
        let subscriptions = SubscriptionEngine::with_poll_interval(bus.clone(), self.poll_interval);

        if !self.preload.is_empty() {
            registry.preload(&self.preload).await?;
        }

        Ok(Sdk {
            registry,
            catalog,
            metrics,
            bus,
            subscriptions,
            shut_down: Arc::new(AtomicBool::new(false)),
        })
    }
}

/// Root handle for the HD wallet SDK. Cheap to clone; every clone shares
/// the same registry, event bus, and metrics.
#[derive(Clone)]
pub struct Sdk {
    registry: Arc<AdapterRegistry>,
    catalog: Arc<ChainConfigCatalog>,
    metrics: Arc<Metrics>,
    bus: Arc<EventBus>,
    subscriptions: Arc<SubscriptionEngine>,
    shut_down: Arc<AtomicBool>,
}

impl Sdk {
    pub fn builder(seed: MasterSeed) -> SdkBuilder {
        SdkBuilder::new(seed)
    }

    /// Construct with every default, skipping the builder for the common
    /// case.
    pub async fn new(seed: MasterSeed) -> WalletResult<Self> {
        Self::builder(seed).build().await
    }

    fn guard(&self) -> WalletResult<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(WalletError::sdk_shutdown());
        }
        Ok(())
    }

    /// Mint a new [`Wallet`] facade sharing this SDK's services.
    pub fn create_wallet(&self) -> WalletResult<Wallet> {
        self.guard()?;
        Ok(Wallet::new(self.registry.clone(), self.bus.clone(), self.subscriptions.clone(), self.metrics.clone(), self.shut_down.clone()))
    }

    /// Install a per-instance RPC override for one chain, scoped to this
    /// SDK instance and never a process global.
    pub fn set_rpc_override(&self, chain: Chain, http_url: impl Into<String>) -> WalletResult<()> {
        self.guard()?;
        self.catalog.set_rpc_override(chain, http_url)
    }

    pub fn clear_rpc_override(&self, chain: Chain) -> WalletResult<()> {
        self.guard()?;
        self.catalog.clear_override(chain);
        Ok(())
    }

    /// Atomically swap the master seed, invalidating every cached adapter
    /// so future derivations use the new key material.
    pub fn replace_seed(&self, new_seed: MasterSeed) -> WalletResult<()> {
        self.guard()?;
        self.registry.replace_seed(new_seed);
        Ok(())
    }

    /// Subscribe to the raw event bus directly, for hosts that want
    /// cross-chain observability rather than a single address's feed.
    pub fn on_event(&self, filter: EventFilter, handler: impl Fn(&ChainEvent) + Send + Sync + 'static) -> WalletResult<Unsubscribe> {
        self.guard()?;
        Ok(self.bus.subscribe(filter, handler))
    }

    pub fn metrics_snapshot(&self) -> std::collections::HashMap<String, u64> {
        self.metrics.snapshot()
    }

    pub fn event_history(&self) -> Vec<ChainEvent> {
        self.bus.history_snapshot()
    }

    /// Loads the adapter for `chain` without deriving anything, for hosts
    /// that want to pay RPC connection-setup cost up front.
    pub async fn preload_chain(&self, chain: Chain) -> WalletResult<Arc<dyn ChainAdapter>> {
        self.guard()?;
        self.registry.load(chain).await
    }

    /// Cancels every outstanding polling loop and calls `shutdown` on
    /// every loaded adapter, then marks the SDK (and every [`Wallet`] it
    /// minted) as shut down — subsequent calls on either return
    /// `SdkShutdown`.
    pub async fn shutdown(&self) -> WalletResult<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.subscriptions.cancel_all();
        self.registry.shutdown_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn sdk() -> Sdk {
        Sdk::new(MasterSeed::new(vec![7u8; 32])).await.unwrap()
    }

    #[tokio::test]
    async fn wallets_minted_from_the_same_sdk_share_state() {
        let sdk = sdk().await;
        let wallet_a = sdk.create_wallet().unwrap();
        let wallet_b = sdk.create_wallet().unwrap();

        let params = crate::types::DeriveParams::new("wallet", "user-1", Chain::Ethereum, "0").unwrap();
        let address_a = wallet_a.derive_address(&params).await.unwrap();
        let address_b = wallet_b.derive_address(&params).await.unwrap();
        assert_eq!(address_a, address_b);
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_poisons_new_wallets() {
        let sdk = sdk().await;
        sdk.shutdown().await.unwrap();
        sdk.shutdown().await.unwrap();

        let err = sdk.create_wallet().unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::SdkShutdown);
    }

    #[tokio::test]
    async fn wallets_minted_before_shutdown_are_rejected_after() {
        let sdk = sdk().await;
        let wallet = sdk.create_wallet().unwrap();
        sdk.shutdown().await.unwrap();

        let params = crate::types::DeriveParams::new("wallet", "user-1", Chain::Ethereum, "0").unwrap();
        let err = wallet.derive_address(&params).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::SdkShutdown);
    }

    #[tokio::test]
    async fn preload_builder_option_warms_the_registry() {
        let sdk = Sdk::builder(MasterSeed::new(vec![9u8; 32])).preload(vec![Chain::Ethereum, Chain::Bitcoin]).build().await.unwrap();
        let wallet = sdk.create_wallet().unwrap();
        assert!(wallet.has_chain("ethereum"));
    }

    #[tokio::test]
    async fn metrics_snapshot_reflects_wallet_activity() {
        let sdk = sdk().await;
        let wallet = sdk.create_wallet().unwrap();
        let params = crate::types::DeriveParams::new("wallet", "user-1", Chain::Ethereum, "0").unwrap();
        wallet.derive_address(&params).await.unwrap();

        let snapshot = sdk.metrics_snapshot();
        assert_eq!(snapshot.get("wallet.derive_address").copied(), Some(1));
    }
}
