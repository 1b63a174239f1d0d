//! Subscription engine: per-address polling loops that turn
//! `ChainAdapter::get_incoming_transactions` into `ChainEvent::Transaction`
//! publications on the event bus, each tx delivered at most once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle};

use crate::chains::{ChainAdapter, SeenHashes};
use crate::error::WalletResult;
use crate::events::{now_ms, ChainEvent, EventBus};
use crate::types::Chain;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
const MAX_CONCURRENT_POLLS_PER_ADAPTER: usize = 4;

/// One active polling subscription. Dropping this (or calling
/// [`Subscription::cancel`]) stops the background task.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn cancel(self) {
        self.handle.abort();
    }
}

/// Owns the polling tasks for every subscribed (chain, address) pair and
/// the per-adapter concurrency limiter that bounds how many polls run at
/// once.
pub struct SubscriptionEngine {
    bus: Arc<EventBus>,
    limiters: std::sync::Mutex<HashMap<Chain, Arc<Semaphore>>>,
    poll_interval: Duration,
    handles: std::sync::Mutex<Vec<AbortHandle>>,
}

impl SubscriptionEngine {
    pub fn new(bus: Arc<EventBus>) -> Arc<Self> {
        Self::with_poll_interval(bus, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(bus: Arc<EventBus>, poll_interval: Duration) -> Arc<Self> {
        Arc::new(Self { bus, limiters: std::sync::Mutex::new(HashMap::new()), poll_interval, handles: std::sync::Mutex::new(Vec::new()) })
    }

    /// Abort every polling task ever started through this engine,
    /// regardless of whether the caller still holds its [`Subscription`]
    /// handle. Used by a process-wide shutdown to cancel all polling
    /// loops even when a caller never kept its handle.
    pub fn cancel_all(&self) {
        let mut handles = self.handles.lock().expect("subscription handles lock poisoned");
        for handle in handles.drain(..) {
            handle.abort();
        }
    }

    fn limiter_for(&self, chain: Chain) -> Arc<Semaphore> {
        let mut limiters = self.limiters.lock().expect("subscription limiter map lock poisoned");
        limiters.entry(chain).or_insert_with(|| Arc::new(Semaphore::new(MAX_CONCURRENT_POLLS_PER_ADAPTER))).clone()
    }

    /// Start polling `address` on `adapter` until the returned
    /// [`Subscription`] is cancelled or dropped.
    pub fn subscribe(self: &Arc<Self>, adapter: Arc<dyn ChainAdapter>, address: String) -> Subscription {
        let bus = self.bus.clone();
        let limiter = self.limiter_for(adapter.chain());
        let poll_interval = self.poll_interval;
        let chain = adapter.chain();

        let handle = tokio::spawn(async move {
            let seen = SeenHashes::new();
            let mut interval = tokio::time::interval(poll_interval);
            loop {
                interval.tick().await;
                let Ok(_permit) = limiter.clone().acquire_owned().await else {
                    continue;
                };

                match adapter.get_incoming_transactions(&address, &seen).await {
                    Ok(incoming) => {
                        for tx in incoming {
                            bus.publish(ChainEvent::Transaction {
                                chain,
                                source_adapter: "subscription_engine",
                                timestamp_ms: now_ms(),
                                tx_hash: tx.tx_hash,
                                from: tx.from,
                                to: tx.to,
                                amount: tx.amount,
                            });
                        }
                    }
                    Err(err) => {
                        bus.publish(ChainEvent::Error {
                            chain,
                            source_adapter: "subscription_engine",
                            timestamp_ms: now_ms(),
                            code: err.code,
                            message: err.message,
                        });
                    }
                }
            }
        });

        self.handles.lock().expect("subscription handles lock poisoned").push(handle.abort_handle());
        Subscription { handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WalletError;
    use crate::types::{DeriveParams, FeeEstimate, IncomingTransaction, TransactionConfig, TransactionResponse};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    struct FakeAdapter {
        chain: Chain,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ChainAdapter for FakeAdapter {
        fn chain(&self) -> Chain {
            self.chain
        }

        fn derive_address(&self, _: &crate::derivation::MasterSeed, _: &DeriveParams) -> WalletResult<String> {
            unimplemented!()
        }

        async fn balance(&self, _address: &str) -> WalletResult<Decimal> {
            unimplemented!()
        }

        async fn send(
            &self,
            _: &crate::derivation::MasterSeed,
            _: &DeriveParams,
            _to: &str,
            _amount: Decimal,
            _config: Option<&TransactionConfig>,
        ) -> WalletResult<TransactionResponse> {
            unimplemented!()
        }

        async fn estimate_fee(&self, _to: &str, _amount: Decimal) -> WalletResult<FeeEstimate> {
            Err(WalletError::method_not_implemented("estimate_fee"))
        }

        async fn get_incoming_transactions(&self, address: &str, seen: &SeenHashes) -> WalletResult<Vec<IncomingTransaction>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let tx_hash = format!("tx-{call}");
            if !seen.mark_if_new(&tx_hash) {
                return Ok(Vec::new());
            }
            Ok(vec![IncomingTransaction {
                tx_hash,
                from: "sender".into(),
                to: address.to_string(),
                amount: Decimal::ONE,
                block_number: None,
                timestamp: None,
                token_contract: None,
            }])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polling_delivers_each_new_transaction_as_an_event() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let adapter: Arc<dyn ChainAdapter> = Arc::new(FakeAdapter { chain: Chain::Ethereum, calls: calls.clone() });
        let engine = SubscriptionEngine::with_poll_interval(bus.clone(), StdDuration::from_millis(10));

        let received = Arc::new(std::sync::Mutex::new(Vec::new()));
        let received_clone = received.clone();
        let _unsub = bus.subscribe(crate::events::EventFilter::new(), move |event| {
            if let ChainEvent::Transaction { tx_hash, .. } = event {
                received_clone.lock().unwrap().push(tx_hash.clone());
            }
        });

        let subscription = engine.subscribe(adapter, "watched-address".to_string());
        tokio::time::advance(StdDuration::from_millis(35)).await;
        tokio::task::yield_now().await;

        assert!(!received.lock().unwrap().is_empty());
        subscription.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_stops_every_outstanding_poll() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let adapter: Arc<dyn ChainAdapter> = Arc::new(FakeAdapter { chain: Chain::Ethereum, calls: calls.clone() });
        let engine = SubscriptionEngine::with_poll_interval(bus, StdDuration::from_millis(10));

        let _subscription = engine.subscribe(adapter, "watched-address".to_string());
        tokio::time::advance(StdDuration::from_millis(15)).await;
        tokio::task::yield_now().await;
        let calls_before = calls.load(Ordering::SeqCst);
        assert!(calls_before > 0);

        engine.cancel_all();
        tokio::time::advance(StdDuration::from_millis(100)).await;
        tokio::task::yield_now().await;

        assert_eq!(calls.load(Ordering::SeqCst), calls_before);
    }
}
