//! Typed event bus: a bounded ring buffer plus synchronous fan-out to
//! subscribers, filtered by chain/type/address.
//!
//! A handler that panics is caught and logged; it never stops delivery to
//! the remaining subscribers in the same publish call.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::error;
use rust_decimal::Decimal;

use crate::types::Chain;

const DEFAULT_HISTORY: usize = 1000;

/// Milliseconds since the Unix epoch, for `ChainEvent` timestamps.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// Tagged union of everything the bus carries.
#[derive(Debug, Clone)]
pub enum ChainEvent {
    Transaction {
        chain: Chain,
        source_adapter: &'static str,
        timestamp_ms: u64,
        tx_hash: String,
        from: String,
        to: String,
        amount: Decimal,
    },
    Block {
        chain: Chain,
        source_adapter: &'static str,
        timestamp_ms: u64,
        height: u64,
    },
    Error {
        chain: Chain,
        source_adapter: &'static str,
        timestamp_ms: u64,
        code: crate::error::ErrorCode,
        message: String,
    },
    Status {
        chain: Chain,
        source_adapter: &'static str,
        timestamp_ms: u64,
        message: String,
    },
}

impl ChainEvent {
    pub fn chain(&self) -> Chain {
        match self {
            ChainEvent::Transaction { chain, .. }
            | ChainEvent::Block { chain, .. }
            | ChainEvent::Error { chain, .. }
            | ChainEvent::Status { chain, .. } => *chain,
        }
    }

    fn kind(&self) -> EventKind {
        match self {
            ChainEvent::Transaction { .. } => EventKind::Transaction,
            ChainEvent::Block { .. } => EventKind::Block,
            ChainEvent::Error { .. } => EventKind::Error,
            ChainEvent::Status { .. } => EventKind::Status,
        }
    }

    /// `from`/`to` for transaction events; `None` for every other variant,
    /// since the address filter is only meaningful for transaction events.
    fn addresses(&self) -> Option<(&str, &str)> {
        match self {
            ChainEvent::Transaction { from, to, .. } => Some((from.as_str(), to.as_str())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Transaction,
    Block,
    Error,
    Status,
}

/// A predicate over [`ChainEvent`]s: all configured dimensions must match.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub chains: Option<Vec<Chain>>,
    pub kinds: Option<Vec<EventKind>>,
    pub addresses: Option<Vec<String>>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(mut self, chain: Chain) -> Self {
        self.chains.get_or_insert_with(Vec::new).push(chain);
        self
    }

    pub fn kind(mut self, kind: EventKind) -> Self {
        self.kinds.get_or_insert_with(Vec::new).push(kind);
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.addresses.get_or_insert_with(Vec::new).push(address.into());
        self
    }

    fn matches(&self, event: &ChainEvent) -> bool {
        if let Some(chains) = &self.chains {
            if !chains.contains(&event.chain()) {
                return false;
            }
        }
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&event.kind()) {
                return false;
            }
        }
        if let Some(addresses) = &self.addresses {
            match event.addresses() {
                Some((from, to)) => {
                    if !addresses.iter().any(|a| a == from || a == to) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}

type Handler = Box<dyn Fn(&ChainEvent) + Send + Sync>;

struct Subscriber {
    id: u64,
    filter: EventFilter,
    handler: Handler,
}

struct Inner {
    history: VecDeque<ChainEvent>,
    history_cap: usize,
    subscribers: Vec<Subscriber>,
}

/// Single in-process broadcaster shared by the facade, the registry, and
/// the subscription engine.
pub struct EventBus {
    inner: Mutex<Inner>,
    next_id: AtomicU64,
}

/// Handle returned by [`EventBus::subscribe`]; dropping it does nothing,
/// call it explicitly to detach the handler.
pub struct Unsubscribe {
    bus: Arc<EventBus>,
    id: u64,
}

impl Unsubscribe {
    pub fn unsubscribe(self) {
        if let Ok(mut inner) = self.bus.inner.lock() {
            inner.subscribers.retain(|s| s.id != self.id);
        }
    }
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Self::with_capacity(DEFAULT_HISTORY)
    }

    pub fn with_capacity(history_cap: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner { history: VecDeque::with_capacity(history_cap), history_cap, subscribers: Vec::new() }),
            next_id: AtomicU64::new(1),
        })
    }

    /// Register a handler under `filter`. Subscribers are delivered events
    /// in the order they publish within one call to [`Self::publish`].
    pub fn subscribe(self: &Arc<Self>, filter: EventFilter, handler: impl Fn(&ChainEvent) + Send + Sync + 'static) -> Unsubscribe {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().expect("event bus lock poisoned");
        inner.subscribers.push(Subscriber { id, filter, handler: Box::new(handler) });
        Unsubscribe { bus: Arc::clone(self), id }
    }

    /// Append to the bounded history and deliver synchronously to every
    /// matching subscriber. A handler panic is caught, logged, and does
    /// not interrupt delivery to the rest.
    pub fn publish(&self, event: ChainEvent) {
        let mut inner = self.inner.lock().expect("event bus lock poisoned");

        if inner.history.len() >= inner.history_cap {
            inner.history.pop_front();
        }
        inner.history.push_back(event.clone());

        for subscriber in &inner.subscribers {
            if subscriber.filter.matches(&event) {
                let outcome = catch_unwind(AssertUnwindSafe(|| (subscriber.handler)(&event)));
                if outcome.is_err() {
                    error!(target: "wallet::events", "event subscriber {} panicked", subscriber.id);
                }
            }
        }
    }

    pub fn history_snapshot(&self) -> Vec<ChainEvent> {
        self.inner.lock().expect("event bus lock poisoned").history.iter().cloned().collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().expect("event bus lock poisoned").subscribers.len()
    }
}
