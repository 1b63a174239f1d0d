//! Adapter registry: lazy per-chain singleton construction with
//! concurrency-safe, idempotent loading and atomic seed replacement.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::Mutex as AsyncMutex;

use crate::chains::{build_adapter, ChainAdapter};
use crate::config::ChainConfigCatalog;
use crate::derivation::MasterSeed;
use crate::error::WalletResult;
use crate::metrics::Metrics;
use crate::types::Chain;

/// Per-chain in-flight load guard: every caller racing to load the same
/// chain waits on the same future instead of building duplicate adapters.
struct LoadGate {
    gates: Mutex<HashMap<Chain, Arc<AsyncMutex<()>>>>,
}

impl LoadGate {
    fn new() -> Self {
        Self { gates: Mutex::new(HashMap::new()) }
    }

    fn gate_for(&self, chain: Chain) -> Arc<AsyncMutex<()>> {
        let mut gates = self.gates.lock().expect("load gate map lock poisoned");
        gates.entry(chain).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }
}

/// Holds one lazily-constructed adapter per chain and the seed they were
/// built against. Replacing the seed invalidates every cached adapter so
/// the next `load` rebuilds against the new key material.
pub struct AdapterRegistry {
    seed: RwLock<MasterSeed>,
    catalog: Arc<ChainConfigCatalog>,
    metrics: Arc<Metrics>,
    cache: RwLock<HashMap<Chain, Arc<dyn ChainAdapter>>>,
    load_gate: LoadGate,
}

impl AdapterRegistry {
    pub fn new(seed: MasterSeed, catalog: Arc<ChainConfigCatalog>, metrics: Arc<Metrics>) -> Arc<Self> {
        Arc::new(Self {
            seed: RwLock::new(seed),
            catalog,
            metrics,
            cache: RwLock::new(HashMap::new()),
            load_gate: LoadGate::new(),
        })
    }

    /// Return the cached adapter for `chain`, constructing and
    /// `initialize`-ing it on first use. Concurrent callers for the same
    /// chain serialize on one load rather than racing duplicate builds.
    pub async fn load(&self, chain: Chain) -> WalletResult<Arc<dyn ChainAdapter>> {
        if let Some(adapter) = self.cache.read().expect("adapter cache lock poisoned").get(&chain) {
            return Ok(adapter.clone());
        }

        let gate = self.load_gate.gate_for(chain);
        let _permit = gate.lock().await;

        // Re-check: another caller may have finished the load while we
        // waited for the gate.
        if let Some(adapter) = self.cache.read().expect("adapter cache lock poisoned").get(&chain) {
            return Ok(adapter.clone());
        }

        let adapter: Arc<dyn ChainAdapter> = Arc::from(build_adapter(chain, &self.catalog, self.metrics.clone()));
        adapter.initialize().await?;

        self.cache.write().expect("adapter cache lock poisoned").insert(chain, adapter.clone());
        Ok(adapter)
    }

    /// Eagerly load every chain in `chains`, surfacing the first failure.
    pub async fn preload(&self, chains: &[Chain]) -> WalletResult<()> {
        for &chain in chains {
            self.load(chain).await?;
        }
        Ok(())
    }

    pub fn has_cached(&self, chain: Chain) -> bool {
        self.cache.read().expect("adapter cache lock poisoned").contains_key(&chain)
    }

    /// Atomically swap the master seed and drop every cached adapter so
    /// the next `load` rebuilds key material against the new seed.
    pub fn replace_seed(&self, new_seed: MasterSeed) {
        *self.seed.write().expect("seed lock poisoned") = new_seed;
        self.cache.write().expect("adapter cache lock poisoned").clear();
    }

    pub fn current_seed(&self) -> MasterSeed {
        self.seed.read().expect("seed lock poisoned").clone()
    }

    /// Call `shutdown` on every adapter that was ever loaded, in no
    /// particular order, collecting the first error but attempting all.
    pub async fn shutdown_all(&self) -> WalletResult<()> {
        let adapters: Vec<Arc<dyn ChainAdapter>> = self.cache.read().expect("adapter cache lock poisoned").values().cloned().collect();
        let mut first_error = None;
        for adapter in adapters {
            if let Err(e) = adapter.shutdown().await {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
