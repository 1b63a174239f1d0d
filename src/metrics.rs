//! In-process counters backing the `wallet.<op>` / `wallet.<op>.error`
//! metrics the facade emits. No external exporter — `Metrics::snapshot`
//! is the integration point for a host that wants to forward these.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

#[derive(Default)]
pub struct Metrics {
    counters: RwLock<HashMap<String, AtomicU64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&self, name: &str) {
        if let Ok(counters) = self.counters.read() {
            if let Some(counter) = counters.get(name) {
                counter.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        let mut counters = self.counters.write().expect("metrics lock poisoned");
        counters.entry(name.to_string()).or_insert_with(|| AtomicU64::new(0)).fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HashMap<String, u64> {
        let counters = self.counters.read().expect("metrics lock poisoned");
        counters.iter().map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_per_name() {
        let metrics = Metrics::new();
        metrics.incr("wallet.balance");
        metrics.incr("wallet.balance");
        metrics.incr("wallet.send");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot["wallet.balance"], 2);
        assert_eq!(snapshot["wallet.send"], 1);
    }
}
