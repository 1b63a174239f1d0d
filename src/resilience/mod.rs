//! Retry and circuit-breaking helpers wrapping fallible async operations.

pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use retry::{with_retry, BackoffPolicy, RetryConfig};
