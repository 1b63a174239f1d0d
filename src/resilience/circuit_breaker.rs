//! A classic closed/open/half-open circuit breaker guarding a single
//! upstream (one adapter's RPC endpoint, typically).

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::WalletError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    half_open_successes: u32,
}

/// Opens after `failure_threshold` consecutive failures; after
/// `reset_timeout` it allows one probe through in the half-open state, and
/// closes again once `half_open_successes_required` probes succeed in a
/// row. A single half-open failure reopens it immediately.
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    half_open_successes_required: u32,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self::with_half_open_successes(failure_threshold, reset_timeout, 1)
    }

    pub fn with_half_open_successes(failure_threshold: u32, reset_timeout: Duration, half_open_successes_required: u32) -> Self {
        Self {
            failure_threshold,
            reset_timeout,
            half_open_successes_required,
            inner: Mutex::new(Inner { state: CircuitState::Closed, consecutive_failures: 0, opened_at: None, half_open_successes: 0 }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().expect("circuit breaker lock poisoned").state
    }

    /// Call before attempting the guarded operation. Returns
    /// `ErrorCode::CircuitOpen` if the breaker refuses the call; otherwise
    /// the caller must report the outcome via [`Self::record_success`] or
    /// [`Self::record_failure`].
    pub fn check(&self) -> Result<(), WalletError> {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.reset_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_successes = 0;
                    Ok(())
                } else {
                    Err(WalletError::circuit_open(format!("circuit open; retry after {:?}", self.reset_timeout.saturating_sub(elapsed))))
                }
            }
            CircuitState::HalfOpen => Ok(()),
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        match inner.state {
            CircuitState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.half_open_successes_required {
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    inner.opened_at = None;
                }
            }
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.half_open_successes = 0;
            }
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            CircuitState::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn opens_after_consecutive_failure_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
        assert_eq!(breaker.state(), CircuitState::Closed);

        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn rejects_calls_while_open() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(30));
        breaker.record_failure();
        assert!(breaker.check().is_err());
    }

    #[test]
    fn transitions_to_half_open_after_reset_timeout() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        sleep(Duration::from_millis(20));
        assert!(breaker.check().is_ok());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn half_open_success_closes_the_circuit() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure();
        sleep(Duration::from_millis(20));
        breaker.check().unwrap();
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure();
        sleep(Duration::from_millis(20));
        breaker.check().unwrap();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn success_in_closed_state_resets_failure_count() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
