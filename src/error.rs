//! Unified error type for the wallet SDK.
//!
//! Every fallible operation in the crate returns [`WalletResult`]. Error
//! variants mirror the taxonomy callers are expected to pattern-match on;
//! the `Display` text is for logs only, never a contract.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Chain;

/// Stable error code every [`WalletError`] carries, for pattern matching
/// instead of string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidParameters,
    UnsupportedChain,
    MethodNotImplemented,
    NetworkError,
    RpcError,
    InsufficientBalance,
    InvalidAddress,
    SignatureFailure,
    BroadcastFailure,
    CircuitOpen,
    AllAttemptsFailed,
    Timeout,
    SdkShutdown,
}

/// Context bag attached to an error for observability. Never holds secrets:
/// the only permitted fields are chain, a digest of params, and attempt
/// count, per the propagation policy in the specification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    pub chain: Option<Chain>,
    pub params_digest: Option<String>,
    pub attempt: Option<u32>,
    pub extra: HashMap<String, String>,
}

impl ErrorContext {
    pub fn chain(mut self, chain: Chain) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("[{code:?}] {message}")]
pub struct WalletError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default)]
    pub context: ErrorContext,
}

impl WalletError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    pub fn invalid_parameters(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParameters, msg)
    }

    pub fn unsupported_chain(chain: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedChain, format!("unsupported chain: {}", chain.into()))
    }

    pub fn method_not_implemented(method: &str) -> Self {
        Self::new(ErrorCode::MethodNotImplemented, format!("{} is not implemented for this adapter", method))
    }

    pub fn network_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, msg)
    }

    pub fn rpc_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcError, msg)
    }

    pub fn insufficient_balance(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientBalance, msg)
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAddress, msg)
    }

    pub fn signature_failure(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SignatureFailure, msg)
    }

    pub fn broadcast_failure(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::BroadcastFailure, msg)
    }

    pub fn circuit_open(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::CircuitOpen, msg)
    }

    pub fn all_attempts_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AllAttemptsFailed, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, msg)
    }

    pub fn sdk_shutdown() -> Self {
        Self::new(ErrorCode::SdkShutdown, "the SDK instance has been shut down")
    }

    /// Only network/RPC/timeout errors (and circuit probes) are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self.code, ErrorCode::NetworkError | ErrorCode::RpcError | ErrorCode::Timeout)
    }
}

pub type WalletResult<T> = Result<T, WalletError>;

impl From<reqwest::Error> for WalletError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            WalletError::timeout(e.to_string())
        } else {
            WalletError::network_error(e.to_string())
        }
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(e: serde_json::Error) -> Self {
        WalletError::new(ErrorCode::RpcError, format!("malformed RPC payload: {e}"))
    }
}

impl From<hex::FromHexError> for WalletError {
    fn from(e: hex::FromHexError) -> Self {
        WalletError::invalid_parameters(format!("invalid hex: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_codes() {
        assert!(WalletError::network_error("x").is_retryable());
        assert!(WalletError::rpc_error("x").is_retryable());
        assert!(WalletError::timeout("x").is_retryable());
        assert!(!WalletError::invalid_parameters("x").is_retryable());
        assert!(!WalletError::circuit_open("x").is_retryable());
    }

    #[test]
    fn serializes_with_stable_code() {
        let err = WalletError::insufficient_balance("not enough sats")
            .with_context(ErrorContext::default().chain(Chain::Bitcoin).attempt(2));
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("insufficient_balance"));
        assert!(json.contains("\"attempt\":2"));
    }
}
