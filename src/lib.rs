//! Deterministic hierarchical multi-chain wallet SDK.
//!
//! Given one master seed, derives key material and addresses for 18
//! chains on demand, through a uniform adapter protocol, with retry and
//! circuit-breaker resilience, a typed event bus, and an address-polling
//! subscription engine.
//!
//! # Architecture
//!
//! - [`derivation`]: HMAC-SHA-512 deterministic key derivation from a
//!   [`MasterSeed`] and [`DeriveParams`].
//! - [`chains`]: the [`chains::ChainAdapter`] trait and one implementation
//!   per chain family (EVM, Bitcoin, Solana, Tron, Aptos, Sui, TON, and the
//!   simple-account chains).
//! - [`registry`]: lazy, concurrency-safe per-chain adapter construction
//!   and caching.
//! - [`events`] / [`subscription`]: the event bus and the polling engine
//!   that feeds it.
//! - [`resilience`]: retry backoff and circuit breaking for RPC calls.
//! - [`config`]: per-chain defaults plus instance-scoped RPC overrides.
//! - [`sdk`] / [`wallet`]: the public facade — [`Sdk`] owns the shared
//!   services, [`Wallet`] is the handle application code calls.
//!
//! # Security
//!
//! Master seeds and derived entropy are wrapped in [`zeroize::Zeroizing`]
//! and never implement `Serialize` or a `Debug` that prints their bytes.

pub mod chains;
pub mod config;
pub mod derivation;
pub mod error;
pub mod events;
pub mod metrics;
pub mod registry;
pub mod resilience;
pub mod sdk;
pub mod subscription;
pub mod types;
pub mod utils;
pub mod wallet;

pub use derivation::MasterSeed;
pub use error::{ErrorCode, ErrorContext, WalletError, WalletResult};
pub use events::{ChainEvent, EventFilter, EventKind, Unsubscribe};
pub use sdk::{Sdk, SdkBuilder};
pub use subscription::Subscription;
pub use types::{
    Chain, ChainCategoryWire, ChainConfig, CommonTxConfig, DeriveParams, FeeEstimate, FeeModel, IncomingTransaction, Priority, RpcEndpoints,
    TransactionConfig, TransactionHistoryEntry, TransactionResponse, TxStatus, Utxo, UtxoSelection, ALL_CHAINS,
};
pub use wallet::{Wallet, WalletSubscription};
