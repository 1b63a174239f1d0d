//! Shared data model: chains, params, configs, and wire-adjacent responses.
//!
//! Everything here is deliberately `Serialize`/`Deserialize` so hosts can
//! log or persist it — except the key-material types in [`crate::derivation`],
//! which never derive either.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// The closed set of chain tags the SDK supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[clap(rename_all = "kebab-case")]
pub enum Chain {
    Ethereum,
    Bsc,
    Polygon,
    Avalanche,
    Arbitrum,
    Optimism,
    Cronos,
    Sonic,
    Base,
    Bitcoin,
    Solana,
    Polkadot,
    Cardano,
    Aptos,
    Sui,
    Tron,
    Ton,
    Near,
}

pub const ALL_CHAINS: &[Chain] = &[
    Chain::Ethereum,
    Chain::Bsc,
    Chain::Polygon,
    Chain::Avalanche,
    Chain::Arbitrum,
    Chain::Optimism,
    Chain::Cronos,
    Chain::Sonic,
    Chain::Base,
    Chain::Bitcoin,
    Chain::Solana,
    Chain::Polkadot,
    Chain::Cardano,
    Chain::Aptos,
    Chain::Sui,
    Chain::Tron,
    Chain::Ton,
    Chain::Near,
];

/// Broad chain family, used to pick the adapter implementation and the
/// shape of [`TransactionConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainCategory {
    Evm,
    Utxo,
    Account,
    Other,
}

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Bsc => "bsc",
            Chain::Polygon => "polygon",
            Chain::Avalanche => "avalanche",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
            Chain::Cronos => "cronos",
            Chain::Sonic => "sonic",
            Chain::Base => "base",
            Chain::Bitcoin => "bitcoin",
            Chain::Solana => "solana",
            Chain::Polkadot => "polkadot",
            Chain::Cardano => "cardano",
            Chain::Aptos => "aptos",
            Chain::Sui => "sui",
            Chain::Tron => "tron",
            Chain::Ton => "ton",
            Chain::Near => "near",
        }
    }

    pub fn category(&self) -> ChainCategory {
        match self {
            Chain::Ethereum
            | Chain::Bsc
            | Chain::Polygon
            | Chain::Avalanche
            | Chain::Arbitrum
            | Chain::Optimism
            | Chain::Cronos
            | Chain::Sonic
            | Chain::Base => ChainCategory::Evm,
            Chain::Bitcoin => ChainCategory::Utxo,
            Chain::Solana | Chain::Tron | Chain::Aptos | Chain::Sui | Chain::Ton => ChainCategory::Account,
            Chain::Polkadot | Chain::Cardano | Chain::Near => ChainCategory::Other,
        }
    }

    /// EIP-155 chain id, for EVM family members only.
    pub fn evm_chain_id(&self) -> Option<u64> {
        match self {
            Chain::Ethereum => Some(1),
            Chain::Bsc => Some(56),
            Chain::Polygon => Some(137),
            Chain::Avalanche => Some(43114),
            Chain::Arbitrum => Some(42161),
            Chain::Optimism => Some(10),
            Chain::Cronos => Some(25),
            Chain::Sonic => Some(146),
            Chain::Base => Some(8453),
            _ => None,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Chain {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_CHAINS
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| WalletError::unsupported_chain(s))
    }
}

/// Caller-supplied derivation coordinates. All four fields are opaque; only
/// their byte representation matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeriveParams {
    pub scope: String,
    pub user_id: String,
    pub chain: Chain,
    pub index: String,
}

impl DeriveParams {
    pub fn new(scope: impl Into<String>, user_id: impl Into<String>, chain: Chain, index: impl Into<String>) -> Result<Self, WalletError> {
        let params = Self {
            scope: scope.into(),
            user_id: user_id.into(),
            chain,
            index: index.into(),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        if self.scope.is_empty() || self.user_id.is_empty() || self.index.is_empty() {
            return Err(WalletError::invalid_parameters(
                "scope, user_id, and index must be non-empty",
            ));
        }
        Ok(())
    }

    /// The exact byte string fed to HMAC: `"{scope}:{userId}:{chain}:{index}"`.
    pub fn mac_message(&self) -> Vec<u8> {
        format!("{}:{}:{}:{}", self.scope, self.user_id, self.chain.as_str(), self.index).into_bytes()
    }
}

/// Per-chain descriptor: display metadata, RPC endpoints, fee model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain: Chain,
    pub display_name: String,
    pub ticker: String,
    pub decimals: u8,
    pub category: ChainCategoryWire,
    pub endpoints: RpcEndpoints,
    pub fee_model: FeeModel,
}

/// `ChainCategory` is not itself (de)serializable to keep it a pure
/// dispatch tag; this wire twin mirrors it for `ChainConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainCategoryWire {
    Evm,
    Utxo,
    Account,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeModel {
    Fixed,
    Dynamic,
    Eip1559,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcEndpoints {
    pub http: String,
    pub ws: Option<String>,
    pub explorer: Option<String>,
    pub explorer_api: Option<String>,
    pub chain_id: Option<u64>,
}

/// Priority hint used both for fee bucketing and polling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

/// UTXO input-selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UtxoSelection {
    Auto,
    LargestFirst,
    SmallestFirst,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub value_sats: u64,
}

/// Fields every chain's `TransactionConfig` variant carries in common.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommonTxConfig {
    pub memo: Option<String>,
    pub priority: Option<Priority>,
    pub timeout_ms: Option<u64>,
    pub confirmations: Option<u32>,
}

/// Per-chain-family transaction configuration, modeled as a sum type so
/// cross-chain fields cannot be constructed together.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TransactionConfig {
    Evm {
        #[serde(flatten)]
        common: CommonTxConfig,
        gas_limit: Option<u64>,
        gas_price: Option<u64>,
        max_fee_per_gas: Option<u64>,
        max_priority_fee_per_gas: Option<u64>,
        nonce: Option<u64>,
        chain_id: Option<u64>,
        tx_type: Option<u8>,
        data: Option<String>,
        value: Option<String>,
    },
    Utxo {
        #[serde(flatten)]
        common: CommonTxConfig,
        fee_rate_sat_vb: Option<u64>,
        selection: UtxoSelection,
        specific_utxos: Vec<Utxo>,
        script_type: Option<String>,
        rbf: bool,
        lock_time: Option<u32>,
        sequence: Option<u32>,
    },
    Solana {
        #[serde(flatten)]
        common: CommonTxConfig,
        compute_units: Option<u32>,
        compute_unit_price: Option<u64>,
        preflight_commitment: Option<String>,
        skip_preflight: bool,
        max_retries: Option<u32>,
    },
    Aptos {
        #[serde(flatten)]
        common: CommonTxConfig,
        gas_unit_price: Option<u64>,
        max_gas_amount: Option<u64>,
        expiration_timestamp_secs: Option<u64>,
    },
    Ton {
        #[serde(flatten)]
        common: CommonTxConfig,
        bounce: Option<bool>,
        seqno: Option<u32>,
        valid_until: Option<u64>,
    },
    Plain {
        #[serde(flatten)]
        common: CommonTxConfig,
    },
}

impl TransactionConfig {
    pub fn common(&self) -> &CommonTxConfig {
        match self {
            TransactionConfig::Evm { common, .. }
            | TransactionConfig::Utxo { common, .. }
            | TransactionConfig::Solana { common, .. }
            | TransactionConfig::Aptos { common, .. }
            | TransactionConfig::Ton { common, .. }
            | TransactionConfig::Plain { common } => common,
        }
    }

    pub fn plain() -> Self {
        TransactionConfig::Plain { common: CommonTxConfig::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub tx_hash: String,
    pub status: TxStatus,
    pub block_number: Option<u64>,
    pub confirmations: Option<u32>,
    pub fee: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeEstimate {
    pub base_fee: Decimal,
    pub priority_fee: Option<Decimal>,
    pub total_fee: Decimal,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingTransaction {
    pub tx_hash: String,
    pub from: String,
    pub to: String,
    pub amount: Decimal,
    pub block_number: Option<u64>,
    pub timestamp: Option<u64>,
    pub token_contract: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionHistoryEntry {
    pub tx_hash: String,
    pub status: TxStatus,
    pub counterparty: String,
    pub amount: Decimal,
    pub timestamp: Option<u64>,
    pub fee: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_round_trips_through_str() {
        for chain in ALL_CHAINS {
            let parsed: Chain = chain.as_str().parse().unwrap();
            assert_eq!(parsed, *chain);
        }
    }

    #[test]
    fn unknown_chain_is_rejected() {
        let err = "dogecoin".parse::<Chain>().unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::UnsupportedChain);
    }

    #[test]
    fn derive_params_rejects_empty_fields() {
        assert!(DeriveParams::new("", "u", Chain::Bitcoin, "0").is_err());
        assert!(DeriveParams::new("s", "u", Chain::Bitcoin, "").is_err());
        assert!(DeriveParams::new("s", "u", Chain::Bitcoin, "0").is_ok());
    }

    #[test]
    fn mac_message_matches_normative_format() {
        let params = DeriveParams::new("wallet", "user-1", Chain::Ethereum, "0").unwrap();
        assert_eq!(params.mac_message(), b"wallet:user-1:ethereum:0".to_vec());
    }
}
