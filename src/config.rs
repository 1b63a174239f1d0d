//! Per-chain configuration: a static default catalog plus instance-scoped
//! RPC overrides.
//!
//! Overrides live on the [`ChainConfigCatalog`] instance, never in process
//! globals — two `Wallet`s in the same process must not see each other's
//! endpoint overrides.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::WalletError;
use crate::types::{Chain, ChainCategoryWire, ChainConfig, FeeModel, RpcEndpoints};
use crate::utils::network_config;

fn display_name(chain: Chain) -> &'static str {
    match chain {
        Chain::Ethereum => "Ethereum",
        Chain::Bsc => "BNB Smart Chain",
        Chain::Polygon => "Polygon",
        Chain::Avalanche => "Avalanche C-Chain",
        Chain::Arbitrum => "Arbitrum One",
        Chain::Optimism => "OP Mainnet",
        Chain::Cronos => "Cronos",
        Chain::Sonic => "Sonic",
        Chain::Base => "Base",
        Chain::Bitcoin => "Bitcoin",
        Chain::Solana => "Solana",
        Chain::Polkadot => "Polkadot",
        Chain::Cardano => "Cardano",
        Chain::Aptos => "Aptos",
        Chain::Sui => "Sui",
        Chain::Tron => "Tron",
        Chain::Ton => "TON",
        Chain::Near => "NEAR Protocol",
    }
}

fn ticker(chain: Chain) -> &'static str {
    match chain {
        Chain::Ethereum => "ETH",
        Chain::Bsc => "BNB",
        Chain::Polygon => "POL",
        Chain::Avalanche => "AVAX",
        Chain::Arbitrum => "ETH",
        Chain::Optimism => "ETH",
        Chain::Cronos => "CRO",
        Chain::Sonic => "S",
        Chain::Base => "ETH",
        Chain::Bitcoin => "BTC",
        Chain::Solana => "SOL",
        Chain::Polkadot => "DOT",
        Chain::Cardano => "ADA",
        Chain::Aptos => "APT",
        Chain::Sui => "SUI",
        Chain::Tron => "TRX",
        Chain::Ton => "TON",
        Chain::Near => "NEAR",
    }
}

fn decimals(chain: Chain) -> u8 {
    match chain {
        Chain::Bitcoin => 8,
        Chain::Solana => 9,
        Chain::Tron => 6,
        Chain::Aptos => 8,
        Chain::Ton => 9,
        Chain::Sui => 9,
        Chain::Near => 24,
        Chain::Cardano => 6,
        Chain::Polkadot => 10,
        _ => 18,
    }
}

fn fee_model(chain: Chain) -> FeeModel {
    match chain.category() {
        crate::types::ChainCategory::Evm => FeeModel::Eip1559,
        crate::types::ChainCategory::Utxo => FeeModel::Dynamic,
        crate::types::ChainCategory::Account | crate::types::ChainCategory::Other => FeeModel::Fixed,
    }
}

fn wire_category(chain: Chain) -> ChainCategoryWire {
    match chain.category() {
        crate::types::ChainCategory::Evm => ChainCategoryWire::Evm,
        crate::types::ChainCategory::Utxo => ChainCategoryWire::Utxo,
        crate::types::ChainCategory::Account => ChainCategoryWire::Account,
        crate::types::ChainCategory::Other => ChainCategoryWire::Other,
    }
}

fn default_config(chain: Chain) -> ChainConfig {
    let default_endpoint = network_config::default_endpoints(chain)
        .into_iter()
        .next()
        .expect("every supported chain has at least one default endpoint");

    ChainConfig {
        chain,
        display_name: display_name(chain).to_string(),
        ticker: ticker(chain).to_string(),
        decimals: decimals(chain),
        category: wire_category(chain),
        endpoints: RpcEndpoints { http: default_endpoint.url, ws: None, explorer: None, explorer_api: None, chain_id: chain.evm_chain_id() },
        fee_model: fee_model(chain),
    }
}

/// Per-instance catalog of chain configs: static defaults with an
/// overlay of caller-installed overrides.
pub struct ChainConfigCatalog {
    overrides: RwLock<HashMap<Chain, ChainConfig>>,
}

impl ChainConfigCatalog {
    pub fn new() -> Self {
        Self { overrides: RwLock::new(HashMap::new()) }
    }

    /// Resolve the effective config for a chain: an override if one is
    /// installed, otherwise the built-in default.
    pub fn get(&self, chain: Chain) -> ChainConfig {
        if let Ok(overrides) = self.overrides.read() {
            if let Some(cfg) = overrides.get(&chain) {
                return cfg.clone();
            }
        }
        default_config(chain)
    }

    /// Install an RPC override for one chain on this instance only.
    /// Validates the URL before accepting it.
    pub fn set_rpc_override(&self, chain: Chain, http_url: impl Into<String>) -> Result<(), WalletError> {
        let http_url = http_url.into();
        let normalized = network_config::validate_rpc_override(&http_url, chain)?;

        let mut config = self.get(chain);
        config.endpoints.http = normalized;

        let mut overrides = self
            .overrides
            .write()
            .map_err(|_| WalletError::new(crate::error::ErrorCode::RpcError, "chain config overrides lock poisoned"))?;
        overrides.insert(chain, config);
        Ok(())
    }

    pub fn clear_override(&self, chain: Chain) {
        if let Ok(mut overrides) = self.overrides.write() {
            overrides.remove(&chain);
        }
    }
}

impl Default for ChainConfigCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_covers_every_chain() {
        let catalog = ChainConfigCatalog::new();
        for chain in crate::types::ALL_CHAINS {
            let cfg = catalog.get(*chain);
            assert!(!cfg.endpoints.http.is_empty());
        }
    }

    #[test]
    fn override_takes_precedence_and_is_instance_scoped() {
        let catalog_a = ChainConfigCatalog::new();
        let catalog_b = ChainConfigCatalog::new();

        catalog_a.set_rpc_override(Chain::Ethereum, "https://eth.llamarpc.com/custom").unwrap();

        assert_eq!(catalog_a.get(Chain::Ethereum).endpoints.http, "https://eth.llamarpc.com/custom");
        assert_ne!(catalog_b.get(Chain::Ethereum).endpoints.http, "https://eth.llamarpc.com/custom");
    }

    #[test]
    fn invalid_override_is_rejected() {
        let catalog = ChainConfigCatalog::new();
        assert!(catalog.set_rpc_override(Chain::Ethereum, "not a url").is_err());
    }
}
