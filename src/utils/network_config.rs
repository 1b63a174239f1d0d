//! RPC endpoint validation and the static default endpoint table.
//!
//! [`ChainConfigCatalog`] (`crate::config`) builds on `default_endpoints`
//! here for its defaults, and on [`validate_endpoint`] whenever a caller
//! installs an override.

use std::collections::HashSet;
use std::sync::RwLock;

use url::Url;

use crate::error::WalletError;
use crate::types::Chain;

/// Validation result for a single RPC endpoint URL.
#[derive(Debug, Clone)]
pub struct EndpointValidation {
    pub is_valid: bool,
    pub url: Option<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// A single known-good RPC endpoint for a chain.
#[derive(Debug, Clone)]
pub struct RpcEndpoint {
    pub url: String,
    pub chain: Chain,
    pub priority: u8,
}

struct Whitelist(RwLock<HashSet<String>>);

impl Whitelist {
    fn default_set() -> HashSet<String> {
        [
            "infura.io", "alchemy.com", "quicknode.com", "ankr.com", "chainstack.com",
            "getblock.io", "drpc.org", "publicnode.com", "llamarpc.com", "1rpc.io",
            "mempool.space", "blockstream.info",
            "solana.com", "helius.xyz", "triton.one",
            "trongrid.io", "aptoslabs.com", "sui.io", "toncenter.com",
            "polkadot.io", "dwellir.com", "near.org",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn contains(&self, domain: &str) -> bool {
        let Ok(set) = self.0.read() else { return false };
        if set.contains(domain) {
            return true;
        }
        set.iter().any(|allowed| domain.ends_with(&format!(".{allowed}")))
    }
}

static WHITELIST: std::sync::OnceLock<Whitelist> = std::sync::OnceLock::new();

fn whitelist() -> &'static Whitelist {
    WHITELIST.get_or_init(|| Whitelist(RwLock::new(Whitelist::default_set())))
}

pub fn is_trusted_provider(domain: &str) -> bool {
    whitelist().contains(domain)
}

/// Validate an RPC endpoint URL for a given chain: scheme, whitelist, and a
/// handful of chain-specific path sanity checks. Errors make the URL
/// unusable; warnings are advisory only.
pub fn validate_endpoint(url: &str, chain: Chain) -> EndpointValidation {
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => {
            return EndpointValidation {
                is_valid: false,
                url: None,
                warnings,
                errors: vec![format!("invalid URL format: {e}")],
            };
        }
    };

    match parsed.scheme() {
        "https" | "wss" => {}
        "ws" => warnings.push("wss (secure websocket) recommended over ws".to_string()),
        "http" => match parsed.host_str() {
            Some(h) if h == "localhost" || h == "127.0.0.1" || h.starts_with("192.168.") => {
                warnings.push("http allowed for local development only".to_string());
            }
            _ => errors.push("https required for remote endpoints".to_string()),
        },
        other => errors.push(format!("unsupported URL scheme: {other}")),
    }

    if let Some(host) = parsed.host_str() {
        if !is_trusted_provider(host) {
            warnings.push(format!("domain '{host}' is not in the trusted provider list"));
        }
        if host.contains("..") {
            errors.push("URL contains suspicious path patterns".to_string());
        }
    }

    validate_chain_path(&parsed, chain, &mut warnings);

    if !parsed.username().is_empty() || parsed.password().is_some() {
        warnings.push("credentials in URL; prefer headers for authentication".to_string());
    }

    let is_valid = errors.is_empty();
    EndpointValidation {
        is_valid,
        url: is_valid.then(|| parsed.to_string()),
        warnings,
        errors,
    }
}

fn validate_chain_path(url: &Url, chain: Chain, warnings: &mut Vec<String>) {
    let host = url.host_str().unwrap_or("");
    let path = url.path();

    match chain {
        Chain::Bitcoin if host.contains("mempool") && !path.contains("/api") => {
            warnings.push("mempool.space API typically uses the /api path".to_string());
        }
        Chain::Solana if !path.is_empty() && path != "/" => {
            warnings.push("Solana RPC typically uses the root path".to_string());
        }
        _ => {}
    }
}

pub fn validate_rpc_override(url: &str, chain: Chain) -> Result<String, WalletError> {
    let validation = validate_endpoint(url, chain);
    if !validation.is_valid {
        return Err(WalletError::invalid_parameters(validation.errors.join("; ")));
    }
    Ok(validation.url.expect("valid endpoint always carries a normalized URL"))
}

/// Static default RPC endpoints, ordered by priority (lowest first).
pub fn default_endpoints(chain: Chain) -> Vec<RpcEndpoint> {
    let mk = |url: &str, priority: u8| RpcEndpoint { url: url.to_string(), chain, priority };

    match chain {
        Chain::Ethereum => vec![mk("https://eth.llamarpc.com", 1), mk("https://ethereum.publicnode.com", 2)],
        Chain::Bsc => vec![mk("https://bsc-dataseed.binance.org", 1), mk("https://bsc.publicnode.com", 2)],
        Chain::Polygon => vec![mk("https://polygon-rpc.com", 1), mk("https://polygon.llamarpc.com", 2)],
        Chain::Avalanche => vec![mk("https://api.avax.network/ext/bc/C/rpc", 1)],
        Chain::Arbitrum => vec![mk("https://arb1.arbitrum.io/rpc", 1)],
        Chain::Optimism => vec![mk("https://mainnet.optimism.io", 1)],
        Chain::Cronos => vec![mk("https://evm.cronos.org", 1)],
        Chain::Sonic => vec![mk("https://rpc.soniclabs.com", 1)],
        Chain::Base => vec![mk("https://mainnet.base.org", 1)],
        Chain::Bitcoin => vec![mk("https://mempool.space/api", 1), mk("https://blockstream.info/api", 2)],
        Chain::Solana => vec![mk("https://api.mainnet-beta.solana.com", 1)],
        Chain::Polkadot => vec![mk("https://rpc.polkadot.io", 1)],
        Chain::Cardano => vec![mk("https://cardano-mainnet.blockfrost.io/api/v0", 1)],
        Chain::Aptos => vec![mk("https://fullnode.mainnet.aptoslabs.com/v1", 1)],
        Chain::Sui => vec![mk("https://fullnode.mainnet.sui.io", 1)],
        Chain::Tron => vec![mk("https://api.trongrid.io", 1)],
        Chain::Ton => vec![mk("https://toncenter.com/api/v2", 1)],
        Chain::Near => vec![mk("https://rpc.mainnet.near.org", 1)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_https_endpoint() {
        let result = validate_endpoint("https://mempool.space/api", Chain::Bitcoin);
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn http_rejected_for_remote_hosts() {
        let result = validate_endpoint("http://untrusted.example/api", Chain::Bitcoin);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("https required")));
    }

    #[test]
    fn localhost_http_allowed() {
        let result = validate_endpoint("http://localhost:8545", Chain::Ethereum);
        assert!(result.is_valid);
        assert!(result.warnings.iter().any(|w| w.contains("local development")));
    }

    #[test]
    fn unknown_domain_warns_but_is_valid() {
        let result = validate_endpoint("https://unknown-provider.example/api", Chain::Bitcoin);
        assert!(result.is_valid);
        assert!(result.warnings.iter().any(|w| w.contains("not in the trusted")));
    }

    #[test]
    fn invalid_url_is_rejected() {
        let result = validate_endpoint("not a url", Chain::Bitcoin);
        assert!(!result.is_valid);
    }

    #[test]
    fn every_chain_has_a_default_endpoint() {
        for chain in crate::types::ALL_CHAINS {
            assert!(!default_endpoints(*chain).is_empty(), "{chain} has no default endpoint");
        }
    }
}
