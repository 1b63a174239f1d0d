//! Property-based invariants over the derivation kernel and the address
//! format validators, run against arbitrary (not just hand-picked) inputs.

use std::sync::Arc;

use proptest::prelude::*;
use wayfinder_wallet::chains::build_adapter;
use wayfinder_wallet::config::ChainConfigCatalog;
use wayfinder_wallet::derivation::{derive_entropy, MasterSeed};
use wayfinder_wallet::metrics::Metrics;
use wayfinder_wallet::wallet::address_validation::is_valid_address;
use wayfinder_wallet::{Chain, DeriveParams, ALL_CHAINS};

fn non_empty_ascii() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,16}".prop_map(|s| s)
}

fn any_chain() -> impl Strategy<Value = Chain> {
    (0..ALL_CHAINS.len()).prop_map(|i| ALL_CHAINS[i])
}

proptest! {
    #[test]
    fn derivation_is_pure_and_deterministic(
        seed_bytes in prop::array::uniform32(any::<u8>()),
        scope in non_empty_ascii(),
        user in non_empty_ascii(),
        chain in any_chain(),
        index in non_empty_ascii(),
    ) {
        let seed = MasterSeed::new(seed_bytes.to_vec());
        let params = DeriveParams::new(scope, user, chain, index).unwrap();

        let a = derive_entropy(&seed, &params).unwrap();
        let b = derive_entropy(&seed, &params).unwrap();
        prop_assert_eq!(a.seed(), b.seed());
    }

    #[test]
    fn distinct_index_always_yields_distinct_entropy(
        seed_bytes in prop::array::uniform32(any::<u8>()),
        chain in any_chain(),
        index_a in non_empty_ascii(),
        index_b in non_empty_ascii(),
    ) {
        prop_assume!(index_a != index_b);
        let seed = MasterSeed::new(seed_bytes.to_vec());
        let a = derive_entropy(&seed, &DeriveParams::new("s", "u", chain, index_a).unwrap()).unwrap();
        let b = derive_entropy(&seed, &DeriveParams::new("s", "u", chain, index_b).unwrap()).unwrap();
        prop_assert_ne!(a.seed(), b.seed());
    }

    #[test]
    fn every_derived_address_passes_its_own_format_validator(
        seed_bytes in prop::array::uniform32(any::<u8>()),
        chain in any_chain(),
        index in non_empty_ascii(),
    ) {
        let seed = MasterSeed::new(seed_bytes.to_vec());
        let params = DeriveParams::new("wallet", "user-1", chain, index).unwrap();
        let catalog = ChainConfigCatalog::new();
        let adapter = build_adapter(chain, &catalog, Arc::new(Metrics::new()));

        let address = adapter.derive_address(&seed, &params).unwrap();
        prop_assert!(is_valid_address(&address, chain), "derived address {address} failed validation for {chain}");
    }
}
