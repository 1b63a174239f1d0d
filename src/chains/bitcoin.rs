//! Bitcoin Taproot (P2TR) adapter: key-path-only spends, built and signed
//! locally, broadcast through an Esplora-compatible REST endpoint.

use std::str::FromStr;

use async_trait::async_trait;
use bitcoin::absolute::LockTime;
use bitcoin::key::TapTweak;
use bitcoin::secp256k1::{Keypair, Message, Secp256k1};
use bitcoin::sighash::{Prevouts, SighashCache, TapSighashType};
use bitcoin::transaction::Version;
use bitcoin::{Address, Amount, Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::derivation::{self, MasterSeed};
use crate::error::{WalletError, WalletResult};
use crate::types::{Chain, DeriveParams, TransactionConfig, TransactionResponse, TxStatus, UtxoSelection};
use crate::utils::http;

use super::{AdapterContext, ChainAdapter};

#[derive(Debug, Deserialize, Clone)]
struct RemoteUtxo {
    txid: String,
    vout: u32,
    value: u64,
}

pub struct BitcoinAdapter {
    ctx: AdapterContext,
}

impl BitcoinAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn api_base(&self) -> &str {
        &self.ctx.config.endpoints.http
    }

    async fn fetch_utxos(&self, address: &str) -> WalletResult<Vec<RemoteUtxo>> {
        let url = format!("{}/address/{}/utxo", self.api_base(), address);
        let response = http::get(&url).await?;
        response.json::<Vec<RemoteUtxo>>().await.map_err(WalletError::from)
    }

    /// Select inputs per the requested strategy, refusing to proceed if
    /// the selected sum cannot cover amount + fee.
    fn select_utxos(utxos: &[RemoteUtxo], amount_sats: u64, fee_rate: u64, selection: UtxoSelection, specific: &[crate::types::Utxo]) -> WalletResult<(Vec<RemoteUtxo>, u64)> {
        let mut candidates = utxos.to_vec();
        match selection {
            UtxoSelection::LargestFirst | UtxoSelection::Auto => candidates.sort_by(|a, b| b.value.cmp(&a.value)),
            UtxoSelection::SmallestFirst => candidates.sort_by(|a, b| a.value.cmp(&b.value)),
            UtxoSelection::Manual => {
                candidates.retain(|u| specific.iter().any(|s| s.txid == u.txid && s.vout == u.vout));
            }
        }

        let mut selected = Vec::new();
        let mut sum = 0u64;
        for utxo in candidates {
            if sum >= amount_sats {
                break;
            }
            sum += utxo.value;
            selected.push(utxo);
        }

        // Rough fee model: ~68 vbytes per key-path-spend input, 43 per output, 10 overhead.
        let estimated_vbytes = 10 + selected.len() as u64 * 68 + 2 * 43;
        let estimated_fee = estimated_vbytes * fee_rate;

        if sum < amount_sats.saturating_add(estimated_fee) {
            return Err(WalletError::insufficient_balance(format!(
                "selected UTXOs ({sum} sats) cannot cover amount + fee ({} sats)",
                amount_sats + estimated_fee
            )));
        }

        Ok((selected, estimated_fee))
    }
}

#[async_trait]
impl ChainAdapter for BitcoinAdapter {
    fn chain(&self) -> Chain {
        Chain::Bitcoin
    }

    fn derive_address(&self, master_seed: &MasterSeed, params: &DeriveParams) -> WalletResult<String> {
        let entropy = derivation::derive_entropy(master_seed, params)?;
        let secret = derivation::secp256k1_from_raw(&entropy)?;
        let secp = Secp256k1::new();
        let keypair = Keypair::from_secret_key(&secp, &secret);
        let (x_only, _parity) = keypair.x_only_public_key();
        let address = Address::p2tr(&secp, x_only, None, Network::Bitcoin);
        Ok(address.to_string())
    }

    async fn balance(&self, address: &str) -> WalletResult<Decimal> {
        let utxos = self.fetch_utxos(address).await?;
        let sats: u64 = utxos.iter().map(|u| u.value).sum();
        Ok(Decimal::from(sats) / Decimal::from(100_000_000u64))
    }

    async fn send(
        &self,
        master_seed: &MasterSeed,
        params: &DeriveParams,
        to: &str,
        amount: Decimal,
        config: Option<&TransactionConfig>,
    ) -> WalletResult<TransactionResponse> {
        let entropy = derivation::derive_entropy(master_seed, params)?;
        let secret = derivation::secp256k1_from_raw(&entropy)?;
        let from = self.derive_address(master_seed, params)?;

        let (fee_rate, selection, specific, rbf, lock_time) = match config {
            Some(TransactionConfig::Utxo { fee_rate_sat_vb, selection, specific_utxos, rbf, lock_time, .. }) => {
                (fee_rate_sat_vb.unwrap_or(8), *selection, specific_utxos.clone(), *rbf, *lock_time)
            }
            Some(_) => return Err(WalletError::invalid_parameters("Bitcoin adapter requires a Utxo TransactionConfig variant")),
            None => (8, UtxoSelection::Auto, Vec::new(), false, None),
        };

        let to_address = bitcoin::Address::from_str(to)
            .map_err(|e| WalletError::invalid_address(format!("invalid Bitcoin address: {e}")))?
            .require_network(Network::Bitcoin)
            .map_err(|e| WalletError::invalid_address(e.to_string()))?;

        let utxos = self.fetch_utxos(&from).await?;
        let amount_sats = (amount * Decimal::from(100_000_000u64)).trunc().to_string().parse::<u64>().unwrap_or(0);
        let (selected, fee_sats) = Self::select_utxos(&utxos, amount_sats, fee_rate, selection, &specific)?;
        let selected_sats: u64 = selected.iter().map(|u| u.value).sum();

        let secp = Secp256k1::new();
        let keypair = Keypair::from_secret_key(&secp, &secret);
        let (x_only, _parity) = keypair.x_only_public_key();
        let from_address = Address::p2tr(&secp, x_only, None, Network::Bitcoin);
        let sequence = if rbf { Sequence::from_consensus(0xffff_fffd) } else { Sequence::from_consensus(0xffff_ffff) };

        let inputs = selected
            .iter()
            .map(|u| -> WalletResult<TxIn> {
                let txid = Txid::from_str(&u.txid).map_err(|e| WalletError::rpc_error(format!("malformed UTXO txid: {e}")))?;
                Ok(TxIn {
                    previous_output: OutPoint { txid, vout: u.vout },
                    script_sig: ScriptBuf::new(),
                    sequence,
                    witness: Witness::new(),
                })
            })
            .collect::<WalletResult<Vec<_>>>()?;

        const DUST_SATS: u64 = 546;
        let change_sats = selected_sats.saturating_sub(amount_sats + fee_sats);
        let mut outputs = vec![TxOut { value: Amount::from_sat(amount_sats), script_pubkey: to_address.script_pubkey() }];
        if change_sats > DUST_SATS {
            outputs.push(TxOut { value: Amount::from_sat(change_sats), script_pubkey: from_address.script_pubkey() });
        }

        let mut tx = Transaction { version: Version::TWO, lock_time: LockTime::from_consensus(lock_time.unwrap_or(0)), input: inputs, output: outputs };

        let prevouts: Vec<TxOut> = selected.iter().map(|u| TxOut { value: Amount::from_sat(u.value), script_pubkey: from_address.script_pubkey() }).collect();
        let tweaked = keypair.tap_tweak(&secp, None);
        let sighashes = {
            let mut cache = SighashCache::new(&tx);
            (0..tx.input.len())
                .map(|i| cache.taproot_key_spend_signature_hash(i, &Prevouts::All(&prevouts), TapSighashType::Default))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| WalletError::signature_failure(format!("sighash computation failed: {e}")))?
        };
        for (i, sighash) in sighashes.into_iter().enumerate() {
            let message = Message::from_digest(sighash.to_byte_array());
            let signature = secp.sign_schnorr_no_aux_rand(&message, &tweaked.to_inner());
            tx.input[i].witness = Witness::from_slice(&[signature.serialize()]);
        }

        let raw_hex = hex::encode(bitcoin::consensus::encode::serialize(&tx));
        let broadcast_url = format!("{}/tx", self.api_base());
        let response = http::post_raw(&broadcast_url, raw_hex).await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WalletError::broadcast_failure(format!("broadcast rejected: {body}")));
        }
        let body = response.text().await.map_err(WalletError::from)?;
        let tx_hash = if body.trim().is_empty() { tx.compute_txid().to_string() } else { body.trim().to_string() };

        Ok(TransactionResponse {
            tx_hash,
            status: TxStatus::Pending,
            block_number: None,
            confirmations: None,
            fee: Some(Decimal::from(fee_sats) / Decimal::from(100_000_000u64)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfigCatalog;
    use crate::metrics::Metrics;
    use std::sync::Arc;

    fn adapter() -> BitcoinAdapter {
        let catalog = ChainConfigCatalog::new();
        BitcoinAdapter::new(AdapterContext { chain: Chain::Bitcoin, config: catalog.get(Chain::Bitcoin), metrics: Arc::new(Metrics::new()) })
    }

    #[test]
    fn derives_bech32m_taproot_address() {
        let seed = MasterSeed::new(vec![11u8; 32]);
        let params = DeriveParams::new("wallet", "user-1", Chain::Bitcoin, "0").unwrap();
        let address = adapter().derive_address(&seed, &params).unwrap();
        assert!(address.starts_with("bc1p"));
        assert_eq!(address.len(), 62);
    }

    #[test]
    fn insufficient_utxos_reject_before_broadcast() {
        let utxos = vec![RemoteUtxo { txid: "a".into(), vout: 0, value: 1_000 }];
        let result = BitcoinAdapter::select_utxos(&utxos, 1_000_000, 8, UtxoSelection::Auto, &[]);
        assert!(result.is_err());
    }

    #[test]
    fn largest_first_minimizes_input_count() {
        let utxos = vec![
            RemoteUtxo { txid: "a".into(), vout: 0, value: 500 },
            RemoteUtxo { txid: "b".into(), vout: 0, value: 50_000 },
            RemoteUtxo { txid: "c".into(), vout: 0, value: 1_000 },
        ];
        let (selected, _) = BitcoinAdapter::select_utxos(&utxos, 10_000, 1, UtxoSelection::LargestFirst, &[]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].value, 50_000);
    }
}
