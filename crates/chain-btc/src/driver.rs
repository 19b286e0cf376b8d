use async_trait::async_trait;
use bitcoin::consensus::encode::serialize_hex;
use coin_core::{
    select_key, Amount, BroadcastPayload, ChainDriver, CoinError, PrivateKey, SignedTransaction,
    StagedData, StagedTransaction, Transaction, Utxo, UtxoSpend,
};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::address::{address_for_key, p2pkh_address, parse_address};
use crate::keys::SecretKeys;
use crate::network::BtcNetwork;
use crate::rpc::{BitcoreClient, UtxoGateway, DEFAULT_FEE_TARGET_BLOCKS};
use crate::transaction::{build_draft, estimate_fee, sign_draft, to_sat, ChangePolicy};

fn default_fee_target() -> u16 {
    DEFAULT_FEE_TARGET_BLOCKS
}

/// Settings for a [`BitcoinChain`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtcConfig {
    pub network: BtcNetwork,
    /// Indexer endpoint; the network's Bitcore URL when unset.
    #[serde(default)]
    pub url: Option<String>,
    /// Confirmation target used for fee-rate lookups.
    #[serde(default = "default_fee_target")]
    pub fee_target_blocks: u16,
}

impl BtcConfig {
    pub fn new(network: BtcNetwork) -> Self {
        Self {
            network,
            url: None,
            fee_target_blocks: DEFAULT_FEE_TARGET_BLOCKS,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        self.url
            .as_deref()
            .unwrap_or_else(|| self.network.default_url())
    }
}

/// UTXO-model chain driver for Bitcoin.
///
/// Spends every unspent output owned by the transfer's input addresses, pays
/// change above the dust threshold back to the change address and signs
/// P2PK / P2PKH inputs under SIGHASH_ALL.
pub struct BitcoinChain<G = BitcoreClient> {
    network: BtcNetwork,
    gateway: G,
}

impl BitcoinChain<BitcoreClient> {
    /// Driver talking to the Bitcore endpoint named by `config`.
    pub fn from_config(config: &BtcConfig) -> Self {
        let gateway = BitcoreClient::new(config.endpoint()).with_fee_target(config.fee_target_blocks);
        Self::with_gateway(config.network, gateway)
    }
}

impl<G: UtxoGateway> BitcoinChain<G> {
    pub fn with_gateway(network: BtcNetwork, gateway: G) -> Self {
        Self { network, gateway }
    }

    pub fn network(&self) -> BtcNetwork {
        self.network
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    async fn fetch_unspent(&self, transaction: &Transaction) -> Result<Vec<Utxo>, CoinError> {
        let lookups = transaction
            .inputs()
            .iter()
            .map(|input| self.gateway.unspent_outputs(&input.address));
        let per_address = try_join_all(lookups).await?;
        Ok(per_address.into_iter().flatten().collect())
    }
}

#[async_trait]
impl<G: UtxoGateway> ChainDriver for BitcoinChain<G> {
    fn name(&self) -> &'static str {
        "bitcoin"
    }

    async fn pack(&self, mut transaction: Transaction) -> Result<StagedTransaction, CoinError> {
        if transaction.inputs().is_empty() {
            return Err(CoinError::InvalidTransaction(
                "at least one input address is required".into(),
            ));
        }

        let unspent = self.fetch_unspent(&transaction).await?;
        debug!(
            chain = self.name(),
            inputs = transaction.inputs().len(),
            unspent = unspent.len(),
            "collected unspent outputs"
        );

        let fee_sat = match transaction.fee() {
            Some(fee) => to_sat(fee)?,
            None => {
                let rate = self.gateway.fee_rate().await?;
                let draft = build_draft(&transaction, &unspent, 0, self.network, ChangePolicy::Skip)?;
                let fee_sat = estimate_fee(&draft, rate)?;
                debug!(
                    chain = self.name(),
                    size = draft.estimated_signed_size(),
                    fee_sat,
                    "estimated fee"
                );
                transaction.set_fee(Amount::from_sat(fee_sat));
                fee_sat
            }
        };

        let draft = build_draft(
            &transaction,
            &unspent,
            fee_sat,
            self.network,
            ChangePolicy::Require,
        )?;
        info!(
            chain = self.name(),
            input_sat = draft.total_input_sat(),
            fee_sat,
            change_sat = draft.change_sat,
            "packed transaction"
        );

        Ok(StagedTransaction::new(
            transaction,
            StagedData::Utxo(UtxoSpend { unspent }),
        ))
    }

    fn sign(
        &self,
        staged: &StagedTransaction,
        keys: &[PrivateKey],
    ) -> Result<SignedTransaction, CoinError> {
        let spend = staged.utxo_spend()?;
        let transaction = staged.transaction();
        let fee = transaction
            .fee()
            .ok_or_else(|| CoinError::InvalidTransaction("staged transaction has no fee".into()))?;

        let draft = build_draft(
            transaction,
            &spend.unspent,
            to_sat(fee)?,
            self.network,
            ChangePolicy::Require,
        )?;

        let mut secrets = SecretKeys::with_capacity(spend.unspent.len());
        for utxo in &spend.unspent {
            let owner = parse_address(&utxo.address, self.network)?;
            let key = select_key(&owner, keys, |candidate| {
                address_for_key(candidate, &owner, self.network).map_err(CoinError::from)
            })?
            .ok_or_else(|| CoinError::NoMatchingKey {
                address: utxo.address.clone(),
            })?;
            secrets.push(key)?;
        }

        let signed_tx = sign_draft(&draft, secrets.as_slice())?;
        drop(secrets);

        let txid = signed_tx.compute_txid().to_string();
        info!(chain = self.name(), %txid, inputs = signed_tx.input.len(), "signed transaction");

        Ok(SignedTransaction::new(
            staged.clone(),
            BroadcastPayload::Raw {
                raw_tx: serialize_hex(&signed_tx),
            },
            txid,
        ))
    }

    async fn send(&self, signed: &SignedTransaction) -> Result<String, CoinError> {
        let raw_tx = match signed.payload() {
            BroadcastPayload::Raw { raw_tx } if !raw_tx.is_empty() => raw_tx,
            _ => {
                return Err(CoinError::StagedDataMismatch {
                    expected: "raw transaction",
                })
            }
        };

        let txid = self.gateway.broadcast(raw_tx).await?;
        info!(chain = self.name(), %txid, "broadcast transaction");
        Ok(txid)
    }

    fn address_for_key(&self, key: &PrivateKey) -> Result<String, CoinError> {
        Ok(p2pkh_address(key, self.network)?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BtcError;
    use alloy_primitives::Bytes;
    use bitcoin::secp256k1::{Secp256k1, SecretKey};
    use bitcoin::{CompressedPublicKey, FeeRate, Network};
    use std::collections::HashMap;
    use std::sync::Mutex;

    const RECIPIENT: &str = "mg6QezKh6pidbDEXYFpdP7CLiGZ94k3NAz";

    /// In-memory gateway with canned unspent outputs.
    #[derive(Default)]
    struct MockGateway {
        unspent: HashMap<String, Vec<Utxo>>,
        fee_rate: Option<FeeRate>,
        broadcasts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl UtxoGateway for MockGateway {
        async fn unspent_outputs(&self, address: &str) -> Result<Vec<Utxo>, BtcError> {
            Ok(self.unspent.get(address).cloned().unwrap_or_default())
        }

        async fn fee_rate(&self) -> Result<FeeRate, BtcError> {
            self.fee_rate
                .ok_or_else(|| BtcError::MalformedResponse("no fee rate".into()))
        }

        async fn broadcast(&self, raw_tx_hex: &str) -> Result<String, BtcError> {
            self.broadcasts.lock().unwrap().push(raw_tx_hex.to_string());
            Ok("f00d".to_string())
        }
    }

    struct Wallet {
        key: PrivateKey,
        address: String,
        script: Vec<u8>,
    }

    fn wallet(byte: u8) -> Wallet {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[byte; 32]).unwrap();
        let pk = CompressedPublicKey(sk.public_key(&secp));
        let address = bitcoin::Address::p2pkh(pk.pubkey_hash(), Network::Testnet);
        Wallet {
            key: PrivateKey::from_bytes([byte; 32]),
            address: address.to_string(),
            script: address.script_pubkey().to_bytes(),
        }
    }

    fn utxo(owner: &Wallet, txid_hex: &str, value_sat: u64) -> Utxo {
        Utxo {
            txid: txid_hex.repeat(32),
            vout: 0,
            script_pubkey: Bytes::from(owner.script.clone()),
            value_sat,
            address: owner.address.clone(),
        }
    }

    fn driver(gateway: MockGateway) -> BitcoinChain<MockGateway> {
        BitcoinChain::with_gateway(BtcNetwork::Testnet, gateway)
    }

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn pack_with_fixed_fee_stages_change() {
        let a = wallet(0x11);
        let mut gateway = MockGateway::default();
        gateway
            .unspent
            .insert(a.address.clone(), vec![utxo(&a, "ab", 100_000)]);

        let tx = Transaction::builder()
            .from(&a.address)
            .to(RECIPIENT, amount("0.00001"))
            .fee(amount("0.0001"))
            .change(&a.address)
            .build()
            .unwrap();

        let chain = driver(gateway);
        let staged = chain.pack(tx).await.unwrap();
        assert_eq!(staged.utxo_spend().unwrap().total_value_sat(), Some(100_000));
        assert_eq!(staged.transaction().fee(), Some(&amount("0.0001")));

        let signed = chain.sign(&staged, &[a.key]).unwrap();
        let raw = hex::decode(signed.payload().raw_hex().unwrap()).unwrap();
        let decoded: bitcoin::Transaction = bitcoin::consensus::deserialize(&raw).unwrap();

        assert_eq!(decoded.output.len(), 2);
        assert_eq!(decoded.output[0].value.to_sat(), 1_000);
        assert_eq!(decoded.output[1].value.to_sat(), 89_000);
        assert_eq!(decoded.output[1].script_pubkey.as_bytes(), a.script.as_slice());
        assert_eq!(decoded.compute_txid().to_string(), signed.tx_hash());
    }

    #[tokio::test]
    async fn pack_estimates_fee_when_unset() {
        let a = wallet(0x12);
        let mut gateway = MockGateway::default();
        gateway
            .unspent
            .insert(a.address.clone(), vec![utxo(&a, "cd", 100_000)]);
        gateway.fee_rate = FeeRate::from_sat_per_vb(2);

        let tx = Transaction::builder()
            .from(&a.address)
            .to(RECIPIENT, amount("0.00001"))
            .change(&a.address)
            .build()
            .unwrap();

        let staged = driver(gateway).pack(tx).await.unwrap();
        let fee_sat = to_sat(staged.transaction().fee().unwrap()).unwrap();
        // One P2PKH input and two P2PKH outputs sign to about 226 bytes.
        assert!((400..=500).contains(&fee_sat), "fee {fee_sat}");
    }

    #[tokio::test]
    async fn lookups_cover_every_input_in_order() {
        let a = wallet(0x13);
        let b = wallet(0x14);
        let mut gateway = MockGateway::default();
        gateway
            .unspent
            .insert(a.address.clone(), vec![utxo(&a, "01", 30_000)]);
        gateway
            .unspent
            .insert(b.address.clone(), vec![utxo(&b, "02", 40_000)]);

        let tx = Transaction::builder()
            .from(&a.address)
            .add_input(&b.address)
            .to(RECIPIENT, amount("0.0006"))
            .fee(amount("0.0001"))
            .build()
            .unwrap();

        let chain = driver(gateway);
        let staged = chain.pack(tx).await.unwrap();
        let spend = staged.utxo_spend().unwrap();
        assert_eq!(spend.unspent[0].address, a.address);
        assert_eq!(spend.unspent[1].address, b.address);

        // Each input is signed by its own key, supplied in any order.
        let signed = chain.sign(&staged, &[b.key.clone(), a.key.clone()]).unwrap();
        let raw = hex::decode(signed.payload().raw_hex().unwrap()).unwrap();
        let decoded: bitcoin::Transaction = bitcoin::consensus::deserialize(&raw).unwrap();
        assert_eq!(decoded.input.len(), 2);
        assert_eq!(decoded.output.len(), 1);
    }

    #[tokio::test]
    async fn insufficient_funds_fails_pack() {
        let a = wallet(0x15);
        let mut gateway = MockGateway::default();
        gateway
            .unspent
            .insert(a.address.clone(), vec![utxo(&a, "ef", 500)]);

        let tx = Transaction::builder()
            .from(&a.address)
            .to(RECIPIENT, amount("0.00001"))
            .fee(amount("0.00001"))
            .build()
            .unwrap();

        let result = driver(gateway).pack(tx).await;
        assert!(matches!(result, Err(CoinError::InsufficientFunds { .. })));
    }

    #[tokio::test]
    async fn change_without_address_fails_pack() {
        let a = wallet(0x16);
        let mut gateway = MockGateway::default();
        gateway
            .unspent
            .insert(a.address.clone(), vec![utxo(&a, "ef", 100_000)]);

        let tx = Transaction::builder()
            .from(&a.address)
            .to(RECIPIENT, amount("0.00001"))
            .fee(amount("0.0001"))
            .build()
            .unwrap();

        let result = driver(gateway).pack(tx).await;
        assert!(matches!(result, Err(CoinError::MissingChangeAddress { .. })));
    }

    #[tokio::test]
    async fn fee_rate_failure_is_network_error() {
        let a = wallet(0x17);
        let mut gateway = MockGateway::default();
        gateway
            .unspent
            .insert(a.address.clone(), vec![utxo(&a, "ef", 100_000)]);

        let tx = Transaction::builder()
            .from(&a.address)
            .to(RECIPIENT, amount("0.00001"))
            .change(&a.address)
            .build()
            .unwrap();

        let result = driver(gateway).pack(tx).await;
        assert!(matches!(result, Err(CoinError::Network(_))));
    }

    #[tokio::test]
    async fn sign_without_matching_key_fails() {
        let a = wallet(0x18);
        let stranger = wallet(0x19);
        let mut gateway = MockGateway::default();
        gateway
            .unspent
            .insert(a.address.clone(), vec![utxo(&a, "ef", 100_000)]);

        let tx = Transaction::builder()
            .from(&a.address)
            .to(RECIPIENT, amount("0.00001"))
            .fee(amount("0.0001"))
            .change(&a.address)
            .build()
            .unwrap();

        let chain = driver(gateway);
        let staged = chain.pack(tx).await.unwrap();
        let result = chain.sign(&staged, &[stranger.key]);
        assert!(matches!(
            result,
            Err(CoinError::NoMatchingKey { address }) if address == a.address
        ));
    }

    #[tokio::test]
    async fn sign_is_deterministic_and_survives_serialization() {
        let a = wallet(0x1a);
        let mut gateway = MockGateway::default();
        gateway
            .unspent
            .insert(a.address.clone(), vec![utxo(&a, "ef", 100_000)]);

        let tx = Transaction::builder()
            .from(&a.address)
            .to(RECIPIENT, amount("0.00001"))
            .fee(amount("0.0001"))
            .change(&a.address)
            .build()
            .unwrap();

        let chain = driver(gateway);
        let staged = chain.pack(tx).await.unwrap();

        // Offline hand-off: the staged transaction travels as JSON.
        let json = serde_json::to_string(&staged).unwrap();
        let restored: StagedTransaction = serde_json::from_str(&json).unwrap();

        let first = chain.sign(&staged, &[a.key.clone()]).unwrap();
        let second = chain.sign(&restored, &[a.key]).unwrap();
        assert_eq!(first.payload(), second.payload());
        assert!(first.is_signed());
    }

    #[tokio::test]
    async fn sign_rejects_account_data() {
        let chain = driver(MockGateway::default());
        let tx = Transaction::builder()
            .from("sender")
            .to(RECIPIENT, amount("1"))
            .fee(amount("0.001"))
            .build()
            .unwrap();
        let staged = StagedTransaction::new(
            tx,
            StagedData::Account(coin_core::AccountParams {
                nonce: 0,
                gas_price: alloy_primitives::U256::from(1u64),
                gas_limit: 21_000,
                to: alloy_primitives::Address::ZERO,
                value: alloy_primitives::U256::ZERO,
                data: Bytes::new(),
            }),
        );
        assert!(matches!(
            chain.sign(&staged, &[]),
            Err(CoinError::StagedDataMismatch { expected: "utxo" })
        ));
    }

    #[test]
    fn address_for_key_is_testnet_p2pkh() {
        let a = wallet(0x1c);
        let chain = driver(MockGateway::default());
        assert_eq!(chain.address_for_key(&a.key).unwrap(), a.address);

        let pair = chain.key_pair(a.key.clone()).unwrap();
        assert_eq!(pair.address, a.address);
    }

    #[tokio::test]
    async fn generated_key_pair_can_spend_its_coins() {
        let chain_for_keys = driver(MockGateway::default());
        let pair = chain_for_keys.generate_key_pair().unwrap();
        let owner = parse_address(&pair.address, BtcNetwork::Testnet).unwrap();

        let mut gateway = MockGateway::default();
        gateway.unspent.insert(
            pair.address.clone(),
            vec![Utxo {
                txid: "9a".repeat(32),
                vout: 0,
                script_pubkey: Bytes::from(owner.script_pubkey().to_bytes()),
                value_sat: 50_000,
                address: pair.address.clone(),
            }],
        );
        let chain = driver(gateway);
        let tx = Transaction::builder()
            .from(&pair.address)
            .to(RECIPIENT, amount("0.0001"))
            .fee(amount("0.00001"))
            .change(&pair.address)
            .build()
            .unwrap();

        let staged = chain.pack(tx).await.unwrap();
        let signed = chain.sign(&staged, &[pair.secret]).unwrap();
        assert!(signed.is_signed());
    }

    #[tokio::test]
    async fn send_broadcasts_raw_hex() {
        let a = wallet(0x1b);
        let mut gateway = MockGateway::default();
        gateway
            .unspent
            .insert(a.address.clone(), vec![utxo(&a, "ef", 100_000)]);

        let tx = Transaction::builder()
            .from(&a.address)
            .to(RECIPIENT, amount("0.00001"))
            .fee(amount("0.0001"))
            .change(&a.address)
            .build()
            .unwrap();

        let chain = driver(gateway);
        let staged = chain.pack(tx).await.unwrap();
        let signed = chain.sign(&staged, &[a.key]).unwrap();
        let txid = chain.send(&signed).await.unwrap();

        assert_eq!(txid, "f00d");
        let sent = chain.gateway().broadcasts.lock().unwrap();
        assert_eq!(sent.as_slice(), [signed.payload().raw_hex().unwrap()]);
    }

    #[test]
    fn config_defaults_to_bitcore_endpoint() {
        let config: BtcConfig = serde_json::from_str(r#"{"network":"testnet"}"#).unwrap();
        assert_eq!(config.endpoint(), BtcNetwork::Testnet.default_url());
        assert_eq!(config.fee_target_blocks, DEFAULT_FEE_TARGET_BLOCKS);

        let custom = BtcConfig::new(BtcNetwork::Regtest).with_url("http://localhost:3000");
        assert_eq!(custom.endpoint(), "http://localhost:3000");
    }
}
