//! Indexer access for the Bitcoin driver.
//!
//! [`UtxoGateway`] is the capability set the driver needs from the network;
//! [`BitcoreClient`] implements it against the Bitcore REST API.

use alloy_primitives::Bytes;
use async_trait::async_trait;
use bitcoin::{Amount, FeeRate};
use coin_core::Utxo;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BtcError;

/// Default confirmation target, in blocks, for fee-rate lookups.
pub const DEFAULT_FEE_TARGET_BLOCKS: u16 = 1;

/// Network capabilities the UTXO driver depends on.
#[async_trait]
pub trait UtxoGateway: Send + Sync {
    /// Unspent outputs currently owned by `address`.
    async fn unspent_outputs(&self, address: &str) -> Result<Vec<Utxo>, BtcError>;

    /// Current fee rate for the configured confirmation target.
    async fn fee_rate(&self) -> Result<FeeRate, BtcError>;

    /// Broadcast a consensus-encoded transaction, returning its txid.
    async fn broadcast(&self, raw_tx_hex: &str) -> Result<String, BtcError>;
}

/// Bitcore REST client.
#[derive(Debug, Clone)]
pub struct BitcoreClient {
    base_url: String,
    fee_target_blocks: u16,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BitcoreCoin {
    mint_txid: String,
    mint_index: u32,
    script: String,
    value: u64,
    #[serde(default)]
    address: String,
}

#[derive(Debug, Deserialize)]
struct BitcoreFee {
    feerate: f64,
}

#[derive(Debug, Serialize)]
struct BitcoreSend<'a> {
    #[serde(rename = "rawTx")]
    raw_tx: &'a str,
}

#[derive(Debug, Deserialize)]
struct BitcoreSendResult {
    txid: String,
}

impl BitcoreClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            fee_target_blocks: DEFAULT_FEE_TARGET_BLOCKS,
            client: reqwest::Client::new(),
        }
    }

    /// Use a different confirmation target for fee-rate lookups.
    pub fn with_fee_target(mut self, blocks: u16) -> Self {
        self.fee_target_blocks = blocks;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl BitcoreCoin {
    fn into_utxo(self, owner: &str) -> Result<Utxo, BtcError> {
        let script = hex::decode(&self.script).map_err(|e| {
            BtcError::MalformedResponse(format!("bad script hex for {}: {e}", self.mint_txid))
        })?;
        if self.value > Amount::MAX_MONEY.to_sat() {
            return Err(BtcError::MalformedResponse(format!(
                "{}:{} reports {} sat, above the money supply",
                self.mint_txid, self.mint_index, self.value
            )));
        }
        let address = if self.address.is_empty() {
            owner.to_string()
        } else {
            self.address
        };
        Ok(Utxo {
            txid: self.mint_txid,
            vout: self.mint_index,
            script_pubkey: Bytes::from(script),
            value_sat: self.value,
            address,
        })
    }
}

/// Convert a BTC-per-kilobyte rate as reported by the indexer.
fn fee_rate_from_btc_per_kb(btc_per_kb: f64) -> Result<FeeRate, BtcError> {
    if !btc_per_kb.is_finite() || btc_per_kb < 0.0 {
        return Err(BtcError::MalformedResponse(format!(
            "fee rate unavailable: {btc_per_kb}"
        )));
    }
    let sat_per_kvb = (btc_per_kb * 100_000_000.0).round() as u64;
    Ok(FeeRate::from_sat_per_kwu(sat_per_kvb.div_ceil(4)))
}

#[async_trait]
impl UtxoGateway for BitcoreClient {
    async fn unspent_outputs(&self, address: &str) -> Result<Vec<Utxo>, BtcError> {
        let url = format!("{}/address/{}/?unspent=true", self.base_url, address);
        debug!(%address, "fetching unspent outputs");

        let coins: Vec<BitcoreCoin> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        coins.into_iter().map(|c| c.into_utxo(address)).collect()
    }

    async fn fee_rate(&self) -> Result<FeeRate, BtcError> {
        let url = format!("{}/fee/{}", self.base_url, self.fee_target_blocks);
        let fee: BitcoreFee = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let rate = fee_rate_from_btc_per_kb(fee.feerate)?;
        debug!(btc_per_kb = fee.feerate, sat_per_vb = rate.to_sat_per_vb_ceil(), "fee rate");
        Ok(rate)
    }

    async fn broadcast(&self, raw_tx_hex: &str) -> Result<String, BtcError> {
        let url = format!("{}/tx/send", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&BitcoreSend { raw_tx: raw_tx_hex })
            .send()
            .await?;

        let status = resp.status();
        if status.is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BtcError::Rejected(format!("{status}: {body}")));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BtcError::Unavailable(format!("{status}: {body}")));
        }

        let result: BitcoreSendResult = resp.json().await?;
        Ok(result.txid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OWNER: &str = "mjhAYkzNQbvdWAR2CTtP5HRqdr7RhaWE29";

    #[tokio::test]
    async fn fetches_and_decodes_unspent_outputs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/address/{OWNER}/")))
            .and(query_param("unspent", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "mintTxid": "aa".repeat(32),
                    "mintIndex": 1,
                    "script": "76a9142dcee438cded87fceacec538cec830868165415c88ac",
                    "value": 100000,
                    "address": OWNER,
                    "spentTxid": ""
                }
            ])))
            .mount(&server)
            .await;

        let client = BitcoreClient::new(server.uri());
        let utxos = client.unspent_outputs(OWNER).await.unwrap();

        assert_eq!(utxos.len(), 1);
        assert_eq!(utxos[0].txid, "aa".repeat(32));
        assert_eq!(utxos[0].vout, 1);
        assert_eq!(utxos[0].value_sat, 100_000);
        assert_eq!(utxos[0].address, OWNER);
        assert_eq!(utxos[0].script_pubkey.len(), 25);
    }

    #[tokio::test]
    async fn missing_coin_address_falls_back_to_owner() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/address/{OWNER}/")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "mintTxid": "bb".repeat(32), "mintIndex": 0, "script": "51", "value": 5 }
            ])))
            .mount(&server)
            .await;

        let utxos = BitcoreClient::new(server.uri())
            .unspent_outputs(OWNER)
            .await
            .unwrap();
        assert_eq!(utxos[0].address, OWNER);
    }

    #[tokio::test]
    async fn bad_script_hex_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/address/{OWNER}/")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "mintTxid": "bb".repeat(32), "mintIndex": 0, "script": "zz", "value": 5 }
            ])))
            .mount(&server)
            .await;

        let result = BitcoreClient::new(server.uri()).unspent_outputs(OWNER).await;
        assert!(matches!(result, Err(BtcError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn value_above_money_supply_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/address/{OWNER}/")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "mintTxid": "cc".repeat(32), "mintIndex": 0, "script": "51", "value": 2_100_000_000_000_001u64 }
            ])))
            .mount(&server)
            .await;

        let result = BitcoreClient::new(server.uri()).unspent_outputs(OWNER).await;
        assert!(matches!(result, Err(BtcError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn server_error_on_lookup_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = BitcoreClient::new(server.uri()).unspent_outputs(OWNER).await;
        assert!(matches!(result, Err(BtcError::Http(_))));
    }

    #[tokio::test]
    async fn fee_rate_uses_target_and_converts_units() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fee/3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "feerate": 0.0001, "blocks": 3 })),
            )
            .mount(&server)
            .await;

        let rate = BitcoreClient::new(server.uri())
            .with_fee_target(3)
            .fee_rate()
            .await
            .unwrap();
        // 0.0001 BTC/kB = 10 sat/vB.
        assert_eq!(rate.to_sat_per_vb_ceil(), 10);
    }

    #[tokio::test]
    async fn negative_fee_rate_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fee/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "feerate": -1 })))
            .mount(&server)
            .await;

        let result = BitcoreClient::new(server.uri()).fee_rate().await;
        assert!(matches!(result, Err(BtcError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn broadcast_posts_raw_tx_and_returns_txid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tx/send"))
            .and(body_json(serde_json::json!({ "rawTx": "0200" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "txid": "abc123" })))
            .mount(&server)
            .await;

        let txid = BitcoreClient::new(format!("{}/", server.uri()))
            .broadcast("0200")
            .await
            .unwrap();
        assert_eq!(txid, "abc123");
    }

    #[tokio::test]
    async fn broadcast_rejection_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tx/send"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad-txns-inputs-missingorspent"))
            .mount(&server)
            .await;

        let err = BitcoreClient::new(server.uri())
            .broadcast("0200")
            .await
            .unwrap_err();
        assert!(matches!(err, BtcError::Rejected(_)));
        assert!(err.to_string().contains("missingorspent"));
    }

    #[tokio::test]
    async fn broadcast_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tx/send"))
            .respond_with(ResponseTemplate::new(503).set_body_string("service unavailable"))
            .mount(&server)
            .await;

        let err = BitcoreClient::new(server.uri())
            .broadcast("0200")
            .await
            .unwrap_err();
        assert!(matches!(err, BtcError::Unavailable(_)));
        assert!(matches!(
            coin_core::CoinError::from(err),
            coin_core::CoinError::Network(_)
        ));
    }

    #[test]
    fn fee_rate_rounds_up_to_whole_sat_per_kwu() {
        // 1 sat/vB = 1000 sat/kvB = 250 sat/kwu.
        let rate = fee_rate_from_btc_per_kb(0.00001).unwrap();
        assert_eq!(rate.to_sat_per_kwu(), 250);
        let rate = fee_rate_from_btc_per_kb(0.00001001).unwrap();
        assert_eq!(rate.to_sat_per_kwu(), 251);
    }
}
