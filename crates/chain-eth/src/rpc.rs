//! Node access for the Ethereum driver.
//!
//! [`AccountGateway`] is the capability set the driver needs; [`JsonRpcClient`]
//! implements it over Ethereum JSON-RPC.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use coin_core::staged::SEND_RAW_TRANSACTION;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::EthError;

/// Call parameters for `eth_estimateGas`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

/// Network capabilities the account driver depends on.
#[async_trait]
pub trait AccountGateway: Send + Sync {
    /// Current gas price in wei.
    async fn gas_price(&self) -> Result<u128, EthError>;

    /// Number of transactions sent from `address`, i.e. its next nonce.
    async fn transaction_count(&self, address: Address) -> Result<u64, EthError>;

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, EthError>;

    /// Broadcasts a 0x-prefixed signed transaction, returning its hash.
    async fn send_raw_transaction(&self, raw_tx_hex: &str) -> Result<String, EthError>;
}

/// Ethereum JSON-RPC client over HTTP.
#[derive(Debug)]
pub struct JsonRpcClient {
    url: String,
    next_id: AtomicU64,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            next_id: AtomicU64::new(1),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, EthError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(%method, id, "json-rpc call");

        let response: RpcResponse<T> = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(EthError::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }
        response
            .result
            .ok_or_else(|| EthError::MalformedResponse(format!("{method}: missing result")))
    }
}

fn quantity_u64(method: &str, value: U256) -> Result<u64, EthError> {
    u64::try_from(value)
        .map_err(|_| EthError::MalformedResponse(format!("{method}: {value} does not fit in u64")))
}

#[async_trait]
impl AccountGateway for JsonRpcClient {
    async fn gas_price(&self) -> Result<u128, EthError> {
        let price: U256 = self.call("eth_gasPrice", json!([])).await?;
        u128::try_from(price)
            .map_err(|_| EthError::MalformedResponse(format!("eth_gasPrice: {price} out of range")))
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, EthError> {
        let count: U256 = self
            .call("eth_getTransactionCount", json!([address, "latest"]))
            .await?;
        quantity_u64("eth_getTransactionCount", count)
    }

    async fn estimate_gas(&self, call: &CallRequest) -> Result<u64, EthError> {
        let gas: U256 = self.call("eth_estimateGas", json!([call])).await?;
        quantity_u64("eth_estimateGas", gas)
    }

    async fn send_raw_transaction(&self, raw_tx_hex: &str) -> Result<String, EthError> {
        self.call(SEND_RAW_TRANSACTION, json!([raw_tx_hex])).await
    }
}
