use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::error::CoinError;
use crate::transaction::Transaction;

/// JSON-RPC method used to broadcast a signed account-model transaction.
pub const SEND_RAW_TRANSACTION: &str = "eth_sendRawTransaction";

/// A single unspent transaction output as reported by a UTXO indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Funding transaction id (hex, display order).
    pub txid: String,
    /// Output index within the funding transaction.
    pub vout: u32,
    /// Locking script of the output.
    pub script_pubkey: Bytes,
    pub value_sat: u64,
    /// Address the indexer associates with the locking script.
    pub address: String,
}

/// Outputs chosen at pack time; sign spends exactly these, in this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoSpend {
    pub unspent: Vec<Utxo>,
}

impl UtxoSpend {
    /// Total value in satoshi, or `None` if it does not fit in a `u64`.
    pub fn total_value_sat(&self) -> Option<u64> {
        self.unspent
            .iter()
            .try_fold(0u64, |total, u| total.checked_add(u.value_sat))
    }
}

/// Account-model call parameters fixed at pack time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountParams {
    pub nonce: u64,
    /// Gas price in wei, carried as a hex quantity in JSON.
    pub gas_price: U256,
    pub gas_limit: u64,
    /// Call target: the recipient for native transfers, the token contract
    /// for token transfers.
    pub to: Address,
    /// Native value in wei (zero for token transfers).
    pub value: U256,
    pub data: Bytes,
}

/// Driver-specific state carried from pack to sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StagedData {
    Utxo(UtxoSpend),
    Account(AccountParams),
}

/// A [`Transaction`] made spendable by a driver's pack step.
///
/// Serializable so that packing (online) and signing (offline) can happen in
/// different processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedTransaction {
    transaction: Transaction,
    data: StagedData,
}

impl StagedTransaction {
    pub fn new(transaction: Transaction, data: StagedData) -> Self {
        Self { transaction, data }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn data(&self) -> &StagedData {
        &self.data
    }

    pub fn utxo_spend(&self) -> Result<&UtxoSpend, CoinError> {
        match &self.data {
            StagedData::Utxo(spend) => Ok(spend),
            StagedData::Account(_) => Err(CoinError::StagedDataMismatch { expected: "utxo" }),
        }
    }

    pub fn account_params(&self) -> Result<&AccountParams, CoinError> {
        match &self.data {
            StagedData::Account(params) => Ok(params),
            StagedData::Utxo(_) => Err(CoinError::StagedDataMismatch {
                expected: "account",
            }),
        }
    }
}

/// A JSON-RPC 2.0 request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Vec<String>,
}

impl JsonRpcRequest {
    /// `eth_sendRawTransaction` carrying a 0x-prefixed signed payload.
    pub fn send_raw_transaction(raw_tx_hex: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: 1,
            method: SEND_RAW_TRANSACTION.to_string(),
            params: vec![raw_tx_hex],
        }
    }
}

/// Wire-ready form of a signed transaction. Opaque to the pipeline; each
/// driver's send step knows how to submit its own variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BroadcastPayload {
    /// Raw consensus-encoded transaction, serialized as `{"rawTx": "<hex>"}`.
    Raw {
        #[serde(rename = "rawTx")]
        raw_tx: String,
    },
    JsonRpc(JsonRpcRequest),
}

impl BroadcastPayload {
    /// The hex-encoded signed transaction inside the payload.
    pub fn raw_hex(&self) -> Option<&str> {
        match self {
            BroadcastPayload::Raw { raw_tx } => Some(raw_tx),
            BroadcastPayload::JsonRpc(request) => request.params.first().map(String::as_str),
        }
    }
}

/// A staged transaction plus its finalized broadcast payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    staged: StagedTransaction,
    payload: BroadcastPayload,
    tx_hash: String,
}

impl SignedTransaction {
    pub fn new(staged: StagedTransaction, payload: BroadcastPayload, tx_hash: String) -> Self {
        Self {
            staged,
            payload,
            tx_hash,
        }
    }

    pub fn staged(&self) -> &StagedTransaction {
        &self.staged
    }

    pub fn transaction(&self) -> &Transaction {
        self.staged.transaction()
    }

    pub fn payload(&self) -> &BroadcastPayload {
        &self.payload
    }

    /// Identifier the network will assign once broadcast (txid or Keccak hash).
    pub fn tx_hash(&self) -> &str {
        &self.tx_hash
    }

    pub fn is_signed(&self) -> bool {
        self.payload.raw_hex().is_some_and(|hex| !hex.is_empty())
    }
}
