//! # coin-core
//!
//! Chain-agnostic pieces of the transaction pipeline: the transfer model,
//! staged and signed wrappers, private key handling, the error taxonomy and
//! the [`ChainDriver`] contract implemented by each ledger model.

pub mod amount;
pub mod chain;
pub mod error;
pub mod keys;
pub mod staged;
pub mod transaction;

pub use amount::Amount;
pub use chain::ChainDriver;
pub use error::CoinError;
pub use keys::{select_key, KeyPair, PrivateKey};
pub use staged::{
    AccountParams, BroadcastPayload, JsonRpcRequest, SignedTransaction, StagedData,
    StagedTransaction, Utxo, UtxoSpend,
};
pub use transaction::{Input, Output, Transaction, TransactionBuilder};
