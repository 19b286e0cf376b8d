//! Bitcoin chain support for the transaction pipeline.
//!
//! Provides the UTXO-model [`BitcoinChain`] driver: unspent-output collection,
//! fee estimation, dust-aware change handling and legacy (P2PK / P2PKH)
//! signing, plus a Bitcore REST gateway.

pub mod address;
pub mod driver;
pub mod error;
mod keys;
pub mod network;
pub mod rpc;
pub mod transaction;
pub mod utxo;

pub use driver::{BitcoinChain, BtcConfig};
pub use error::BtcError;
pub use network::BtcNetwork;
pub use rpc::{BitcoreClient, UtxoGateway};
