//! Ethereum/EVM chain support for the transaction pipeline.
//!
//! This crate provides:
//! - the account-model [`EthereumChain`] driver (native ether or one ERC-20 token)
//! - EIP-155 legacy transaction signing and decoding
//! - ERC-20 `transfer` call data encoding
//! - address derivation and EIP-55 validation
//! - a JSON-RPC gateway

pub mod abi;
pub mod address;
pub mod chains;
pub mod driver;
pub mod erc20;
pub mod error;
pub mod rpc;
pub mod transaction;

pub use chains::{EthAsset, EvmNetwork};
pub use driver::{EthConfig, EthereumChain};
pub use error::EthError;
pub use rpc::{AccountGateway, JsonRpcClient};
