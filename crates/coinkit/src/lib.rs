//! # coinkit
//!
//! One entry point for the pack / sign / send pipeline: pick a driver from a
//! [`DriverConfig`], then move a [`Transaction`] through it.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use coinkit::{connect, Amount, DriverConfig, PrivateKey, Transaction};
//!
//! let config = DriverConfig::from_json(r#"{ "chain": "bitcoin", "network": "testnet" }"#)?;
//! let driver = connect(&config)?;
//!
//! let tx = Transaction::builder()
//!     .from("mjhAYkzNQbvdWAR2CTtP5HRqdr7RhaWE29")
//!     .to("mg6QezKh6pidbDEXYFpdP7CLiGZ94k3NAz", "0.0001".parse::<Amount>()?)
//!     .change("mjhAYkzNQbvdWAR2CTtP5HRqdr7RhaWE29")
//!     .build()?;
//!
//! let staged = driver.pack(tx).await?;
//! let key = PrivateKey::from_hex("0x...")?;
//! let signed = driver.sign(&staged, &[key])?;
//! let txid = driver.send(&signed).await?;
//! # Ok(()) }
//! ```

pub mod config;
pub mod logging;

pub use chain_btc::{BitcoinChain, BtcConfig, BtcNetwork};
pub use chain_eth::{EthAsset, EthConfig, EthereumChain, EvmNetwork};
pub use coin_core::{
    Amount, ChainDriver, CoinError, KeyPair, PrivateKey, SignedTransaction, StagedTransaction,
    Transaction,
};
pub use config::{ConfigError, DriverConfig};
pub use logging::{init_logging, LogFormat};

use tracing::debug;

/// Builds the driver described by `config`, backed by its HTTP gateway.
pub fn connect(config: &DriverConfig) -> Result<Box<dyn ChainDriver>, CoinError> {
    let driver: Box<dyn ChainDriver> = match config {
        DriverConfig::Bitcoin(btc) => {
            debug!(
                chain = config.chain_name(),
                network = %btc.network,
                url = btc.endpoint(),
                "connecting driver"
            );
            Box::new(BitcoinChain::from_config(btc))
        }
        DriverConfig::Ethereum(eth) => {
            let driver = EthereumChain::from_config(eth)?;
            match eth.network.chain() {
                Some(known) => debug!(
                    chain = config.chain_name(),
                    network = known.name,
                    symbol = known.symbol,
                    testnet = known.is_testnet,
                    chain_id = known.chain_id,
                    "connecting driver"
                ),
                None => debug!(
                    chain = config.chain_name(),
                    chain_id = eth.network.chain_id(),
                    "connecting driver to custom network"
                ),
            }
            Box::new(driver)
        }
    };
    Ok(driver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_dispatches_by_chain() {
        for config in [
            DriverConfig::Bitcoin(BtcConfig::new(BtcNetwork::Testnet)),
            DriverConfig::Ethereum(EthConfig::new(EvmNetwork::Sepolia)),
            DriverConfig::Ethereum(
                EthConfig::new(EvmNetwork::Custom { chain_id: 31337 })
                    .with_url("http://127.0.0.1:8545"),
            ),
        ] {
            let driver = connect(&config).unwrap();
            assert_eq!(driver.name(), config.chain_name());
        }
    }

    #[test]
    fn key_pairs_follow_the_chain() {
        let key = PrivateKey::from_hex(
            "7783f51f3cab49b1cab5952de8c13472ae196581fba89addf145f1b71c42f4a4",
        )
        .unwrap();
        let btc = connect(&DriverConfig::Bitcoin(BtcConfig::new(BtcNetwork::Testnet))).unwrap();
        let eth = connect(&DriverConfig::Ethereum(EthConfig::new(EvmNetwork::Sepolia))).unwrap();

        assert_eq!(
            btc.key_pair(key.clone()).unwrap().address,
            "mjhAYkzNQbvdWAR2CTtP5HRqdr7RhaWE29"
        );
        assert_eq!(
            eth.key_pair(key).unwrap().address,
            "0x10FC8c36DDe58B75Fd0F0E1041Fa7Be32B3eDe60"
        );
    }

    #[test]
    fn ethereum_without_endpoint_fails() {
        let config = DriverConfig::Ethereum(EthConfig::new(EvmNetwork::Kovan));
        assert!(connect(&config).is_err());
    }
}
