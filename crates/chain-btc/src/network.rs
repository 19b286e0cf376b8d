use bitcoin::Network;
use serde::{Deserialize, Serialize};

/// Default Bitcore API endpoint for Bitcoin mainnet.
pub const MAINNET_URL: &str = "https://api.bitcore.io/api/BTC/mainnet";

/// Default Bitcore API endpoint for Bitcoin testnet.
pub const TESTNET_URL: &str = "https://api.bitcore.io/api/BTC/testnet";

/// Default Bitcore API endpoint for Bitcoin signet.
pub const SIGNET_URL: &str = "https://api.bitcore.io/api/BTC/signet";

/// Default endpoint for a locally run Bitcore node on regtest.
pub const REGTEST_URL: &str = "http://127.0.0.1:3000/api/BTC/regtest";

/// Supported Bitcoin networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BtcNetwork {
    Mainnet,
    Testnet,
    Signet,
    Regtest,
}

impl BtcNetwork {
    /// Convert to the `bitcoin` crate's `Network` type.
    pub fn to_bitcoin_network(self) -> Network {
        match self {
            BtcNetwork::Mainnet => Network::Bitcoin,
            BtcNetwork::Testnet => Network::Testnet,
            BtcNetwork::Signet => Network::Signet,
            BtcNetwork::Regtest => Network::Regtest,
        }
    }

    /// Return the default indexer endpoint for this network.
    pub fn default_url(self) -> &'static str {
        match self {
            BtcNetwork::Mainnet => MAINNET_URL,
            BtcNetwork::Testnet => TESTNET_URL,
            BtcNetwork::Signet => SIGNET_URL,
            BtcNetwork::Regtest => REGTEST_URL,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BtcNetwork::Mainnet => "mainnet",
            BtcNetwork::Testnet => "testnet",
            BtcNetwork::Signet => "signet",
            BtcNetwork::Regtest => "regtest",
        }
    }
}

impl std::fmt::Display for BtcNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
