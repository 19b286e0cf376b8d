use std::path::Path;

use chain_btc::BtcConfig;
use chain_eth::EthConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Which driver to build and how to reach its network.
///
/// ```json
/// { "chain": "ethereum", "network": "sepolia", "asset": { "type": "native" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "chain", rename_all = "lowercase")]
pub enum DriverConfig {
    Bitcoin(BtcConfig),
    Ethereum(EthConfig),
}

impl DriverConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn chain_name(&self) -> &'static str {
        match self {
            DriverConfig::Bitcoin(_) => "bitcoin",
            DriverConfig::Ethereum(_) => "ethereum",
        }
    }
}
