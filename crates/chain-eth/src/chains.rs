use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// Decimals of the native asset (ether / wei).
pub const NATIVE_DECIMALS: u8 = 18;

/// Tether USD on Ethereum mainnet.
pub const USDT_CONTRACT: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");

pub const USDT_DECIMALS: u8 = 6;

/// Definition of a known EVM network.
#[derive(Debug, Clone, Serialize)]
pub struct EvmChain {
    pub chain_id: u64,
    pub name: &'static str,
    pub symbol: &'static str,
    /// Public JSON-RPC endpoint, if one is still operated.
    pub rpc_url: Option<&'static str>,
    pub is_testnet: bool,
}

/// Ethereum Mainnet (chain ID 1).
pub const ETHEREUM: EvmChain = EvmChain {
    chain_id: 1,
    name: "Ethereum",
    symbol: "ETH",
    rpc_url: Some("https://eth.llamarpc.com"),
    is_testnet: false,
};

/// Sepolia testnet (chain ID 11155111).
pub const SEPOLIA: EvmChain = EvmChain {
    chain_id: 11_155_111,
    name: "Sepolia",
    symbol: "ETH",
    rpc_url: Some("https://rpc.sepolia.org"),
    is_testnet: true,
};

/// Kovan testnet (chain ID 42). Shut down upstream; needs an explicit URL.
pub const KOVAN: EvmChain = EvmChain {
    chain_id: 42,
    name: "Kovan",
    symbol: "ETH",
    rpc_url: None,
    is_testnet: true,
};

/// The replay-protection domain a driver signs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvmNetwork {
    Mainnet,
    Sepolia,
    Kovan,
    Custom { chain_id: u64 },
}

impl EvmNetwork {
    pub fn chain_id(self) -> u64 {
        match self {
            EvmNetwork::Mainnet => ETHEREUM.chain_id,
            EvmNetwork::Sepolia => SEPOLIA.chain_id,
            EvmNetwork::Kovan => KOVAN.chain_id,
            EvmNetwork::Custom { chain_id } => chain_id,
        }
    }

    /// Metadata for named networks.
    pub fn chain(self) -> Option<&'static EvmChain> {
        match self {
            EvmNetwork::Mainnet => Some(&ETHEREUM),
            EvmNetwork::Sepolia => Some(&SEPOLIA),
            EvmNetwork::Kovan => Some(&KOVAN),
            EvmNetwork::Custom { .. } => None,
        }
    }

    pub fn default_url(self) -> Option<&'static str> {
        self.chain().and_then(|c| c.rpc_url)
    }
}

/// Which asset a driver moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EthAsset {
    /// Ether, sent as transaction value.
    #[default]
    Native,
    /// An ERC-20 token, sent through `transfer(address,uint256)`.
    Token { contract: Address, decimals: u8 },
}

impl EthAsset {
    pub fn usdt() -> Self {
        EthAsset::Token {
            contract: USDT_CONTRACT,
            decimals: USDT_DECIMALS,
        }
    }

    /// Decimal places between display amounts and base units.
    pub fn decimals(&self) -> u8 {
        match self {
            EthAsset::Native => NATIVE_DECIMALS,
            EthAsset::Token { decimals, .. } => *decimals,
        }
    }
}
