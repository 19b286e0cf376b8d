use alloy_primitives::{Bytes, U256};
use async_trait::async_trait;
use coin_core::staged::SEND_RAW_TRANSACTION;
use coin_core::{
    select_key, AccountParams, Amount, BroadcastPayload, ChainDriver, CoinError, JsonRpcRequest,
    PrivateKey, SignedTransaction, StagedData, StagedTransaction, Transaction,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::address::{address_for_key, parse_address};
use crate::chains::{EthAsset, EvmNetwork, NATIVE_DECIMALS};
use crate::erc20;
use crate::error::EthError;
use crate::rpc::{AccountGateway, CallRequest, JsonRpcClient};
use crate::transaction::{sign_transaction, LegacyTransaction};

/// Gas estimates at or below this are treated as a malformed call.
pub const DEFAULT_MIN_GAS_LIMIT: u64 = 100_000;

fn default_min_gas_limit() -> u64 {
    DEFAULT_MIN_GAS_LIMIT
}

/// Settings for an [`EthereumChain`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthConfig {
    pub network: EvmNetwork,
    /// JSON-RPC endpoint; the network's public endpoint when unset.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub asset: EthAsset,
    #[serde(default = "default_min_gas_limit")]
    pub min_gas_limit: u64,
}

impl EthConfig {
    pub fn new(network: EvmNetwork) -> Self {
        Self {
            network,
            url: None,
            asset: EthAsset::Native,
            min_gas_limit: DEFAULT_MIN_GAS_LIMIT,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_asset(mut self, asset: EthAsset) -> Self {
        self.asset = asset;
        self
    }

    pub fn with_min_gas_limit(mut self, min_gas_limit: u64) -> Self {
        self.min_gas_limit = min_gas_limit;
        self
    }

    pub fn endpoint(&self) -> Result<&str, EthError> {
        self.url
            .as_deref()
            .or_else(|| self.network.default_url())
            .ok_or_else(|| {
                EthError::TransactionBuildError(format!(
                    "no JSON-RPC endpoint configured for chain {}",
                    self.network.chain_id()
                ))
            })
    }
}

/// Account-model chain driver for Ethereum and EVM networks.
///
/// Moves either ether or one ERC-20 token, chosen by the configured
/// [`EthAsset`]. Transactions are single-sender, single-recipient and signed
/// as EIP-155 legacy transactions.
pub struct EthereumChain<G = JsonRpcClient> {
    network: EvmNetwork,
    asset: EthAsset,
    min_gas_limit: u64,
    gateway: G,
}

impl EthereumChain<JsonRpcClient> {
    pub fn from_config(config: &EthConfig) -> Result<Self, EthError> {
        let gateway = JsonRpcClient::new(config.endpoint()?);
        Ok(Self::with_gateway(config, gateway))
    }
}

impl<G: AccountGateway> EthereumChain<G> {
    pub fn with_gateway(config: &EthConfig, gateway: G) -> Self {
        Self {
            network: config.network,
            asset: config.asset,
            min_gas_limit: config.min_gas_limit,
            gateway,
        }
    }

    pub fn network(&self) -> EvmNetwork {
        self.network
    }

    pub fn asset(&self) -> EthAsset {
        self.asset
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

/// First input address; only single-sender transfers are supported.
fn sender_of(transaction: &Transaction) -> Result<&str, CoinError> {
    transaction
        .inputs()
        .first()
        .map(|input| input.address.as_str())
        .ok_or_else(|| CoinError::InvalidTransaction("a sender address is required".into()))
}

#[async_trait]
impl<G: AccountGateway> ChainDriver for EthereumChain<G> {
    fn name(&self) -> &'static str {
        "ethereum"
    }

    async fn pack(&self, mut transaction: Transaction) -> Result<StagedTransaction, CoinError> {
        let sender = parse_address(sender_of(&transaction)?)?;
        let output = match transaction.outputs() {
            [output] => output,
            outputs => {
                return Err(CoinError::InvalidTransaction(format!(
                    "exactly one output is supported, got {}",
                    outputs.len()
                )))
            }
        };
        let recipient = parse_address(&output.address)?;
        let amount = output.amount.to_base_units(self.asset.decimals())?;

        let (to, value, data) = match self.asset {
            EthAsset::Native => (recipient, amount, Bytes::new()),
            EthAsset::Token { contract, .. } => {
                (contract, U256::ZERO, erc20::encode_transfer(recipient, amount))
            }
        };

        let (gas_price, nonce) = futures::try_join!(
            self.gateway.gas_price(),
            self.gateway.transaction_count(sender)
        )?;

        let call = CallRequest {
            from: sender,
            to,
            value,
            data: data.clone(),
        };
        let gas_limit = self.gateway.estimate_gas(&call).await?;
        debug!(chain = self.name(), nonce, gas_price, gas_limit, "queried account state");

        if gas_limit <= self.min_gas_limit {
            return Err(EthError::GasLimitTooLow {
                estimate: gas_limit,
                floor: self.min_gas_limit,
            }
            .into());
        }

        if transaction.fee().is_none() {
            let fee_wei = U256::from(gas_price) * U256::from(gas_limit);
            transaction.set_fee(Amount::from_base_units(fee_wei, NATIVE_DECIMALS)?);
        }
        info!(
            chain = self.name(),
            nonce,
            gas_limit,
            fee = %transaction.fee().map(Amount::as_str).unwrap_or_default(),
            "packed transaction"
        );

        Ok(StagedTransaction::new(
            transaction,
            StagedData::Account(AccountParams {
                nonce,
                gas_price: U256::from(gas_price),
                gas_limit,
                to,
                value,
                data,
            }),
        ))
    }

    fn sign(
        &self,
        staged: &StagedTransaction,
        keys: &[PrivateKey],
    ) -> Result<SignedTransaction, CoinError> {
        let params = staged.account_params()?;
        let sender_str = sender_of(staged.transaction())?;
        let sender = parse_address(sender_str)?;

        let key = select_key(&sender, keys, |candidate| {
            address_for_key(candidate).map_err(CoinError::from)
        })?
        .ok_or_else(|| CoinError::NoMatchingKey {
            address: sender_str.to_string(),
        })?;

        let tx = LegacyTransaction {
            chain_id: self.network.chain_id(),
            nonce: params.nonce,
            gas_price: u128::try_from(params.gas_price).map_err(|_| {
                CoinError::InvalidTransaction(format!("gas price {} out of range", params.gas_price))
            })?,
            gas_limit: params.gas_limit,
            to: params.to,
            value: params.value,
            data: params.data.clone(),
        };
        let signed = sign_transaction(&tx, key)?;
        info!(chain = self.name(), tx_hash = %signed.tx_hash, nonce = tx.nonce, "signed transaction");

        Ok(SignedTransaction::new(
            staged.clone(),
            BroadcastPayload::JsonRpc(JsonRpcRequest::send_raw_transaction(signed.raw_hex())),
            signed.tx_hash,
        ))
    }

    async fn send(&self, signed: &SignedTransaction) -> Result<String, CoinError> {
        let raw_tx = match signed.payload() {
            BroadcastPayload::JsonRpc(request) if request.method == SEND_RAW_TRANSACTION => {
                request.params.first()
            }
            _ => None,
        }
        .ok_or(CoinError::StagedDataMismatch {
            expected: "eth_sendRawTransaction request",
        })?;

        let tx_hash = self.gateway.send_raw_transaction(raw_tx).await?;
        info!(chain = self.name(), %tx_hash, "broadcast transaction");
        Ok(tx_hash)
    }

    fn address_for_key(&self, key: &PrivateKey) -> Result<String, CoinError> {
        Ok(address_for_key(key)?.to_checksum(None))
    }
}
