use coin_core::{Amount, CoinError};
use thiserror::Error;

/// Bitcoin chain operation errors.
#[derive(Debug, Error)]
pub enum BtcError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("insufficient funds: have {available_sat} sat, need {required_sat} sat")]
    InsufficientFunds { available_sat: u64, required_sat: u64 },

    #[error("change of {change_sat} sat needs a change address")]
    MissingChangeAddress { change_sat: u64 },

    #[error("unsupported locking script on input {input}: {script}")]
    UnsupportedScript { input: usize, script: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The indexer refused the payload (4xx).
    #[error("broadcast rejected: {0}")]
    Rejected(String),

    /// The indexer failed to process the request (5xx); retrying may succeed.
    #[error("indexer unavailable: {0}")]
    Unavailable(String),
}

impl From<BtcError> for CoinError {
    fn from(e: BtcError) -> Self {
        match e {
            BtcError::InvalidPrivateKey(msg) => CoinError::InvalidKey(msg),
            BtcError::InvalidAddress(msg) => CoinError::InvalidAddress(msg),
            BtcError::InvalidAmount(msg) => CoinError::InvalidAmount(msg),
            BtcError::TransactionBuildError(msg) => CoinError::InvalidTransaction(msg),
            BtcError::SigningError(msg) => CoinError::Signing(msg),
            BtcError::InsufficientFunds {
                available_sat,
                required_sat,
            } => CoinError::InsufficientFunds {
                available: Amount::from_sat(available_sat).to_string(),
                required: Amount::from_sat(required_sat).to_string(),
            },
            BtcError::MissingChangeAddress { change_sat } => CoinError::MissingChangeAddress {
                change: Amount::from_sat(change_sat).to_string(),
            },
            BtcError::UnsupportedScript { input, script } => {
                CoinError::UnsupportedScript { input, script }
            }
            BtcError::Http(e) => CoinError::Network(e.to_string()),
            BtcError::MalformedResponse(msg) => CoinError::Network(msg),
            BtcError::Rejected(msg) => CoinError::RemoteRejection(msg),
            BtcError::Unavailable(msg) => CoinError::Network(msg),
        }
    }
}
