use coin_core::staged::SEND_RAW_TRANSACTION;
use coin_core::CoinError;
use thiserror::Error;

/// Ethereum chain operation errors.
#[derive(Debug, Error)]
pub enum EthError {
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

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("gas estimate {estimate} is at or below the minimum of {floor}")]
    GasLimitTooLow { estimate: u64, floor: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A JSON-RPC error object returned by the node for `method`.
    #[error("{method} failed with RPC error {code}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
}

impl From<EthError> for CoinError {
    fn from(e: EthError) -> Self {
        match e {
            EthError::InvalidPrivateKey(msg) => CoinError::InvalidKey(msg),
            EthError::InvalidAddress(msg) => CoinError::InvalidAddress(msg),
            EthError::InvalidAmount(msg) => CoinError::InvalidAmount(msg),
            EthError::TransactionBuildError(msg) | EthError::EncodingError(msg) => {
                CoinError::InvalidTransaction(msg)
            }
            EthError::SigningError(msg) => CoinError::Signing(msg),
            EthError::GasLimitTooLow { estimate, floor } => {
                CoinError::GasLimitTooLow { estimate, floor }
            }
            EthError::Http(err) => CoinError::Network(err.to_string()),
            EthError::MalformedResponse(msg) => CoinError::Network(msg),
            // Only a refused broadcast says the payload itself is bad.
            EthError::Rpc {
                method,
                code,
                message,
            } if method == SEND_RAW_TRANSACTION => {
                CoinError::RemoteRejection(format!("{message} (code {code})"))
            }
            rpc @ EthError::Rpc { .. } => CoinError::Network(rpc.to_string()),
        }
    }
}
