use thiserror::Error;

/// Errors surfaced by the pack / sign / send pipeline.
///
/// Every chain driver reports failures through this type so callers can react
/// to the same taxonomy regardless of the ledger model underneath.
#[derive(Debug, Error)]
pub enum CoinError {
    /// The gateway was unreachable or returned data that could not be decoded.
    #[error("network error: {0}")]
    Network(String),

    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: String, required: String },

    /// Leftover value is above the dust threshold but no change address was given.
    #[error("change of {change} exceeds the dust threshold but no change address was supplied")]
    MissingChangeAddress { change: String },

    #[error("gas estimate {estimate} is at or below the minimum of {floor}")]
    GasLimitTooLow { estimate: u64, floor: u64 },

    #[error("no supplied key matches address {address}")]
    NoMatchingKey { address: String },

    #[error("input {input} has an unsupported locking script: {script}")]
    UnsupportedScript { input: usize, script: String },

    /// The network accepted the request but reported the payload as invalid.
    #[error("remote rejected transaction: {0}")]
    RemoteRejection(String),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A staged transaction packed by one driver family was handed to another.
    #[error("staged data mismatch: expected {expected} data")]
    StagedDataMismatch { expected: &'static str },

    #[error("signing error: {0}")]
    Signing(String),
}
