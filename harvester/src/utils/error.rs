use alloy_primitives::B256;
use thiserror::Error;

/// Harvester Result
pub type HarvesterResult<T> = Result<T, HarvesterError>;

/// Harvester Errors
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HarvesterError {
    /// Malformed or missing settings
    #[error("configuration error: {0}")]
    Config(String),
    /// A startup assertion did not hold
    #[error("precondition failed: {0}")]
    Precondition(String),
    /// The RPC endpoint could not be reached or answered with garbage
    #[error("rpc transport error: {0}")]
    Transport(String),
    /// JSON-RPC error object returned by the node
    #[error("rpc error {code}: {message}")]
    RpcResponse { code: i64, message: String },
    /// Decoding issue
    #[error("decoding error: {0}")]
    DecodingError(String),
    /// The credential could not sign the envelope
    #[error("signing error: {0}")]
    Signing(String),
    /// The node refused the raw transaction
    #[error("transaction submission failed: {0}")]
    Submission(String),
    /// The receipt reported a failed execution
    #[error("transaction {0} reverted")]
    Reverted(B256),
    /// No receipt within the confirmation bound
    #[error("transaction {hash} was not confirmed within {waited_secs}s")]
    ConfirmationTimeout { hash: B256, waited_secs: u64 },
    /// The ledger no longer knows the transaction
    #[error("transaction {0} was dropped by the ledger")]
    Dropped(B256),
    /// Too many consecutive failing cycles
    #[error("harvester halted: {0}")]
    Halted(String),
    /// Arithmetic error
    #[error("arithmetic error: {0}")]
    Arithmetic(String),
}

pub fn arithmetic_err<S: AsRef<str>>(s: S) -> HarvesterError {
    HarvesterError::Arithmetic(s.as_ref().to_string())
}

pub fn decoding_err<E: std::fmt::Debug>(err: E) -> HarvesterError {
    HarvesterError::DecodingError(format!("{:#?}", err))
}
