//! Error taxonomy for the Lumen wallet
//!
//! Components never catch-and-suppress: low-level faults are translated into
//! these variants and propagated. Every variant maps to a distinct,
//! actionable user-facing message.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("user PIN is required; enter your PIN and try again")]
    MissingPin,

    #[error("no ephemeral key in the session; start a new login")]
    MissingEphemeralKey,

    #[error("no identity proof in the session; complete the login flow first")]
    MissingProof,

    #[error("proving service unavailable: {0}")]
    ProverUnavailable(String),

    #[error("proving service returned a malformed response: {0}")]
    ProverMalformedResponse(String),

    #[error("invalid JWT claims: {0}")]
    InvalidJwtClaims(String),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("ledger rejected the transaction: {0}")]
    LedgerRejected(String),

    #[error("only {received} of {threshold} required key-server responses; decryption unavailable")]
    InsufficientKeyShards { received: usize, threshold: usize },

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for the session-incomplete family: the user must restart the
    /// login or re-enter their PIN rather than retry the operation.
    pub fn is_session_incomplete(&self) -> bool {
        matches!(
            self,
            Error::MissingPin | Error::MissingEphemeralKey | Error::MissingProof
        )
    }
}
