//! error types for the sekie client

use thiserror::Error;

/// failures talking to the ledger node
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("api error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        error_code: Option<String>,
        vm_error_code: Option<u64>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("decoding error: {0}")]
    Decoding(String),

    #[error("timeout waiting for {0}")]
    Timeout(String),

    #[error("transaction {hash} aborted: {vm_status}")]
    Aborted { hash: String, vm_status: String },
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            LedgerError::Decoding(e.to_string())
        } else if e.is_timeout() {
            LedgerError::Timeout(e.to_string())
        } else {
            LedgerError::Connection(e.to_string())
        }
    }
}

/// malformed identity material
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("missing private key")]
    MissingPrivateKey,

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("public key does not match private key")]
    KeyMismatch,
}

/// configuration loading failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid identity {role}: {source}")]
    Identity {
        role: &'static str,
        #[source]
        source: IdentityError,
    },

    #[error("invalid value: {0}")]
    Invalid(String),
}

/// which step of a dispatch failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatchErrorKind {
    Construction,
    Signing,
    Submission,
    Confirmation,
}

impl std::fmt::Display for DispatchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DispatchErrorKind::Construction => "construction",
            DispatchErrorKind::Signing => "signing",
            DispatchErrorKind::Submission => "submission",
            DispatchErrorKind::Confirmation => "confirmation",
        };
        f.write_str(name)
    }
}

/// outcome of a failed dispatch, one variant per step
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// envelope could not be built (account state unreachable)
    #[error("construction error: {0}")]
    Construction(String),

    /// key material absent or invalid
    #[error("signing error: {0}")]
    Signing(String),

    /// node rejected the signed transaction before execution
    #[error("submission error: {0}")]
    Submission(String),

    /// settlement never observed, or the transaction aborted on-chain
    #[error("confirmation error: {0}")]
    Confirmation(String),
}

impl DispatchError {
    pub fn kind(&self) -> DispatchErrorKind {
        match self {
            DispatchError::Construction(_) => DispatchErrorKind::Construction,
            DispatchError::Signing(_) => DispatchErrorKind::Signing,
            DispatchError::Submission(_) => DispatchErrorKind::Submission,
            DispatchError::Confirmation(_) => DispatchErrorKind::Confirmation,
        }
    }

    /// underlying message from the ledger or signer
    pub fn message(&self) -> &str {
        match self {
            DispatchError::Construction(m)
            | DispatchError::Signing(m)
            | DispatchError::Submission(m)
            | DispatchError::Confirmation(m) => m,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_kind() {
        let err = DispatchError::Confirmation("EINSUFFICIENT_BALANCE".into());
        assert_eq!(err.kind(), DispatchErrorKind::Confirmation);
        assert_eq!(err.message(), "EINSUFFICIENT_BALANCE");
        assert_eq!(err.to_string(), "confirmation error: EINSUFFICIENT_BALANCE");
    }
}
