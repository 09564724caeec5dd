use std::fmt;

use crate::transaction::{Phase, TransactionError};

/// Error type for pooled broker sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The broker could not be reached.
    ConnectionFailed { address: String, reason: String },
    /// The connection opened but a channel could not be created on it.
    ChannelFailed { address: String, reason: String },
    /// The session was already torn down.
    SessionClosed(String),
    /// `release` called more times than the session was referenced.
    ReleasedTooManyTimes(String),
    /// A transactional session was requested under a transaction that is
    /// already preparing or finished.
    TransactionNotActive(Phase),
    /// Enlisting in the ambient transaction failed.
    Transaction(TransactionError),
    /// Connection settings could not be parsed.
    InvalidSettings(String),
    /// A pool lock was poisoned.
    Poisoned(&'static str),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::ConnectionFailed { address, reason } => {
                write!(f, "connection to {} failed: {}", address, reason)
            }
            PoolError::ChannelFailed { address, reason } => {
                write!(f, "channel on {} failed: {}", address, reason)
            }
            PoolError::SessionClosed(address) => write!(f, "session for {} is closed", address),
            PoolError::ReleasedTooManyTimes(address) => {
                write!(f, "session for {} released more times than acquired", address)
            }
            PoolError::TransactionNotActive(phase) => {
                write!(f, "ambient transaction is not active (phase: {})", phase)
            }
            PoolError::Transaction(e) => write!(f, "transaction error: {}", e),
            PoolError::InvalidSettings(msg) => write!(f, "invalid connection settings: {}", msg),
            PoolError::Poisoned(what) => write!(f, "{} lock poisoned", what),
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::Transaction(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransactionError> for PoolError {
    fn from(err: TransactionError) -> Self {
        PoolError::Transaction(err)
    }
}

impl From<serde_json::Error> for PoolError {
    fn from(err: serde_json::Error) -> Self {
        PoolError::InvalidSettings(err.to_string())
    }
}
