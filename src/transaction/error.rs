use std::fmt;

use super::Phase;

/// Error type for transaction operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// Enlisting or completing a transaction that is no longer active.
    NotActive(Phase),
    /// A participant voted to roll back during prepare.
    Aborted(String),
    /// The transaction state lock was poisoned.
    Poisoned,
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionError::NotActive(phase) => {
                write!(f, "transaction is not active (phase: {})", phase)
            }
            TransactionError::Aborted(reason) => write!(f, "transaction aborted: {}", reason),
            TransactionError::Poisoned => write!(f, "transaction state lock poisoned"),
        }
    }
}

impl std::error::Error for TransactionError {}
