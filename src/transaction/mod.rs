//! Ambient transaction, a small two-phase commit coordinator.
//!
//! Resources that want to finish their work together with a unit of work
//! enlist an [`EnlistmentNotification`] participant. Completing the
//! transaction prepares every participant and then commits or rolls back
//! all of them.

mod error;
mod transaction;

pub use error::TransactionError;
pub use transaction::{EnlistmentNotification, Phase, Transaction, TransactionScope, Vote};
