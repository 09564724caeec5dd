use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::TransactionError;

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Active,
    Preparing,
    Committed,
    RolledBack,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Active => "active",
            Phase::Preparing => "preparing",
            Phase::Committed => "committed",
            Phase::RolledBack => "rolled back",
        };
        f.write_str(name)
    }
}

/// A participant's answer to prepare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Vote {
    Prepared,
    ForceRollback(String),
}

/// Receives two-phase commit notifications from a [`Transaction`].
///
/// Callbacks run on the thread that completes the transaction, outside any
/// transaction lock.
pub trait EnlistmentNotification: Send + Sync {
    fn prepare(&self) -> Vote;
    fn commit(&self);
    fn rollback(&self);
}

struct TransactionState {
    phase: Phase,
    participants: Vec<Arc<dyn EnlistmentNotification>>,
}

struct TransactionInner {
    id: u64,
    state: Mutex<TransactionState>,
}

/// Handle to a two-phase commit coordinator.
///
/// Clones refer to the same transaction. Participants are notified in
/// enlistment order.
#[derive(Clone)]
pub struct Transaction {
    inner: Arc<TransactionInner>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TransactionInner {
                id: NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed),
                state: Mutex::new(TransactionState {
                    phase: Phase::Active,
                    participants: Vec::new(),
                }),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn phase(&self) -> Phase {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .phase
    }

    pub fn is_active(&self) -> bool {
        self.phase() == Phase::Active
    }

    /// True if both handles refer to the same transaction.
    pub fn same_as(&self, other: &Transaction) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn participant_count(&self) -> usize {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .participants
            .len()
    }

    /// Register a participant. Only allowed while the transaction is active.
    pub fn enlist(
        &self,
        participant: Arc<dyn EnlistmentNotification>,
    ) -> Result<(), TransactionError> {
        let mut state = self.state()?;
        if state.phase != Phase::Active {
            warn!(
                transaction = self.id(),
                phase = %state.phase,
                "enlist attempted on inactive transaction"
            );
            return Err(TransactionError::NotActive(state.phase));
        }
        state.participants.push(participant);
        debug!(
            transaction = self.id(),
            participants = state.participants.len(),
            "participant enlisted"
        );
        Ok(())
    }

    /// Prepare every participant, then commit them all, or roll them all
    /// back if any participant refuses.
    pub fn commit(&self) -> Result<(), TransactionError> {
        let participants = self.begin(Phase::Preparing)?;

        let refusal = participants.iter().find_map(|p| match p.prepare() {
            Vote::Prepared => None,
            Vote::ForceRollback(reason) => Some(reason),
        });

        match refusal {
            None => {
                self.set_phase(Phase::Committed);
                for participant in &participants {
                    participant.commit();
                }
                info!(transaction = self.id(), participants = participants.len(), "committed");
                Ok(())
            }
            Some(reason) => {
                self.set_phase(Phase::RolledBack);
                for participant in &participants {
                    participant.rollback();
                }
                info!(transaction = self.id(), reason = %reason, "rolled back during prepare");
                Err(TransactionError::Aborted(reason))
            }
        }
    }

    /// Roll back every participant.
    pub fn rollback(&self) -> Result<(), TransactionError> {
        let participants = self.begin(Phase::RolledBack)?;
        for participant in &participants {
            participant.rollback();
        }
        info!(transaction = self.id(), participants = participants.len(), "rolled back");
        Ok(())
    }

    // Leave the active phase and take the participant list, so callbacks
    // run without holding the lock.
    fn begin(&self, next: Phase) -> Result<Vec<Arc<dyn EnlistmentNotification>>, TransactionError> {
        let mut state = self.state()?;
        if state.phase != Phase::Active {
            return Err(TransactionError::NotActive(state.phase));
        }
        state.phase = next;
        Ok(std::mem::take(&mut state.participants))
    }

    fn set_phase(&self, phase: Phase) {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .phase = phase;
    }

    fn state(&self) -> Result<MutexGuard<'_, TransactionState>, TransactionError> {
        self.inner
            .state
            .lock()
            .map_err(|_| TransactionError::Poisoned)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id())
            .field("phase", &self.phase())
            .finish()
    }
}

/// Commits on [`complete`](Self::complete); rolls back if dropped first.
///
/// ```ignore
/// let scope = TransactionScope::new();
/// let sessions = pool.scope().with_transaction(scope.transaction().clone());
/// // ... acquire sessions, publish ...
/// scope.complete()?;
/// ```
pub struct TransactionScope {
    transaction: Transaction,
    completed: bool,
}

impl Default for TransactionScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionScope {
    pub fn new() -> Self {
        Self {
            transaction: Transaction::new(),
            completed: false,
        }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn complete(mut self) -> Result<(), TransactionError> {
        self.completed = true;
        self.transaction.commit()
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if self.completed || !self.transaction.is_active() {
            return;
        }
        if let Err(e) = self.transaction.rollback() {
            warn!(transaction = self.transaction.id(), error = %e, "rollback on drop failed");
        }
    }
}
