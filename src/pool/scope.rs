use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace, warn};

use super::{ConnectionFactory, ConnectionPool, PoolError, PooledSession, SessionEnlistment};
use crate::transaction::{Phase, Transaction};

type SessionCache = Arc<Mutex<HashMap<String, PooledSession>>>;

/// The sessions of one unit of work, keyed by address.
///
/// Transactional acquires for the same address share one session. If the
/// scope is bound to a [`Transaction`], a newly opened session is enlisted in
/// it and stays open until the transaction is decided, even after every
/// caller has released it.
pub struct SessionScope<'p, F> {
    pool: &'p ConnectionPool<F>,
    transaction: Option<Transaction>,
    sessions: SessionCache,
}

impl<'p, F: ConnectionFactory> SessionScope<'p, F> {
    pub(crate) fn new(pool: &'p ConnectionPool<F>) -> Self {
        Self {
            pool,
            transaction: None,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transaction = Some(transaction);
        self
    }

    /// Bind, replace or clear the ambient transaction. Sessions already
    /// enlisted stay with the transaction they were enlisted in.
    pub fn set_transaction(&mut self, transaction: Option<Transaction>) {
        self.transaction = transaction;
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    /// The cached session for `address`, if any. Takes no reference.
    pub fn cached(&self, address: &str) -> Option<PooledSession> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a session for `address` with one reference taken for the caller,
    /// who must [`release`](PooledSession::release) it.
    ///
    /// Non-transactional acquires always open a fresh session that is never
    /// shared. Transactional acquires reuse the cached session while it is
    /// active.
    pub fn acquire(
        &self,
        address: &str,
        transactional: bool,
    ) -> Result<PooledSession, PoolError> {
        if !transactional {
            let session = self.pool.open(address)?;
            session.add_ref()?;
            return Ok(session);
        }

        let transaction = match &self.transaction {
            Some(tx) if tx.phase() != Phase::Active => {
                let phase = tx.phase();
                warn!(
                    transaction = tx.id(),
                    phase = %phase,
                    address,
                    "session acquired under a transaction that is not active"
                );
                return Err(PoolError::TransactionNotActive(phase));
            }
            other => other.clone(),
        };

        let session = {
            let mut sessions = self.lock()?;

            if let Some(cached) = sessions.get(address).cloned() {
                match cached.add_ref() {
                    Ok(()) => {
                        trace!(
                            session = cached.id(),
                            refs = cached.ref_count(),
                            "reusing session"
                        );
                        return Ok(cached);
                    }
                    Err(PoolError::SessionClosed(_)) => {
                        debug!(session = cached.id(), address, "evicting stale session");
                        sessions.remove(address);
                    }
                    Err(e) => return Err(e),
                }
            }

            let session = self.pool.open(address)?;
            // The reference and the hold are taken before the cache lock is
            // dropped, so no other acquirer can see the session at zero.
            session.add_ref()?;
            if transaction.is_some() {
                session.hold()?;
            }
            self.evict_on_dispose(&session);
            sessions.insert(address.to_string(), session.clone());
            session
        };

        // Outside the cache lock: a failed enlist tears the session down,
        // and teardown evicts through the cache.
        if let Some(tx) = transaction {
            let participant = Arc::new(SessionEnlistment::new(session.clone()));
            if let Err(e) = tx.enlist(participant) {
                let _ = session.release_hold();
                let _ = session.release();
                return Err(e.into());
            }
            debug!(
                transaction = tx.id(),
                session = session.id(),
                address,
                "session enlisted"
            );
        }

        Ok(session)
    }

    fn evict_on_dispose(&self, session: &PooledSession) {
        let cache = Arc::downgrade(&self.sessions);
        let id = session.id();
        session.on_disposed(move |address| {
            let Some(cache) = cache.upgrade() else {
                return;
            };
            let mut sessions = cache.lock().unwrap_or_else(PoisonError::into_inner);
            if sessions.get(address).is_some_and(|s| s.id() == id) {
                sessions.remove(address);
                trace!(session = id, address, "session evicted");
            }
        });
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, PooledSession>>, PoolError> {
        self.sessions
            .lock()
            .map_err(|_| PoolError::Poisoned("session cache"))
    }
}

impl<F> Drop for SessionScope<'_, F> {
    fn drop(&mut self) {
        let sessions =
            std::mem::take(&mut *self.sessions.lock().unwrap_or_else(PoisonError::into_inner));
        for (address, session) in sessions {
            if !session.is_active() {
                continue;
            }
            match &self.transaction {
                Some(tx) if tx.is_active() => debug!(
                    transaction = tx.id(),
                    session = session.id(),
                    address = %address,
                    "scope ended before its transaction"
                ),
                _ => warn!(
                    session = session.id(),
                    address = %address,
                    refs = session.ref_count(),
                    "scope ended with session still referenced"
                ),
            }
        }
    }
}
