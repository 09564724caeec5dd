use tracing::{error, info};

use super::PooledSession;
use crate::transaction::{EnlistmentNotification, Vote};

/// Holds a session for its transaction until the transaction is decided.
pub struct SessionEnlistment {
    session: PooledSession,
}

impl SessionEnlistment {
    /// The caller must already have taken the hold this participant will
    /// give back.
    pub fn new(session: PooledSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &PooledSession {
        &self.session
    }

    fn finish(&self, outcome: &'static str) {
        info!(
            session = self.session.id(),
            address = %self.session.address(),
            outcome,
            "transaction decided for session"
        );
        if let Err(e) = self.session.release_hold() {
            error!(session = self.session.id(), error = %e, "enlisted session hold release failed");
        }
    }
}

impl EnlistmentNotification for SessionEnlistment {
    fn prepare(&self) -> Vote {
        info!(
            session = self.session.id(),
            address = %self.session.address(),
            "prepared session"
        );
        Vote::Prepared
    }

    fn commit(&self) {
        self.finish("committed");
    }

    fn rollback(&self) {
        self.finish("rolled back");
    }
}
