use tracing::{debug, warn};

use super::{ConnectionFactory, ConnectionSettings, PoolError, PooledSession, SessionScope};

/// Opens broker sessions and hands out [`SessionScope`]s that share them.
///
/// The pool itself keeps no cache; each scope owns the sessions of one unit
/// of work.
pub struct ConnectionPool<F> {
    factory: F,
    settings: ConnectionSettings,
}

impl<F: ConnectionFactory> ConnectionPool<F> {
    pub fn new(factory: F) -> Self {
        Self::with_settings(factory, ConnectionSettings::default())
    }

    pub fn with_settings(factory: F, settings: ConnectionSettings) -> Self {
        Self { factory, settings }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Start a unit of work.
    pub fn scope(&self) -> SessionScope<'_, F> {
        SessionScope::new(self)
    }

    /// Open a new, unshared session with no references taken.
    pub fn open(&self, address: &str) -> Result<PooledSession, PoolError> {
        let mut connection = self.factory.connect(address, &self.settings)?;
        let channel = match connection.create_channel() {
            Ok(channel) => channel,
            Err(e) => {
                warn!(address, error = %e, "channel creation failed, closing connection");
                connection.close();
                return Err(e);
            }
        };

        let session = PooledSession::new(address, connection, channel);
        debug!(session = session.id(), address, "session opened");
        Ok(session)
    }
}
