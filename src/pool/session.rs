use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error};

use super::{BrokerChannel, BrokerConnection, PoolError};
use crate::bus::{Event, PublishError, Publisher};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

type DisposedCallback = Box<dyn FnOnce(&str) + Send>;

struct SessionResources {
    connection: Box<dyn BrokerConnection>,
    channel: Box<dyn BrokerChannel>,
}

struct SessionState {
    refs: usize,
    // The enlisted transaction's reference, kept apart from caller references.
    held: bool,
    resources: Option<SessionResources>,
}

impl SessionState {
    fn usable(&self) -> bool {
        self.resources
            .as_ref()
            .is_some_and(|resources| resources.channel.is_open())
    }

    fn take_if_unreferenced(&mut self) -> Option<SessionResources> {
        if self.refs == 0 && !self.held {
            self.resources.take()
        } else {
            None
        }
    }
}

struct SessionInner {
    id: u64,
    address: String,
    state: Mutex<SessionState>,
    disposed: Mutex<Vec<DisposedCallback>>,
}

/// One broker connection plus one channel on it, shared by reference count.
///
/// Cloning the handle does not take a reference; [`add_ref`](Self::add_ref)
/// and [`release`](Self::release) do. A session enlisted in a transaction is
/// also held by it, and caller releases can never give that hold back. When
/// no reference and no hold remain, the channel and then the connection are
/// closed and the disposal callbacks run, exactly once.
#[derive(Clone)]
pub struct PooledSession {
    inner: Arc<SessionInner>,
}

impl PooledSession {
    /// Wrap freshly opened resources. The session starts with no references.
    pub(crate) fn new(
        address: &str,
        connection: Box<dyn BrokerConnection>,
        channel: Box<dyn BrokerChannel>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
                address: address.to_string(),
                state: Mutex::new(SessionState {
                    refs: 0,
                    held: false,
                    resources: Some(SessionResources {
                        connection,
                        channel,
                    }),
                }),
                disposed: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn address(&self) -> &str {
        &self.inner.address
    }

    /// Caller references plus the transaction hold, if any.
    pub fn ref_count(&self) -> usize {
        let state = self.state();
        state.refs + usize::from(state.held)
    }

    /// True while a transaction holds this session.
    pub fn is_held(&self) -> bool {
        self.state().held
    }

    /// True until the session has been torn down or its channel has closed
    /// underneath it.
    pub fn is_active(&self) -> bool {
        self.state().usable()
    }

    /// True if both handles refer to the same session.
    pub fn same_session(&self, other: &PooledSession) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Take one more reference. Fails once the session is no longer active.
    pub fn add_ref(&self) -> Result<(), PoolError> {
        let mut state = self.state();
        if !state.usable() {
            return Err(PoolError::SessionClosed(self.inner.address.clone()));
        }
        state.refs += 1;
        Ok(())
    }

    /// Give back one caller reference, tearing the session down on the last
    /// one unless a transaction still holds it.
    ///
    /// Releasing more often than referenced is a caller bug and is reported
    /// as [`PoolError::ReleasedTooManyTimes`] without touching the count.
    pub fn release(&self) -> Result<(), PoolError> {
        let resources = {
            let mut state = self.state();
            if state.refs == 0 {
                return Err(self.released_too_often("session released more times than acquired"));
            }
            state.refs -= 1;
            state.take_if_unreferenced()
        };

        if let Some(resources) = resources {
            self.teardown(resources);
        }
        Ok(())
    }

    /// Take the transaction hold. A session is held by at most one
    /// transaction.
    pub(crate) fn hold(&self) -> Result<(), PoolError> {
        let mut state = self.state();
        if !state.usable() {
            return Err(PoolError::SessionClosed(self.inner.address.clone()));
        }
        state.held = true;
        Ok(())
    }

    /// Give back the transaction hold, tearing the session down if no caller
    /// references remain.
    pub(crate) fn release_hold(&self) -> Result<(), PoolError> {
        let resources = {
            let mut state = self.state();
            if !state.held {
                return Err(self.released_too_often("transaction hold released twice"));
            }
            state.held = false;
            state.take_if_unreferenced()
        };

        if let Some(resources) = resources {
            self.teardown(resources);
        }
        Ok(())
    }

    /// Run `callback` with the session address once the session is torn
    /// down. Runs immediately if it already is.
    pub fn on_disposed<F>(&self, callback: F)
    where
        F: FnOnce(&str) + Send + 'static,
    {
        let pending = {
            let mut callbacks = self
                .inner
                .disposed
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if self.state().resources.is_some() {
                callbacks.push(Box::new(callback));
                None
            } else {
                Some(callback)
            }
        };
        if let Some(callback) = pending {
            callback(&self.inner.address);
        }
    }

    /// Use the channel. Must not release this session from inside `f`.
    pub fn with_channel<R>(
        &self,
        f: impl FnOnce(&mut dyn BrokerChannel) -> R,
    ) -> Result<R, PoolError> {
        let mut state = self.state();
        match state.resources.as_mut() {
            Some(resources) => Ok(f(resources.channel.as_mut())),
            None => Err(PoolError::SessionClosed(self.inner.address.clone())),
        }
    }

    fn teardown(&self, mut resources: SessionResources) {
        resources.channel.close();
        resources.connection.close();
        debug!(
            session = self.inner.id,
            address = %self.inner.address,
            "session closed"
        );

        // Teardown happens at most once, so the callbacks are taken at most once.
        let callbacks = std::mem::take(
            &mut *self
                .inner
                .disposed
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for callback in callbacks {
            callback(&self.inner.address);
        }
    }

    fn released_too_often(&self, reason: &'static str) -> PoolError {
        error!(
            session = self.inner.id,
            address = %self.inner.address,
            "{reason}"
        );
        PoolError::ReleasedTooManyTimes(self.inner.address.clone())
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Publisher for PooledSession {
    fn publish(&self, event: Event) -> Result<(), PublishError> {
        match self.with_channel(|channel| channel.publish(event)) {
            Ok(result) => result,
            Err(_) => Err(PublishError::ChannelClosed(self.inner.address.clone())),
        }
    }
}

impl fmt::Debug for PooledSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("PooledSession")
            .field("id", &self.inner.id)
            .field("address", &self.inner.address)
            .field("refs", &state.refs)
            .field("held", &state.held)
            .field("active", &state.usable())
            .finish()
    }
}
