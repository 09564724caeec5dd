//! Failure bookkeeping for transport messages.
//!
//! The transport records every handler failure against the id of the
//! transport message being processed. On redelivery it asks
//! [`FailureManager::is_poison`] whether the message failed before and should
//! be moved aside instead of dispatched again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::dispatch::HandlerError;

/// Notified of every recorded failure.
pub trait FailureObserver: Send + Sync {
    fn on_failure(&self, address: &str, message_id: &str, error: &HandlerError);
}

impl<F> FailureObserver for F
where
    F: Fn(&str, &str, &HandlerError) + Send + Sync,
{
    fn on_failure(&self, address: &str, message_id: &str, error: &HandlerError) {
        self(address, message_id, error)
    }
}

/// Remembers which transport messages failed.
#[derive(Default)]
pub struct FailureManager {
    failures: Mutex<HashMap<String, Vec<String>>>,
    observer: Option<Arc<dyn FailureObserver>>,
}

impl FailureManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(observer: Arc<dyn FailureObserver>) -> Self {
        Self {
            failures: Mutex::new(HashMap::new()),
            observer: Some(observer),
        }
    }

    pub fn record_failure(&self, address: &str, message_id: &str, error: &HandlerError) {
        let count = {
            let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
            let errors = failures.entry(message_id.to_string()).or_default();
            errors.push(error.to_string());
            errors.len()
        };
        warn!(address, message_id, failures = count, error = %error, "message handling failed");

        if let Some(observer) = &self.observer {
            observer.on_failure(address, message_id, error);
        }
    }

    /// True if failures were recorded for `message_id`. Forgets them, so the
    /// next call for the same id returns false.
    pub fn is_poison(&self, message_id: &str) -> bool {
        let removed = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(message_id);
        match removed {
            Some(errors) => {
                debug!(message_id, failures = errors.len(), "message is poison");
                true
            }
            None => false,
        }
    }

    /// Failure descriptions recorded for `message_id`, oldest first.
    pub fn failures(&self, message_id: &str) -> Vec<String> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(message_id)
            .cloned()
            .unwrap_or_default()
    }
}
