//! Error types for handlers, aspects and dispatch.

use std::error::Error;
use std::fmt;

use crate::bus::PublishError;
use crate::pool::PoolError;

/// Error raised by a handler or an aspect, and propagated unchanged out of
/// [`MessageDispatcher::dispatch`](super::MessageDispatcher::dispatch).
#[derive(Debug)]
pub enum HandlerError {
    /// Payload decode failed.
    DecodeFailed(String),
    /// Business logic rejected the message.
    Rejected(String),
    /// Something the handler needed was not found.
    NotFound(String),
    /// A handler or message value was not of the type its descriptor promised.
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// An aspect continued an invocation whose handler had already run.
    AlreadyInvoked(&'static str),
    /// An aspect continued an invocation after a later aspect stopped it.
    ShortCircuited(&'static str),
    /// Publishing from inside a handler failed.
    Publish(PublishError),
    /// Acquiring or using a pooled broker session failed.
    Pool(PoolError),
    /// Other error.
    Other(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::DecodeFailed(msg) => write!(f, "decode failed: {}", msg),
            HandlerError::Rejected(msg) => write!(f, "rejected: {}", msg),
            HandlerError::NotFound(id) => write!(f, "not found: {}", id),
            HandlerError::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            HandlerError::AlreadyInvoked(handler) => {
                write!(f, "handler already invoked for this invocation: {}", handler)
            }
            HandlerError::ShortCircuited(handler) => {
                write!(f, "invocation short-circuited before handler: {}", handler)
            }
            HandlerError::Publish(e) => write!(f, "publish error: {}", e),
            HandlerError::Pool(e) => write!(f, "session pool error: {}", e),
            HandlerError::Other(e) => write!(f, "handler error: {}", e),
        }
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HandlerError::Publish(e) => Some(e),
            HandlerError::Pool(e) => Some(e),
            HandlerError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<PublishError> for HandlerError {
    fn from(err: PublishError) -> Self {
        HandlerError::Publish(err)
    }
}

impl From<PoolError> for HandlerError {
    fn from(err: PoolError) -> Self {
        HandlerError::Pool(err)
    }
}

impl From<bitcode::Error> for HandlerError {
    fn from(err: bitcode::Error) -> Self {
        HandlerError::DecodeFailed(err.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::DecodeFailed(err.to_string())
    }
}
