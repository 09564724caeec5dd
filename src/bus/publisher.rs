//! Publisher trait and its error type.

use std::error::Error;
use std::fmt;

use super::Event;

/// Error type for publish operations.
#[derive(Debug)]
pub enum PublishError {
    /// Connection to the broker failed
    ConnectionFailed(String),
    /// The channel was already closed
    ChannelClosed(String),
    /// Serialization of the event failed
    SerializationFailed(String),
    /// The broker rejected the event
    Rejected(String),
    /// Other error
    Other(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            PublishError::ChannelClosed(address) => write!(f, "Channel closed: {}", address),
            PublishError::SerializationFailed(msg) => write!(f, "Serialization failed: {}", msg),
            PublishError::Rejected(msg) => write!(f, "Event rejected: {}", msg),
            PublishError::Other(e) => write!(f, "Publish error: {}", e),
        }
    }
}

impl Error for PublishError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PublishError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<bitcode::Error> for PublishError {
    fn from(err: bitcode::Error) -> Self {
        PublishError::SerializationFailed(err.to_string())
    }
}

/// Anything events can be published through.
///
/// Pooled broker sessions implement this, so handlers publish through the
/// session (and its transaction) they acquired.
pub trait Publisher: Send + Sync {
    fn publish(&self, event: Event) -> Result<(), PublishError>;

    /// Publish several events.
    ///
    /// Default implementation publishes sequentially and stops at the first
    /// failure.
    fn publish_batch(&self, events: Vec<Event>) -> Result<(), PublishError> {
        for event in events {
            self.publish(event)?;
        }
        Ok(())
    }
}
