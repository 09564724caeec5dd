//! Outbound messaging seam.
//!
//! Handlers and aspects that send further messages do so through a
//! [`Publisher`], typically a pooled broker session, never by re-entering
//! the dispatcher.

mod event;
mod publisher;

pub use event::{Event, CORRELATION_HEADER};
pub use publisher::{PublishError, Publisher};
