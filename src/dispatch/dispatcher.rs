//! Message dispatcher: the entry point that routes messages to handlers.
//!
//! ## Example
//!
//! ```ignore
//! let dispatcher = MessageDispatcher::new(registry)
//!     .with_aspects(DefaultAspects::new().with(LoggingAspect));
//!
//! dispatcher.dispatch(&[
//!     Box::new(OrderShipped::new("o-1")) as Box<dyn Message>,
//!     Box::new(OrderCancelled::new("o-2")),
//! ])?;
//! ```

use tracing::{debug, trace};

use super::aspect::{AspectProvider, DefaultAspects};
use super::discoverer::{HandlerDescriptor, HandlerDiscoverer};
use super::error::HandlerError;
use super::invocation::Invocation;
use crate::handler::HandlerRegistry;
use crate::message::Message;
use crate::types::TypeKey;

/// Routes each message to every applicable handler, in discovery order,
/// through the aspect chain.
///
/// Generic over the registry `R` and the aspect provider `A`. Dispatch is
/// sequential: messages in batch order, handlers of one message one after
/// another. The first error stops the batch and is returned unchanged;
/// retry and poison handling belong to the caller.
pub struct MessageDispatcher<R, A = DefaultAspects> {
    registry: R,
    aspects: A,
}

impl<R: HandlerRegistry> MessageDispatcher<R, DefaultAspects> {
    /// Create a dispatcher with no aspects.
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            aspects: DefaultAspects::new(),
        }
    }
}

impl<R: HandlerRegistry, A: AspectProvider> MessageDispatcher<R, A> {
    /// Replace the aspect provider.
    ///
    /// Uses builder pattern, returning the dispatcher for chaining.
    pub fn with_aspects<B: AspectProvider>(self, aspects: B) -> MessageDispatcher<R, B> {
        MessageDispatcher {
            registry: self.registry,
            aspects,
        }
    }

    /// Dispatch a batch of messages, in order.
    pub fn dispatch(&self, messages: &[Box<dyn Message>]) -> Result<(), HandlerError> {
        for message in messages {
            self.dispatch_one(&**message)?;
        }
        Ok(())
    }

    /// Dispatch a single message to all of its handlers.
    pub fn dispatch_one(&self, message: &dyn Message) -> Result<(), HandlerError> {
        let message_type = message.type_key();
        let descriptors = self.handlers_for(message_type);
        debug!(
            message_type = message_type.short_name(),
            correlation_id = message.correlation_id().unwrap_or(""),
            handlers = descriptors.len(),
            "dispatching message"
        );
        if descriptors.is_empty() {
            return Ok(());
        }

        // One dispatch run: aspects are materialized once, then each
        // invocation gets its own copy of the queue.
        let aspects = self.aspects.default_aspects();
        for descriptor in &descriptors {
            trace!(descriptor = %descriptor, "resolving handler");
            let handler = self.registry.resolve(descriptor.handler())?;
            let mut invocation = Invocation::new(message, descriptor, handler, aspects.clone());
            invocation.proceed()?;
        }
        Ok(())
    }

    /// The ordered handler descriptors a message of `message_type` would run.
    pub fn handlers_for(&self, message_type: TypeKey) -> Vec<HandlerDescriptor<'_>> {
        HandlerDiscoverer::new(&self.registry).handlers_for(message_type)
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn aspects(&self) -> &A {
        &self.aspects
    }
}
