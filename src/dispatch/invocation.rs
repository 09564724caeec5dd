use std::any::Any;
use std::fmt;

use super::aspect::AspectQueue;
use super::discoverer::HandlerDescriptor;
use super::error::HandlerError;
use crate::handler::{HandlerInstance, Invoker};
use crate::message::Message;
use crate::types::{TypeKey, UpcastPath};

/// Execution context for one (message, handler) pair.
///
/// Carries its own copy of the aspect queue. [`proceed`](Self::proceed)
/// hands the invocation to the next aspect; once the queue is empty it calls
/// the handler. An aspect that returns without proceeding short-circuits
/// the rest of the chain and the handler call, and the invocation stays
/// short-circuited: proceeding again is an error.
pub struct Invocation<'m> {
    message: &'m dyn Message,
    message_type: TypeKey,
    handler_type: TypeKey,
    handler: HandlerInstance,
    invoker: Invoker,
    upcast: UpcastPath,
    aspects: AspectQueue,
    handled: bool,
    short_circuited: bool,
}

impl<'m> Invocation<'m> {
    pub fn new(
        message: &'m dyn Message,
        descriptor: &HandlerDescriptor<'_>,
        handler: HandlerInstance,
        aspects: AspectQueue,
    ) -> Self {
        Self {
            message,
            message_type: descriptor.message_type(),
            handler_type: descriptor.handler_type(),
            handler,
            invoker: descriptor.consumption().invoker(),
            upcast: descriptor.upcast().clone(),
            aspects,
            handled: false,
            short_circuited: false,
        }
    }

    /// Run the next aspect, or the handler when no aspects remain.
    ///
    /// Errors from aspects and the handler are returned as-is.
    pub fn proceed(&mut self) -> Result<(), HandlerError> {
        if self.short_circuited {
            return Err(HandlerError::ShortCircuited(self.handler_type.name()));
        }
        if let Some(aspect) = self.aspects.pop_front() {
            let result = aspect.around(self);
            if !self.handled {
                self.short_circuited = true;
            }
            return result;
        }
        if self.handled {
            return Err(HandlerError::AlreadyInvoked(self.handler_type.name()));
        }
        self.handled = true;

        let target = self
            .upcast
            .apply(self.message.as_any())
            .ok_or(HandlerError::TypeMismatch {
                expected: self.message_type.name(),
                found: self.message.type_key().name(),
            })?;
        (self.invoker)(self.handler.as_ref(), target)
    }

    pub fn message(&self) -> &'m dyn Message {
        self.message
    }

    /// The consumed type the handler receives the message as.
    pub fn message_type(&self) -> TypeKey {
        self.message_type
    }

    pub fn handler_type(&self) -> TypeKey {
        self.handler_type
    }

    pub fn handler(&self) -> &(dyn Any + Send + Sync) {
        self.handler.as_ref()
    }

    /// The handler as its concrete type, if it is an `H`.
    pub fn handler_as<H: 'static>(&self) -> Option<&H> {
        self.handler.downcast_ref::<H>()
    }

    /// True once the handler has been called.
    pub fn is_handled(&self) -> bool {
        self.handled
    }

    /// True once an aspect has returned without the handler being called.
    pub fn is_short_circuited(&self) -> bool {
        self.short_circuited
    }

    pub fn remaining_aspects(&self) -> usize {
        self.aspects.len()
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("message", &self.message)
            .field("message_type", &self.message_type)
            .field("handler_type", &self.handler_type)
            .field("remaining_aspects", &self.aspects.len())
            .field("handled", &self.handled)
            .field("short_circuited", &self.short_circuited)
            .finish()
    }
}
