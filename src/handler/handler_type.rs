use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::Consume;
use crate::dispatch::HandlerError;
use crate::types::TypeKey;

/// A resolved handler object, shared or freshly created per dispatch.
pub type HandlerInstance = Arc<dyn Any + Send + Sync>;

/// Calls `Consume<M>::consume` on a type-erased handler with a type-erased message.
pub type Invoker = fn(&(dyn Any + Send + Sync), &dyn Any) -> Result<(), HandlerError>;

type Factory = Arc<dyn Fn() -> HandlerInstance + Send + Sync>;

fn invoke<H, M>(handler: &(dyn Any + Send + Sync), message: &dyn Any) -> Result<(), HandlerError>
where
    H: Consume<M> + 'static,
    M: 'static,
{
    let handler = handler
        .downcast_ref::<H>()
        .ok_or(HandlerError::TypeMismatch {
            expected: type_name::<H>(),
            found: "handler instance of another type",
        })?;
    let message = message
        .downcast_ref::<M>()
        .ok_or(HandlerError::TypeMismatch {
            expected: type_name::<M>(),
            found: "message of another type",
        })?;
    handler.consume(message)
}

/// One "consumes T" declaration of a handler type.
#[derive(Clone)]
pub struct Consumption {
    message_type: TypeKey,
    invoker: Invoker,
}

impl Consumption {
    pub fn message_type(&self) -> TypeKey {
        self.message_type
    }

    pub fn invoker(&self) -> Invoker {
        self.invoker
    }
}

impl fmt::Debug for Consumption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Consumption")
            .field(&self.message_type)
            .finish()
    }
}

/// A registered handler implementation: its key, what it consumes, and how
/// to get an instance of it.
#[derive(Clone)]
pub struct HandlerType {
    key: TypeKey,
    consumes: Vec<Consumption>,
    factory: Factory,
}

impl HandlerType {
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Declared consumptions, in declaration order.
    pub fn consumes(&self) -> &[Consumption] {
        &self.consumes
    }

    pub fn instantiate(&self) -> HandlerInstance {
        (self.factory)()
    }

    pub(crate) fn merge(&mut self, other: HandlerType) {
        for consumption in other.consumes {
            if !self
                .consumes
                .iter()
                .any(|c| c.message_type == consumption.message_type)
            {
                self.consumes.push(consumption);
            }
        }
    }
}

impl fmt::Debug for HandlerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerType")
            .field("key", &self.key)
            .field("consumes", &self.consumes)
            .finish()
    }
}

/// Typed builder for a [`HandlerType`].
///
/// ```ignore
/// let audit = Handler::transient(AuditLog::default)
///     .consumes::<OrderEvent>()
///     .consumes::<PaymentEvent>();
/// ```
pub struct Handler<H> {
    factory: Factory,
    consumes: Vec<Consumption>,
    _handler: PhantomData<fn() -> H>,
}

impl<H: Send + Sync + 'static> Handler<H> {
    /// A new handler instance is created for every dispatch.
    pub fn transient<F>(factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(move || Arc::new(factory()) as HandlerInstance),
            consumes: Vec::new(),
            _handler: PhantomData,
        }
    }

    /// The same instance is shared by every dispatch.
    pub fn singleton(instance: H) -> Self {
        Self::shared(Arc::new(instance))
    }

    /// Share an instance the caller keeps a handle to (handy for inspecting
    /// handler state after dispatch).
    pub fn shared(instance: Arc<H>) -> Self {
        Self {
            factory: Arc::new(move || Arc::clone(&instance) as HandlerInstance),
            consumes: Vec::new(),
            _handler: PhantomData,
        }
    }

    /// Declare that `H` consumes `M`.
    pub fn consumes<M: 'static>(mut self) -> Self
    where
        H: Consume<M>,
    {
        let message_type = TypeKey::of::<M>();
        if !self.consumes.iter().any(|c| c.message_type == message_type) {
            self.consumes.push(Consumption {
                message_type,
                invoker: invoke::<H, M>,
            });
        }
        self
    }
}

impl<H: Send + Sync + 'static> From<Handler<H>> for HandlerType {
    fn from(handler: Handler<H>) -> Self {
        HandlerType {
            key: TypeKey::of::<H>(),
            consumes: handler.consumes,
            factory: handler.factory,
        }
    }
}
