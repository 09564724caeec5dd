use std::any::Any;
use std::fmt;

use crate::types::TypeKey;

/// Object-safe access to a value's concrete type.
///
/// Implemented for every `'static` type; it only exists so that
/// [`Message`] can expose `as_any` and `type_key` through `dyn Message`.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn type_key(&self) -> TypeKey;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }
}

/// A value that can be dispatched to handlers.
///
/// Messages are opaque to the dispatch core: it only looks at the runtime
/// type (to find handlers) and the optional correlation id (for logging).
///
/// ```ignore
/// #[derive(Debug)]
/// struct OrderShipped { order_id: String }
///
/// impl Message for OrderShipped {
///     fn correlation_id(&self) -> Option<&str> {
///         Some(&self.order_id)
///     }
/// }
/// ```
pub trait Message: AsAny + Send + Sync + fmt::Debug {
    /// Application-assigned correlation field, if the message carries one.
    fn correlation_id(&self) -> Option<&str> {
        None
    }
}
