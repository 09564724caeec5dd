use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use super::handler_type::{HandlerInstance, HandlerType};
use crate::dispatch::HandlerError;
use crate::types::{TypeHierarchy, TypeKey};

/// Source of handler types, handler instances and order rules.
///
/// The dispatch core only reads from a registry; implementations must be
/// immutable once dispatching starts so concurrent dispatchers need no
/// coordination.
pub trait HandlerRegistry: Send + Sync {
    /// Subtype relation over message and handler types.
    fn hierarchy(&self) -> &TypeHierarchy;

    /// Every registered handler type, in a stable order.
    fn handler_types(&self) -> Vec<&HandlerType>;

    /// Produce the handler object for one dispatch.
    fn resolve(&self, handler: &HandlerType) -> Result<HandlerInstance, HandlerError> {
        Ok(handler.instantiate())
    }

    /// Preferred handler order for a message type, if one was registered.
    fn handler_order(&self, message_type: TypeKey) -> Option<Vec<TypeKey>>;
}

impl<R: HandlerRegistry + ?Sized> HandlerRegistry for Arc<R> {
    fn hierarchy(&self) -> &TypeHierarchy {
        (**self).hierarchy()
    }

    fn handler_types(&self) -> Vec<&HandlerType> {
        (**self).handler_types()
    }

    fn resolve(&self, handler: &HandlerType) -> Result<HandlerInstance, HandlerError> {
        (**self).resolve(handler)
    }

    fn handler_order(&self, message_type: TypeKey) -> Option<Vec<TypeKey>> {
        (**self).handler_order(message_type)
    }
}

/// In-process registry built once at startup.
///
/// Handler types are enumerated in registration order.
///
/// ## Example
///
/// ```ignore
/// let registry = StaticRegistry::builder(hierarchy)
///     .handler(Handler::transient(AuditLog::default).consumes::<OrderEvent>())
///     .handler(Handler::singleton(Shipping::new()).consumes::<OrderShipped>())
///     .order_for::<OrderShipped>([TypeKey::of::<Shipping>()])
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct StaticRegistry {
    hierarchy: TypeHierarchy,
    handlers: IndexMap<TypeKey, HandlerType>,
    orders: HashMap<TypeKey, Vec<TypeKey>>,
}

impl StaticRegistry {
    pub fn builder(hierarchy: TypeHierarchy) -> StaticRegistryBuilder {
        StaticRegistryBuilder {
            registry: StaticRegistry {
                hierarchy,
                ..StaticRegistry::default()
            },
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn get(&self, key: TypeKey) -> Option<&HandlerType> {
        self.handlers.get(&key)
    }
}

impl HandlerRegistry for StaticRegistry {
    fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    fn handler_types(&self) -> Vec<&HandlerType> {
        self.handlers.values().collect()
    }

    fn handler_order(&self, message_type: TypeKey) -> Option<Vec<TypeKey>> {
        self.orders.get(&message_type).cloned()
    }
}

pub struct StaticRegistryBuilder {
    registry: StaticRegistry,
}

impl StaticRegistryBuilder {
    /// Register a handler type. Registering the same type again adds its
    /// consumptions to the first registration and keeps the first factory.
    pub fn handler(mut self, handler: impl Into<HandlerType>) -> Self {
        let handler = handler.into();
        match self.registry.handlers.get_mut(&handler.key()) {
            Some(existing) => existing.merge(handler),
            None => {
                self.registry.handlers.insert(handler.key(), handler);
            }
        }
        self
    }

    /// Order rule for messages of type `M`: handlers assignable to the listed
    /// types run first, in the listed order.
    pub fn order_for<M: 'static>(mut self, rule: impl IntoIterator<Item = TypeKey>) -> Self {
        self.registry
            .orders
            .insert(TypeKey::of::<M>(), rule.into_iter().collect());
        self
    }

    pub fn build(self) -> StaticRegistry {
        self.registry
    }
}
