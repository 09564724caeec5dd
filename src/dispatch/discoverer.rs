use std::collections::HashSet;
use std::fmt;

use crate::handler::{Consumption, HandlerRegistry, HandlerType};
use crate::types::{TypeHierarchy, TypeKey, UpcastPath};

/// A handler type paired with the most specific message type it will
/// receive for one runtime message type.
#[derive(Clone)]
pub struct HandlerDescriptor<'r> {
    handler: &'r HandlerType,
    consumption: Consumption,
    upcast: UpcastPath,
}

impl<'r> HandlerDescriptor<'r> {
    pub fn handler(&self) -> &'r HandlerType {
        self.handler
    }

    pub fn handler_type(&self) -> TypeKey {
        self.handler.key()
    }

    /// The declared consumed type selected for this message.
    pub fn message_type(&self) -> TypeKey {
        self.consumption.message_type()
    }

    pub(crate) fn consumption(&self) -> &Consumption {
        &self.consumption
    }

    pub(crate) fn upcast(&self) -> &UpcastPath {
        &self.upcast
    }
}

impl fmt::Display for HandlerDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invoke {} to handle {}",
            self.handler_type(),
            self.message_type()
        )
    }
}

impl fmt::Debug for HandlerDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("handler", &self.handler_type())
            .field("message_type", &self.message_type())
            .finish()
    }
}

/// Computes which handlers run for a message type, and in which order.
pub struct HandlerDiscoverer<'r, R: ?Sized> {
    registry: &'r R,
}

impl<'r, R: HandlerRegistry + ?Sized> HandlerDiscoverer<'r, R> {
    pub fn new(registry: &'r R) -> Self {
        Self { registry }
    }

    /// Ordered handler descriptors for `message_type`.
    ///
    /// Every handler type appears at most once, with the most specific of
    /// its declared consumed types that `message_type` can be seen as.
    /// Handlers named by the message type's order rule come first, in rule
    /// order; the rest follow in registry order. An empty result is fine.
    pub fn handlers_for(&self, message_type: TypeKey) -> Vec<HandlerDescriptor<'r>> {
        let hierarchy = self.registry.hierarchy();
        let mut seen = HashSet::new();
        let mut discovered = Vec::new();

        for handler in self.registry.handler_types() {
            if !seen.insert(handler.key()) {
                continue;
            }
            let Some(consumption) = most_specific(hierarchy, message_type, handler.consumes())
            else {
                continue;
            };
            let Some(upcast) = hierarchy.upcast_path(message_type, consumption.message_type())
            else {
                continue;
            };
            discovered.push(HandlerDescriptor {
                handler,
                consumption: consumption.clone(),
                upcast,
            });
        }

        match self.registry.handler_order(message_type) {
            Some(rule) => apply_order(hierarchy, &rule, discovered),
            None => discovered,
        }
    }
}

// Among the consumptions a message can be upcast to, keep those with no
// strictly more specific alternative; ties go to the smallest type name.
fn most_specific<'c>(
    hierarchy: &TypeHierarchy,
    message_type: TypeKey,
    consumes: &'c [Consumption],
) -> Option<&'c Consumption> {
    let matching: Vec<&Consumption> = consumes
        .iter()
        .filter(|c| hierarchy.can_upcast(message_type, c.message_type()))
        .collect();

    matching
        .iter()
        .copied()
        .filter(|candidate| {
            !matching.iter().any(|other| {
                hierarchy.is_strict_subtype(other.message_type(), candidate.message_type())
            })
        })
        .min_by_key(|c| c.message_type())
}

fn apply_order<'r>(
    hierarchy: &TypeHierarchy,
    rule: &[TypeKey],
    discovered: Vec<HandlerDescriptor<'r>>,
) -> Vec<HandlerDescriptor<'r>> {
    let mut remaining = discovered;
    let mut ordered = Vec::with_capacity(remaining.len());
    for wanted in rule {
        if let Some(index) = remaining
            .iter()
            .position(|d| hierarchy.is_assignable(*wanted, d.handler_type()))
        {
            ordered.push(remaining.remove(index));
        }
    }
    ordered.extend(remaining);
    ordered
}
