//! Handlers and the registry the dispatcher discovers them from.
//!
//! A handler type declares each message type it consumes by implementing
//! [`Consume<M>`] and listing `M` when it is registered. Registration turns
//! every declaration into a statically generated invoker, so nothing is
//! instantiated by type at dispatch time.
//!
//! ## Handler Convention
//!
//! ```ignore
//! #[derive(Default)]
//! pub struct ShippingNotifier;
//!
//! impl Consume<OrderShipped> for ShippingNotifier {
//!     fn consume(&self, message: &OrderShipped) -> Result<(), HandlerError> {
//!         // ...
//!         Ok(())
//!     }
//! }
//!
//! let registry = mta_rust::register_handlers!(
//!     StaticRegistry::builder(hierarchy),
//!     ShippingNotifier => [OrderShipped],
//!     AuditLog => [OrderEvent, PaymentEvent],
//! )
//! .build();
//! ```

mod handler_type;
mod registry;

pub use handler_type::{Consumption, Handler, HandlerInstance, HandlerType, Invoker};
pub use registry::{HandlerRegistry, StaticRegistry, StaticRegistryBuilder};

use crate::dispatch::HandlerError;

/// Capability of consuming messages of type `M`.
///
/// `M` may be the runtime type of a message or any of its registered
/// ancestors. Handlers are shared (`&self`); use interior mutability for
/// state.
pub trait Consume<M>: Send + Sync {
    fn consume(&self, message: &M) -> Result<(), HandlerError>;
}

/// Register `Default` handler types with a [`StaticRegistryBuilder`].
///
/// Each entry lists the message types the handler consumes; the handler
/// must implement [`Consume`] for each of them.
///
/// # Example
/// ```ignore
/// let registry = mta_rust::register_handlers!(
///     StaticRegistry::builder(hierarchy),
///     AuditLog => [OrderEvent],
///     ShippingNotifier => [OrderShipped, OrderCancelled],
/// )
/// .build();
/// ```
#[macro_export]
macro_rules! register_handlers {
    ($builder:expr, $( $handler:ty => [ $( $message:ty ),+ $(,)? ] ),+ $(,)?) => {
        $builder
        $(
            .handler(
                $crate::handler::Handler::<$handler>::transient(
                    <$handler as ::std::default::Default>::default,
                )
                $( .consumes::<$message>() )+
            )
        )+
    };
}
