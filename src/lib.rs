//! Message transport core: polymorphic handler dispatch and
//! transaction-aware pooled broker sessions.

pub mod bus;
pub mod dispatch;
pub mod failure;
pub mod handler;
pub mod message;
pub mod pool;
pub mod transaction;
pub mod types;

pub use bus::{Event, PublishError, Publisher};
pub use dispatch::{
    Aspect, AspectProvider, DefaultAspects, HandlerDescriptor, HandlerDiscoverer, HandlerError,
    Invocation, LoggingAspect, MessageDispatcher,
};
pub use failure::{FailureManager, FailureObserver};
pub use handler::{Consume, Handler, HandlerRegistry, HandlerType, StaticRegistry};
pub use message::{AsAny, Message};
pub use pool::{
    ConnectionFactory, ConnectionPool, ConnectionSettings, PoolError, PooledSession, SessionScope,
};
pub use transaction::{Transaction, TransactionError, TransactionScope};
pub use types::{TypeHierarchy, TypeKey};

#[cfg(feature = "in-memory")]
pub use pool::InMemoryBroker;
