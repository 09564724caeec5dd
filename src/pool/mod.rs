//! Reference-counted, transaction-aware broker sessions.
//!
//! ```text
//!   ConnectionPool ──scope()──▶ SessionScope ─── cache: address ─▶ PooledSession
//!        │                         │                                  │
//!   ConnectionFactory          Transaction ◀── enlist ── SessionEnlistment
//!        │                                                            │
//!   BrokerConnection ─▶ BrokerChannel  ◀───── closed on last release ─┘
//! ```
//!
//! Every reference holder calls `release` once. A session enlisted in a
//! transaction holds one extra reference for the participant, so it stays
//! open until the transaction commits or rolls back.

mod broker;
mod enlistment;
mod error;
#[cfg(feature = "in-memory")]
mod in_memory;
#[allow(clippy::module_inception)]
mod pool;
mod scope;
mod session;
mod settings;

pub use broker::{BrokerChannel, BrokerConnection, ConnectionFactory};
pub use enlistment::SessionEnlistment;
pub use error::PoolError;
#[cfg(feature = "in-memory")]
pub use in_memory::InMemoryBroker;
pub use pool::ConnectionPool;
pub use scope::SessionScope;
pub use session::PooledSession;
pub use settings::ConnectionSettings;
