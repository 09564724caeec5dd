//! Broker seams: how the pool opens connections and channels.

use std::sync::Arc;

use super::{ConnectionSettings, PoolError};
use crate::bus::{Event, PublishError};

/// Opens physical broker connections.
///
/// Implementations might include a RabbitMQ/AMQP client, or the bundled
/// `InMemoryBroker` for tests and single-process setups. Opening is a
/// blocking call on the invoking thread and is not retried by the pool.
pub trait ConnectionFactory: Send + Sync {
    fn connect(
        &self,
        address: &str,
        settings: &ConnectionSettings,
    ) -> Result<Box<dyn BrokerConnection>, PoolError>;
}

impl<F: ConnectionFactory + ?Sized> ConnectionFactory for Arc<F> {
    fn connect(
        &self,
        address: &str,
        settings: &ConnectionSettings,
    ) -> Result<Box<dyn BrokerConnection>, PoolError> {
        (**self).connect(address, settings)
    }
}

/// One physical connection.
pub trait BrokerConnection: Send {
    fn create_channel(&mut self) -> Result<Box<dyn BrokerChannel>, PoolError>;

    /// Close the connection. Called once, after the channel is closed.
    fn close(&mut self);
}

/// An addressable channel on a connection.
pub trait BrokerChannel: Send {
    fn publish(&mut self, event: Event) -> Result<(), PublishError>;

    fn is_open(&self) -> bool;

    /// Close the channel. Called once, before the connection is closed.
    fn close(&mut self);
}
