//! In-memory broker for testing and single-process scenarios.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{BrokerChannel, BrokerConnection, ConnectionFactory, ConnectionSettings, PoolError};
use crate::bus::{Event, PublishError};

#[derive(Default)]
struct BrokerState {
    connection_attempts: usize,
    connections_opened: usize,
    connections_closed: usize,
    channels_opened: usize,
    channels_closed: usize,
    unreachable: HashSet<String>,
    failing_channels: HashSet<String>,
    // Channels created before the current generation count as dropped.
    channel_generations: HashMap<String, u64>,
    published: Vec<(String, Event)>,
    last_settings: Option<ConnectionSettings>,
}

/// A [`ConnectionFactory`] that keeps everything in process.
///
/// Clones share state, so a test can hand one clone to the pool and inspect
/// another.
///
/// ```
/// use mta_rust::bus::{Event, Publisher};
/// use mta_rust::pool::{ConnectionPool, InMemoryBroker};
///
/// let broker = InMemoryBroker::new();
/// let pool = ConnectionPool::new(broker.clone());
/// let scope = pool.scope();
///
/// let session = scope.acquire("amqp://orders", true).unwrap();
/// session.publish(Event::with_string_payload("evt-1", "OrderPlaced", "{}")).unwrap();
/// session.release().unwrap();
///
/// assert_eq!(broker.event_types("amqp://orders"), vec!["OrderPlaced"]);
/// assert_eq!(broker.open_connections(), 0);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse connections to `address` until [`set_reachable`](Self::set_reachable).
    pub fn set_unreachable(&self, address: &str) {
        self.state().unreachable.insert(address.to_string());
    }

    pub fn set_reachable(&self, address: &str) {
        self.state().unreachable.remove(address);
    }

    /// Connections to `address` open, but refuse to create channels.
    pub fn fail_channels(&self, address: &str) {
        self.state().failing_channels.insert(address.to_string());
    }

    /// Drop every channel currently open on `address`, as a broker does when
    /// it closes a channel on its side. Channels created later are unaffected.
    pub fn drop_channels(&self, address: &str) {
        *self
            .state()
            .channel_generations
            .entry(address.to_string())
            .or_default() += 1;
    }

    pub fn connection_attempts(&self) -> usize {
        self.state().connection_attempts
    }

    pub fn connections_opened(&self) -> usize {
        self.state().connections_opened
    }

    pub fn connections_closed(&self) -> usize {
        self.state().connections_closed
    }

    pub fn channels_opened(&self) -> usize {
        self.state().channels_opened
    }

    pub fn channels_closed(&self) -> usize {
        self.state().channels_closed
    }

    pub fn open_connections(&self) -> usize {
        let state = self.state();
        state.connections_opened - state.connections_closed
    }

    /// Settings passed to the most recent connect.
    pub fn last_settings(&self) -> Option<ConnectionSettings> {
        self.state().last_settings.clone()
    }

    /// Events published to `address`, in publish order.
    pub fn published(&self, address: &str) -> Vec<Event> {
        self.state()
            .published
            .iter()
            .filter(|(to, _)| to == address)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn event_types(&self, address: &str) -> Vec<String> {
        self.published(address)
            .into_iter()
            .map(|event| event.event_type)
            .collect()
    }

    fn state(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BrokerState {
    fn channel_generation(&self, address: &str) -> u64 {
        self.channel_generations.get(address).copied().unwrap_or(0)
    }
}

impl ConnectionFactory for InMemoryBroker {
    fn connect(
        &self,
        address: &str,
        settings: &ConnectionSettings,
    ) -> Result<Box<dyn BrokerConnection>, PoolError> {
        let mut state = self.state();
        state.connection_attempts += 1;
        state.last_settings = Some(settings.clone());
        if state.unreachable.contains(address) {
            return Err(PoolError::ConnectionFailed {
                address: address.to_string(),
                reason: "broker unreachable".to_string(),
            });
        }
        state.connections_opened += 1;
        Ok(Box::new(InMemoryConnection {
            broker: self.clone(),
            address: address.to_string(),
            open: true,
        }))
    }
}

struct InMemoryConnection {
    broker: InMemoryBroker,
    address: String,
    open: bool,
}

impl BrokerConnection for InMemoryConnection {
    fn create_channel(&mut self) -> Result<Box<dyn BrokerChannel>, PoolError> {
        let mut state = self.broker.state();
        if !self.open || state.failing_channels.contains(&self.address) {
            return Err(PoolError::ChannelFailed {
                address: self.address.clone(),
                reason: "channel refused".to_string(),
            });
        }
        state.channels_opened += 1;
        Ok(Box::new(InMemoryChannel {
            broker: self.broker.clone(),
            address: self.address.clone(),
            generation: state.channel_generation(&self.address),
            open: true,
        }))
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.broker.state().connections_closed += 1;
        }
    }
}

struct InMemoryChannel {
    broker: InMemoryBroker,
    address: String,
    generation: u64,
    open: bool,
}

impl BrokerChannel for InMemoryChannel {
    fn publish(&mut self, event: Event) -> Result<(), PublishError> {
        let mut state = self.broker.state();
        if !self.open || state.channel_generation(&self.address) != self.generation {
            return Err(PublishError::ChannelClosed(self.address.clone()));
        }
        state.published.push((self.address.clone(), event));
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open && self.broker.state().channel_generation(&self.address) == self.generation
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.broker.state().channels_closed += 1;
        }
    }
}
