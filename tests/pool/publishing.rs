use serde::{Deserialize, Serialize};

use mta_rust::{
    ConnectionPool, Consume, Event, Handler, HandlerError, InMemoryBroker, Message,
    MessageDispatcher, PooledSession, PublishError, Publisher, StaticRegistry, TypeHierarchy,
};

const NOTIFICATIONS: &str = "amqp://broker/notifications";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ShipmentNotice {
    order_id: String,
    carrier: String,
}

#[derive(Debug)]
struct OrderShipped {
    order_id: String,
}

impl Message for OrderShipped {
    fn correlation_id(&self) -> Option<&str> {
        Some(&self.order_id)
    }
}

/// Forwards every shipment to the notifications exchange.
struct Forwarder {
    session: PooledSession,
}

impl Consume<OrderShipped> for Forwarder {
    fn consume(&self, message: &OrderShipped) -> Result<(), HandlerError> {
        let notice = ShipmentNotice {
            order_id: message.order_id.clone(),
            carrier: "ups".into(),
        };
        let event = Event::encode(
            format!("notice-{}", message.order_id),
            "ShipmentNotice",
            &notice,
        )?
        .with_correlation_id(&message.order_id);
        self.session.publish(event)?;
        Ok(())
    }
}

#[test]
fn handler_publishes_through_pooled_session() {
    let broker = InMemoryBroker::new();
    let pool = ConnectionPool::new(broker.clone());
    let scope = pool.scope();
    let session = scope.acquire(NOTIFICATIONS, true).unwrap();

    let registry = StaticRegistry::builder(TypeHierarchy::flat())
        .handler(
            Handler::singleton(Forwarder {
                session: session.clone(),
            })
            .consumes::<OrderShipped>(),
        )
        .build();
    let dispatcher = MessageDispatcher::new(registry);

    let batch: Vec<Box<dyn Message>> = vec![
        Box::new(OrderShipped {
            order_id: "o-1".into(),
        }),
        Box::new(OrderShipped {
            order_id: "o-2".into(),
        }),
    ];
    dispatcher.dispatch(&batch).unwrap();
    session.release().unwrap();

    let published = broker.published(NOTIFICATIONS);
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].correlation_id(), Some("o-1"));
    let notice: ShipmentNotice = published[1].decode().unwrap();
    assert_eq!(
        notice,
        ShipmentNotice {
            order_id: "o-2".into(),
            carrier: "ups".into(),
        }
    );
}

#[test]
fn publishing_on_a_closed_session_fails_the_handler() {
    let broker = InMemoryBroker::new();
    let pool = ConnectionPool::new(broker.clone());
    let session = pool.scope().acquire(NOTIFICATIONS, false).unwrap();
    session.release().unwrap();

    let registry = StaticRegistry::builder(TypeHierarchy::flat())
        .handler(Handler::singleton(Forwarder { session }).consumes::<OrderShipped>())
        .build();
    let dispatcher = MessageDispatcher::new(registry);

    let result = dispatcher.dispatch_one(&OrderShipped {
        order_id: "o-3".into(),
    });

    assert!(matches!(
        result,
        Err(HandlerError::Publish(PublishError::ChannelClosed(_)))
    ));
    assert!(broker.published(NOTIFICATIONS).is_empty());
}

#[test]
fn batch_publish_then_release_closes_channel() {
    let broker = InMemoryBroker::new();
    let pool = ConnectionPool::new(broker.clone());
    let scope = pool.scope();
    let session = scope.acquire(NOTIFICATIONS, true).unwrap();

    session
        .publish_batch(vec![
            Event::with_string_payload("e-1", "First", "{}"),
            Event::with_string_payload("e-2", "Second", "{}"),
        ])
        .unwrap();
    session.release().unwrap();

    let result = session.publish(Event::with_string_payload("e-3", "Third", "{}"));
    assert!(result.is_err());
    assert_eq!(broker.event_types(NOTIFICATIONS), vec!["First", "Second"]);
}
