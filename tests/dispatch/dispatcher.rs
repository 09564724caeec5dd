use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use mta_rust::{
    Consume, FailureManager, HandlerError, Message, MessageDispatcher, StaticRegistry,
    TypeHierarchy,
};

use crate::support::*;

#[test]
fn batch_runs_messages_in_order() {
    let journal = Journal::default();
    let dispatcher = MessageDispatcher::new(order_registry(&journal));

    let batch: Vec<Box<dyn Message>> = vec![
        Box::new(PaymentReceived { amount: 3 }),
        Box::new(ExpressShipped::new("o-1")),
        Box::new(PaymentReceived { amount: 4 }),
    ];
    dispatcher.dispatch(&batch).unwrap();

    assert_eq!(
        journal.entries(),
        vec![
            "ledger:3",
            "audit:o-1",
            "shipping:o-1:courier",
            "express:o-1",
            "ledger-order:o-1",
            "ledger:4",
        ]
    );
}

#[test]
fn message_without_handlers_has_no_effect() {
    let journal = Journal::default();
    let dispatcher = MessageDispatcher::new(order_registry(&journal));

    let batch: Vec<Box<dyn Message>> = vec![Box::new(Unrouted), Box::new(Unrouted)];
    dispatcher.dispatch(&batch).unwrap();

    assert!(journal.entries().is_empty());
}

#[test]
fn empty_batch_is_fine() {
    let dispatcher = MessageDispatcher::new(StaticRegistry::builder(TypeHierarchy::flat()).build());
    assert!(dispatcher.dispatch(&[]).is_ok());
}

struct Refuser;

impl Consume<PaymentReceived> for Refuser {
    fn consume(&self, message: &PaymentReceived) -> Result<(), HandlerError> {
        if message.amount == 0 {
            return Err(HandlerError::Rejected("zero payment".into()));
        }
        Ok(())
    }
}

#[test]
fn handler_error_is_recorded_by_the_caller() {
    let journal = Journal::default();
    let registry = StaticRegistry::builder(hierarchy())
        .handler(mta_rust::Handler::singleton(Refuser).consumes::<PaymentReceived>())
        .handler(
            mta_rust::Handler::singleton(Ledger {
                journal: journal.clone(),
            })
            .consumes::<PaymentReceived>(),
        )
        .build();
    let dispatcher = MessageDispatcher::new(registry);
    let failures = FailureManager::new();

    let batch: Vec<Box<dyn Message>> = vec![
        Box::new(PaymentReceived { amount: 0 }),
        Box::new(PaymentReceived { amount: 9 }),
    ];
    if let Err(e) = dispatcher.dispatch(&batch) {
        failures.record_failure("queue://payments", "tm-1", &e);
    }

    assert!(journal.entries().is_empty());
    assert!(failures.is_poison("tm-1"));
    assert!(!failures.is_poison("tm-1"));
}

static PINGS: AtomicUsize = AtomicUsize::new(0);

#[derive(Default)]
struct PingCounter;

impl Consume<OrderEvent> for PingCounter {
    fn consume(&self, _: &OrderEvent) -> Result<(), HandlerError> {
        PINGS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Consume<PaymentReceived> for PingCounter {
    fn consume(&self, _: &PaymentReceived) -> Result<(), HandlerError> {
        PINGS.fetch_add(10, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn macro_registers_default_handlers() {
    let registry = mta_rust::register_handlers!(
        StaticRegistry::builder(hierarchy()),
        PingCounter => [OrderEvent, PaymentReceived],
    )
    .build();
    let dispatcher = MessageDispatcher::new(registry);

    dispatcher
        .dispatch_one(&OrderShipped::new("o-7", "ups"))
        .unwrap();
    dispatcher
        .dispatch_one(&PaymentReceived { amount: 2 })
        .unwrap();

    assert_eq!(PINGS.load(Ordering::SeqCst), 11);
}

#[test]
fn shared_registry_serves_concurrent_dispatchers() {
    let journal = Journal::default();
    let registry = Arc::new(order_registry(&journal));

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let dispatcher = MessageDispatcher::new(Arc::clone(&registry));
            thread::spawn(move || {
                dispatcher
                    .dispatch_one(&PaymentReceived { amount: i })
                    .unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let mut entries = journal.entries();
    entries.sort();
    assert_eq!(entries, vec!["ledger:0", "ledger:1", "ledger:2", "ledger:3"]);
}
