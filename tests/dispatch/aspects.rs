use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mta_rust::{Aspect, DefaultAspects, HandlerError, Invocation, LoggingAspect, MessageDispatcher};

use crate::support::*;

/// Records entry and exit around the rest of the chain.
struct Tracer {
    name: &'static str,
    journal: Journal,
}

impl Aspect for Tracer {
    fn around(&self, invocation: &mut Invocation<'_>) -> Result<(), HandlerError> {
        self.journal.push(format!("{}:before", self.name));
        let result = invocation.proceed();
        self.journal.push(format!("{}:after", self.name));
        result
    }
}

/// Never proceeds.
struct Gate {
    journal: Journal,
}

impl Aspect for Gate {
    fn around(&self, _invocation: &mut Invocation<'_>) -> Result<(), HandlerError> {
        self.journal.push("gate");
        Ok(())
    }
}

fn tracer(name: &'static str, journal: &Journal) -> Tracer {
    Tracer {
        name,
        journal: journal.clone(),
    }
}

#[test]
fn empty_queue_invokes_each_handler_once() {
    let journal = Journal::default();
    let dispatcher = MessageDispatcher::new(order_registry(&journal));

    dispatcher
        .dispatch_one(&OrderShipped::new("o-1", "ups"))
        .unwrap();

    assert_eq!(
        journal.entries(),
        vec!["audit:o-1", "shipping:o-1:ups", "ledger-order:o-1"]
    );
}

#[test]
fn aspects_wrap_the_handler_in_queue_order() {
    let journal = Journal::default();
    let dispatcher = MessageDispatcher::new(order_registry(&journal)).with_aspects(
        DefaultAspects::new()
            .with(tracer("outer", &journal))
            .with(tracer("inner", &journal)),
    );

    dispatcher
        .dispatch_one(&PaymentReceived { amount: 12 })
        .unwrap();

    assert_eq!(
        journal.entries(),
        vec![
            "outer:before",
            "inner:before",
            "ledger:12",
            "inner:after",
            "outer:after",
        ]
    );
}

#[test]
fn aspect_that_does_not_proceed_short_circuits() {
    let journal = Journal::default();
    let dispatcher = MessageDispatcher::new(order_registry(&journal)).with_aspects(
        DefaultAspects::new()
            .with(Gate {
                journal: journal.clone(),
            })
            .with(tracer("never", &journal)),
    );

    dispatcher
        .dispatch_one(&PaymentReceived { amount: 5 })
        .unwrap();

    assert_eq!(journal.entries(), vec!["gate"]);
}

#[test]
fn every_invocation_gets_a_full_queue() {
    let journal = Journal::default();
    let dispatcher = MessageDispatcher::new(order_registry(&journal))
        .with_aspects(DefaultAspects::new().with(tracer("t", &journal)));

    dispatcher.dispatch_one(&OrderEvent::new("o-2")).unwrap();

    assert_eq!(
        journal.entries(),
        vec![
            "t:before",
            "audit:o-2",
            "t:after",
            "t:before",
            "shipping-generic:o-2",
            "t:after",
            "t:before",
            "ledger-order:o-2",
            "t:after",
        ]
    );
}

#[test]
fn factory_aspects_are_created_once_per_message() {
    let journal = Journal::default();
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);
    let factory_journal = journal.clone();
    let dispatcher = MessageDispatcher::new(order_registry(&journal)).with_aspects(
        DefaultAspects::new().with_factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            tracer("fresh", &factory_journal)
        }),
    );

    // Three handlers for OrderEvent, one for PaymentReceived.
    dispatcher.dispatch_one(&OrderEvent::new("o-3")).unwrap();
    dispatcher
        .dispatch_one(&PaymentReceived { amount: 1 })
        .unwrap();

    assert_eq!(created.load(Ordering::SeqCst), 2);
}

#[test]
fn proceeding_twice_is_rejected() {
    let journal = Journal::default();
    let second = Arc::new(std::sync::Mutex::new(None));
    let slot = Arc::clone(&second);
    let dispatcher = MessageDispatcher::new(order_registry(&journal)).with_aspects(
        DefaultAspects::new().with(
            move |invocation: &mut Invocation<'_>| -> Result<(), HandlerError> {
                invocation.proceed()?;
                let again = invocation.proceed();
                *slot.lock().unwrap() = Some(again.map_err(|e| e.to_string()));
                Ok(())
            },
        ),
    );

    dispatcher
        .dispatch_one(&PaymentReceived { amount: 7 })
        .unwrap();

    assert_eq!(journal.entries(), vec!["ledger:7"]);
    let outcome = second.lock().unwrap().take().unwrap();
    assert!(outcome.unwrap_err().contains("already invoked"));
}

#[test]
fn proceeding_after_a_short_circuit_is_rejected() {
    let journal = Journal::default();
    let second = Arc::new(std::sync::Mutex::new(None));
    let slot = Arc::clone(&second);
    let retry = move |invocation: &mut Invocation<'_>| -> Result<(), HandlerError> {
        invocation.proceed()?;
        let again = invocation.proceed();
        *slot.lock().unwrap() = Some(again.map_err(|e| e.to_string()));
        Ok(())
    };
    let dispatcher = MessageDispatcher::new(order_registry(&journal)).with_aspects(
        DefaultAspects::new().with(retry).with(Gate {
            journal: journal.clone(),
        }),
    );

    dispatcher
        .dispatch_one(&PaymentReceived { amount: 7 })
        .unwrap();

    assert_eq!(journal.entries(), vec!["gate"]);
    let outcome = second.lock().unwrap().take().unwrap();
    assert!(outcome.unwrap_err().contains("short-circuited"));
}

#[test]
fn aspect_sees_the_resolved_pairing() {
    let journal = Journal::default();
    let seen = Journal::default();
    let sink = seen.clone();
    let dispatcher = MessageDispatcher::new(order_registry(&journal)).with_aspects(
        DefaultAspects::new().with(
            move |invocation: &mut Invocation<'_>| -> Result<(), HandlerError> {
                sink.push(format!(
                    "{} <- {} ({})",
                    invocation.handler_type().short_name(),
                    invocation.message_type().short_name(),
                    invocation.message().correlation_id().unwrap_or("-"),
                ));
                if let Some(express) = invocation.handler_as::<ExpressDesk>() {
                    express.journal.push("peeked");
                }
                invocation.proceed()
            },
        ),
    );

    dispatcher.dispatch_one(&ExpressShipped::new("o-4")).unwrap();

    assert_eq!(
        seen.entries(),
        vec![
            "AuditLog <- OrderEvent (-)",
            "ShippingNotifier <- OrderShipped (-)",
            "ExpressDesk <- ExpressShipped (-)",
            "Ledger <- OrderEvent (-)",
        ]
    );
    assert!(journal.entries().contains(&"peeked".to_string()));
}

#[test]
fn aspect_error_stops_dispatch() {
    let journal = Journal::default();
    let dispatcher = MessageDispatcher::new(order_registry(&journal)).with_aspects(
        DefaultAspects::new().with(|_: &mut Invocation<'_>| -> Result<(), HandlerError> {
            Err(HandlerError::Rejected("maintenance".into()))
        }),
    );

    let result = dispatcher.dispatch_one(&OrderEvent::new("o-5"));

    assert!(matches!(result, Err(HandlerError::Rejected(ref m)) if m == "maintenance"));
    assert!(journal.entries().is_empty());
}

#[test]
fn logging_aspect_is_transparent() {
    let journal = Journal::default();
    let dispatcher = MessageDispatcher::new(order_registry(&journal))
        .with_aspects(DefaultAspects::new().with(LoggingAspect));

    dispatcher
        .dispatch_one(&OrderShipped::new("o-6", "dhl"))
        .unwrap();

    assert_eq!(
        journal.entries(),
        vec!["audit:o-6", "shipping:o-6:dhl", "ledger-order:o-6"]
    );
}
