use std::collections::HashSet;

use mta_rust::{Handler, HandlerDiscoverer, StaticRegistry, TypeKey};

use crate::support::*;

fn pairs(descriptors: &[mta_rust::HandlerDescriptor<'_>]) -> Vec<(TypeKey, TypeKey)> {
    descriptors
        .iter()
        .map(|d| (d.handler_type(), d.message_type()))
        .collect()
}

#[test]
fn exact_type_matches_in_registry_order() {
    let journal = Journal::default();
    let registry = order_registry(&journal);
    let discoverer = HandlerDiscoverer::new(&registry);

    let found = discoverer.handlers_for(TypeKey::of::<OrderEvent>());

    assert_eq!(
        pairs(&found),
        vec![
            (TypeKey::of::<AuditLog>(), TypeKey::of::<OrderEvent>()),
            (TypeKey::of::<ShippingNotifier>(), TypeKey::of::<OrderEvent>()),
            (TypeKey::of::<Ledger>(), TypeKey::of::<OrderEvent>()),
        ]
    );
}

#[test]
fn subtype_selects_most_specific_consumed_type() {
    let journal = Journal::default();
    let registry = order_registry(&journal);
    let discoverer = HandlerDiscoverer::new(&registry);

    let found = discoverer.handlers_for(TypeKey::of::<ExpressShipped>());

    assert_eq!(
        pairs(&found),
        vec![
            (TypeKey::of::<AuditLog>(), TypeKey::of::<OrderEvent>()),
            (TypeKey::of::<ShippingNotifier>(), TypeKey::of::<OrderShipped>()),
            (TypeKey::of::<ExpressDesk>(), TypeKey::of::<ExpressShipped>()),
            (TypeKey::of::<Ledger>(), TypeKey::of::<OrderEvent>()),
        ]
    );
}

#[test]
fn selected_types_are_ancestors_of_the_message() {
    let journal = Journal::default();
    let registry = order_registry(&journal);
    let hierarchy = hierarchy();
    let discoverer = HandlerDiscoverer::new(&registry);

    for message_type in [
        TypeKey::of::<OrderEvent>(),
        TypeKey::of::<OrderShipped>(),
        TypeKey::of::<ExpressShipped>(),
        TypeKey::of::<PaymentReceived>(),
        TypeKey::of::<Refund>(),
    ] {
        let found = discoverer.handlers_for(message_type);
        let mut handlers = HashSet::new();
        for descriptor in &found {
            assert!(hierarchy.is_assignable(descriptor.message_type(), message_type));
            assert!(handlers.insert(descriptor.handler_type()), "{} twice", descriptor);
        }
    }
}

#[test]
fn unrelated_ties_break_by_type_name() {
    let journal = Journal::default();
    let registry = order_registry(&journal);
    let discoverer = HandlerDiscoverer::new(&registry);

    let found = discoverer.handlers_for(TypeKey::of::<Refund>());
    let ledger = found
        .iter()
        .find(|d| d.handler_type() == TypeKey::of::<Ledger>())
        .unwrap();

    // OrderEvent and PaymentReceived are equally specific for a Refund.
    assert_eq!(ledger.message_type(), TypeKey::of::<OrderEvent>());
}

#[test]
fn selection_is_idempotent() {
    let journal = Journal::default();
    let registry = order_registry(&journal);
    let discoverer = HandlerDiscoverer::new(&registry);

    let first = pairs(&discoverer.handlers_for(TypeKey::of::<Refund>()));
    let second = pairs(&discoverer.handlers_for(TypeKey::of::<Refund>()));
    assert_eq!(first, second);
}

#[test]
fn registering_a_handler_twice_lists_it_once() {
    let journal = Journal::default();
    let registry = StaticRegistry::builder(hierarchy())
        .handler(
            Handler::singleton(ShippingNotifier {
                journal: journal.clone(),
            })
            .consumes::<OrderEvent>(),
        )
        .handler(
            Handler::singleton(ShippingNotifier {
                journal: journal.clone(),
            })
            .consumes::<OrderShipped>(),
        )
        .build();
    let discoverer = HandlerDiscoverer::new(&registry);

    let found = discoverer.handlers_for(TypeKey::of::<OrderShipped>());

    assert_eq!(
        pairs(&found),
        vec![(TypeKey::of::<ShippingNotifier>(), TypeKey::of::<OrderShipped>())]
    );
}

#[test]
fn unrouted_message_has_no_handlers() {
    let journal = Journal::default();
    let registry = order_registry(&journal);
    let discoverer = HandlerDiscoverer::new(&registry);

    assert!(discoverer.handlers_for(TypeKey::of::<Unrouted>()).is_empty());
}

#[test]
fn descriptor_describes_the_pairing() {
    let journal = Journal::default();
    let registry = order_registry(&journal);
    let discoverer = HandlerDiscoverer::new(&registry);

    let found = discoverer.handlers_for(TypeKey::of::<PaymentReceived>());
    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].to_string(),
        format!(
            "Invoke {} to handle {}",
            TypeKey::of::<Ledger>(),
            TypeKey::of::<PaymentReceived>()
        )
    );
}
