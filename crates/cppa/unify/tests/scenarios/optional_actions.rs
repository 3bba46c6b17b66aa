use crate::fixtures::*;
use cppa_document::Element;
use cppa_unify::{unify, BindingMatchMode, Unifier, UnifierConfig, UnifyError};

fn any_mode() -> Unifier {
    Unifier::new(UnifierConfig {
        binding_match_mode: BindingMatchMode::Any,
        ..UnifierConfig::default()
    })
}

#[test]
fn optional_action_without_counterpart_is_dropped() {
    init_tracing();
    let a = buyer()
        .action(action("buy_cancel", "Cancel", "send", &["buy_cancel_out"]).with_attr("use", "optional"))
        .component(ebms3_channel("buy_cancel_out", None))
        .build();
    let agreement = unify(&a, &seller().build(), &request()).unwrap();
    assert_eq!(actions(&agreement), vec!["Order", "Confirmation"]);
    assert_eq!(channels(&agreement).len(), 2);
    assert_closed(&agreement);
}

#[test]
fn uncovered_counterparty_action() {
    let invoice = || action("sell_invoice", "Invoice", "send", &["sell_out"]);
    let a = buyer().build();

    let required = seller().action(invoice()).build();
    let err = unify(&a, &required, &request()).unwrap_err();
    assert!(matches!(err, UnifyError::NoServiceSpecifications { .. }));

    let agreement = any_mode().unify(&a, &required, &request()).unwrap();
    assert_eq!(actions(&agreement), vec!["Order", "Confirmation"]);

    let optional = seller().action(invoice().with_attr("use", "optional")).build();
    assert!(unify(&a, &optional, &request()).is_ok());
}

#[test]
fn failed_action_leaves_no_components_behind() {
    let property = |name: &str| {
        Element::cppa("Property")
            .with_attr("name", name)
            .with_attr("minOccurs", "1")
            .with_attr("maxOccurs", "1")
    };
    let a = buyer()
        .action(
            action("buy_cancel", "Cancel", "send", &["buy_cancel_out"])
                .with_child(property("OrderRef"))
                .with_child(property("Reason")),
        )
        .component(ebms3_channel("buy_cancel_out", Some("buy_cancel_http")))
        .component(http_transport("buy_cancel_http", None))
        .build();
    let b = seller()
        .action(
            action("sell_cancel", "Cancel", "receive", &["sell_cancel_in"]).with_child(property("OrderRef")),
        )
        .component(ebms3_channel("sell_cancel_in", None).with_attr("transport", "sell_http"))
        .build();

    let err = unify(&a, &b, &request()).unwrap_err();
    assert!(matches!(err, UnifyError::NoServiceSpecifications { .. }));

    // The cancel channel and its transport unify before the property check
    // rejects the action.
    let agreement = any_mode().unify(&a, &b, &request()).unwrap();
    assert_eq!(actions(&agreement), vec!["Order", "Confirmation"]);
    assert_eq!(channels(&agreement).len(), 2);
    assert!(channels(&agreement)
        .iter()
        .filter_map(|c| c.cppa_child_text("Description"))
        .all(|d| !d.contains("buy_cancel_out")));
    assert_eq!(transports(&agreement).len(), 1);
    assert_closed(&agreement);
}

#[test]
fn no_matching_actions_at_all() {
    let a = ProfileBuilder::new("cpp_buyer", "buyer-1", "Buyer", "Seller")
        .action(action("buy_quote", "Quote", "send", &["buy_out"]).with_attr("use", "optional"))
        .component(ebms3_channel("buy_out", None))
        .build();
    let err = any_mode().unify(&a, &seller().build(), &request()).unwrap_err();
    assert!(matches!(err, UnifyError::NoServiceSpecifications { .. }));
}
