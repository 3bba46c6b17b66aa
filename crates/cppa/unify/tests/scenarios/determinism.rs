use crate::fixtures::*;
use cppa_document::Element;
use cppa_unify::{Unifier, UnifierConfig};
use std::collections::HashSet;

fn with_auth(transport: Element) -> Element {
    transport.with_child(Element::cppa("UserAuthentication"))
}

fn profiles() -> (Element, Element) {
    let a = ProfileBuilder::new("cpp_buyer", "buyer-1", "Buyer", "Seller")
        .action(action("buy_order", "Order", "send", &["buy_out"]))
        .action(action("buy_cancel", "Cancel", "send", &["buy_out"]))
        .action(action("buy_confirm", "Confirmation", "receive", &["buy_in"]))
        .component(ebms3_channel("buy_out", Some("buy_http")))
        .component(ebms3_channel("buy_in", None))
        .component(with_auth(http_transport("buy_http", None)))
        .build();
    let b = ProfileBuilder::new("cpp_seller", "seller-1", "Seller", "Buyer")
        .action(action("sell_order", "Order", "receive", &["sell_in"]))
        .action(action("sell_cancel", "Cancel", "receive", &["sell_in"]))
        .action(action("sell_confirm", "Confirmation", "send", &["sell_out"]))
        .component(ebms3_channel("sell_in", Some("sell_http")))
        .component(ebms3_channel("sell_out", None))
        .component(with_auth(http_transport("sell_http", Some("https://seller.example.com/as4"))))
        .build();
    (a, b)
}

fn credentials(agreement: &Element) -> (String, String) {
    let auth = transports(agreement)[0].cppa_child("UserAuthentication").unwrap();
    (
        auth.cppa_child_text("Username").unwrap().to_string(),
        auth.cppa_child_text("Password").unwrap().to_string(),
    )
}

#[test]
fn fixed_inputs_give_identical_agreements() {
    init_tracing();
    let (a, b) = profiles();
    let first = Unifier::new(UnifierConfig::deterministic(7)).unify(&a, &b, &request()).unwrap();
    let second = Unifier::new(UnifierConfig::deterministic(7)).unify(&a, &b, &request()).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );

    let reused = Unifier::new(UnifierConfig::deterministic(7));
    let third = reused.unify(&a, &b, &request()).unwrap();
    let fourth = reused.unify(&a, &b, &request()).unwrap();
    assert_eq!(third, fourth);
    assert_eq!(first, third);
}

#[test]
fn usernames_derive_from_keys_and_passwords_from_seed() {
    let (a, b) = profiles();
    let seven = Unifier::new(UnifierConfig::deterministic(7)).unify(&a, &b, &request()).unwrap();
    let eight = Unifier::new(UnifierConfig::deterministic(8)).unify(&a, &b, &request()).unwrap();
    let (user_seven, password_seven) = credentials(&seven);
    let (user_eight, password_eight) = credentials(&eight);
    assert_eq!(user_seven, user_eight);
    assert_eq!(user_seven.len(), 15);
    assert_eq!(password_seven.len(), 20);
    assert_ne!(password_seven, password_eight);
}

#[test]
fn shared_channels_are_unified_once() {
    let (a, b) = profiles();
    let agreement = Unifier::new(UnifierConfig::deterministic(1)).unify(&a, &b, &request()).unwrap();
    let bindings = action_bindings(&agreement);
    assert_eq!(bindings.len(), 3);

    let channel_of = |action: &str| {
        bindings
            .iter()
            .find(|ab| ab.attr("action") == Some(action))
            .and_then(|ab| ab.cppa_child_text("ChannelId"))
    };
    assert_eq!(channel_of("Order"), channel_of("Cancel"));
    assert_ne!(channel_of("Order"), channel_of("Confirmation"));
    assert_eq!(channels(&agreement).len(), 2);
    assert_eq!(transports(&agreement).len(), 1);
    assert_closed(&agreement);
}

#[test]
fn emitted_identifiers_are_distinct() {
    let (a, b) = profiles();
    let agreement = Unifier::new(UnifierConfig::deterministic(1)).unify(&a, &b, &request()).unwrap();
    let ids: Vec<&str> = channels(&agreement)
        .into_iter()
        .chain(transports(&agreement))
        .filter_map(|c| c.attr("id"))
        .collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), ids.len());
    for id in ids {
        assert!(id.starts_with('_'));
        assert!(id.len() >= 5);
    }
}
