use crate::fixtures::*;
use cppa_document::Element;
use cppa_unify::{unify, AgreementIdStrategy, DefaultHandler, Unifier, UnifierConfig, UnifyError};

#[test]
fn buyer_and_seller_form_an_agreement() {
    init_tracing();
    let agreement = unify(&buyer().build(), &seller().build(), &request()).unwrap();

    assert!(agreement.is_cppa("CPA"));
    let top: Vec<&str> = agreement.children().map(|c| c.name().local.as_str()).collect();
    assert_eq!(
        top,
        vec![
            "AgreementInfo",
            "PartyInfo",
            "CounterPartyInfo",
            "ServiceSpecification",
            "ebMS3Channel",
            "ebMS3Channel",
            "HTTPTransport",
        ]
    );
    assert!(agreement.nodes().iter().all(|node| node.as_element().is_some()));

    let info = agreement.cppa_child("AgreementInfo").unwrap();
    assert_eq!(info.cppa_child_text("AgreementIdentifier"), Some("cpp_buyer_cpp_seller"));
    assert_eq!(info.cppa_child_text("ActivationDate"), Some("2026-01-01T00:00:00Z"));
    assert!(info.cppa_child("ExpirationDate").is_none());

    let party = |tag: &str| {
        agreement
            .cppa_child(tag)
            .and_then(|p| p.cppa_child_text("PartyId"))
            .map(str::to_string)
    };
    assert_eq!(party("PartyInfo").as_deref(), Some("buyer-1"));
    assert_eq!(party("CounterPartyInfo").as_deref(), Some("seller-1"));

    let bindings = action_bindings(&agreement);
    let summary: Vec<_> = bindings
        .iter()
        .map(|ab| (ab.attr("id"), ab.attr("action"), ab.attr("sendOrReceive")))
        .collect();
    assert_eq!(
        summary,
        vec![
            (Some("buy_order"), Some("Order"), Some("send")),
            (Some("buy_confirm"), Some("Confirmation"), Some("receive")),
        ]
    );

    let transport = transports(&agreement)[0];
    assert_eq!(transport.cppa_child_text("Endpoint"), Some("https://seller.example.com/as4"));
    assert_closed(&agreement);
}

#[test]
fn unused_components_stay_out() {
    let agreement = unify(&buyer().build(), &seller().build(), &request()).unwrap();
    let descriptions: Vec<&str> = channels(&agreement)
        .iter()
        .filter_map(|c| c.cppa_child_text("Description"))
        .collect();
    assert!(descriptions.iter().all(|d| !d.contains("buy_spare")));
    assert!(transports(&agreement)
        .iter()
        .all(|t| t.cppa_child_text("Endpoint") != Some("https://spare.buyer.example.com")));
}

#[test]
fn explicit_agreement_id_and_profile_locations() {
    let request = request()
        .with_agreement_id("cpa-42")
        .with_profile_urls("https://buyer.example.com/cpp.xml", "https://seller.example.com/cpp.xml");
    let agreement = unify(&buyer().build(), &seller().build(), &request).unwrap();
    let info = agreement.cppa_child("AgreementInfo").unwrap();
    assert_eq!(info.cppa_child_text("AgreementIdentifier"), Some("cpa-42"));
    let profiles: Vec<_> = info
        .cppa_children("ProfileIdentifier")
        .map(|p| (p.text(), p.attr("href")))
        .collect();
    assert_eq!(
        profiles,
        vec![
            (Some("cpp_buyer"), Some("https://buyer.example.com/cpp.xml")),
            (Some("cpp_seller"), Some("https://seller.example.com/cpp.xml")),
        ]
    );
}

#[test]
fn matching_is_symmetric() {
    let (a, b) = (buyer().build(), seller().build());
    let forward = unify(&a, &b, &request()).unwrap();
    let backward = unify(&b, &a, &request()).unwrap();

    let mut forward_actions = actions(&forward);
    let mut backward_actions = actions(&backward);
    forward_actions.sort();
    backward_actions.sort();
    assert_eq!(forward_actions, backward_actions);
    assert_eq!(channels(&forward).len(), channels(&backward).len());
    assert_eq!(transports(&forward).len(), transports(&backward).len());
}

#[test]
fn role_filter() {
    let (a, b) = (buyer().build(), seller().build());

    let request = request().with_party_role("Buyer").with_counterparty_role("Seller");
    assert!(unify(&a, &b, &request).is_ok());

    let request = crate::fixtures::request().with_party_role("Seller");
    let err = unify(&a, &b, &request).unwrap_err();
    assert!(matches!(err, UnifyError::NoServiceSpecifications { .. }));

    let stranger = ProfileBuilder::new("cpp_shipper", "shipper-1", "Seller", "Customer")
        .action(action("ship", "Order", "receive", &["ship_in"]))
        .component(ebms3_channel("ship_in", None))
        .build();
    let exact = crate::fixtures::request()
        .with_party_role("Buyer")
        .with_counterparty_role("Seller");
    let err = unify(&a, &stranger, &exact).unwrap_err();
    assert!(matches!(err, UnifyError::ServiceSpecificationNotFound { .. }));
}

struct DefaultChannelProfile;

impl DefaultHandler for DefaultChannelProfile {
    fn apply(&self, mut profile: Element) -> cppa_unify::Result<Element> {
        for channel in profile.children_mut().filter(|c| c.is_cppa("ebMS3Channel")) {
            if channel.cppa_child("ChannelProfile").is_none() {
                channel.push(Element::cppa("ChannelProfile").with_text("http://www.oasis-open.org/as4"));
            }
        }
        Ok(profile)
    }
}

struct Prefixed;

impl AgreementIdStrategy for Prefixed {
    fn agreement_id(&self, a_profile_id: &str, b_profile_id: &str) -> String {
        format!("cpa:{a_profile_id}:{b_profile_id}")
    }
}

#[test]
fn hooks_shape_the_agreement() {
    let unifier = Unifier::new(UnifierConfig::default())
        .with_default_handler(DefaultChannelProfile)
        .with_id_strategy(Prefixed);
    let agreement = unifier
        .unify(&buyer().build(), &seller().build(), &request())
        .unwrap();
    assert_eq!(
        agreement
            .cppa_child("AgreementInfo")
            .and_then(|i| i.cppa_child_text("AgreementIdentifier")),
        Some("cpa:cpp_buyer:cpp_seller")
    );
    assert!(channels(&agreement)
        .iter()
        .all(|c| c.cppa_child_text("ChannelProfile") == Some("http://www.oasis-open.org/as4")));
}
