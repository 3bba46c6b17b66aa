use crate::fixtures::*;
use cppa_unify::{unify, ErrorKind, UnifyError};

#[test]
fn profile_deny_list_blocks_the_agreement() {
    init_tracing();
    let b = seller()
        .attr("denied", "blocked")
        .component(party_list("blocked", &["buyer-1"]))
        .build();
    let err = unify(&buyer().build(), &b, &request()).unwrap_err();
    assert!(matches!(err, UnifyError::PartyDenied { ref party, .. } if party.starts_with("buyer-1")));
    assert_eq!(err.kind(), ErrorKind::AccessControl);
}

#[test]
fn profile_allow_list() {
    let allowing = |parties: &[&str]| {
        seller()
            .attr("allowed", "partners")
            .component(party_list("partners", parties))
            .build()
    };
    assert!(unify(&buyer().build(), &allowing(&["buyer-1", "buyer-2"]), &request()).is_ok());

    let err = unify(&buyer().build(), &allowing(&["buyer-2"]), &request()).unwrap_err();
    assert!(matches!(err, UnifyError::PartyNotAllowed { .. }));
}

#[test]
fn denied_optional_action_is_dropped() {
    let a = buyer()
        .action(
            action("buy_cancel", "Cancel", "send", &["buy_out"])
                .with_attr("use", "optional")
                .with_attr("denied", "no_sellers"),
        )
        .component(party_list("no_sellers", &["seller-1"]))
        .build();
    let b = seller()
        .action(action("sell_cancel", "Cancel", "receive", &["sell_in"]).with_attr("use", "optional"))
        .build();
    let agreement = unify(&a, &b, &request()).unwrap();
    assert_eq!(actions(&agreement), vec!["Order", "Confirmation"]);
    assert_closed(&agreement);
}

#[test]
fn denied_required_action_fails_the_binding() {
    let a = buyer()
        .action(
            action("buy_cancel", "Cancel", "send", &["buy_out"])
                .with_attr("use", "required")
                .with_attr("denied", "no_sellers"),
        )
        .component(party_list("no_sellers", &["seller-1"]))
        .build();
    let b = seller()
        .action(action("sell_cancel", "Cancel", "receive", &["sell_in"]))
        .build();
    let err = unify(&a, &b, &request()).unwrap_err();
    assert!(matches!(err, UnifyError::NoServiceSpecifications { .. }));
}

#[test]
fn party_id_list_entries_are_checked() {
    // A list entry in the seller's profile names a party the buyer denies.
    let a = buyer()
        .attr("denied", "blocked")
        .component(party_list("blocked", &["intruder"]))
        .build();
    let b = seller().component(party_list("friends", &["intruder"])).build();
    let err = unify(&a, &b, &request()).unwrap_err();
    assert!(matches!(err, UnifyError::PartyDenied { ref party, .. } if party.starts_with("intruder")));

    // Listing a party outside the allow list is enough to be refused.
    let a = buyer()
        .attr("allowed", "partners")
        .component(party_list("partners", &["seller-1"]))
        .build();
    let b = seller().component(party_list("friends", &["intruder"])).build();
    let err = unify(&a, &b, &request()).unwrap_err();
    assert!(matches!(err, UnifyError::PartyNotAllowed { ref party, .. } if party.starts_with("intruder")));
    assert_eq!(err.kind(), ErrorKind::AccessControl);
}
