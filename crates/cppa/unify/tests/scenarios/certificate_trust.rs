use crate::fixtures::*;
use cppa_unify::{unify, UnifyError};

fn signing_seller(anchor_root: &str) -> ProfileBuilder {
    ProfileBuilder::new("cpp_seller", "seller-1", "Seller", "Buyer")
        .party(trust_anchor("sell_anchor", anchor_root))
        .action(action("sell_order", "Order", "receive", &["sell_in"]))
        .action(action("sell_confirm", "Confirmation", "send", &["sell_out"]))
        .component(signing(
            ebms3_channel("sell_in", None),
            "SigningTrustAnchorRef",
            "sell_anchor",
        ))
        .component(ebms3_channel("sell_out", None))
}

fn signing_buyer(order_channels: &[&str]) -> ProfileBuilder {
    ProfileBuilder::new("cpp_buyer", "buyer-1", "Buyer", "Seller")
        .party(certificate("buy_legacy_cert", "LEAF-L", "ROOT-LEGACY"))
        .party(certificate("buy_sign_cert", "LEAF-S", "ROOT-SHARED"))
        .action(action("buy_order", "Order", "send", order_channels))
        .action(action("buy_confirm", "Confirmation", "receive", &["buy_in"]))
        .component(signing(
            ebms3_channel("buy_legacy", None),
            "SigningCertificateRef",
            "buy_legacy_cert",
        ))
        .component(signing(
            ebms3_channel("buy_out", None),
            "SigningCertificateRef",
            "buy_sign_cert",
        ))
        .component(ebms3_channel("buy_in", None))
}

#[test]
fn trusted_signing_certificate() {
    init_tracing();
    let agreement = unify(
        &signing_buyer(&["buy_out"]).build(),
        &signing_seller("ROOT-SHARED").build(),
        &request(),
    )
    .unwrap();
    let signature = channels(&agreement)
        .into_iter()
        .find_map(|c| c.cppa_child("WSSecurityBinding"))
        .and_then(|s| s.cppa_child("Signature"))
        .unwrap();
    assert_eq!(
        signature.cppa_child("SigningCertificateRef").and_then(|r| r.attr("certId")),
        Some("buy_sign_cert")
    );
}

#[test]
fn untrusted_signing_certificate_fails() {
    let err = unify(
        &signing_buyer(&["buy_out"]).build(),
        &signing_seller("ROOT-OTHER").build(),
        &request(),
    )
    .unwrap_err();
    assert!(matches!(err, UnifyError::NoServiceSpecifications { .. }));
}

#[test]
fn untrusted_candidate_falls_through_to_trusted_one() {
    let agreement = unify(
        &signing_buyer(&["buy_legacy", "buy_out"]).build(),
        &signing_seller("ROOT-SHARED").build(),
        &request(),
    )
    .unwrap();
    let descriptions: Vec<&str> = channels(&agreement)
        .iter()
        .filter_map(|c| c.cppa_child_text("Description"))
        .collect();
    assert!(descriptions.iter().any(|d| d.starts_with("Channel formed from buy_out ")));
    assert!(descriptions.iter().all(|d| !d.contains("buy_legacy")));
    assert_closed(&agreement);
}
