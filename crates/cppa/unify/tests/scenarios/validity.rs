use crate::fixtures::*;
use chrono::{TimeZone, Utc};
use cppa_unify::{unify, ErrorKind, UnifyError};

fn dates(agreement: &cppa_document::Element) -> (Option<String>, Option<String>) {
    let info = agreement.cppa_child("AgreementInfo").unwrap();
    (
        info.cppa_child_text("ActivationDate").map(str::to_string),
        info.cppa_child_text("ExpirationDate").map(str::to_string),
    )
}

#[test]
fn phase_in_delays_activation() {
    let a = buyer().info("PhaseIn", "P7D").build();
    let b = seller().info("PhaseIn", "PT12H").build();
    let agreement = unify(&a, &b, &request()).unwrap();
    assert_eq!(dates(&agreement), (Some("2026-01-08T00:00:00Z".into()), None));
}

#[test]
fn stated_dates_bound_the_agreement() {
    let a = buyer()
        .info("ActivationDate", "2026-02-01T00:00:00Z")
        .info("ExpirationDate", "2027-06-30T00:00:00Z")
        .build();
    let b = seller().info("ExpirationDate", "2027-01-01T00:00:00Z").build();
    let agreement = unify(&a, &b, &request()).unwrap();
    assert_eq!(
        dates(&agreement),
        (
            Some("2026-02-01T00:00:00Z".into()),
            Some("2027-01-01T00:00:00Z".into())
        )
    );

    let capped = request().with_expiration(Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap());
    let agreement = unify(&a, &b, &capped).unwrap();
    assert_eq!(dates(&agreement).1.as_deref(), Some("2026-12-01T00:00:00Z"));
}

#[test]
fn expiration_before_activation() {
    init_tracing();
    let a = buyer().info("PhaseIn", "P7D").build();
    let b = seller().info("ExpirationDate", "2026-01-05T00:00:00Z").build();
    let err = unify(&a, &b, &request()).unwrap_err();
    assert!(matches!(err, UnifyError::ExpiresBeforeActivation { .. }));
    assert_eq!(err.kind(), ErrorKind::Consistency);

    let late_start = request().with_activation(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
    let b = seller().info("ExpirationDate", "2026-02-01T00:00:00Z").build();
    let err = unify(&buyer().build(), &b, &late_start).unwrap_err();
    assert!(matches!(err, UnifyError::ExpiresBeforeActivation { .. }));
}

#[test]
fn malformed_dates_are_rejected() {
    let a = buyer().info("ActivationDate", "next tuesday").build();
    let err = unify(&a, &seller().build(), &request()).unwrap_err();
    assert!(matches!(err, UnifyError::InvalidValue { ref field, .. } if field == "ActivationDate"));
}
