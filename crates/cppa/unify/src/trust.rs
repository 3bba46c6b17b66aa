//! Certificate-versus-trust-anchor validation.

use crate::error::{Result, UnifyError};
use cppa_document::{ns, Element};
use tracing::{debug, info};

/// One side of a trust check: the element holding the reference and the
/// profile the reference resolves in.
#[derive(Clone, Copy)]
pub struct TrustSide<'a> {
    pub profile: &'a Element,
    pub holder: &'a Element,
    /// Local name of the reference element, e.g. `SigningCertificateRef`.
    pub reference: &'a str,
}

/// Verify that the certificate referenced on `cert` chains to a root listed
/// in the trust anchor referenced on `anchor`.
///
/// The check only applies when each side carries exactly one reference.
pub fn check_certificate(cert: TrustSide<'_>, anchor: TrustSide<'_>) -> Result<()> {
    let cert_refs: Vec<&Element> = cert.holder.cppa_children(cert.reference).collect();
    let anchor_refs: Vec<&Element> = anchor.holder.cppa_children(anchor.reference).collect();
    let (cert_id, anchor_id) = match (cert_refs.as_slice(), anchor_refs.as_slice()) {
        ([c], [a]) => (
            c.attr("certId").unwrap_or_default(),
            a.attr("certId").unwrap_or_default(),
        ),
        _ => {
            debug!(cert = cert.reference, anchor = anchor.reference, "No certificate and anchor pair to check");
            return Ok(());
        }
    };

    let certificate = party_info_child(cert.profile, "Certificate", cert_id)?;
    let trust_anchor = party_info_child(anchor.profile, "TrustAnchor", anchor_id)?;

    let untrusted = || UnifyError::UntrustedCertificate {
        cert_id: cert_id.to_string(),
        anchor_id: anchor_id.to_string(),
    };
    let root = root_certificate(certificate).ok_or_else(untrusted)?;

    if anchor_roots(anchor.profile, trust_anchor).any(|candidate| candidate == root) {
        info!(cert_id, anchor_id, "Certificate matches trust anchor");
        Ok(())
    } else {
        Err(untrusted())
    }
}

fn party_info_child<'a>(profile: &'a Element, local: &str, id: &str) -> Result<&'a Element> {
    profile
        .cppa_children("PartyInfo")
        .flat_map(|info| info.cppa_children(local))
        .find(|c| c.attr("id") == Some(id))
        .ok_or_else(|| UnifyError::dangling(local, id))
}

/// Outermost certificate of a chain: the last `ds:X509Certificate` in
/// document order, whitespace removed.
pub fn root_certificate(certificate: &Element) -> Option<String> {
    certificate
        .descendants_or_self()
        .filter(|e| e.is(ns::DS, "X509Certificate"))
        .last()
        .map(|e| strip_whitespace(e.text().unwrap_or_default()))
}

fn first_certificate(certificate: &Element) -> Option<String> {
    certificate
        .descendants_or_self()
        .find(|e| e.is(ns::DS, "X509Certificate"))
        .map(|e| strip_whitespace(e.text().unwrap_or_default()))
}

/// Certificates a trust anchor accepts as roots: referenced ones first,
/// then embedded ones.
fn anchor_roots<'a>(profile: &'a Element, anchor: &'a Element) -> impl Iterator<Item = String> + 'a {
    let referenced = anchor
        .cppa_children("AnchorCertificateRef")
        .filter_map(|r| r.attr("certId"))
        .filter_map(move |id| {
            profile
                .descendants()
                .find(|e| e.is_cppa("Certificate") && e.attr("id") == Some(id))
        })
        .filter_map(first_certificate);
    let embedded = anchor
        .cppa_children("Certificate")
        .filter_map(first_certificate);
    referenced.chain(embedded)
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}
