//! Message and transport security: WS-Security, signature, encryption, user
//! authentication and TLS.
//!
//! All handlers share the complex sub-element signature so they can be
//! passed to [`UnificationContext::merge_complex_children`].

use crate::context::UnificationContext;
use crate::error::{Result, UnifyError};
use crate::key::{sender_first, Direction, UnificationKey};
use crate::primitives::{merge_simple_children, MergeRule};
use crate::trust::{check_certificate, TrustSide};
use cppa_document::Element;
use tracing::debug;

/// Optional, one-sided values copied, first match wins.
const FIRST_MATCH: MergeRule = MergeRule::optional().lenient();
const OPTIONAL_BOOLEAN: MergeRule = MergeRule::optional().boolean();

pub fn ws_security<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    merge_simple_children(a, b, out, "WSSVersion", MergeRule::optional())?;
    ctx.merge_complex_children(key, a, b, out, "Signature", direction, signature)?;
    ctx.merge_complex_children(key, a, b, out, "Encryption", direction, encryption)?;
    ctx.merge_complex_children(key, a, b, out, "UserAuthentication", direction, user_authentication)
}

pub fn signature<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    merge_simple_children(a, b, out, "SignatureAlgorithm", FIRST_MATCH)?;
    merge_simple_children(a, b, out, "DigestAlgorithm", FIRST_MATCH)?;
    merge_simple_children(a, b, out, "SigningCertificateRef", FIRST_MATCH)?;
    ctx.merge_complex_children(key, a, b, out, "SignElements", direction, expressions)?;
    merge_simple_children(a, b, out, "SignAttachments", OPTIONAL_BOOLEAN)?;
    merge_simple_children(a, b, out, "SignExternalPayloads", OPTIONAL_BOOLEAN)?;

    check_signing_trust(ctx, a, b, direction)
}

pub fn encryption<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    ctx.merge_complex_children(key, a, b, out, "KeyEncryption", direction, key_encryption)?;
    ctx.merge_complex_children(key, a, b, out, "DataEncryption", direction, data_encryption)?;
    merge_simple_children(a, b, out, "EncryptionCertificateRef", FIRST_MATCH)?;

    check_encryption_trust(ctx, a, b, direction)
}

/// The sender signs; the receiver must trust the signing certificate.
/// `a` and `b` hold the `SigningCertificateRef`/`SigningTrustAnchorRef`
/// children.
pub fn check_signing_trust(
    ctx: &UnificationContext<'_>,
    a: &Element,
    b: &Element,
    direction: Option<Direction>,
) -> Result<()> {
    let (signer, verifier) = sender_first(direction, (ctx.acpp, a), (ctx.bcpp, b));
    check_certificate(
        TrustSide {
            profile: signer.0,
            holder: signer.1,
            reference: "SigningCertificateRef",
        },
        TrustSide {
            profile: verifier.0,
            holder: verifier.1,
            reference: "SigningTrustAnchorRef",
        },
    )
}

/// The sender encrypts for the receiver's certificate, which the sender
/// must trust.
pub fn check_encryption_trust(
    ctx: &UnificationContext<'_>,
    a: &Element,
    b: &Element,
    direction: Option<Direction>,
) -> Result<()> {
    let (sender, receiver) = sender_first(direction, (ctx.acpp, a), (ctx.bcpp, b));
    check_certificate(
        TrustSide {
            profile: receiver.0,
            holder: receiver.1,
            reference: "EncryptionCertificateRef",
        },
        TrustSide {
            profile: sender.0,
            holder: sender.1,
            reference: "EncryptionTrustAnchorRef",
        },
    )
}

fn key_encryption<'p>(
    _ctx: &mut UnificationContext<'p>,
    _key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    _direction: Option<Direction>,
) -> Result<()> {
    merge_simple_children(a, b, out, "EncryptionAlgorithm", FIRST_MATCH)?;
    merge_simple_children(a, b, out, "MaskGenerationFunction", FIRST_MATCH)?;
    merge_simple_children(a, b, out, "DigestAlgorithm", FIRST_MATCH)
}

fn data_encryption<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    merge_simple_children(a, b, out, "EncryptionAlgorithm", FIRST_MATCH.intersect())?;
    ctx.merge_complex_children(key, a, b, out, "EncryptElements", direction, expressions)?;
    merge_simple_children(a, b, out, "EncryptAttachments", OPTIONAL_BOOLEAN)?;
    merge_simple_children(a, b, out, "EncryptExternalPayloads", OPTIONAL_BOOLEAN)
}

/// `Expression` lists compare as sorted sets of equal size.
fn expressions<'p>(
    _ctx: &mut UnificationContext<'p>,
    _key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    _direction: Option<Direction>,
) -> Result<()> {
    let sorted = |e: &'p Element| {
        let mut list: Vec<&'p str> = e
            .cppa_children("Expression")
            .map(|x| x.text().unwrap_or_default())
            .collect();
        list.sort_unstable();
        list
    };
    let (a_list, b_list) = (sorted(a), sorted(b));
    if a_list.len() != b_list.len() {
        return Err(UnifyError::CountMismatch {
            element: "Expression".to_string(),
            a: a_list.len(),
            b: b_list.len(),
        });
    }
    for (x, y) in a_list.into_iter().zip(b_list) {
        if x != y {
            return Err(UnifyError::ValueMismatch {
                element: "Expression".to_string(),
                a: Some(x.to_string()),
                b: Some(y.to_string()),
            });
        }
        out.push(Element::cppa("Expression").with_text(x));
    }
    Ok(())
}

/// Generates credentials: the username is derived from the key of the
/// component being unified, the password is random.
pub fn user_authentication<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    _direction: Option<Direction>,
) -> Result<()> {
    out.push(Element::cppa("Username").with_text(ctx.username(key)));
    out.push(Element::cppa("Password").with_text(ctx.password()));
    debug!(key = %key, "Generated user credentials");
    merge_simple_children(a, b, out, "Digest", OPTIONAL_BOOLEAN)?;
    merge_simple_children(a, b, out, "Nonce", OPTIONAL_BOOLEAN)?;
    merge_simple_children(a, b, out, "Created", OPTIONAL_BOOLEAN)
}

/// TLS settings are merged from the sender's point of view.
pub fn transport_layer_security<'p>(
    ctx: &mut UnificationContext<'p>,
    _key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    let (client, server) = sender_first(direction, (ctx.acpp, a), (ctx.bcpp, b));
    let (c, s) = (client.1, server.1);
    merge_simple_children(c, s, out, "TLSProtocol", FIRST_MATCH)?;
    merge_simple_children(c, s, out, "CipherSuite", FIRST_MATCH.intersect())?;
    merge_simple_children(c, s, out, "ClientCertificateRef", FIRST_MATCH)?;
    merge_simple_children(c, s, out, "ServerCertificateRef", FIRST_MATCH)?;

    check_certificate(
        TrustSide {
            profile: server.0,
            holder: s,
            reference: "ServerCertificateRef",
        },
        TrustSide {
            profile: client.0,
            holder: c,
            reference: "ServerTrustAnchorRef",
        },
    )?;
    check_certificate(
        TrustSide {
            profile: client.0,
            holder: c,
            reference: "ClientCertificateRef",
        },
        TrustSide {
            profile: server.0,
            holder: s,
            reference: "ClientTrustAnchorRef",
        },
    )
}
