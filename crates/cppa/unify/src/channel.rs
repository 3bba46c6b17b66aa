//! Channel unification.
//!
//! A channel pair is looked up by id in each profile, checked for a common
//! type and dispatched on [`ChannelKind`]. Results are memoised per
//! [`UnificationKey`] and the transports, packages and channels a channel
//! consumes are recorded as dependencies.

use crate::context::UnificationContext;
use crate::error::{Result, UnifyError};
use crate::key::{Category, Direction, UnificationKey};
use crate::primitives::{description_or_dash, merge_attribute, merge_simple_children, xsd_boolean, MergeRule};
use crate::reliability::{
    as4_reception_awareness, ebms2_reliable_messaging, error_handling, pull_handling,
    receipt_handling,
};
use crate::security::{
    check_encryption_trust, check_signing_trust, encryption, signature, ws_security,
};
use crate::{package, transport};
use cppa_document::{Element, QName};
use std::fmt;
use tracing::{debug, info, warn};

/// Supported channel bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Named,
    Ediint,
    Ebms2,
    WebServices,
    Ebms3,
    Transport,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 6] = [
        ChannelKind::Named,
        ChannelKind::Ediint,
        ChannelKind::Ebms2,
        ChannelKind::WebServices,
        ChannelKind::Ebms3,
        ChannelKind::Transport,
    ];

    pub fn local_name(self) -> &'static str {
        match self {
            ChannelKind::Named => "NamedChannel",
            ChannelKind::Ediint => "EDIINTChannel",
            ChannelKind::Ebms2 => "ebMS2Channel",
            ChannelKind::WebServices => "WSChannel",
            ChannelKind::Ebms3 => "ebMS3Channel",
            ChannelKind::Transport => "TransportChannel",
        }
    }

    pub fn from_element(element: &Element) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| element.is_cppa(kind.local_name()))
    }

    fn unify<'p>(
        self,
        ctx: &mut UnificationContext<'p>,
        key: &UnificationKey,
        a: &'p Element,
        b: &'p Element,
        out: &mut Element,
        direction: Option<Direction>,
    ) -> Result<()> {
        match self {
            ChannelKind::Named => named_channel(ctx, key, a, b, out, direction),
            ChannelKind::Ediint => ediint_channel(ctx, key, a, b, out, direction),
            ChannelKind::Ebms2 => ebms2_channel(ctx, key, a, b, out, direction),
            ChannelKind::WebServices => ws_channel(ctx, key, a, b, out, direction),
            ChannelKind::Ebms3 => ebms3_channel(ctx, key, a, b, out, direction),
            ChannelKind::Transport => transport_channel(ctx, key, a, b, out, direction),
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.local_name())
    }
}

/// Unify channel `a_id` of profile A with channel `b_id` of profile B and
/// return the key of the pair. The unified channel is available from the
/// channel memo table.
pub fn unify_channel<'p>(
    ctx: &mut UnificationContext<'p>,
    a_id: Option<&str>,
    b_id: Option<&str>,
    direction: Option<Direction>,
) -> Result<UnificationKey> {
    let key = ctx.key(a_id, b_id);
    ctx.memoize(Category::Channel, &key, |ctx| {
        compute_channel(ctx, &key, direction).map_err(|e| e.context(format!("channel {key}")))
    })?;
    Ok(key)
}

fn compute_channel<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    direction: Option<Direction>,
) -> Result<Option<Element>> {
    let (a_id, b_id) = match (key.a_component.as_deref(), key.b_component.as_deref()) {
        (None, None) => return Ok(None),
        (Some(a), Some(b)) => (a, b),
        (a, b) => {
            return Err(UnifyError::OneSided {
                category: Category::Channel,
                a: a.map(str::to_string),
                b: b.map(str::to_string),
            })
        }
    };
    let a = ctx.a_lookup("channel", a_id)?;
    let b = ctx.b_lookup("channel", b_id)?;
    if a.name() != b.name() {
        return Err(UnifyError::TypeMismatch {
            category: Category::Channel,
            a: a.name().to_string(),
            b: b.name().to_string(),
        });
    }
    let kind = ChannelKind::from_element(a).ok_or_else(|| UnifyError::UnsupportedType {
        category: Category::Channel,
        tag: a.name().to_string(),
    })?;

    info!(kind = %kind, a = a_id, b = b_id, direction = ?direction, "Unifying channel");
    let mut out = Element::new(a.name().clone());
    out.set_attr("id", ctx.id(key)?);
    kind.unify(ctx, key, a, b, &mut out, direction)
        .map_err(|e| e.context(format!("mismatch in {kind}")))?;
    Ok(Some(out))
}

/// Handler for elements whose text is a channel id: the referenced
/// channels are unified (without a direction) and the text replaced by the
/// identifier of the pair.
pub fn channel_reference<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    _direction: Option<Direction>,
) -> Result<()> {
    let target = unify_channel(ctx, a.text().map(str::trim), b.text().map(str::trim), None)?;
    out.set_text(Some(ctx.id(&target)?));
    ctx.record(key, Category::Channel, &target);
    debug!(element = %a.name().local, target = %target, "Channel reference unified");
    Ok(())
}

// ── Shared channel behaviour ────────────────────────────────────────

fn description(ctx: &UnificationContext<'_>, a: &Element, b: &Element, out: &mut Element) {
    let text = format!(
        "Channel formed from {} ({}) in {} and {} ({}) in {}",
        a.attr("id").unwrap_or_default(),
        description_or_dash(a),
        ctx.acpp_id,
        b.attr("id").unwrap_or_default(),
        description_or_dash(b),
        ctx.bcpp_id,
    );
    out.push(
        Element::cppa("Description")
            .with_qattr(QName::xml("lang"), "en")
            .with_text(text),
    );
}

/// The smaller of the two limits. A side without a limit accepts any size.
fn max_size(a: &Element, b: &Element, out: &mut Element) {
    let limit = |e: &Element| {
        let text = e.cppa_child_text("MaxSize")?;
        match text.trim().parse::<u64>() {
            Ok(0) => None,
            Ok(value) => Some(value),
            Err(_) => {
                warn!(channel = e.attr("id").unwrap_or_default(), value = text, "Ignoring invalid MaxSize");
                None
            }
        }
    };
    let merged = match (limit(a), limit(b)) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, y) => x.or(y),
    };
    if let Some(value) = merged {
        out.push(Element::cppa("MaxSize").with_text(value.to_string()));
    }
}

/// `asResponse` holds when either side asks for it, unless the other side
/// explicitly refuses.
fn as_response(a: &Element, b: &Element, out: &mut Element) -> Result<()> {
    match (xsd_boolean(a.attr("asResponse")), xsd_boolean(b.attr("asResponse"))) {
        (Some(true), Some(false)) | (Some(false), Some(true)) => Err(UnifyError::AsResponseConflict {
            a_channel: a.attr("id").unwrap_or_default().to_string(),
            b_channel: b.attr("id").unwrap_or_default().to_string(),
        }),
        (Some(true), _) | (_, Some(true)) => {
            out.set_attr("asResponse", "true");
            Ok(())
        }
        _ => Ok(()),
    }
}

/// `mpc` and `submpcext` must agree. A value set on one side only is
/// accepted when that side answers pull requests for the current direction.
fn mpc(a: &Element, b: &Element, out: &mut Element, direction: Option<Direction>) -> Result<()> {
    let a_id = a.attr("id").unwrap_or_default();
    let b_id = b.attr("id").unwrap_or_default();
    let a_responds =
        direction == Some(Direction::Send) && xsd_boolean(a.attr("asResponse")) != Some(false);
    let b_responds =
        direction == Some(Direction::Receive) && xsd_boolean(b.attr("asResponse")) != Some(false);

    for attribute in ["mpc", "submpcext"] {
        match (a.attr(attribute), b.attr(attribute)) {
            (None, None) => {}
            (Some(x), Some(y)) if x == y => out.set_attr(attribute, x),
            (Some(x), Some(y)) => {
                return Err(UnifyError::MpcConflict {
                    attribute: attribute.to_string(),
                    a_channel: a_id.to_string(),
                    a: x.to_string(),
                    b_channel: b_id.to_string(),
                    b: y.to_string(),
                })
            }
            (Some(x), None) if a_responds => out.set_attr(attribute, x),
            (None, Some(y)) if b_responds => out.set_attr(attribute, y),
            _ => {
                return Err(UnifyError::MpcNotPullResponder {
                    attribute: attribute.to_string(),
                    a_channel: a_id.to_string(),
                    b_channel: b_id.to_string(),
                })
            }
        }
    }
    Ok(())
}

/// Both channels name a transport, or neither does.
fn transport_elements<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    match (a.attr("transport"), b.attr("transport")) {
        (None, None) => Ok(()),
        (Some(a_transport), Some(b_transport)) => {
            let target = transport::unify_transport(ctx, a_transport, b_transport, direction)?;
            out.set_attr("transport", ctx.id(&target)?);
            ctx.record(key, Category::Transport, &target);
            Ok(())
        }
        _ => Err(UnifyError::TransportPresence {
            a_channel: a.attr("id").unwrap_or_default().to_string(),
            b_channel: b.attr("id").unwrap_or_default().to_string(),
        }),
    }
}

/// Packaging is unified when both channels name a package.
fn package_elements<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    match (a.attr("package"), b.attr("package")) {
        (Some(a_package), Some(b_package)) => {
            let target = package::unify_package(ctx, a_package, b_package, direction)?;
            out.set_attr("package", ctx.id(&target)?);
            ctx.record(key, Category::Package, &target);
        }
        (None, None) => {}
        (a_package, b_package) => {
            debug!(a = ?a_package, b = ?b_package, "Package declared on one side only, ignored");
        }
    }
    Ok(())
}

// ── Channel kinds ───────────────────────────────────────────────────

fn named_channel<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    description(ctx, a, b, out);
    max_size(a, b, out);
    merge_simple_children(a, b, out, "ChannelName", MergeRule::REQUIRED)?;
    merge_simple_children(a, b, out, "SigningCertificateRef", MergeRule::optional().lenient())?;
    merge_simple_children(a, b, out, "EncryptionCertificateRef", MergeRule::optional().lenient())?;
    check_signing_trust(ctx, a, b, direction)?;
    check_encryption_trust(ctx, a, b, direction)?;
    transport_elements(ctx, key, a, b, out, direction)
}

fn ediint_channel<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    description(ctx, a, b, out);
    max_size(a, b, out);
    ctx.merge_complex_children(key, a, b, out, "Signature", direction, signature)?;
    ctx.merge_complex_children(key, a, b, out, "Encryption", direction, encryption)?;
    transport_elements(ctx, key, a, b, out, direction)
}

fn ebms2_channel<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    as_response(a, b, out)?;
    description(ctx, a, b, out);
    max_size(a, b, out);
    transport_elements(ctx, key, a, b, out, direction)?;
    package_elements(ctx, key, a, b, out, direction)?;
    ctx.merge_complex_children(key, a, b, out, "ErrorHandling", direction, error_handling)?;
    ctx.merge_complex_children(key, a, b, out, "ReceiptHandling", direction, receipt_handling)?;
    ctx.merge_complex_children(
        key,
        a,
        b,
        out,
        "ebMS2ReliableMessaging",
        direction,
        ebms2_reliable_messaging,
    )?;
    ctx.merge_complex_children(
        key,
        a,
        b,
        out,
        "ebMS2SecurityBinding",
        direction,
        ebms2_security_binding,
    )
}

fn ebms2_security_binding<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    ctx.merge_complex_children(key, a, b, out, "Signature", direction, signature)?;
    ctx.merge_complex_children(key, a, b, out, "Encryption", direction, encryption)
}

fn ws_channel<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    description(ctx, a, b, out);
    max_size(a, b, out);
    merge_simple_children(a, b, out, "SOAPVersion", MergeRule::optional())?;
    ctx.merge_complex_children(key, a, b, out, "WSSecurityBinding", direction, ws_security)
}

fn transport_channel<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    transport_elements(ctx, key, a, b, out, direction)?;
    description(ctx, a, b, out);
    max_size(a, b, out);
    ctx.merge_complex_children(key, a, b, out, "RequestChannelID", direction, channel_reference)
}

fn ebms3_channel<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    merge_attribute(a, b, out, "actorOrRole")?;
    as_response(a, b, out)?;
    description(ctx, a, b, out);
    max_size(a, b, out);
    merge_simple_children(a, b, out, "ChannelProfile", MergeRule::optional())?;
    mpc(a, b, out, direction)?;
    merge_simple_children(a, b, out, "SOAPVersion", MergeRule::optional())?;

    ctx.merge_complex_children(key, a, b, out, "Addressing", direction, ws_addressing)?;
    ctx.merge_complex_children(key, a, b, out, "WSSecurityBinding", direction, ws_security)?;
    ctx.merge_complex_children(
        key,
        a,
        b,
        out,
        "AS4ReceptionAwareness",
        direction,
        as4_reception_awareness,
    )?;
    ctx.merge_complex_children(key, a, b, out, "ErrorHandling", direction, error_handling)?;
    ctx.merge_complex_children(key, a, b, out, "ReceiptHandling", direction, receipt_handling)?;
    ctx.merge_complex_children(key, a, b, out, "PullChannelId", direction, channel_reference)?;
    ctx.merge_complex_children(key, a, b, out, "PullHandling", direction, pull_handling)?;
    ctx.merge_complex_children(key, a, b, out, "AlternateChannel", direction, channel_reference)?;

    transport_elements(ctx, key, a, b, out, direction)?;
    package_elements(ctx, key, a, b, out, direction)
}

/// WS-Addressing for multi-hop routing.
fn ws_addressing<'p>(
    _ctx: &mut UnificationContext<'p>,
    _key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    _direction: Option<Direction>,
) -> Result<()> {
    merge_simple_children(a, b, out, "Endpoint", MergeRule::optional())?;
    merge_simple_children(a, b, out, "Action", MergeRule::REQUIRED)?;
    merge_simple_children(a, b, out, "ebMSInferredPullRequestRoutingInput", MergeRule::optional())?;
    merge_simple_children(a, b, out, "ebMSInferredReverseRoutingInput", MergeRule::optional())
}
