//! Message packaging: envelopes and their MIME part trees.

use crate::channel::unify_channel;
use crate::context::UnificationContext;
use crate::error::{Result, UnifyError};
use crate::key::{Category, Direction, UnificationKey};
use crate::primitives::merge_attributes;
use cppa_document::Element;
use tracing::{debug, info};

/// Supported package envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
    SoapWithAttachments,
    SimpleSoap,
    Mime,
}

impl PackageKind {
    pub const ALL: [PackageKind; 3] = [
        PackageKind::SoapWithAttachments,
        PackageKind::SimpleSoap,
        PackageKind::Mime,
    ];

    pub fn local_name(self) -> &'static str {
        match self {
            PackageKind::SoapWithAttachments => "SOAPWithAttachmentsEnvelope",
            PackageKind::SimpleSoap => "SimpleSOAPEnvelope",
            PackageKind::Mime => "MIMEEnvelope",
        }
    }

    pub fn from_element(element: &Element) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| element.is_cppa(kind.local_name()))
    }
}

/// Parts that may appear in an envelope or a composite part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MimePartKind {
    CompressedSimple,
    MultipartRelated,
    External,
    Simple,
}

impl MimePartKind {
    pub const ALL: [MimePartKind; 4] = [
        MimePartKind::CompressedSimple,
        MimePartKind::MultipartRelated,
        MimePartKind::External,
        MimePartKind::Simple,
    ];

    pub fn local_name(self) -> &'static str {
        match self {
            MimePartKind::CompressedSimple => "CompressedSimpleMIMEPart",
            MimePartKind::MultipartRelated => "MIMEMultipartRelated",
            MimePartKind::External => "ExternalPayload",
            MimePartKind::Simple => "SimpleMIMEPart",
        }
    }

    pub fn from_element(element: &Element) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| element.is_cppa(kind.local_name()))
    }
}

/// Unify package `a_id` of A with package `b_id` of B. The unified package
/// carries no `id`; it receives its identifier when the agreement is
/// assembled.
pub fn unify_package<'p>(
    ctx: &mut UnificationContext<'p>,
    a_id: &str,
    b_id: &str,
    direction: Option<Direction>,
) -> Result<UnificationKey> {
    let key = ctx.key(Some(a_id), Some(b_id));
    ctx.memoize(Category::Package, &key, |ctx| {
        compute_package(ctx, &key, a_id, b_id, direction)
            .map(Some)
            .map_err(|e| e.context(format!("package {a_id} {b_id}")))
    })?;
    Ok(key)
}

fn compute_package<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a_id: &str,
    b_id: &str,
    direction: Option<Direction>,
) -> Result<Element> {
    let a = ctx.a_lookup("package", a_id)?;
    let b = ctx.b_lookup("package", b_id)?;
    if a.name() != b.name() {
        return Err(UnifyError::TypeMismatch {
            category: Category::Package,
            a: a.name().to_string(),
            b: b.name().to_string(),
        });
    }
    let kind = PackageKind::from_element(a).ok_or_else(|| UnifyError::UnsupportedType {
        category: Category::Package,
        tag: a.name().to_string(),
    })?;
    info!(kind = kind.local_name(), a = a_id, b = b_id, "Unifying package");

    let mut out = Element::new(a.name().clone());
    mime_part_list(ctx, key, a, b, &mut out, direction)
        .map_err(|e| e.context(format!("mismatch in package {}", kind.local_name())))?;
    Ok(out)
}

/// Parts other than `Description` pair up by position and must have the
/// same type.
fn mime_part_list<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    let parts = |e: &'p Element| -> Vec<&'p Element> {
        e.children().filter(|c| !c.is_cppa("Description")).collect()
    };
    let (a_parts, b_parts) = (parts(a), parts(b));
    if a_parts.len() != b_parts.len() {
        return Err(UnifyError::CountMismatch {
            element: "MIME part".to_string(),
            a: a_parts.len(),
            b: b_parts.len(),
        });
    }
    for (a_part, b_part) in a_parts.into_iter().zip(b_parts) {
        if a_part.name() != b_part.name() {
            return Err(UnifyError::TypeMismatch {
                category: Category::Package,
                a: a_part.name().to_string(),
                b: b_part.name().to_string(),
            });
        }
        let kind = MimePartKind::from_element(a_part).ok_or_else(|| UnifyError::UnsupportedType {
            category: Category::Package,
            tag: a_part.name().to_string(),
        })?;
        let merged = mime_part(ctx, key, kind, a_part, b_part, direction)?;
        debug!(part = kind.local_name(), "Added MIME part");
        out.push(merged);
    }
    Ok(())
}

fn mime_part<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    kind: MimePartKind,
    a: &'p Element,
    b: &'p Element,
    direction: Option<Direction>,
) -> Result<Element> {
    let mut out = Element::new(a.name().clone());
    match kind {
        MimePartKind::CompressedSimple | MimePartKind::MultipartRelated => {
            merge_attributes(a, b, &mut out, true)?;
            mime_part_list(ctx, key, a, b, &mut out, direction)?;
        }
        MimePartKind::Simple => {
            out.set_attr("PartName", part_name(a, b)?);
        }
        MimePartKind::External => {
            out.set_attr("PartName", part_name(a, b)?);
            let a_channel = a.cppa_child_text("ChannelId").map(str::trim);
            let b_channel = b.cppa_child_text("ChannelId").map(str::trim);
            if a_channel.is_none() || b_channel.is_none() {
                return Err(UnifyError::missing("ChannelId"));
            }
            let target = unify_channel(ctx, a_channel, b_channel, direction)?;
            ctx.record(key, Category::Channel, &target);
            out.push(Element::cppa("ChannelId").with_text(ctx.id(&target)?));
        }
    }
    Ok(out)
}

fn part_name<'a>(a: &'a Element, b: &Element) -> Result<&'a str> {
    match (a.attr("PartName"), b.attr("PartName")) {
        (Some(x), Some(y)) if x == y => Ok(x),
        (x, y) => Err(UnifyError::AttributeMismatch {
            element: a.name().local.clone(),
            attribute: "PartName".to_string(),
            a: x.map(str::to_string),
            b: y.map(str::to_string),
        }),
    }
}
