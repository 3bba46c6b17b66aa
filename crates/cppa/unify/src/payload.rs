//! Payload profiles.

use crate::context::UnificationContext;
use crate::error::{Result, UnifyError};
use crate::key::{Category, UnificationKey};
use crate::primitives::{merge_cardinality, merge_listed_attributes, merge_simple_children, MergeRule};
use crate::security::{encryption, signature};
use cppa_document::Element;
use tracing::info;

/// Unify the payload profiles named by two action bindings. Neither naming
/// one unifies trivially; one side only is a failure.
pub fn unify_payload_profile<'p>(
    ctx: &mut UnificationContext<'p>,
    a_id: Option<&str>,
    b_id: Option<&str>,
) -> Result<UnificationKey> {
    let key = ctx.key(a_id, b_id);
    ctx.memoize(Category::PayloadProfile, &key, |ctx| {
        compute_payload_profile(ctx, &key).map_err(|e| {
            e.context(format!(
                "payload profile {} {}",
                a_id.unwrap_or("None"),
                b_id.unwrap_or("None")
            ))
        })
    })?;
    Ok(key)
}

fn compute_payload_profile<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
) -> Result<Option<Element>> {
    let (a_id, b_id) = match (key.a_component.as_deref(), key.b_component.as_deref()) {
        (None, None) => return Ok(None),
        (Some(a), Some(b)) => (a, b),
        (a, b) => {
            return Err(UnifyError::OneSided {
                category: Category::PayloadProfile,
                a: a.map(str::to_string),
                b: b.map(str::to_string),
            })
        }
    };
    let a = ctx.a_lookup("payload profile", a_id)?;
    let b = ctx.b_lookup("payload profile", b_id)?;
    info!(a = a_id, b = b_id, "Unifying payload profiles");

    let mut out = Element::new(a.name().clone()).with_attr("id", ctx.id(key)?);

    let a_parts: Vec<&'p Element> = a.cppa_children("PayloadPart").collect();
    let b_parts: Vec<&'p Element> = b.cppa_children("PayloadPart").collect();
    if a_parts.len() != b_parts.len() {
        return Err(UnifyError::CountMismatch {
            element: "PayloadPart".to_string(),
            a: a_parts.len(),
            b: b_parts.len(),
        });
    }
    for (index, (a_part, b_part)) in a_parts.into_iter().zip(b_parts).enumerate() {
        let mut part = Element::new(a_part.name().clone());
        merge_cardinality(a_part, b_part, &mut part, &format!("{a_id} {b_id} {index}"))?;
        merge_listed_attributes(
            a_part,
            b_part,
            &mut part,
            &["requireSignature", "requireEncryption"],
        )?;
        merge_simple_children(a_part, b_part, &mut part, "PartName", MergeRule::REQUIRED)?;
        merge_simple_children(a_part, b_part, &mut part, "MIMEContentType", MergeRule::optional().lenient())?;
        merge_simple_children(
            a_part,
            b_part,
            &mut part,
            "Schema",
            MergeRule::optional().lenient().intersect(),
        )?;
        ctx.merge_complex_children(key, a_part, b_part, &mut part, "Signature", None, signature)?;
        ctx.merge_complex_children(key, a_part, b_part, &mut part, "Encryption", None, encryption)?;
        out.push(part);
    }
    Ok(Some(out))
}
