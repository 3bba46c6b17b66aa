//! Transport unification.

use crate::context::UnificationContext;
use crate::error::{Result, UnifyError};
use crate::key::{Category, Direction, UnificationKey};
use crate::primitives::{merge_simple_children, MergeRule};
use crate::security::{transport_layer_security, user_authentication};
use cppa_document::{Element, QName};
use tracing::info;

const OPTIONAL_FIRST_MATCH: MergeRule = MergeRule::optional().lenient();

/// Unify transport `a_id` of A with transport `b_id` of B.
pub fn unify_transport<'p>(
    ctx: &mut UnificationContext<'p>,
    a_id: &str,
    b_id: &str,
    direction: Option<Direction>,
) -> Result<UnificationKey> {
    let key = ctx.key(Some(a_id), Some(b_id));
    ctx.memoize(Category::Transport, &key, |ctx| {
        compute_transport(ctx, &key, a_id, b_id, direction)
            .map(Some)
            .map_err(|e| e.context(format!("transport {a_id} {b_id}")))
    })?;
    Ok(key)
}

fn compute_transport<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a_id: &str,
    b_id: &str,
    direction: Option<Direction>,
) -> Result<Element> {
    let a = ctx.a_lookup("transport", a_id)?;
    let b = ctx.b_lookup("transport", b_id)?;
    if a.name() != b.name() {
        return Err(UnifyError::TypeMismatch {
            category: Category::Transport,
            a: a.name().to_string(),
            b: b.name().to_string(),
        });
    }
    info!(kind = %a.name().local, a = a_id, b = b_id, "Unifying transport");

    let mut out = Element::new(a.name().clone()).with_attr("id", ctx.id(key)?);
    out.push(
        Element::cppa("Description")
            .with_qattr(QName::xml("lang"), "en")
            .with_text(format!(
                "Transport formed from {a_id} in {} and {b_id} in {}",
                ctx.acpp_id, ctx.bcpp_id
            )),
    );
    merge_simple_children(a, b, &mut out, "ClientIPv4", OPTIONAL_FIRST_MATCH)?;
    merge_simple_children(a, b, &mut out, "ClientIPv6", OPTIONAL_FIRST_MATCH)?;
    merge_simple_children(a, b, &mut out, "Endpoint", OPTIONAL_FIRST_MATCH)?;
    ctx.merge_complex_children(
        key,
        a,
        b,
        &mut out,
        "TransportLayerSecurity",
        direction,
        transport_layer_security,
    )?;
    ctx.merge_complex_children(key, a, b, &mut out, "UserAuthentication", direction, user_authentication)?;
    Ok(out)
}
