//! Service specifications, service bindings and action bindings.
//!
//! A's role pairs are matched against B's reversed role pairs. Within each
//! matching service binding the actions are unified twice: A's sends
//! against B's receives, then A's receives against B's sends.

use crate::acl;
use crate::channel::unify_channel;
use crate::config::BindingMatchMode;
use crate::context::UnificationContext;
use crate::error::{Result, UnifyError};
use crate::key::{Category, Direction, UnificationKey};
use crate::payload::unify_payload_profile;
use crate::request::RoleFilter;
use cppa_document::Element;
use tracing::{debug, info, warn};

/// Action bindings merged for one service binding, across both directions.
#[derive(Debug, Default)]
struct MergedActions {
    keys: Vec<UnificationKey>,
    actions: Vec<String>,
}

/// Unify every admitted service specification of A with its counterpart in
/// B. Fails when none of them produces a service binding.
pub fn unify_service_specifications<'p>(
    ctx: &mut UnificationContext<'p>,
    roles: &RoleFilter,
) -> Result<Vec<Element>> {
    let acpp = ctx.acpp;
    let mut specifications = Vec::new();

    for a_spec in acpp.cppa_children("ServiceSpecification") {
        let (role, counter_role) = match role_pair(a_spec) {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Skipping service specification without roles");
                continue;
            }
        };
        if !roles.admits(role, counter_role) {
            debug!(role, counter_role, "Role pair not requested, skipping");
            continue;
        }
        info!(role, counter_role, "Processing service specification");

        match unify_service_specification(ctx, a_spec, role, counter_role) {
            Ok(specification) => specifications.push(specification),
            Err(e @ UnifyError::ServiceSpecificationNotFound { .. }) if roles.is_exact() => {
                return Err(e);
            }
            Err(e) => {
                warn!(role, counter_role, error = %e, "Service specification dropped");
            }
        }
    }

    if specifications.is_empty() {
        return Err(UnifyError::NoServiceSpecifications {
            a_profile: ctx.acpp_id.clone(),
            b_profile: ctx.bcpp_id.clone(),
        });
    }
    info!(count = specifications.len(), "Matched service specifications");
    Ok(specifications)
}

fn role_pair(spec: &Element) -> Result<(&str, &str)> {
    let name = |local: &str| {
        spec.cppa_child(local)
            .and_then(|r| r.attr("name"))
            .ok_or_else(|| UnifyError::missing(local))
    };
    Ok((name("PartyRole")?, name("CounterPartyRole")?))
}

fn unify_service_specification<'p>(
    ctx: &mut UnificationContext<'p>,
    a_spec: &'p Element,
    role: &str,
    counter_role: &str,
) -> Result<Element> {
    let (acpp, bcpp) = (ctx.acpp, ctx.bcpp);
    let b_spec = bcpp
        .cppa_children("ServiceSpecification")
        .find(|b| matches!(role_pair(b), Ok((r, c)) if r == counter_role && c == role))
        .ok_or_else(|| UnifyError::ServiceSpecificationNotFound {
            role: counter_role.to_string(),
            counter_role: role.to_string(),
            profile: ctx.bcpp_id.clone(),
        })?;
    acl::check(a_spec, acpp, b_spec, bcpp)?;

    let mut out = Element::cppa("ServiceSpecification")
        .with_child(Element::cppa("PartyRole").with_attr("name", role))
        .with_child(Element::cppa("CounterPartyRole").with_attr("name", counter_role));

    let mut included = 0;
    let mut last = None;
    for (position, a_binding) in a_spec.cppa_children("ServiceBinding").enumerate() {
        match unify_service_binding(ctx, a_binding, b_spec, role, counter_role) {
            Ok((binding, keys)) => {
                out.push(binding);
                ctx.action_bindings.extend(keys);
                included += 1;
            }
            Err(e) => {
                warn!(
                    binding = position + 1,
                    mode = ?ctx.config.binding_match_mode,
                    error = %e,
                    "Service binding abandoned"
                );
                last = Some(e);
            }
        }
    }

    if included == 0 {
        return Err(UnifyError::NoServiceBindings {
            a_profile: ctx.acpp_id.clone(),
            role: role.to_string(),
            b_profile: ctx.bcpp_id.clone(),
            counter_role: counter_role.to_string(),
            last: last.map(Box::new),
        });
    }
    info!(role, counter_role, bindings = included, "Service specification unified");
    Ok(out)
}

fn unify_service_binding<'p>(
    ctx: &mut UnificationContext<'p>,
    a_binding: &'p Element,
    b_spec: &'p Element,
    role: &str,
    counter_role: &str,
) -> Result<(Element, Vec<UnificationKey>)> {
    let a_service = a_binding
        .cppa_child("Service")
        .ok_or_else(|| UnifyError::missing("Service"))?;
    let service = a_service.text().unwrap_or_default();
    let service_type = a_service.attr("type");

    let b_binding = b_spec
        .cppa_children("ServiceBinding")
        .find(|b| {
            b.cppa_child("Service").is_some_and(|s| {
                s.text() == Some(service) && (service_type.is_none() || s.attr("type") == service_type)
            })
        })
        .ok_or_else(|| UnifyError::ServiceNotFound {
            service: service.to_string(),
            role: counter_role.to_string(),
            counter_role: role.to_string(),
            profile: ctx.bcpp_id.clone(),
        })?;
    info!(service, service_type, role, "Unifying service binding");
    acl::check(a_binding, ctx.acpp, b_binding, ctx.bcpp)?;

    let mut out_service = Element::cppa("Service").with_text(service);
    if let Some(kind) = service_type {
        out_service.set_attr("type", kind);
    }
    let mut out = Element::cppa("ServiceBinding").with_child(out_service);

    let mut merged = MergedActions::default();
    for direction in [Direction::Send, Direction::Receive] {
        unify_send_receive(ctx, service, a_binding, b_binding, &mut out, direction, &mut merged)?;
    }
    if ctx.config.binding_match_mode == BindingMatchMode::All {
        check_coverage(&merged.actions, b_binding)?;
    }
    if merged.keys.is_empty() {
        return Err(UnifyError::NoActionBindings {
            service: service.to_string(),
        });
    }
    debug!(service, actions = ?merged.actions, "Service binding unified");
    Ok((out, merged.keys))
}

/// Unify A's action bindings for `direction` against B's bindings for the
/// reverse direction.
fn unify_send_receive<'p>(
    ctx: &mut UnificationContext<'p>,
    service: &str,
    a_binding: &'p Element,
    b_binding: &'p Element,
    out: &mut Element,
    direction: Direction,
    merged: &mut MergedActions,
) -> Result<()> {
    let a_actions = a_binding
        .cppa_children("ActionBinding")
        .filter(|ab| ab.attr("sendOrReceive") == Some(direction.as_str()));

    for a_action in a_actions {
        let action = a_action.attr("action").unwrap_or_default();
        match unify_action_binding(ctx, service, a_binding, b_binding, a_action, direction) {
            Ok(Some((element, key))) => {
                out.push(element);
                merged.keys.push(key);
                merged.actions.push(action.to_string());
            }
            Ok(None) => {}
            Err(e) if ctx.config.binding_match_mode == BindingMatchMode::Any => {
                warn!(service, action, error = %e, "Skipping action binding");
            }
            Err(e) => return Err(e.context(format!("action {service} {action}"))),
        }
    }
    Ok(())
}

/// `Ok(None)` when the action is optional and has no usable counterpart.
fn unify_action_binding<'p>(
    ctx: &mut UnificationContext<'p>,
    service: &str,
    a_service_binding: &'p Element,
    b_service_binding: &'p Element,
    a_action: &'p Element,
    direction: Direction,
) -> Result<Option<(Element, UnificationKey)>> {
    let action = a_action.attr("action").unwrap_or_default();
    let optional = a_action.attr("use") == Some("optional");
    let candidates: Vec<&'p Element> = b_service_binding
        .cppa_children("ActionBinding")
        .filter(|b| {
            b.attr("action") == Some(action)
                && b.attr("sendOrReceive") == Some(direction.reverse().as_str())
        })
        .collect();
    let b_action = match candidates.as_slice() {
        [single] => *single,
        _ if optional => {
            info!(service, action, matches = candidates.len(), "No match for optional action");
            return Ok(None);
        }
        _ => {
            return Err(UnifyError::ActionUnmatched {
                profile: ctx.bcpp_id.clone(),
                service: service.to_string(),
                action: action.to_string(),
            })
        }
    };

    if let Err(e) = acl::check(a_action, ctx.acpp, b_action, ctx.bcpp) {
        if a_action.attr("use") == Some("required") {
            return Err(e);
        }
        warn!(service, action, error = %e, "Access control excludes action binding");
        return Ok(None);
    }
    check_reply_to(service, action, a_action, b_action, a_service_binding, b_service_binding)?;

    let (a_id, b_id) = (a_action.attr("id"), b_action.attr("id"));
    let key = ctx.key(a_id, b_id);
    let mut out = Element::cppa("ActionBinding");
    if let Some(id) = a_id {
        out.set_attr("id", id);
    }
    out.set_attr("sendOrReceive", direction.as_str());
    out.set_attr("action", action);
    if let Some(reply_to) = a_action.attr("replyTo") {
        out.set_attr("replyTo", reply_to);
    }

    match (a_action.attr("payloadProfileId"), b_action.attr("payloadProfileId")) {
        (Some(a_profile), Some(b_profile)) => {
            let target = unify_payload_profile(ctx, Some(a_profile), Some(b_profile))?;
            out.set_attr("payloadProfileId", ctx.id(&target)?);
            ctx.record(&key, Category::PayloadProfile, &target);
        }
        (None, None) => {}
        (a_profile, b_profile) => {
            debug!(a = ?a_profile, b = ?b_profile, "Payload profile on one side only, ignored");
        }
    }

    let channel = unify_channel_candidates(ctx, a_action, b_action, direction)?;
    ctx.record(&key, Category::Channel, &channel);
    out.push(Element::cppa("ChannelId").with_text(ctx.id(&channel)?));

    unify_properties(ctx, a_action, b_action, &mut out)?;
    info!(service, action, direction = %direction, key = %key, "Action binding unified");
    Ok(Some((out, key)))
}

/// Both bindings reply to something or neither does, and the bindings they
/// reply to are for the same action.
fn check_reply_to(
    service: &str,
    action: &str,
    a_action: &Element,
    b_action: &Element,
    a_service_binding: &Element,
    b_service_binding: &Element,
) -> Result<()> {
    match (a_action.attr("replyTo"), b_action.attr("replyTo")) {
        (None, None) => Ok(()),
        (Some(a_ref), Some(b_ref)) => {
            let a_target = action_by_id(a_service_binding, a_ref)?;
            let b_target = action_by_id(b_service_binding, b_ref)?;
            if a_target.attr("action") == b_target.attr("action") {
                Ok(())
            } else {
                Err(UnifyError::ReplyToMismatch {
                    service: service.to_string(),
                    a_action: a_target.attr("action").map(str::to_string),
                    b_action: b_target.attr("action").map(str::to_string),
                })
            }
        }
        _ => Err(UnifyError::ReplyToPresence {
            service: service.to_string(),
            action: action.to_string(),
        }),
    }
}

fn action_by_id<'a>(service_binding: &'a Element, id: &str) -> Result<&'a Element> {
    service_binding
        .cppa_children("ActionBinding")
        .find(|ab| ab.attr("id") == Some(id))
        .ok_or_else(|| UnifyError::dangling("ActionBinding", id))
}

/// The first pair of channel candidates, in document order, that unifies.
fn unify_channel_candidates<'p>(
    ctx: &mut UnificationContext<'p>,
    a_action: &'p Element,
    b_action: &'p Element,
    direction: Direction,
) -> Result<UnificationKey> {
    let channel_ids = |e: &'p Element| -> Vec<&'p str> {
        e.cppa_children("ChannelId")
            .filter_map(Element::text)
            .map(str::trim)
            .collect()
    };
    let (a_channels, b_channels) = (channel_ids(a_action), channel_ids(b_action));

    let mut last = None;
    for (a_position, a_channel) in a_channels.iter().copied().enumerate() {
        for (b_position, b_channel) in b_channels.iter().copied().enumerate() {
            match unify_channel(ctx, Some(a_channel), Some(b_channel), Some(direction)) {
                Ok(key) => {
                    debug!(a = a_channel, b = b_channel, a_position, b_position, "Channel candidate unified");
                    return Ok(key);
                }
                Err(e) => {
                    debug!(a = a_channel, b = b_channel, error = %e, "Channel candidate rejected");
                    last = Some(e);
                }
            }
        }
    }
    Err(UnifyError::NoChannelMatch {
        a_binding: a_action.attr("id").unwrap_or_default().to_string(),
        b_binding: b_action.attr("id").unwrap_or_default().to_string(),
        last: last.map(Box::new),
    })
}

/// Properties come from the bindings themselves, or from a referenced
/// `PropertySet`. Both sides need the same number, and every property of A
/// needs a B property with the same name and cardinality.
fn unify_properties<'p>(
    ctx: &UnificationContext<'p>,
    a_action: &'p Element,
    b_action: &'p Element,
    out: &mut Element,
) -> Result<()> {
    let a_parent = property_parent(ctx.acpp, a_action)?;
    let b_parent = property_parent(ctx.bcpp, b_action)?;
    let a_properties: Vec<&Element> = a_parent.cppa_children("Property").collect();
    let b_count = b_parent.cppa_children("Property").count();

    let a_binding = a_action.attr("id").unwrap_or_default();
    let b_binding = b_action.attr("id").unwrap_or_default();
    if a_properties.len() != b_count {
        return Err(UnifyError::PropertyCount {
            a_binding: a_binding.to_string(),
            b_binding: b_binding.to_string(),
        });
    }

    for property in a_properties {
        let same = |p: &&Element| {
            ["name", "minOccurs", "maxOccurs"]
                .iter()
                .all(|attribute| p.attr(attribute) == property.attr(attribute))
        };
        if !b_parent.cppa_children("Property").any(|p| same(&p)) {
            return Err(UnifyError::PropertyMismatch {
                name: property.attr("name").unwrap_or_default().to_string(),
                a_binding: a_binding.to_string(),
                b_binding: b_binding.to_string(),
            });
        }
        out.push(property.clone());
    }
    Ok(())
}

fn property_parent<'p>(profile: &'p Element, action: &'p Element) -> Result<&'p Element> {
    match action.attr("propertySetId") {
        None => Ok(action),
        Some(id) => profile
            .cppa_children("PropertySet")
            .find(|set| set.attr("id") == Some(id))
            .ok_or_else(|| UnifyError::dangling("PropertySet", id)),
    }
}

/// Every action of B must have been merged, unless B marks it optional.
fn check_coverage(covered: &[String], b_service_binding: &Element) -> Result<()> {
    for b_action in b_service_binding.cppa_children("ActionBinding") {
        let action = b_action.attr("action").unwrap_or_default();
        if covered.iter().any(|c| c == action) {
            continue;
        }
        if b_action.attr("use") == Some("optional") {
            debug!(action, "Optional counterparty action not covered");
            continue;
        }
        return Err(UnifyError::RequiredActionUncovered {
            action: action.to_string(),
        });
    }
    Ok(())
}
