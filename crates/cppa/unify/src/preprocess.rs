//! Inlining of channel feature references.
//!
//! Channels may point at shared feature definitions (`securityBinding`,
//! `reliableMessagingBinding`, `errorHandling`, `receiptHandling`). Before
//! unification every such pointer is replaced by a copy of the element it
//! names, appended as a child of the referencing element.

use crate::error::{Result, UnifyError};
use cppa_document::Element;
use tracing::debug;

/// Attributes that reference a shared feature definition by id.
pub const FEATURE_ATTRIBUTES: [&str; 4] = [
    "securityBinding",
    "reliableMessagingBinding",
    "errorHandling",
    "receiptHandling",
];

/// Inline every feature reference in `profile`, returning how many were
/// replaced.
///
/// Copies may carry references of their own, which are expanded in turn.
/// A definition that ends up referencing itself, directly or through other
/// definitions, fails with [`UnifyError::CyclicFeature`].
pub fn inline_channel_features(profile: &mut Element) -> Result<usize> {
    let definitions = profile.clone();
    let mut expanding = Vec::new();
    let mut inlined = 0;
    expand_in_place(profile, &definitions, &mut expanding, &mut inlined)?;
    Ok(inlined)
}

fn expand_in_place(
    element: &mut Element,
    definitions: &Element,
    expanding: &mut Vec<String>,
    inlined: &mut usize,
) -> Result<()> {
    for attribute in FEATURE_ATTRIBUTES {
        if let Some(id) = element.remove_attr(attribute) {
            let copy = expand_definition(element, attribute, &id, definitions, expanding, inlined)?;
            element.push(copy);
        }
    }
    for child in element.children_mut() {
        expand_in_place(child, definitions, expanding, inlined)?;
    }
    Ok(())
}

fn expand_definition(
    referrer: &Element,
    attribute: &str,
    id: &str,
    definitions: &Element,
    expanding: &mut Vec<String>,
    inlined: &mut usize,
) -> Result<Element> {
    if expanding.iter().any(|open| open == id) {
        return Err(UnifyError::CyclicFeature {
            element: referrer.name().local.clone(),
            id: id.to_string(),
        });
    }
    let mut copy = definitions
        .find_by_id(id)
        .cloned()
        .ok_or_else(|| UnifyError::dangling(attribute, id))?;
    copy.remove_attr("id");

    expanding.push(id.to_string());
    expand_in_place(&mut copy, definitions, expanding, inlined)?;
    expanding.pop();

    debug!(element = %referrer.name().local, attribute, id, "Inlined feature");
    *inlined += 1;
    Ok(copy)
}
