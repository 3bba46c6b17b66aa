//! Generic merge rules shared by every protocol handler.
//!
//! Simple sub-elements (text-only children such as `SignatureAlgorithm`)
//! are merged by [`merge_simple_children`] under a [`MergeRule`]. Complex
//! sub-elements recurse into a handler and live on the unification context.

use crate::error::{Result, UnifyError};
use cppa_document::Element;
use tracing::debug;

/// How a simple sub-element is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRule {
    /// At least one child must be present.
    pub required: bool,
    /// Both sides must have the same number of children, and with several
    /// children every A child must find a partner.
    pub strict_elements: bool,
    /// An attribute present on one side only is a mismatch.
    pub strict_attributes: bool,
    /// Values are `xs:boolean`.
    pub boolean: bool,
    /// With several children on both sides keep every matching pair rather
    /// than the first.
    pub intersect_if_multiple: bool,
}

impl Default for MergeRule {
    fn default() -> Self {
        Self::REQUIRED
    }
}

impl MergeRule {
    pub const REQUIRED: Self = Self {
        required: true,
        strict_elements: true,
        strict_attributes: true,
        boolean: false,
        intersect_if_multiple: false,
    };

    pub const fn optional() -> Self {
        Self {
            required: false,
            ..Self::REQUIRED
        }
    }

    /// Tolerate children on one side only; they are copied.
    pub const fn lenient(self) -> Self {
        Self {
            strict_elements: false,
            ..self
        }
    }

    pub const fn lenient_attributes(self) -> Self {
        Self {
            strict_attributes: false,
            ..self
        }
    }

    pub const fn boolean(self) -> Self {
        Self {
            boolean: true,
            ..self
        }
    }

    pub const fn intersect(self) -> Self {
        Self {
            intersect_if_multiple: true,
            ..self
        }
    }
}

/// Interpret an `xs:boolean` lexical value.
pub fn xsd_boolean(value: Option<&str>) -> Option<bool> {
    match value.map(str::trim) {
        Some("true") | Some("1") => Some(true),
        Some("false") | Some("0") => Some(false),
        _ => None,
    }
}

/// Merge the CPPA children named `local` of `a` and `b` into `out`.
pub fn merge_simple_children(
    a: &Element,
    b: &Element,
    out: &mut Element,
    local: &str,
    rule: MergeRule,
) -> Result<()> {
    let a_children: Vec<&Element> = a.cppa_children(local).collect();
    let b_children: Vec<&Element> = b.cppa_children(local).collect();
    let (a_count, b_count) = (a_children.len(), b_children.len());

    if rule.strict_elements && a_count != b_count {
        return Err(UnifyError::CountMismatch {
            element: local.to_string(),
            a: a_count,
            b: b_count,
        });
    }

    match (a_count, b_count) {
        (0, 0) if rule.required => Err(UnifyError::missing(local)),
        (0, 0) => Ok(()),
        (0, _) => {
            for child in b_children {
                out.push(copy_simple(child, local));
            }
            Ok(())
        }
        (_, 0) => {
            for child in a_children {
                out.push(copy_simple(child, local));
            }
            Ok(())
        }
        (1, 1) => {
            out.push(merge_pair(a_children[0], b_children[0], local, rule)?);
            Ok(())
        }
        _ => {
            let mut matched_any = false;
            for (position, a_child) in a_children.iter().enumerate() {
                let merged = b_children.iter().find_map(|b_child| {
                    match merge_pair(a_child, b_child, local, rule) {
                        Ok(merged) => Some(merged),
                        Err(e) => {
                            debug!(element = local, position = position + 1, error = %e, "Skipping non-matching pair");
                            None
                        }
                    }
                });
                match merged {
                    Some(merged) => {
                        out.push(merged);
                        matched_any = true;
                        if !rule.intersect_if_multiple {
                            break;
                        }
                    }
                    None if rule.strict_elements => {
                        return Err(UnifyError::UnmatchedChild {
                            element: local.to_string(),
                            position: position + 1,
                        });
                    }
                    None => {}
                }
            }
            if matched_any {
                Ok(())
            } else {
                Err(UnifyError::EmptyIntersection {
                    element: local.to_string(),
                })
            }
        }
    }
}

fn copy_simple(source: &Element, local: &str) -> Element {
    let mut copy = Element::cppa(local);
    copy.set_text(source.text().map(str::to_string));
    copy_attributes(source, &mut copy);
    copy
}

fn merge_pair(a: &Element, b: &Element, local: &str, rule: MergeRule) -> Result<Element> {
    let mut merged = Element::cppa(local);
    let text = if rule.boolean {
        Some(merge_boolean(a, b)?)
    } else {
        merge_text(a, b)?
    };
    merged.set_text(text);
    merge_attributes(a, b, &mut merged, rule.strict_attributes)?;
    Ok(merged)
}

/// Texts must be identical.
pub fn merge_text(a: &Element, b: &Element) -> Result<Option<String>> {
    if a.text() == b.text() {
        Ok(a.text().map(str::to_string))
    } else {
        Err(UnifyError::ValueMismatch {
            element: a.name().local.clone(),
            a: a.text().map(str::to_string),
            b: b.text().map(str::to_string),
        })
    }
}

/// Both `true` gives `true`, both `false` gives `false`; anything else is a
/// mismatch.
pub fn merge_boolean(a: &Element, b: &Element) -> Result<String> {
    match (xsd_boolean(a.text()), xsd_boolean(b.text())) {
        (Some(true), Some(true)) => Ok("true".to_string()),
        (Some(false), Some(false)) => Ok("false".to_string()),
        _ => Err(UnifyError::BooleanMismatch {
            element: a.name().local.clone(),
            a: a.text().map(str::to_string),
            b: b.text().map(str::to_string),
        }),
    }
}

/// Merge every attribute of `a` and `b` into `out`. Shared attributes must
/// agree; one-sided attributes are copied unless `strict`.
pub fn merge_attributes(a: &Element, b: &Element, out: &mut Element, strict: bool) -> Result<()> {
    for (this, other) in [(a, b), (b, a)] {
        for attribute in this.attributes() {
            match other.qattr(&attribute.name) {
                Some(value) if value == attribute.value => {
                    out.set_qattr(attribute.name.clone(), value);
                }
                Some(value) => {
                    return Err(UnifyError::AttributeMismatch {
                        element: this.name().local.clone(),
                        attribute: attribute.name.to_string(),
                        a: Some(attribute.value.clone()),
                        b: Some(value.to_string()),
                    });
                }
                None if strict => {
                    return Err(UnifyError::MissingAttribute {
                        element: this.name().local.clone(),
                        attribute: attribute.name.to_string(),
                    });
                }
                None => out.set_qattr(attribute.name.clone(), attribute.value.clone()),
            }
        }
    }
    Ok(())
}

/// Attributes in `names` must have equal values (absence included); all
/// other attributes are copied.
pub fn merge_listed_attributes(
    a: &Element,
    b: &Element,
    out: &mut Element,
    names: &[&str],
) -> Result<()> {
    for name in names {
        merge_attribute(a, b, out, name)?;
    }
    for (this, _) in [(a, b), (b, a)] {
        for attribute in this.attributes() {
            let listed = attribute.name.namespace.is_none()
                && names.contains(&attribute.name.local.as_str());
            if !listed {
                out.set_qattr(attribute.name.clone(), attribute.value.clone());
            }
        }
    }
    Ok(())
}

/// A single unqualified attribute must be equal on both sides; it is set on
/// `out` when present.
pub fn merge_attribute(a: &Element, b: &Element, out: &mut Element, name: &str) -> Result<()> {
    match (a.attr(name), b.attr(name)) {
        (Some(x), Some(y)) if x == y => {
            out.set_attr(name, x);
            Ok(())
        }
        (None, None) => Ok(()),
        (x, y) => Err(UnifyError::AttributeMismatch {
            element: a.name().local.clone(),
            attribute: name.to_string(),
            a: x.map(str::to_string),
            b: y.map(str::to_string),
        }),
    }
}

/// `minOccurs` and `maxOccurs` must match exactly.
pub fn merge_cardinality(a: &Element, b: &Element, out: &mut Element, context: &str) -> Result<()> {
    for attribute in ["minOccurs", "maxOccurs"] {
        match (a.attr(attribute), b.attr(attribute)) {
            (Some(x), Some(y)) if x == y => out.set_attr(attribute, x),
            (None, None) => {}
            (x, y) => {
                return Err(UnifyError::CardinalityMismatch {
                    context: context.to_string(),
                    attribute: attribute.to_string(),
                    a: x.map(str::to_string),
                    b: y.map(str::to_string),
                })
            }
        }
    }
    Ok(())
}

pub fn copy_attributes(source: &Element, target: &mut Element) {
    for attribute in source.attributes() {
        target.set_qattr(attribute.name.clone(), attribute.value.clone());
    }
}

/// Text of a `Description` child, or `-`.
pub fn description_or_dash(element: &Element) -> &str {
    element.cppa_child_text("Description").unwrap_or("-")
}
