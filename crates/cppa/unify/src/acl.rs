//! Party access-control lists.
//!
//! Profiles, service specifications, service bindings and action bindings
//! may carry `allowed` and `denied` attributes naming a `PartyIdList` of the
//! same profile. Every party identifier of the other profile must appear in
//! an allow list and may not appear in a deny list. Both directions are
//! checked.

use crate::error::{Result, UnifyError};
use cppa_document::Element;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// A `PartyId` value with its optional `type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartyIdentity {
    pub value: String,
    pub kind: Option<String>,
}

impl PartyIdentity {
    fn from_element(element: &Element) -> Self {
        Self {
            value: element.text().unwrap_or_default().to_string(),
            kind: element.attr("type").map(str::to_string),
        }
    }
}

impl fmt::Display for PartyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Some(kind) => write!(f, "{} ({})", self.value, kind),
            None => f.write_str(&self.value),
        }
    }
}

/// Every party identifier appearing in a profile, list entries included,
/// in document order without duplicates.
pub fn party_identities(profile: &Element) -> Vec<PartyIdentity> {
    let mut seen = HashSet::new();
    profile
        .descendants()
        .filter(|e| e.is_cppa("PartyId"))
        .map(PartyIdentity::from_element)
        .filter(|party| seen.insert(party.clone()))
        .collect()
}

/// Members of the `PartyIdList` with the given id, following
/// `PartyIdListRef/@href` inclusions.
pub fn party_list(profile: &Element, list_id: &str) -> Result<Vec<PartyIdentity>> {
    let mut visited = HashSet::new();
    let mut seen = HashSet::new();
    let mut parties = Vec::new();
    collect_list(profile, list_id, &mut visited, &mut seen, &mut parties)?;
    Ok(parties)
}

fn collect_list(
    profile: &Element,
    list_id: &str,
    visited: &mut HashSet<String>,
    seen: &mut HashSet<PartyIdentity>,
    parties: &mut Vec<PartyIdentity>,
) -> Result<()> {
    if !visited.insert(list_id.to_string()) {
        return Ok(());
    }
    let list = profile
        .cppa_children("PartyIdList")
        .find(|l| l.attr("id") == Some(list_id))
        .ok_or_else(|| UnifyError::dangling("PartyIdList", list_id))?;
    for party in list.cppa_children("PartyId").map(PartyIdentity::from_element) {
        if seen.insert(party.clone()) {
            parties.push(party);
        }
    }
    for include in list.cppa_children("PartyIdListRef") {
        if let Some(href) = include.attr("href") {
            collect_list(profile, href, visited, seen, parties)?;
        }
    }
    Ok(())
}

/// Check the `allowed`/`denied` lists on `a_element` (resolved in `acpp`)
/// against B's parties, and those on `b_element` against A's.
pub fn check(a_element: &Element, acpp: &Element, b_element: &Element, bcpp: &Element) -> Result<()> {
    check_one_way(a_element, acpp, bcpp)?;
    check_one_way(b_element, bcpp, acpp)
}

/// Profile-level check: the lists sit on the profile roots.
pub fn check_profiles(acpp: &Element, bcpp: &Element) -> Result<()> {
    check(acpp, acpp, bcpp, bcpp)
}

fn check_one_way(element: &Element, own_profile: &Element, other_profile: &Element) -> Result<()> {
    let (allowed, denied) = (element.attr("allowed"), element.attr("denied"));
    if allowed.is_none() && denied.is_none() {
        return Ok(());
    }
    let others = party_identities(other_profile);

    if let Some(list_id) = allowed {
        let members: HashSet<PartyIdentity> = party_list(own_profile, list_id)?.into_iter().collect();
        if let Some(party) = others.iter().find(|p| !members.contains(*p)) {
            return Err(UnifyError::PartyNotAllowed {
                party: party.to_string(),
                list: list_id.to_string(),
            });
        }
        debug!(list = list_id, parties = others.len(), "Allow list satisfied");
    }
    if let Some(list_id) = denied {
        let members: HashSet<PartyIdentity> = party_list(own_profile, list_id)?.into_iter().collect();
        if let Some(party) = others.iter().find(|p| members.contains(*p)) {
            return Err(UnifyError::PartyDenied {
                party: party.to_string(),
                list: list_id.to_string(),
            });
        }
        debug!(list = list_id, parties = others.len(), "Deny list satisfied");
    }
    Ok(())
}
