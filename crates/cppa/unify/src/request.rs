use crate::error::Result;
use chrono::{DateTime, Utc};
use cppa_document::Element;

/// Per-run inputs to [`crate::Unifier::unify`].
#[derive(Debug, Clone, Default)]
pub struct UnifyRequest {
    /// Explicit agreement identifier. Unset means the unifier's
    /// [`AgreementIdStrategy`] derives one.
    pub agreement_id: Option<String>,
    /// Restrict unification to one role pair of profile A.
    pub roles: RoleFilter,
    pub requested_activation: Option<DateTime<Utc>>,
    pub requested_expiration: Option<DateTime<Utc>>,
    /// Location of profile A, recorded as `ProfileIdentifier/@href`.
    pub a_profile_url: Option<String>,
    /// Location of profile B, recorded as `ProfileIdentifier/@href`.
    pub b_profile_url: Option<String>,
    /// Time the agreement is formed at. Unset means the current time.
    pub now: Option<DateTime<Utc>>,
}

impl UnifyRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agreement_id(mut self, id: impl Into<String>) -> Self {
        self.agreement_id = Some(id.into());
        self
    }

    pub fn with_party_role(mut self, role: impl Into<String>) -> Self {
        self.roles.party_role = Some(role.into());
        self
    }

    pub fn with_counterparty_role(mut self, role: impl Into<String>) -> Self {
        self.roles.counterparty_role = Some(role.into());
        self
    }

    pub fn with_activation(mut self, at: DateTime<Utc>) -> Self {
        self.requested_activation = Some(at);
        self
    }

    pub fn with_expiration(mut self, at: DateTime<Utc>) -> Self {
        self.requested_expiration = Some(at);
        self
    }

    pub fn with_profile_urls(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.a_profile_url = Some(a.into());
        self.b_profile_url = Some(b.into());
        self
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

/// Optional restriction on which of profile A's role pairs are unified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleFilter {
    pub party_role: Option<String>,
    pub counterparty_role: Option<String>,
}

impl RoleFilter {
    pub fn admits(&self, party_role: &str, counterparty_role: &str) -> bool {
        self.party_role.as_deref().map_or(true, |r| r == party_role)
            && self
                .counterparty_role
                .as_deref()
                .map_or(true, |r| r == counterparty_role)
    }

    /// Both roles named: the caller asked for this exact pair, so its
    /// absence from the counterparty is fatal.
    pub fn is_exact(&self) -> bool {
        self.party_role.is_some() && self.counterparty_role.is_some()
    }
}

/// Fills in defaulted values of a profile before unification.
pub trait DefaultHandler: Send + Sync {
    fn apply(&self, profile: Element) -> Result<Element>;
}

/// Derives the agreement identifier from the two profile identifiers.
pub trait AgreementIdStrategy: Send + Sync {
    fn agreement_id(&self, a_profile_id: &str, b_profile_id: &str) -> String;
}

/// `<A profile id>_<B profile id>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JoinedProfileIds;

impl AgreementIdStrategy for JoinedProfileIds {
    fn agreement_id(&self, a_profile_id: &str, b_profile_id: &str) -> String {
        format!("{a_profile_id}_{b_profile_id}")
    }
}
