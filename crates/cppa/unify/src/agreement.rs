//! Agreement formation: the entry point tying every unifier together.
//!
//! A run prepares both profiles, checks profile-level access control,
//! computes the agreement's validity period, copies party information,
//! unifies the service specifications and finally emits exactly the
//! components reachable from the merged action bindings.

use crate::acl;
use crate::action::unify_service_specifications;
use crate::config::UnifierConfig;
use crate::context::UnificationContext;
use crate::dates::{format_datetime, parse_datetime, parse_duration};
use crate::dependency::Inclusion;
use crate::error::{Result, UnifyError};
use crate::key::{Category, UnificationKey};
use crate::preprocess::inline_channel_features;
use crate::request::{AgreementIdStrategy, DefaultHandler, JoinedProfileIds, UnifyRequest};
use chrono::{DateTime, Duration, Utc};
use cppa_document::{Element, QName};
use std::fmt;
use tracing::{debug, info, warn};

/// Forms agreements from pairs of profiles.
///
/// A `Unifier` holds only settings; every call to [`Unifier::unify`] starts
/// from empty caches, so one instance can serve any number of runs.
pub struct Unifier {
    config: UnifierConfig,
    default_handler: Option<Box<dyn DefaultHandler>>,
    id_strategy: Box<dyn AgreementIdStrategy>,
}

impl Default for Unifier {
    fn default() -> Self {
        Self::new(UnifierConfig::default())
    }
}

impl fmt::Debug for Unifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unifier")
            .field("config", &self.config)
            .field("default_handler", &self.default_handler.is_some())
            .finish_non_exhaustive()
    }
}

impl Unifier {
    pub fn new(config: UnifierConfig) -> Self {
        Self {
            config,
            default_handler: None,
            id_strategy: Box::new(JoinedProfileIds),
        }
    }

    /// Apply `handler` to both profiles before anything else looks at them.
    pub fn with_default_handler(mut self, handler: impl DefaultHandler + 'static) -> Self {
        self.default_handler = Some(Box::new(handler));
        self
    }

    /// Derive agreement identifiers with `strategy` when the request names
    /// none.
    pub fn with_id_strategy(mut self, strategy: impl AgreementIdStrategy + 'static) -> Self {
        self.id_strategy = Box::new(strategy);
        self
    }

    pub fn config(&self) -> &UnifierConfig {
        &self.config
    }

    /// Form the agreement between profiles `acpp` and `bcpp`.
    ///
    /// The inputs are not modified. On failure no partial agreement is
    /// returned.
    pub fn unify(&self, acpp: &Element, bcpp: &Element, request: &UnifyRequest) -> Result<Element> {
        let now = request.now.unwrap_or_else(Utc::now);
        let acpp = self.prepare(acpp.clone())?;
        let bcpp = self.prepare(bcpp.clone())?;
        let acpp_id = profile_id(&acpp)?;
        let bcpp_id = profile_id(&bcpp)?;
        info!(a = %acpp_id, b = %bcpp_id, "Forming agreement");

        acl::check_profiles(&acpp, &bcpp)?;

        let (activation, expiration) = validity(&acpp, &bcpp, request, now)?;
        let agreement_id = request
            .agreement_id
            .clone()
            .unwrap_or_else(|| self.id_strategy.agreement_id(&acpp_id, &bcpp_id));

        let mut agreement = Element::cppa("CPA");
        agreement.push(agreement_info(
            &agreement_id,
            (&acpp_id, request.a_profile_url.as_deref()),
            (&bcpp_id, request.b_profile_url.as_deref()),
            now,
            activation,
            expiration,
        ));
        agreement.push(party_info("PartyInfo", &acpp)?);
        agreement.push(party_info("CounterPartyInfo", &bcpp)?);

        let mut ctx = UnificationContext::new(&acpp, acpp_id.as_str(), &bcpp, bcpp_id.as_str(), &self.config);
        for specification in unify_service_specifications(&mut ctx, &request.roles)? {
            agreement.push(specification);
        }

        let inclusion = ctx.dependencies.sweep(&ctx.action_bindings);
        emit_components(&mut ctx, &inclusion, &mut agreement)?;
        info!(
            agreement = %agreement_id,
            action_bindings = inclusion.action_bindings.len(),
            channels = inclusion.channels.len(),
            transports = inclusion.transports.len(),
            payload_profiles = inclusion.payload_profiles.len(),
            packages = inclusion.packages.len(),
            "Agreement formed"
        );
        Ok(agreement.canonicalize())
    }

    fn prepare(&self, profile: Element) -> Result<Element> {
        let mut profile = match &self.default_handler {
            Some(handler) => handler.apply(profile)?,
            None => profile,
        };
        let inlined = inline_channel_features(&mut profile)?;
        debug!(inlined, "Channel features inlined");
        Ok(profile)
    }
}

fn profile_id(profile: &Element) -> Result<String> {
    profile
        .cppa_child("ProfileInfo")
        .and_then(|info| info.cppa_child_text("ProfileIdentifier"))
        .map(|id| id.trim().to_string())
        .ok_or_else(|| UnifyError::missing("ProfileIdentifier"))
}

fn profile_info_text<'a>(profile: &'a Element, local: &str) -> Option<&'a str> {
    profile
        .cppa_child("ProfileInfo")
        .and_then(|info| info.cppa_child_text(local))
}

/// An invalid `PhaseIn` counts as no phase-in.
fn phase_in(profile: &Element) -> Duration {
    match profile_info_text(profile, "PhaseIn") {
        None => Duration::zero(),
        Some(value) => parse_duration("PhaseIn", value).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring phase-in");
            Duration::zero()
        }),
    }
}

/// Activation is the latest of: now plus the longer phase-in, the requested
/// activation, and either profile's activation date. Expiration is the
/// earliest stated expiration, none of which may fall on or before
/// activation.
fn validity(
    acpp: &Element,
    bcpp: &Element,
    request: &UnifyRequest,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, Option<DateTime<Utc>>)> {
    let phase_in = phase_in(acpp).max(phase_in(bcpp));
    let mut activation = now
        .checked_add_signed(phase_in)
        .ok_or_else(|| UnifyError::InvalidValue {
            field: "PhaseIn".to_string(),
            value: phase_in.to_string(),
            reason: "activation date out of range".to_string(),
        })?;
    if let Some(requested) = request.requested_activation {
        activation = activation.max(requested);
    }
    for profile in [acpp, bcpp] {
        if let Some(value) = profile_info_text(profile, "ActivationDate") {
            activation = activation.max(parse_datetime("ActivationDate", value)?);
        }
    }

    let mut candidates = Vec::new();
    for profile in [acpp, bcpp] {
        if let Some(value) = profile_info_text(profile, "ExpirationDate") {
            let stated = parse_datetime("ExpirationDate", value)?;
            candidates.push(match request.requested_expiration {
                Some(requested) => stated.min(requested),
                None => stated,
            });
        }
    }
    if candidates.is_empty() {
        candidates.extend(request.requested_expiration);
    }
    for candidate in &candidates {
        if *candidate <= activation {
            return Err(UnifyError::ExpiresBeforeActivation {
                expiration: format_datetime(candidate),
                activation: format_datetime(&activation),
            });
        }
    }
    let expiration = candidates.into_iter().min();
    debug!(activation = %activation, expiration = ?expiration, "Validity computed");
    Ok((activation, expiration))
}

fn agreement_info(
    agreement_id: &str,
    (a_id, a_href): (&str, Option<&str>),
    (b_id, b_href): (&str, Option<&str>),
    now: DateTime<Utc>,
    activation: DateTime<Utc>,
    expiration: Option<DateTime<Utc>>,
) -> Element {
    let profile_identifier = |id: &str, href: Option<&str>| {
        let mut identifier = Element::cppa("ProfileIdentifier").with_text(id);
        if let Some(href) = href {
            identifier.set_attr("href", href);
        }
        identifier
    };
    let mut info = Element::cppa("AgreementInfo")
        .with_child(Element::cppa("AgreementIdentifier").with_text(agreement_id))
        .with_child(
            Element::cppa("Description")
                .with_qattr(QName::xml("lang"), "en")
                .with_text(format!(
                    "Agreement formed from {a_id} and {b_id} at {}",
                    format_datetime(&now)
                )),
        )
        .with_child(profile_identifier(a_id, a_href))
        .with_child(profile_identifier(b_id, b_href))
        .with_child(Element::cppa("ActivationDate").with_text(format_datetime(&activation)));
    if let Some(expiration) = expiration {
        info.push(Element::cppa("ExpirationDate").with_text(format_datetime(&expiration)));
    }
    info
}

/// Party names, every party identifier below `PartyInfo`, and certificates.
fn party_info(tag: &str, profile: &Element) -> Result<Element> {
    let source = profile
        .cppa_child("PartyInfo")
        .ok_or_else(|| UnifyError::missing("PartyInfo"))?;
    let mut out = Element::cppa(tag);
    for name in source.cppa_children("PartyName") {
        out.push(name.clone());
    }
    for party in source.descendants().filter(|e| e.is_cppa("PartyId")) {
        out.push(party.clone());
    }
    for certificate in source.cppa_children("Certificate") {
        out.push(certificate.clone());
    }
    Ok(out)
}

/// Append the included components in category order. Packages are the
/// only components whose identifier is assigned here.
fn emit_components(
    ctx: &mut UnificationContext<'_>,
    inclusion: &Inclusion,
    agreement: &mut Element,
) -> Result<()> {
    let groups: [(Category, &[UnificationKey]); 4] = [
        (Category::Channel, inclusion.channels.as_slice()),
        (Category::Transport, inclusion.transports.as_slice()),
        (Category::PayloadProfile, inclusion.payload_profiles.as_slice()),
        (Category::Package, inclusion.packages.as_slice()),
    ];
    for (category, keys) in groups {
        for key in keys {
            let Some(mut component) = ctx.memo.table(category).unified(key).cloned() else {
                debug!(category = category.as_str(), key = %key, "Nothing to emit");
                continue;
            };
            if category == Category::Package {
                component.set_attr("id", ctx.id(key)?);
            }
            debug!(category = category.as_str(), key = %key, "Emitting component");
            agreement.push(component);
        }
    }
    Ok(())
}
