//! Profile fixtures shared by the integration scenarios.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use cppa_document::{Element, QName};
use cppa_unify::UnifyRequest;
use std::collections::HashSet;
use tracing_subscriber::EnvFilter;

pub const SERVICE: &str = "urn:example:ordering";

/// Install a test subscriber once; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

pub fn request() -> UnifyRequest {
    UnifyRequest::new().at(now())
}

// ---------------------------------------------------------------------------
// Profile builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    id: String,
    party_id: String,
    role: String,
    counter_role: String,
    attributes: Vec<(String, String)>,
    profile_info: Vec<Element>,
    party_info: Vec<Element>,
    actions: Vec<Element>,
    components: Vec<Element>,
}

impl ProfileBuilder {
    pub fn new(id: &str, party_id: &str, role: &str, counter_role: &str) -> Self {
        Self {
            id: id.into(),
            party_id: party_id.into(),
            role: role.into(),
            counter_role: counter_role.into(),
            attributes: Vec::new(),
            profile_info: Vec::new(),
            party_info: Vec::new(),
            actions: Vec::new(),
            components: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn info(mut self, local: &str, text: &str) -> Self {
        self.profile_info.push(Element::cppa(local).with_text(text));
        self
    }

    pub fn party(mut self, element: Element) -> Self {
        self.party_info.push(element);
        self
    }

    pub fn action(mut self, action: Element) -> Self {
        self.actions.push(action);
        self
    }

    pub fn component(mut self, component: Element) -> Self {
        self.components.push(component);
        self
    }

    pub fn build(self) -> Element {
        let mut profile = Element::cppa("CPP");
        for (name, value) in &self.attributes {
            profile.set_attr(name, value.as_str());
        }
        let info = self.profile_info.into_iter().fold(
            Element::cppa("ProfileInfo").with_child(Element::cppa("ProfileIdentifier").with_text(&self.id)),
            |info, e| info.with_child(e),
        );
        let party = self.party_info.into_iter().fold(
            Element::cppa("PartyInfo")
                .with_child(Element::cppa("PartyName").with_text(format!("{} Ltd", self.party_id)))
                .with_child(
                    Element::cppa("PartyId")
                        .with_attr("type", "urn:oasis:names:tc:ebcore:partyid-type:unregistered")
                        .with_text(&self.party_id),
                ),
            |party, e| party.with_child(e),
        );
        let binding = self.actions.into_iter().fold(
            Element::cppa("ServiceBinding").with_child(Element::cppa("Service").with_text(SERVICE)),
            |binding, a| binding.with_child(a),
        );
        let specification = Element::cppa("ServiceSpecification")
            .with_child(Element::cppa("PartyRole").with_attr("name", &self.role))
            .with_child(Element::cppa("CounterPartyRole").with_attr("name", &self.counter_role))
            .with_child(binding);

        profile.push(info);
        profile.push(party);
        profile.push(specification);
        for component in self.components {
            profile.push(component);
        }
        profile.with_comment("fixture")
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

pub fn action(id: &str, name: &str, direction: &str, channels: &[&str]) -> Element {
    channels.iter().fold(
        Element::cppa("ActionBinding")
            .with_attr("id", id)
            .with_attr("sendOrReceive", direction)
            .with_attr("action", name),
        |action, channel| action.with_child(Element::cppa("ChannelId").with_text(*channel)),
    )
}

pub fn ebms3_channel(id: &str, transport: Option<&str>) -> Element {
    let mut channel = Element::cppa("ebMS3Channel")
        .with_attr("id", id)
        .with_child(Element::cppa("Description").with_text(format!("{id} channel")))
        .with_child(Element::cppa("SOAPVersion").with_text("1.2"));
    if let Some(transport) = transport {
        channel.set_attr("transport", transport);
    }
    channel
}

pub fn http_transport(id: &str, endpoint: Option<&str>) -> Element {
    let transport = Element::cppa("HTTPTransport").with_attr("id", id);
    match endpoint {
        Some(endpoint) => transport.with_child(Element::cppa("Endpoint").with_text(endpoint)),
        None => transport,
    }
}

pub fn signing(channel: Element, reference: &str, cert_id: &str) -> Element {
    channel.with_child(
        Element::cppa("WSSecurityBinding").with_child(
            Element::cppa("Signature")
                .with_child(Element::cppa(reference).with_attr("certId", cert_id)),
        ),
    )
}

pub fn certificate(id: &str, leaf: &str, root: &str) -> Element {
    let x509 = |data: &str| Element::new(QName::ds("X509Certificate")).with_text(data);
    Element::cppa("Certificate").with_attr("id", id).with_child(
        Element::new(QName::ds("KeyInfo")).with_child(
            Element::new(QName::ds("X509Data"))
                .with_child(x509(leaf))
                .with_child(x509(root)),
        ),
    )
}

pub fn trust_anchor(id: &str, root: &str) -> Element {
    Element::cppa("TrustAnchor").with_attr("id", id).with_child(
        Element::cppa("Certificate").with_attr("id", format!("{id}_root")).with_child(
            Element::new(QName::ds("KeyInfo")).with_child(
                Element::new(QName::ds("X509Data"))
                    .with_child(Element::new(QName::ds("X509Certificate")).with_text(root)),
            ),
        ),
    )
}

pub fn party_list(id: &str, parties: &[&str]) -> Element {
    parties.iter().fold(Element::cppa("PartyIdList").with_attr("id", id), |list, party| {
        list.with_child(
            Element::cppa("PartyId")
                .with_attr("type", "urn:oasis:names:tc:ebcore:partyid-type:unregistered")
                .with_text(*party),
        )
    })
}

/// A buyer that sends orders and receives confirmations, with one channel
/// and transport it never uses in an action.
pub fn buyer() -> ProfileBuilder {
    ProfileBuilder::new("cpp_buyer", "buyer-1", "Buyer", "Seller")
        .action(action("buy_order", "Order", "send", &["buy_out"]))
        .action(action("buy_confirm", "Confirmation", "receive", &["buy_in"]))
        .component(ebms3_channel("buy_out", Some("buy_http")))
        .component(ebms3_channel("buy_in", None))
        .component(ebms3_channel("buy_spare", Some("buy_spare_http")))
        .component(http_transport("buy_http", None))
        .component(http_transport("buy_spare_http", Some("https://spare.buyer.example.com")))
}

/// The seller mirroring [`buyer`].
pub fn seller() -> ProfileBuilder {
    ProfileBuilder::new("cpp_seller", "seller-1", "Seller", "Buyer")
        .action(action("sell_order", "Order", "receive", &["sell_in"]))
        .action(action("sell_confirm", "Confirmation", "send", &["sell_out"]))
        .component(ebms3_channel("sell_in", Some("sell_http")))
        .component(ebms3_channel("sell_out", None))
        .component(http_transport("sell_http", Some("https://seller.example.com/as4")))
}

// ---------------------------------------------------------------------------
// Agreement inspection
// ---------------------------------------------------------------------------

pub fn action_bindings(agreement: &Element) -> Vec<&Element> {
    agreement
        .cppa_children("ServiceSpecification")
        .flat_map(|s| s.cppa_children("ServiceBinding"))
        .flat_map(|b| b.cppa_children("ActionBinding"))
        .collect()
}

pub fn actions(agreement: &Element) -> Vec<&str> {
    action_bindings(agreement)
        .into_iter()
        .filter_map(|ab| ab.attr("action"))
        .collect()
}

pub fn channels(agreement: &Element) -> Vec<&Element> {
    agreement
        .children()
        .filter(|c| c.name().local.ends_with("Channel"))
        .collect()
}

pub fn transports(agreement: &Element) -> Vec<&Element> {
    agreement
        .children()
        .filter(|c| c.name().local.ends_with("Transport"))
        .collect()
}

/// Every emitted channel and transport is referenced, and every reference
/// resolves.
pub fn assert_closed(agreement: &Element) {
    let channel_ids: HashSet<&str> = channels(agreement).iter().filter_map(|c| c.attr("id")).collect();
    let transport_ids: HashSet<&str> = transports(agreement).iter().filter_map(|t| t.attr("id")).collect();

    let channel_refs: HashSet<&str> = agreement
        .descendants()
        .filter(|e| e.is_cppa("ChannelId"))
        .filter_map(Element::text)
        .collect();
    let transport_refs: HashSet<&str> = channels(agreement)
        .iter()
        .filter_map(|c| c.attr("transport"))
        .collect();

    assert_eq!(channel_ids, channel_refs, "channels emitted vs referenced");
    assert_eq!(transport_ids, transport_refs, "transports emitted vs referenced");
}
