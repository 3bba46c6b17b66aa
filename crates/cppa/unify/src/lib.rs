#![deny(unsafe_code)]
//! # cppa-unify
//!
//! Forms a collaboration agreement (CPA) from two CPPA3 collaboration
//! profiles (CPPs).
//!
//! Each profile states what its party can do: the services and actions it
//! exchanges, and the channels, transports, packaging and payload profiles
//! it supports for them. Unification pairs A's role with B's reversed role,
//! matches A's sends with B's receives and vice versa, and keeps the largest
//! configuration both parties support. Only components reachable from a
//! merged action binding appear in the agreement, each under a short
//! identifier derived from the pair of components it was formed from.
//!
//! ## Key Types
//!
//! - [`Unifier`] — forms agreements; holds configuration and hooks
//! - [`UnifyRequest`] — per-run inputs (agreement id, dates, role filter)
//! - [`UnifierConfig`] — engine settings, loadable from TOML
//! - [`UnificationKey`] — a component of A paired with a component of B
//! - [`UnifyError`] — why two profiles could not be unified
//!
//! ## Example
//!
//! ```no_run
//! use cppa_unify::{Unifier, UnifierConfig, UnifyRequest};
//! # fn profiles() -> (cppa_document::Element, cppa_document::Element) { unimplemented!() }
//!
//! let (acpp, bcpp) = profiles();
//! let unifier = Unifier::new(UnifierConfig::default());
//! let request = UnifyRequest::new().with_party_role("Buyer");
//! let agreement = unifier.unify(&acpp, &bcpp, &request)?;
//! # Ok::<(), cppa_unify::UnifyError>(())
//! ```

pub mod acl;
pub mod action;
pub mod agreement;
pub mod channel;
pub mod config;
pub mod context;
pub mod dates;
pub mod dependency;
pub mod error;
pub mod identifier;
pub mod key;
pub mod memo;
pub mod package;
pub mod payload;
pub mod preprocess;
pub mod primitives;
pub mod reliability;
pub mod request;
pub mod security;
pub mod transport;
pub mod trust;

pub use agreement::Unifier;
pub use channel::ChannelKind;
pub use config::{BindingMatchMode, UnifierConfig};
pub use context::UnificationContext;
pub use dependency::{DependencyGraph, Inclusion};
pub use error::{ConfigError, ErrorKind, Result, UnifyError};
pub use identifier::IdentifierGenerator;
pub use key::{Category, Direction, UnificationKey};
pub use package::{MimePartKind, PackageKind};
pub use request::{AgreementIdStrategy, DefaultHandler, JoinedProfileIds, RoleFilter, UnifyRequest};

use cppa_document::Element;

/// Form the agreement between `acpp` and `bcpp` with default settings.
pub fn unify(acpp: &Element, bcpp: &Element, request: &UnifyRequest) -> Result<Element> {
    Unifier::default().unify(acpp, bcpp, request)
}
