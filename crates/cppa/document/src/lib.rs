#![deny(unsafe_code)]
//! # cppa-document
//!
//! In-memory element tree for OASIS ebCore CPPA3 documents.
//!
//! Collaboration Protocol Profiles (CPPs) and the Agreements (CPAs) formed
//! from them are handled as already-parsed trees: each [`Element`] has a
//! namespace-qualified name, ordered attributes, optional text and an
//! ordered list of child nodes. Parsing and serialising XML is left to the
//! embedding application; the tree derives `serde` traits so it can be
//! exchanged in other formats.
//!
//! ## Key Types
//!
//! - [`Element`] — an element node with lookup and traversal helpers
//! - [`Node`] — child node (element, comment, processing instruction)
//! - [`QName`] — namespace-qualified name
//! - [`ns`] — namespace URIs used by CPPA3

pub mod element;
pub mod name;

pub use element::{Attribute, ChildrenNamed, Descendants, Element, ElementPath, Node};
pub use name::{ns, QName, QNameError};
