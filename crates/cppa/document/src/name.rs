use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Well-known namespace URIs used by CPPA3 documents.
pub mod ns {
    /// OASIS ebCore CPPA3 namespace.
    pub const CPPA: &str = "http://docs.oasis-open.org/ebcore/ns/cppa/v3.0";
    /// XML Digital Signature namespace.
    pub const DS: &str = "http://www.w3.org/2000/09/xmldsig#";
    /// XML DSig 1.1 namespace.
    pub const DSIG11: &str = "http://www.w3.org/2009/xmldsig11#";
    /// The reserved `xml:` namespace.
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    /// XML Key Management namespace.
    pub const XKMS: &str = "http://www.w3.org/2002/03/xkms#";
}

/// A namespace-qualified name.
///
/// Displayed in Clark notation (`{uri}local`), or as the bare local name
/// when there is no namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    /// A name in no namespace, the usual case for attributes.
    pub fn unqualified(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    pub fn cppa(local: impl Into<String>) -> Self {
        Self::new(ns::CPPA, local)
    }

    pub fn ds(local: impl Into<String>) -> Self {
        Self::new(ns::DS, local)
    }

    pub fn xml(local: impl Into<String>) -> Self {
        Self::new(ns::XML, local)
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local == local
    }

    pub fn is_cppa(&self, local: &str) -> bool {
        self.is(ns::CPPA, local)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(uri) => write!(f, "{{{}}}{}", uri, self.local),
            None => f.write_str(&self.local),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QNameError {
    #[error("empty local name in {0:?}")]
    EmptyLocalName(String),

    #[error("unterminated namespace in {0:?}")]
    UnterminatedNamespace(String),
}

impl FromStr for QName {
    type Err = QNameError;

    /// Parse Clark notation. A string without a leading `{` is unqualified.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, local) = match s.strip_prefix('{') {
            Some(rest) => {
                let end = rest
                    .find('}')
                    .ok_or_else(|| QNameError::UnterminatedNamespace(s.to_string()))?;
                (Some(rest[..end].to_string()), &rest[end + 1..])
            }
            None => (None, s),
        };
        if local.is_empty() {
            return Err(QNameError::EmptyLocalName(s.to_string()));
        }
        Ok(Self {
            namespace,
            local: local.to_string(),
        })
    }
}

impl From<&str> for QName {
    fn from(local: &str) -> Self {
        Self::unqualified(local)
    }
}
