use crate::key::{Category, UnificationKey};
use thiserror::Error;

/// Broad classification of a unification failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Element counts, presence or types differ.
    Structural,
    /// Text, attribute or boolean values differ.
    Value,
    /// A party is not allowed, or is denied, by an access-control list.
    AccessControl,
    /// A certificate does not chain to the peer's trust anchor.
    Trust,
    /// Settings that are individually valid contradict each other.
    Consistency,
    /// An id reference does not resolve.
    Reference,
    /// A component was re-entered while its own unification was in progress.
    Reentrancy,
}

/// Errors raised while unifying two profiles.
///
/// Errors are `Clone` so a failure cached for a key can be replayed verbatim
/// to every later request for the same key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnifyError {
    #[error("child count mismatch for {element}: {a} vs {b}")]
    CountMismatch { element: String, a: usize, b: usize },

    #[error("missing required {element}")]
    MissingElement { element: String },

    #[error("no match for {element} #{position}")]
    UnmatchedChild { element: String, position: usize },

    #[error("empty intersection for {element}")]
    EmptyIntersection { element: String },

    #[error("incompatible {category} types {a} vs {b}")]
    TypeMismatch {
        category: Category,
        a: String,
        b: String,
    },

    #[error("unsupported {category} type {tag}")]
    UnsupportedType { category: Category, tag: String },

    #[error("missing {category}: {a:?} versus {b:?}")]
    OneSided {
        category: Category,
        a: Option<String>,
        b: Option<String>,
    },

    #[error("{element}: {a:?} vs {b:?}")]
    ValueMismatch {
        element: String,
        a: Option<String>,
        b: Option<String>,
    },

    #[error("boolean {element}: {a:?} vs {b:?}")]
    BooleanMismatch {
        element: String,
        a: Option<String>,
        b: Option<String>,
    },

    #[error("attribute {attribute} of {element}: {a:?} vs {b:?}")]
    AttributeMismatch {
        element: String,
        attribute: String,
        a: Option<String>,
        b: Option<String>,
    },

    #[error("attribute {attribute} of {element} present in one input only")]
    MissingAttribute { element: String, attribute: String },

    #[error("incompatible {attribute} cardinality in {context}: {a:?} vs {b:?}")]
    CardinalityMismatch {
        context: String,
        attribute: String,
        a: Option<String>,
        b: Option<String>,
    },

    #[error("incompatible {attribute} {a_channel}={a:?} versus {b_channel}={b:?}")]
    MpcConflict {
        attribute: String,
        a_channel: String,
        a: String,
        b_channel: String,
        b: String,
    },

    #[error("{attribute} set by the pull client side of {a_channel}, {b_channel}")]
    MpcNotPullResponder {
        attribute: String,
        a_channel: String,
        b_channel: String,
    },

    #[error("channels {a_channel} {b_channel} inconsistent for asResponse")]
    AsResponseConflict { a_channel: String, b_channel: String },

    #[error("channels {a_channel} and {b_channel} inconsistent for transport")]
    TransportPresence { a_channel: String, b_channel: String },

    #[error("bindings {service} {action} inconsistent for replyTo presence")]
    ReplyToPresence { service: String, action: String },

    #[error("bindings {service} reply to different actions {a_action:?} {b_action:?}")]
    ReplyToMismatch {
        service: String,
        a_action: Option<String>,
        b_action: Option<String>,
    },

    #[error("unequal number of properties for {a_binding}, {b_binding}")]
    PropertyCount { a_binding: String, b_binding: String },

    #[error("mismatch for property {name} in {a_binding}, {b_binding}")]
    PropertyMismatch {
        name: String,
        a_binding: String,
        b_binding: String,
    },

    #[error("party {party} not in allowed list {list}")]
    PartyNotAllowed { party: String, list: String },

    #[error("party {party} in denied list {list}")]
    PartyDenied { party: String, list: String },

    #[error("cert {cert_id} does not match a root cert in {anchor_id}")]
    UntrustedCertificate { cert_id: String, anchor_id: String },

    #[error("unresolved {kind} reference {id}")]
    DanglingReference { kind: String, id: String },

    #[error("feature reference {id} on {element} points at an enclosing element")]
    CyclicFeature { element: String, id: String },

    #[error("invalid {field} value {value:?}: {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("service expires at {expiration} before earliest activation {activation}")]
    ExpiresBeforeActivation {
        expiration: String,
        activation: String,
    },

    #[error("no match in {profile} for {service}-{action}")]
    ActionUnmatched {
        profile: String,
        service: String,
        action: String,
    },

    #[error("required binding for action {action} not matched")]
    RequiredActionUncovered { action: String },

    #[error("service {service} not found for {role} {counter_role} in {profile}")]
    ServiceNotFound {
        service: String,
        role: String,
        counter_role: String,
        profile: String,
    },

    #[error("no ServiceSpecification for {role} {counter_role} in {profile}")]
    ServiceSpecificationNotFound {
        role: String,
        counter_role: String,
        profile: String,
    },

    #[error("action bindings {a_binding} {b_binding} failed to unify")]
    NoChannelMatch {
        a_binding: String,
        b_binding: String,
        #[source]
        last: Option<Box<UnifyError>>,
    },

    #[error("no action bindings matched for service {service}")]
    NoActionBindings { service: String },

    #[error("no service bindings matched for {a_profile}-{role} {b_profile}-{counter_role}")]
    NoServiceBindings {
        a_profile: String,
        role: String,
        b_profile: String,
        counter_role: String,
        #[source]
        last: Option<Box<UnifyError>>,
    },

    #[error("no matching service specifications for {a_profile}-{b_profile}")]
    NoServiceSpecifications { a_profile: String, b_profile: String },

    #[error("identifier space exhausted for {key}")]
    IdentifierExhausted { key: UnificationKey },

    #[error("{category} {key} re-entered while in progress")]
    Reentrant {
        category: Category,
        key: UnificationKey,
    },

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<UnifyError>,
    },
}

impl UnifyError {
    /// Wrap this error with a description of the component being unified.
    pub fn context(self, context: impl Into<String>) -> Self {
        UnifyError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub fn dangling(kind: impl Into<String>, id: impl Into<String>) -> Self {
        UnifyError::DanglingReference {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn missing(element: impl Into<String>) -> Self {
        UnifyError::MissingElement {
            element: element.into(),
        }
    }

    /// Classify the failure. Wrapping variants report the kind of the
    /// underlying cause.
    pub fn kind(&self) -> ErrorKind {
        use UnifyError::*;
        match self {
            Context { source, .. } => source.kind(),
            NoChannelMatch { last: Some(last), .. } | NoServiceBindings { last: Some(last), .. } => {
                last.kind()
            }
            CountMismatch { .. }
            | MissingElement { .. }
            | UnmatchedChild { .. }
            | TypeMismatch { .. }
            | UnsupportedType { .. }
            | OneSided { .. }
            | MissingAttribute { .. }
            | PropertyCount { .. }
            | ActionUnmatched { .. }
            | ServiceNotFound { .. }
            | ServiceSpecificationNotFound { .. }
            | NoChannelMatch { .. }
            | NoActionBindings { .. }
            | NoServiceBindings { .. }
            | NoServiceSpecifications { .. } => ErrorKind::Structural,
            EmptyIntersection { .. }
            | ValueMismatch { .. }
            | BooleanMismatch { .. }
            | AttributeMismatch { .. }
            | CardinalityMismatch { .. }
            | MpcConflict { .. }
            | PropertyMismatch { .. }
            | InvalidValue { .. } => ErrorKind::Value,
            PartyNotAllowed { .. } | PartyDenied { .. } => ErrorKind::AccessControl,
            UntrustedCertificate { .. } => ErrorKind::Trust,
            MpcNotPullResponder { .. }
            | AsResponseConflict { .. }
            | TransportPresence { .. }
            | ReplyToPresence { .. }
            | ReplyToMismatch { .. }
            | ExpiresBeforeActivation { .. }
            | RequiredActionUncovered { .. }
            | IdentifierExhausted { .. } => ErrorKind::Consistency,
            DanglingReference { .. } | CyclicFeature { .. } => ErrorKind::Reference,
            Reentrant { .. } => ErrorKind::Reentrancy,
        }
    }

    /// The innermost error, skipping context wrappers.
    pub fn root_cause(&self) -> &UnifyError {
        match self {
            UnifyError::Context { source, .. } => source.root_cause(),
            UnifyError::NoChannelMatch { last: Some(last), .. }
            | UnifyError::NoServiceBindings { last: Some(last), .. } => last.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, UnifyError>;

/// Errors loading a [`crate::UnifierConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}
