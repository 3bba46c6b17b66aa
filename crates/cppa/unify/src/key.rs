use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one unification: a component of profile A paired with a
/// component of profile B.
///
/// Component ids are optional because a channel may legitimately omit its
/// transport or package on both sides; such keys unify trivially.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnificationKey {
    pub a_profile: String,
    pub a_component: Option<String>,
    pub b_profile: String,
    pub b_component: Option<String>,
}

impl UnificationKey {
    pub fn new(
        a_profile: impl Into<String>,
        a_component: Option<&str>,
        b_profile: impl Into<String>,
        b_component: Option<&str>,
    ) -> Self {
        Self {
            a_profile: a_profile.into(),
            a_component: a_component.map(str::to_string),
            b_profile: b_profile.into(),
            b_component: b_component.map(str::to_string),
        }
    }

    /// Underscore-joined form that identifiers and usernames are hashed from.
    /// Absent components are rendered as `None`.
    pub fn digest_input(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.a_profile,
            self.a_component.as_deref().unwrap_or("None"),
            self.b_profile,
            self.b_component.as_deref().unwrap_or("None"),
        )
    }

    /// True when neither side names a component.
    pub fn is_vacant(&self) -> bool {
        self.a_component.is_none() && self.b_component.is_none()
    }
}

impl fmt::Display for UnificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.a_profile,
            self.a_component.as_deref().unwrap_or("None"),
            self.b_profile,
            self.b_component.as_deref().unwrap_or("None"),
        )
    }
}

/// Message direction from the point of view of profile A.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Send,
    Receive,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Send => Direction::Receive,
            Direction::Receive => Direction::Send,
        }
    }

    /// Value of the `sendOrReceive` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Send => "send",
            Direction::Receive => "receive",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orders a pair of per-profile values so the sending side comes first.
///
/// Anything other than an explicit send (including no direction at all)
/// treats B as the sender.
pub fn sender_first<T>(direction: Option<Direction>, a: T, b: T) -> (T, T) {
    match direction {
        Some(Direction::Send) => (a, b),
        _ => (b, a),
    }
}

/// Kind of component a dependency edge points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Channel,
    Transport,
    Package,
    PayloadProfile,
    ActionBinding,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Channel => "channel",
            Category::Transport => "transport",
            Category::Package => "package",
            Category::PayloadProfile => "payloadprofile",
            Category::ActionBinding => "actionbinding",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
