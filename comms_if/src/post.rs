//! # Postings
//!
//! A posting is a single named value published by a controller for the
//! outside world, either locally or to a group of peer vehicles.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single published value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    /// Name of the variable being published
    pub var: String,

    /// The value itself
    pub value: PostValue,

    /// Where the value should be delivered
    pub dest: PostDest,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The value of a posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostValue {
    Num(f64),
    Str(String),
}

/// Destination of a posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostDest {
    /// Only the local vehicle's community
    Local,

    /// Broadcast to all vehicles in the named group
    Group(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Posting {
    /// A string posting for the local community.
    pub fn str<V: Into<String>, S: Into<String>>(var: V, value: S) -> Self {
        Self {
            var: var.into(),
            value: PostValue::Str(value.into()),
            dest: PostDest::Local,
        }
    }

    /// A numeric posting for the local community.
    pub fn num<V: Into<String>>(var: V, value: f64) -> Self {
        Self {
            var: var.into(),
            value: PostValue::Num(value),
            dest: PostDest::Local,
        }
    }

    /// Send this posting to a peer group rather than the local community.
    pub fn to_group<G: Into<String>>(mut self, group: G) -> Self {
        self.dest = PostDest::Group(group.into());
        self
    }

    /// The value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self.value {
            PostValue::Str(ref s) => Some(s.as_str()),
            PostValue::Num(_) => None,
        }
    }

    /// The value as a number, if it is numeric.
    pub fn as_num(&self) -> Option<f64> {
        match self.value {
            PostValue::Num(n) => Some(n),
            PostValue::Str(_) => None,
        }
    }
}

impl fmt::Display for PostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostValue::Num(n) => write!(f, "{}", n),
            PostValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl fmt::Display for Posting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dest {
            PostDest::Local => write!(f, "{}={}", self.var, self.value),
            PostDest::Group(ref g) => write!(f, "{}={} (to {})", self.var, self.value, g),
        }
    }
}
