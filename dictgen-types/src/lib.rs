//! Shared types for dictgen
//!
//! This crate provides the identifiers and small value types used across the
//! dictgen crates: record and publication identifiers, writing systems and
//! relation directions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Record identifier (a stable guid-like string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value usable as an html `id` attribute (ids may start with a digit)
    pub fn anchor(&self) -> String {
        format!("g{}", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId(id.to_string())
    }
}

/// Publication identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicationId(pub String);

impl PublicationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PublicationId {
    fn from(id: &str) -> Self {
        PublicationId(id.to_string())
    }
}

/// A writing system known to the generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritingSystem {
    /// Language tag emitted in `lang` attributes (e.g. "fr", "ar-Arab")
    pub id: String,

    #[serde(default)]
    pub abbreviation: Option<String>,

    #[serde(default)]
    pub right_to_left: bool,
}

impl WritingSystem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            abbreviation: None,
            right_to_left: false,
        }
    }

    pub fn rtl(mut self) -> Self {
        self.right_to_left = true;
        self
    }

    /// Abbreviation for display, falling back to the tag itself
    pub fn display_abbreviation(&self) -> &str {
        self.abbreviation.as_deref().unwrap_or(&self.id)
    }
}

/// Direction under which a relation is viewed from one of its endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Reverse,
    Either,
}

impl Direction {
    /// Suffix used in list filter ids ("type:f" / "type:r")
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Direction::Forward => Some("f"),
            Direction::Reverse => Some("r"),
            Direction::Either => None,
        }
    }

    /// Whether a filter entry with this direction admits an instance viewed as `actual`.
    ///
    /// Undirected instances (`Either`) pass any tag.
    pub fn admits(&self, actual: Direction) -> bool {
        match (self, actual) {
            (Direction::Either, _) | (_, Direction::Either) => true,
            (tag, actual) => *tag == actual,
        }
    }
}
