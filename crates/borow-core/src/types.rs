//! Core types for Borow

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::address::ConceptAddress;

pub const DEFAULT_RESPECT_LEVEL: i32 = 100;

/// Concept identity - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ConceptId(Arc<str>);

impl ConceptId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    /// Identity used when a caller supplies none: the caller file joined with
    /// the expression text, so repeated borrows of the same source expression
    /// land on the same concept.
    pub fn fallback(callsite: &Callsite<'_>) -> Self {
        Self::new(format!("{}:{}", callsite.file, callsite.expression))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn address(&self) -> ConceptAddress {
        ConceptAddress::of(&self.0)
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConceptId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ConceptId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<ConceptId> for String {
    fn from(id: ConceptId) -> Self {
        id.0.to_string()
    }
}

impl std::borrow::Borrow<str> for ConceptId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ConceptId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Immutable descriptor of the situation a value is borrowed in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub future_usage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default = "default_respect_level")]
    pub respect_level: i32,
}

fn default_respect_level() -> i32 {
    DEFAULT_RESPECT_LEVEL
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            future_usage: None,
            source: None,
            respect_level: DEFAULT_RESPECT_LEVEL,
        }
    }

    pub fn with_future_usage(mut self, future_usage: impl Into<String>) -> Self {
        self.future_usage = Some(future_usage.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_respect_level(mut self, respect_level: i32) -> Self {
        self.respect_level = respect_level;
        self
    }
}

/// Build a context from its four fields.
pub fn make_context(
    name: impl Into<String>,
    future_usage: Option<&str>,
    source: Option<&str>,
    respect_level: i32,
) -> Context {
    Context {
        name: name.into(),
        future_usage: future_usage.map(String::from),
        source: source.map(String::from),
        respect_level,
    }
}

/// Where a borrow was taken: the expression text and its source location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Callsite<'a> {
    pub expression: &'a str,
    pub file: &'a str,
    pub line: u32,
}

impl<'a> Callsite<'a> {
    pub fn new(expression: &'a str, file: &'a str, line: u32) -> Self {
        Self {
            expression,
            file,
            line,
        }
    }

    /// Callsite at the caller's location.
    #[track_caller]
    pub fn here(expression: &'a str) -> Self {
        let location = std::panic::Location::caller();
        Self::new(expression, location.file(), location.line())
    }

    /// An expression with no nameable text cannot be borrowed.
    pub fn has_personality(&self) -> bool {
        !self.expression.trim().is_empty()
    }

    pub fn location(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

/// Read-only copy of a concept, taken at the moment of access.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetaSnapshot {
    pub concept_id: ConceptId,
    pub display_name: String,
    pub context_name: String,
    pub source: String,
    pub future_usage: String,
    pub respect_level: i32,
    pub is_aware: bool,
    pub is_intentional: bool,
    pub observed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutated_at: Option<DateTime<Utc>>,
    /// `file:line` of the most recent acquisition.
    pub callsite: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
}

impl MetaSnapshot {
    pub fn address(&self) -> ConceptAddress {
        self.concept_id.address()
    }
}
