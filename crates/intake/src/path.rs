//! Hierarchical field identifiers.
//!
//! A field's runtime identity is the dot-joined chain of every ancestor id plus
//! its own id (`requestorInfo.email`). Paths are the only key space of the
//! [`FormStore`](crate::store::FormStore), so composing them must never let two
//! schema nodes collide; that is why local ids may not contain the separator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{IntakeError, Result};

/// Separator between path segments.
pub const SEPARATOR: char = '.';

/// Prefix reserved for engine-owned keys inside a snapshot (see `store::SELF_KEY`).
pub const RESERVED_PREFIX: char = '@';

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath(String);

impl FieldPath {
    /// Path of a top-level field.
    pub fn root(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Compose `prefix + "." + id`; an absent prefix yields a root path.
    pub fn compose(prefix: Option<&FieldPath>, id: &str) -> Self {
        match prefix {
            Some(parent) => parent.child(id),
            None => Self::root(id),
        }
    }

    pub fn child(&self, id: &str) -> Self {
        let mut s = String::with_capacity(self.0.len() + 1 + id.len());
        s.push_str(&self.0);
        s.push(SEPARATOR);
        s.push_str(id);
        Self(s)
    }

    /// Parse a dotted path, rejecting empty or reserved segments.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(IntakeError::InvalidPath(raw.to_string()));
        }
        for segment in raw.split(SEPARATOR) {
            if validate_segment(segment).is_err() {
                return Err(IntakeError::InvalidPath(raw.to_string()));
            }
        }
        Ok(Self(raw.to_string()))
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Check that a local id can be used as a path segment.
pub fn validate_segment(id: &str) -> std::result::Result<(), &'static str> {
    if id.is_empty() {
        return Err("id must not be empty");
    }
    if id.contains(SEPARATOR) {
        return Err("id must not contain '.'");
    }
    if id.starts_with(RESERVED_PREFIX) {
        return Err("ids starting with '@' are reserved");
    }
    Ok(())
}
