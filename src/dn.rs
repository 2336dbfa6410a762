//! Distinguished names
//!
//! A Dn is a slash-delimited path such as `sys/intf/phys-[eth1/1]`. Slashes
//! inside square brackets belong to the segment (the relative name) and do not
//! split it, so `phys-[eth1/1]` is a single segment.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::StoreError;

/// Validated distinguished name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dn(String);

impl Dn {
    pub fn parse(raw: &str) -> std::result::Result<Self, StoreError> {
        let invalid = |detail: &str| StoreError::InvalidDn {
            dn: raw.to_string(),
            detail: detail.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("empty"));
        }
        if raw.starts_with('/') || raw.ends_with('/') {
            return Err(invalid("leading or trailing '/'"));
        }
        if raw.contains(['*', '?']) {
            return Err(invalid("wildcard characters are not allowed"));
        }
        let segments = split_segments(raw).map_err(|detail| invalid(detail))?;
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid("empty segment"));
        }
        Ok(Dn(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Segments of this Dn, bracket aware
    pub fn segments(&self) -> Vec<&str> {
        // Validated on construction
        split_segments(&self.0).unwrap_or_default()
    }

    /// Last segment (relative name)
    pub fn rn(&self) -> &str {
        self.segments().last().copied().unwrap_or(&self.0)
    }

    pub fn depth(&self) -> usize {
        self.segments().len()
    }

    /// Parent Dn, `None` for a top-level Dn
    pub fn parent(&self) -> Option<Dn> {
        let rn_len = self.rn().len();
        if rn_len == self.0.len() {
            return None;
        }
        // Strip "/<rn>"
        let parent = &self.0[..self.0.len() - rn_len - 1];
        Some(Dn(parent.to_string()))
    }

    /// True when `other` lies strictly below this Dn
    pub fn is_ancestor_of(
        &self,
        other: &Dn,
    ) -> bool {
        let mine = self.segments();
        let theirs = other.segments();
        theirs.len() > mine.len() && theirs[..mine.len()] == mine[..]
    }

    /// True when `other` is this Dn or lies below it
    pub fn contains(
        &self,
        other: &Dn,
    ) -> bool {
        self == other || self.is_ancestor_of(other)
    }
}

/// Split on '/' outside of square brackets
pub(crate) fn split_segments(raw: &str) -> std::result::Result<Vec<&str>, &'static str> {
    let mut segments = Vec::new();
    let mut depth: usize = 0;
    let mut start = 0;

    for (i, c) in raw.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1).ok_or("unbalanced ']'")?;
            }
            '/' if depth == 0 => {
                segments.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unbalanced '['");
    }
    segments.push(&raw[start..]);
    Ok(segments)
}

impl fmt::Display for Dn {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Dn {
    type Err = StoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Dn::parse(s)
    }
}

impl AsRef<str> for Dn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Dn {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Dn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Dn::parse(&raw).map_err(serde::de::Error::custom)
    }
}
