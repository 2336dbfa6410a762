//! Dn patterns for watch subscriptions and schema classes
//!
//! A pattern is a sequence of segments separated by `/` (bracket aware, like
//! [`Dn`]). Within a segment `*` matches any run of characters and `?` matches
//! exactly one. A segment consisting solely of `**` matches zero or more whole
//! segments.

use std::fmt;

use crate::dn::split_segments;
use crate::Dn;
use crate::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    /// Exact segment match
    Literal(String),
    /// Segment with `*`/`?` wildcards
    Glob(Vec<char>),
    /// `**`
    AnySegments,
}

impl PatternSegment {
    fn parse(raw: &str) -> Self {
        if raw == "**" {
            PatternSegment::AnySegments
        } else if raw.contains(['*', '?']) {
            PatternSegment::Glob(raw.chars().collect())
        } else {
            PatternSegment::Literal(raw.to_string())
        }
    }

    fn matches_one(
        &self,
        segment: &str,
    ) -> bool {
        match self {
            PatternSegment::Literal(expected) => expected == segment,
            PatternSegment::Glob(glob) => {
                let text: Vec<char> = segment.chars().collect();
                glob_match(glob, &text)
            }
            PatternSegment::AnySegments => true,
        }
    }
}

/// Compiled Dn pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnPattern {
    source: String,
    segments: Vec<PatternSegment>,
}

impl DnPattern {
    /// Parse an absolute pattern such as `sys/intf/phys-*`
    pub fn parse(pattern: &str) -> std::result::Result<Self, StoreError> {
        let segments = parse_segments(pattern)?;
        if segments.is_empty() {
            return Err(invalid(pattern, "empty pattern"));
        }
        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    /// Pattern relative to `base`. An empty relative pattern matches `base` only.
    pub fn scoped(
        base: &Dn,
        relative: &str,
    ) -> std::result::Result<Self, StoreError> {
        let mut segments: Vec<PatternSegment> = base
            .segments()
            .into_iter()
            .map(|s| PatternSegment::Literal(s.to_string()))
            .collect();

        let source = if relative.is_empty() {
            base.to_string()
        } else {
            segments.extend(parse_segments(relative)?);
            format!("{base}/{relative}")
        };

        Ok(Self { source, segments })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True when the pattern contains no wildcard segment
    pub fn is_exact(&self) -> bool {
        self.segments.iter().all(|s| matches!(s, PatternSegment::Literal(_)))
    }

    pub fn matches(
        &self,
        dn: &Dn,
    ) -> bool {
        match_segments(&self.segments, &dn.segments())
    }
}

impl fmt::Display for DnPattern {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn invalid(
    pattern: &str,
    detail: &str,
) -> StoreError {
    StoreError::InvalidPattern {
        pattern: pattern.to_string(),
        detail: detail.to_string(),
    }
}

fn parse_segments(pattern: &str) -> std::result::Result<Vec<PatternSegment>, StoreError> {
    if pattern.is_empty() {
        return Ok(Vec::new());
    }
    if pattern.starts_with('/') || pattern.ends_with('/') {
        return Err(invalid(pattern, "leading or trailing '/'"));
    }
    let raw = split_segments(pattern).map_err(|detail| invalid(pattern, detail))?;
    if raw.iter().any(|s| s.is_empty()) {
        return Err(invalid(pattern, "empty segment"));
    }
    Ok(raw.into_iter().map(PatternSegment::parse).collect())
}

fn match_segments(
    pattern: &[PatternSegment],
    concrete: &[&str],
) -> bool {
    match pattern.split_first() {
        None => concrete.is_empty(),
        Some((PatternSegment::AnySegments, rest)) => {
            (0..=concrete.len()).any(|skip| match_segments(rest, &concrete[skip..]))
        }
        Some((segment, rest)) => match concrete.split_first() {
            Some((head, tail)) => segment.matches_one(head) && match_segments(rest, tail),
            None => false,
        },
    }
}

/// Wildcard match of a single segment; `*` never crosses a segment boundary
/// because segments are matched one at a time.
fn glob_match(
    glob: &[char],
    text: &[char],
) -> bool {
    let (mut g, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if g < glob.len() && (glob[g] == '?' || glob[g] == text[t]) {
            g += 1;
            t += 1;
        } else if g < glob.len() && glob[g] == '*' {
            backtrack = Some((g, t));
            g += 1;
        } else if let Some((star_g, star_t)) = backtrack {
            g = star_g + 1;
            t = star_t + 1;
            backtrack = Some((star_g, star_t + 1));
        } else {
            return false;
        }
    }

    glob[g..].iter().all(|c| *c == '*')
}
