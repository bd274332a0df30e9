//! Route pattern compilation and matching.
//!
//! A pattern such as `/users/:id` is tokenized once at registration time
//! into literal and parameter segments. Matching is a single anchored pass
//! over a normalized request path: segment counts must agree, literals must
//! compare byte-for-byte, and each parameter captures one non-empty
//! segment. There is no prefix matching, no wildcards, and no regex
//! machinery, so metacharacters in a pattern are matched verbatim.

use std::collections::HashMap;

/// Strips trailing slashes from a path; an empty or all-slash path
/// normalizes to `/`.
pub fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

/// Parameter names are restricted to alphanumerics and underscores; a
/// `:`-segment with any other character is an ordinary literal.
fn is_param_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled route pattern, built once at registration and reused for
/// every request.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compiles a pattern string.
    ///
    /// The pattern is normalized first, then split on `/`. A segment of the
    /// form `:name`, where the name is non-empty and made of alphanumerics
    /// or underscores, becomes a named capture; every other segment is a
    /// literal. If the same name appears twice, the last occurrence wins at
    /// match time.
    pub fn parse(pattern: &str) -> Self {
        let normalized = normalize_path(pattern);
        let segments = normalized
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) if is_param_name(name) => Segment::Param(name.to_string()),
                _ => Segment::Literal(segment.to_string()),
            })
            .collect();
        Self { raw: normalized.to_string(), segments }
    }

    /// The normalized pattern string this matcher was compiled from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Tests a normalized request path against this pattern.
    ///
    /// Returns the captured parameters on a match, `None` otherwise. The
    /// whole path must match; a parameter never captures an empty segment
    /// and never spans a `/`.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let mut params = HashMap::new();
        let mut parts = path.split('/');

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), part.to_string());
                }
            }
        }

        if parts.next().is_some() {
            return None;
        }

        Some(params)
    }
}
