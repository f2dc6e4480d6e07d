use fancy_regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::{DomainError, Request};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchType {
    Host,
    Path,
    Header,
}

impl FromStr for MatchType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HOST" => Ok(MatchType::Host),
            "PATH" => Ok(MatchType::Path),
            "HEADER" => Ok(MatchType::Header),
            other => Err(DomainError::InvalidRequestMatcher(format!(
                "unknown match type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchType::Host => "HOST",
            MatchType::Path => "PATH",
            MatchType::Header => "HEADER",
        })
    }
}

/// A case-insensitive, whole-string regex over one part of a request.
#[derive(Debug, Clone)]
pub struct RequestMatcher {
    match_type: MatchType,
    pattern: String,
    regex: Regex,
    header_name: Option<String>,
    comparable_core: String,
}

impl RequestMatcher {
    pub fn new(
        match_type: MatchType,
        pattern: &str,
        header_name: Option<&str>,
    ) -> Result<Self, DomainError> {
        let header_name = header_name.filter(|h| !h.is_empty());
        if match_type == MatchType::Header && header_name.is_none() {
            return Err(DomainError::InvalidRequestMatcher(format!(
                "HEADER matcher '{pattern}' requires a header name"
            )));
        }

        let regex = Regex::new(&format!("(?i)^(?:{pattern})$")).map_err(|e| {
            DomainError::InvalidRegex {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            match_type,
            pattern: pattern.to_string(),
            regex,
            header_name: header_name.map(str::to_ascii_lowercase),
            comparable_core: comparable_core(pattern),
        })
    }

    pub fn host(pattern: &str) -> Result<Self, DomainError> {
        Self::new(MatchType::Host, pattern, None)
    }

    pub fn path(pattern: &str) -> Result<Self, DomainError> {
        Self::new(MatchType::Path, pattern, None)
    }

    pub fn header(name: &str, pattern: &str) -> Result<Self, DomainError> {
        Self::new(MatchType::Header, pattern, Some(name))
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn header_name(&self) -> Option<&str> {
        self.header_name.as_deref()
    }

    pub fn comparable_core(&self) -> &str {
        &self.comparable_core
    }

    /// Non-HTTP requests can only match on host.
    pub fn matches(&self, request: &Request) -> bool {
        match self.match_type {
            MatchType::Host => self.is_match(request.hostname()),
            MatchType::Path => request
                .as_http()
                .is_some_and(|http| self.is_match(&http.uri())),
            MatchType::Header => request.as_http().is_some_and(|http| {
                self.header_name
                    .as_deref()
                    .and_then(|name| http.header(name))
                    .is_some_and(|value| self.is_match(value))
            }),
        }
    }

    fn is_match(&self, target: &str) -> bool {
        self.regex.is_match(target).unwrap_or(false)
    }
}

/// The regex with non-word characters stripped from both ends.
fn comparable_core(pattern: &str) -> String {
    pattern
        .trim_matches(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .to_string()
}

impl PartialEq for RequestMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RequestMatcher {}

impl PartialOrd for RequestMatcher {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Descending lexicographic order of comparable cores, so `abcde` sorts
/// before `abc`. Length only decides between a core and its own prefix:
/// `abd` sorts before `abcde`.
impl Ord for RequestMatcher {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .comparable_core
            .cmp(&self.comparable_core)
            .then_with(|| self.match_type.cmp(&other.match_type))
            .then_with(|| self.pattern.cmp(&other.pattern))
            .then_with(|| self.header_name.cmp(&other.header_name))
    }
}
