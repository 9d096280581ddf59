//! Status-code filter parsing.
//!
//! A filter is a comma-separated list of tokens, each one of:
//! - an exact code: `200`
//! - a class: `4xx` (case-insensitive), covering `400..=499`
//! - an inclusive range: `500-502`

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("status filter is empty")]
    Empty,

    #[error("status filter contains an empty entry")]
    EmptyToken,

    #[error("invalid status filter entry '{0}' (expected 200, 4xx or 500-502)")]
    InvalidToken(String),

    #[error("status range '{0}' ends before it starts")]
    ReversedRange(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFilter {
    codes: BTreeSet<u16>,
}

fn parse_code(text: &str) -> Option<u16> {
    if text.len() == 3 && text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().ok()
    } else {
        None
    }
}

fn parse_token(token: &str) -> Result<(u16, u16), FilterError> {
    let invalid = || FilterError::InvalidToken(token.to_string());

    if let Some(code) = parse_code(token) {
        return Ok((code, code));
    }

    let lower = token.to_ascii_lowercase();
    if let Some(class) = lower.strip_suffix("xx")
        && class.len() == 1
        && let Some(digit) = class.chars().next().and_then(|c| c.to_digit(10))
    {
        let start = digit as u16 * 100;
        return Ok((start, start + 99));
    }

    if let Some((start, end)) = token.split_once('-') {
        let start = parse_code(start.trim()).ok_or_else(invalid)?;
        let end = parse_code(end.trim()).ok_or_else(invalid)?;
        if end < start {
            return Err(FilterError::ReversedRange(token.to_string()));
        }
        return Ok((start, end));
    }

    Err(invalid())
}

impl StatusFilter {
    pub fn parse(input: &str) -> Result<Self, FilterError> {
        if input.trim().is_empty() {
            return Err(FilterError::Empty);
        }

        let mut codes = BTreeSet::new();
        for token in input.split(',') {
            let token = token.trim();
            if token.is_empty() {
                return Err(FilterError::EmptyToken);
            }
            let (start, end) = parse_token(token)?;
            codes.extend(start..=end);
        }

        Ok(Self { codes })
    }

    pub fn contains(&self, status: u16) -> bool {
        self.codes.contains(&status)
    }

    /// Unprobed entries (no status) never match.
    pub fn matches(&self, status: Option<u16>) -> bool {
        status.is_some_and(|code| self.contains(code))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl FromStr for StatusFilter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} status codes", self.codes.len())
    }
}
