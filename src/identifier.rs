//! Video identifier validation
//!
//! Platform IDs are exactly 11 characters from the URL-safe base64 alphabet.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::error::RelayError;

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap_or_else(|e| unreachable!("static regex: {e}"))
    })
}

/// Check whether a raw path segment is a well-formed video ID.
///
/// Surrounding whitespace is ignored.
pub fn is_valid(raw: &str) -> bool {
    id_pattern().is_match(raw.trim())
}

/// A validated video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    pub fn parse(raw: &str) -> Result<Self, RelayError> {
        let raw = raw.trim();
        if is_valid(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(RelayError::InvalidIdentifier)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
