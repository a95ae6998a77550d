//! StatePath - Dotted path into the state object graph

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Validated dotted path such as `display_settings.show_charts`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatePath {
    raw: String,
    segments: Vec<String>,
}

impl StatePath {
    /// Split on `.`, rejecting empty paths and empty segments
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::InvalidPath {
                path: raw.to_string(),
                reason: "path is empty".to_string(),
            });
        }
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if let Some(position) = segments.iter().position(String::is_empty) {
            return Err(Error::InvalidPath {
                path: raw.to_string(),
                reason: format!("segment {position} is empty"),
            });
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True for `key` itself and for any path nested under it
    pub fn is_within(&self, key: &str) -> bool {
        self.raw == key
            || (self.raw.len() > key.len()
                && self.raw.starts_with(key)
                && self.raw.as_bytes()[key.len()] == b'.')
    }
}

impl FromStr for StatePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
