//! Request DTOs for the key-value API
//!
//! Defines the query parameters carried by incoming requests.

use serde::Deserialize;

use crate::error::{KvError, Result};

/// Query string shared by `/set`, `/get` and `/del`: `?id=<integer>`.
///
/// The id stays a raw string here so a malformed value surfaces as a
/// validation error rather than an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyQuery {
    #[serde(default)]
    pub id: Option<String>,
}

impl KeyQuery {
    /// Parses the id into an integer key.
    pub fn key(&self) -> Result<i64> {
        parse_key(self.id.as_deref())
    }
}

/// Parses a raw id parameter into an integer key.
///
/// Missing, empty and non-integer ids are validation errors.
pub fn parse_key(raw: Option<&str>) -> Result<i64> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| KvError::Validation("Missing id".to_string()))?;

    raw.parse()
        .map_err(|_| KvError::Validation(format!("id must be an integer, got '{raw}'")))
}
