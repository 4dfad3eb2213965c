//! oslevel parsing and comparison
//!
//! Levels are compared as integers after deleting every `-`, so
//! `2023-04-01-1234` becomes `202304011234`. Two levels with different digit
//! counts still compare numerically; `OsLevel::digit_count` lets callers
//! notice that case.

use std::cmp::Ordering;
use std::sync::LazyLock;

use nimcust_inventory::InventorySnapshot;
use regex::Regex;

use crate::error::CoreError;

static LPP_SOURCE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4}-[0-9]{2}-[0-9]{2}-[0-9]{4})-lpp_source$")
        .expect("lpp_source name regex should be valid")
});

const SEPARATOR: char = '-';

/// A comparable software level
#[derive(Debug, Clone)]
pub struct OsLevel {
    literal: String,
    value: u128,
    digits: usize,
}

impl OsLevel {
    /// Normalize a literal level
    ///
    /// Separators are removed, then the leading run of digits is the value.
    /// A literal without leading digits has value 0.
    pub fn new(literal: impl Into<String>) -> Self {
        let literal = literal.into();
        let stripped: String = literal.trim().chars().filter(|c| *c != SEPARATOR).collect();
        let digits: String = stripped.chars().take_while(char::is_ascii_digit).collect();
        let value = if digits.is_empty() {
            0
        } else {
            digits.parse().unwrap_or(u128::MAX)
        };

        Self {
            literal,
            value,
            digits: digits.len(),
        }
    }

    /// Level as written
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.literal
    }

    /// Integer form used for ordering
    #[must_use]
    pub fn numeric(&self) -> u128 {
        self.value
    }

    /// Number of digits that make up the integer form
    #[must_use]
    pub fn digit_count(&self) -> usize {
        self.digits
    }
}

impl std::fmt::Display for OsLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.literal)
    }
}

impl PartialEq for OsLevel {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for OsLevel {}

impl PartialOrd for OsLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OsLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

/// Extract the level of a known, well-formed lpp_source
///
/// # Errors
/// Returns `CoreError::InvalidBundle` if `name` is not in the inventory's
/// bundle set or is not of the form `YYYY-MM-DD-NNNN-lpp_source`.
pub fn parse_bundle_level(name: &str, inventory: &InventorySnapshot) -> Result<OsLevel, CoreError> {
    if !inventory.has_lpp_source(name) {
        return Err(CoreError::InvalidBundle {
            lpp_source: name.to_string(),
            reason: "cannot find lpp_source in inventory".to_string(),
        });
    }

    let caps = LPP_SOURCE_NAME
        .captures(name)
        .ok_or_else(|| CoreError::InvalidBundle {
            lpp_source: name.to_string(),
            reason: "name does not match YYYY-MM-DD-NNNN-lpp_source".to_string(),
        })?;

    Ok(OsLevel::new(&caps[1]))
}

/// Normalize the oslevel a client reports
#[must_use]
pub fn parse_client_level(raw: &str) -> OsLevel {
    OsLevel::new(raw)
}

/// Order two levels numerically
#[must_use]
pub fn compare(a: &OsLevel, b: &OsLevel) -> Ordering {
    a.cmp(b)
}
