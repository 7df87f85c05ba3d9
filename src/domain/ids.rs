//! Type-safe identifiers for clients and containers.
//!
//! [`Phone`] is the routing key of the whole system: clients, containers,
//! ledger entries and chat sessions are all keyed by the normalized phone
//! number. [`ContainerId`] wraps the human-readable container id.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized client phone number (digits only).
///
/// Only constructed through [`Phone::normalize`], so a `Phone` is never
/// empty and never contains formatting characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Strips every non-digit character from `raw`.
    ///
    /// Returns `None` when no digit is left (e.g. empty input or a
    /// non-numeric chat id).
    #[must_use]
    pub fn normalize(raw: &str) -> Option<Self> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            None
        } else {
            Some(Self(digits))
        }
    }

    /// Returns the digits as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an inventory container (`<phone>-<SUFFIX>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    /// Wraps an id read back from storage.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mints a fresh id for `phone`: the phone digits plus a six character
    /// uppercase suffix taken from a v4 UUID.
    #[must_use]
    pub fn generate(phone: &Phone) -> Self {
        let suffix: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(6)
            .collect::<String>()
            .to_uppercase();
        Self(format!("{phone}-{suffix}"))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ContainerId> for String {
    fn from(id: ContainerId) -> Self {
        id.0
    }
}
