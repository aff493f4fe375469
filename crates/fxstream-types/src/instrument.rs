//! Instrument symbols.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A normalized instrument symbol such as `EUR_USD`.
///
/// Symbols are upper-cased on construction so that `eur_usd` and `EUR_USD`
/// address the same price partition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Instrument(String);

impl Instrument {
    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the base currency (the part before `_`), if any.
    #[must_use]
    pub fn base(&self) -> Option<&str> {
        self.0.split_once('_').map(|(base, _)| base)
    }

    /// Returns the quote currency (the part after `_`), if any.
    #[must_use]
    pub fn quote(&self) -> Option<&str> {
        self.0.split_once('_').map(|(_, quote)| quote)
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Instrument {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Instrument {
    type Err = InstrumentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(InstrumentParseError(s.to_string()));
        }
        Ok(Self(s.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for Instrument {
    type Error = InstrumentParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Instrument> for String {
    fn from(value: Instrument) -> Self {
        value.0
    }
}

/// Error returned when parsing an invalid instrument symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentParseError(String);

impl std::fmt::Display for InstrumentParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid instrument '{}', expected letters, digits and '_' (e.g. EUR_USD)",
            self.0
        )
    }
}

impl std::error::Error for InstrumentParseError {}
