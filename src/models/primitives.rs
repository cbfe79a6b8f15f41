//! Primitive types and newtypes for type-safe API interactions.
//!
//! Symbols and market data categories are both short uppercase codes;
//! wrapping them keeps one from being passed where the other is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::filter::FilterValue;

/// A Platts assessment symbol (e.g., "PCAAS00").
///
/// # Example
///
/// ```
/// use spgci_rs::Symbol;
///
/// let symbol = Symbol::new("PCAAS00");
/// assert_eq!(symbol.as_str(), "PCAAS00");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new symbol.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the symbol as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A Market Data Category code (e.g., "ET").
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mdc(String);

impl Mdc {
    /// Create a new market data category.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the category code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mdc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Mdc {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Mdc {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Mdc {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&Mdc> for FilterValue {
    fn from(mdc: &Mdc) -> Self {
        FilterValue::Text(mdc.0.clone())
    }
}
