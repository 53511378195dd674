use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

///
/// Item
///
/// One stored item in the store's native attribute-map shape, keyed by
/// stored attribute name.
///

pub type Item = BTreeMap<String, AttributeValue>;

///
/// Fields
///
/// Record field values keyed by record field name (not stored name).
///

pub type Fields = BTreeMap<String, AttributeValue>;

///
/// AttributeValue
///
/// Store-native attribute value. Numbers keep their textual form so they
/// round-trip through the store unchanged.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum AttributeValue {
    S(String),
    N(String),
    B(Vec<u8>),
    Bool(bool),
    Null,
    L(Vec<Self>),
    M(BTreeMap<String, Self>),
}

impl AttributeValue {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::S(value.into())
    }

    #[must_use]
    pub fn number(value: impl fmt::Display) -> Self {
        Self::N(value.to_string())
    }

    /// Whether this value is the zero value of its kind.
    ///
    /// Zero values are treated as "not populated" by index selection, query
    /// filters and patch merging.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::S(s) => s.is_empty(),
            Self::N(n) => n.parse::<f64>().is_ok_and(|v| v == 0.0),
            Self::B(b) => b.is_empty(),
            Self::Bool(b) => !b,
            Self::Null => true,
            Self::L(items) => items.is_empty(),
            Self::M(map) => map.is_empty(),
        }
    }

    /// Lists and maps are structured; everything else is a scalar.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Self::L(_) | Self::M(_))
    }

    /// Natural textual form of a scalar, used for key composition.
    #[must_use]
    pub fn as_key_text(&self) -> Option<String> {
        match self {
            Self::S(s) | Self::N(s) => Some(s.clone()),
            Self::Bool(b) => Some(b.to_string()),
            Self::B(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            Self::Null | Self::L(_) | Self::M(_) => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::S(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::S(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::N(value.to_string())
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        Self::N(value.to_string())
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S(s) => write!(f, "{s:?}"),
            Self::N(n) => write!(f, "{n}"),
            Self::B(b) => write!(f, "<{} bytes>", b.len()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null => write!(f, "null"),
            Self::L(items) => write!(f, "[{} items]", items.len()),
            Self::M(map) => write!(f, "{{{} entries}}", map.len()),
        }
    }
}

///
/// TESTS
///
