use crate::error::InternalError;
use thiserror::Error as ThisError;

/// Characters allowed as value separator or query wildcard.
pub const SYMBOL_CHARS: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`";

pub const VALUE_SEPARATOR_DEFAULT: char = ':';

///
/// KeyCharError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum KeyCharError {
    #[error("value separator '{0}' not in the valid set: {symbols}", symbols = SYMBOL_CHARS)]
    InvalidSeparator(char),

    #[error("query wildcard '{0}' not in the valid set: {symbols}", symbols = SYMBOL_CHARS)]
    InvalidWildcard(char),

    #[error("query wildcard '{0}' must differ from the value separator")]
    WildcardIsSeparator(char),
}

impl From<KeyCharError> for InternalError {
    fn from(err: KeyCharError) -> Self {
        Self::configuration(err.to_string())
    }
}

///
/// KeyChars
///
/// Validated separator and optional wildcard characters.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KeyChars {
    separator: char,
    wildcard: Option<char>,
}

impl KeyChars {
    pub fn new(separator: char, wildcard: Option<char>) -> Result<Self, KeyCharError> {
        if !is_symbol(separator) {
            return Err(KeyCharError::InvalidSeparator(separator));
        }
        if let Some(wildcard) = wildcard {
            if !is_symbol(wildcard) {
                return Err(KeyCharError::InvalidWildcard(wildcard));
            }
            if wildcard == separator {
                return Err(KeyCharError::WildcardIsSeparator(wildcard));
            }
        }

        Ok(Self {
            separator,
            wildcard,
        })
    }

    #[must_use]
    pub const fn separator(&self) -> char {
        self.separator
    }

    #[must_use]
    pub const fn wildcard(&self) -> Option<char> {
        self.wildcard
    }

    /// Strip a trailing wildcard; returns the remainder when present.
    #[must_use]
    pub fn strip_wildcard<'a>(&self, value: &'a str) -> Option<&'a str> {
        self.wildcard.and_then(|w| value.strip_suffix(w))
    }
}

impl Default for KeyChars {
    fn default() -> Self {
        Self {
            separator: VALUE_SEPARATOR_DEFAULT,
            wildcard: None,
        }
    }
}

fn is_symbol(ch: char) -> bool {
    SYMBOL_CHARS.contains(ch)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_accepts_symbols_only() {
        assert!(KeyChars::new('#', Some('*')).is_ok());
        assert_eq!(
            KeyChars::new('a', None),
            Err(KeyCharError::InvalidSeparator('a'))
        );
        assert_eq!(
            KeyChars::new(':', Some('~')),
            Err(KeyCharError::InvalidWildcard('~'))
        );
        assert_eq!(
            KeyChars::new(':', Some(':')),
            Err(KeyCharError::WildcardIsSeparator(':'))
        );
    }

    #[test]
    fn strip_wildcard_requires_configured_char() {
        let chars = KeyChars::new(':', Some('*')).expect("valid chars");
        assert_eq!(chars.strip_wildcard("ord*"), Some("ord"));
        assert_eq!(chars.strip_wildcard("ord"), None);

        let disabled = KeyChars::default();
        assert_eq!(disabled.strip_wildcard("ord*"), None);
    }
}
