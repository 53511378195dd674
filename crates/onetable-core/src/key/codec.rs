//! Module: key::codec
//! Responsibility: pack ordered key-field values into one stored attribute
//! value and recover them.
//! Does not own: which fields feed which slot (see `schema::keys`).
//!
//! Values are joined with their natural text. No padding is applied, so
//! range scans over numeric components are only monotonic when callers keep
//! them at one fixed width.

use crate::{error::InternalError, key::KeyChars};
use thiserror::Error as ThisError;

///
/// KeyCodecError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum KeyCodecError {
    #[error("composite key has no parts")]
    NoParts,

    #[error("key part {position} is empty")]
    EmptyPart { position: usize },

    #[error("key part {position} '{value}' contains the value separator '{separator}'")]
    SeparatorInPart {
        position: usize,
        value: String,
        separator: char,
    },

    #[error("stored key '{stored}' has {found} segments, expected {expected}")]
    SegmentCount {
        stored: String,
        expected: usize,
        found: usize,
    },
}

impl From<KeyCodecError> for InternalError {
    fn from(err: KeyCodecError) -> Self {
        Self::key_validation(err.to_string())
    }
}

///
/// KeyCondition
///
/// Encoded query-side key value. `prefix` selects a begins-with condition
/// instead of a comparison.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyCondition {
    pub value: String,
    pub prefix: bool,
}

///
/// DecodedKey
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecodedKey {
    pub type_name: Option<String>,
    pub parts: Vec<String>,
}

///
/// KeyCodec
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct KeyCodec {
    chars: KeyChars,
    type_discriminator: bool,
}

impl KeyCodec {
    #[must_use]
    pub const fn new(chars: KeyChars, type_discriminator: bool) -> Self {
        Self {
            chars,
            type_discriminator,
        }
    }

    #[must_use]
    pub const fn chars(&self) -> KeyChars {
        self.chars
    }

    /// Whether a key of this arity carries a type discriminator segment.
    #[must_use]
    pub const fn discriminates(&self, arity: usize) -> bool {
        self.type_discriminator && arity > 1
    }

    /// Encode a fully populated key for a write.
    pub fn encode(&self, type_name: &str, parts: &[String]) -> Result<String, KeyCodecError> {
        if parts.is_empty() {
            return Err(KeyCodecError::NoParts);
        }

        let separator = self.chars.separator();
        let last = parts.len() - 1;
        for (position, part) in parts.iter().enumerate() {
            if part.is_empty() {
                return Err(KeyCodecError::EmptyPart { position });
            }
            // The final segment may hold separators; decode splits at most n-1 times.
            if position < last && part.contains(separator) {
                return Err(KeyCodecError::SeparatorInPart {
                    position,
                    value: part.clone(),
                    separator,
                });
            }
        }

        let mut segments = Vec::with_capacity(parts.len() + 1);
        if self.discriminates(parts.len()) {
            segments.push(type_name);
        }
        segments.extend(parts.iter().map(String::as_str));

        Ok(join(&segments, separator))
    }

    /// Encode the leading populated parts of a key for a query.
    ///
    /// Returns `None` when nothing constrains the key. A partially populated
    /// composite, or a last supplied part ending in the wildcard, yields a
    /// prefix condition.
    #[must_use]
    pub fn encode_query(&self, type_name: &str, parts: &[Option<String>]) -> Option<KeyCondition> {
        if parts.is_empty() {
            return None;
        }

        let separator = self.chars.separator();
        let mut segments: Vec<&str> = Vec::with_capacity(parts.len() + 1);
        if self.discriminates(parts.len()) {
            segments.push(type_name);
        }

        let mut populated = 0;
        for part in parts {
            let Some(part) = part.as_deref().filter(|p| !p.is_empty()) else {
                break;
            };

            if let Some(stripped) = self.chars.strip_wildcard(part) {
                if !stripped.is_empty() {
                    segments.push(stripped);
                    return Some(KeyCondition {
                        value: join(&segments, separator),
                        prefix: true,
                    });
                }
                // A bare wildcard matches anything in this slot.
                break;
            }

            segments.push(part);
            populated += 1;
        }

        if populated == parts.len() {
            return Some(KeyCondition {
                value: join(&segments, separator),
                prefix: false,
            });
        }
        if segments.is_empty() {
            return None;
        }

        let mut value = join(&segments, separator);
        value.push(separator);

        Some(KeyCondition {
            value,
            prefix: true,
        })
    }

    /// Split a stored key value back into its parts.
    pub fn decode(&self, stored: &str, arity: usize) -> Result<DecodedKey, KeyCodecError> {
        if arity == 0 {
            return Err(KeyCodecError::NoParts);
        }

        let discriminated = self.discriminates(arity);
        if arity == 1 {
            return Ok(DecodedKey {
                type_name: None,
                parts: vec![stored.to_string()],
            });
        }

        let expected = arity + usize::from(discriminated);
        let mut segments: Vec<String> = stored
            .splitn(expected, self.chars.separator())
            .map(str::to_string)
            .collect();
        if segments.len() != expected {
            return Err(KeyCodecError::SegmentCount {
                stored: stored.to_string(),
                expected,
                found: segments.len(),
            });
        }

        let type_name = discriminated.then(|| segments.remove(0));

        Ok(DecodedKey {
            type_name,
            parts: segments,
        })
    }

    /// Leading type segment of a discriminated stored key.
    #[must_use]
    pub fn discriminator<'a>(&self, stored: &'a str, arity: usize) -> Option<&'a str> {
        if !self.discriminates(arity) {
            return None;
        }

        stored.split(self.chars.separator()).next()
    }
}

fn join(segments: &[&str], separator: char) -> String {
    let mut buf = [0u8; 4];
    segments.join(&*separator.encode_utf8(&mut buf))
}

///
/// TESTS
///
