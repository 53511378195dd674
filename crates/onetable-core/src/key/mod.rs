//! Composite key handling: separator/wildcard validation and the codec that
//! packs ordered field values into one key attribute value.

mod chars;
mod codec;

pub use chars::{KeyCharError, KeyChars, SYMBOL_CHARS, VALUE_SEPARATOR_DEFAULT};
pub use codec::{DecodedKey, KeyCodec, KeyCodecError, KeyCondition};
