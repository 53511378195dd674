use crate::{
    cursor::cipher::{CipherError, TokenCipher},
    error::{ErrorClass, ErrorDetail, ErrorOrigin, InternalError},
    serialize::{self, SerializeError},
    value::Item,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{fmt, sync::Arc};
use thiserror::Error as ThisError;

const SIGNATURE_DOMAIN: &[u8] = b"onetable:continuation:v1";

///
/// TokenError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum TokenError {
    #[error("failed to seal continuation token: {0}")]
    Seal(String),

    #[error("continuation token could not be decrypted")]
    Decrypt(#[source] CipherError),

    #[error("continuation token payload is malformed: {0}")]
    Malformed(#[source] SerializeError),

    #[error("unsupported continuation token version: {version}")]
    UnsupportedVersion { version: u8 },

    #[error("continuation token does not match query shape: expected {expected}, found {found}")]
    ShapeMismatch { expected: String, found: String },
}

impl From<TokenError> for InternalError {
    fn from(err: TokenError) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Cursor, err.to_string())
            .with_detail(ErrorDetail::Token(err))
    }
}

///
/// TokenVersion
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TokenVersion {
    V1,
}

impl TokenVersion {
    const V1_TAG: u8 = 1;

    const fn decode(raw: u8) -> Option<Self> {
        match raw {
            Self::V1_TAG => Some(Self::V1),
            _ => None,
        }
    }

    const fn encode(self) -> u8 {
        match self {
            Self::V1 => Self::V1_TAG,
        }
    }
}

///
/// TokenShape
///
/// Structural identity of a paged query: a token is only accepted back by
/// a query with the same table, record type and index.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TokenShape<'a> {
    pub table: &'a str,
    pub type_name: &'a str,
    /// Empty for the primary index.
    pub index: &'a str,
}

impl TokenShape<'_> {
    #[must_use]
    pub fn signature(&self) -> ShapeSignature {
        let mut hasher = Sha256::new();
        hasher.update(SIGNATURE_DOMAIN);
        for part in [self.table, self.type_name, self.index] {
            let len = u32::try_from(part.len()).unwrap_or(u32::MAX);
            hasher.update(len.to_be_bytes());
            hasher.update(part.as_bytes());
        }

        ShapeSignature(hasher.finalize().into())
    }
}

///
/// ShapeSignature
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ShapeSignature([u8; 32]);

impl ShapeSignature {
    #[must_use]
    pub fn as_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ShapeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_hex())
    }
}

///
/// TokenWire
///

#[derive(Debug, Deserialize, Serialize)]
struct TokenWire {
    version: u8,
    signature: [u8; 32],
    last_key: Item,
}

///
/// ContinuationTokens
///
/// Seals a store's last-evaluated key into an opaque token and opens it
/// again for the same query shape.
///

#[derive(Clone)]
pub struct ContinuationTokens {
    cipher: Arc<dyn TokenCipher>,
}

impl ContinuationTokens {
    #[must_use]
    pub fn new(cipher: Arc<dyn TokenCipher>) -> Self {
        Self { cipher }
    }

    /// `None` when there is no further page.
    pub fn tokenize(
        &self,
        shape: &TokenShape<'_>,
        last_key: Option<&Item>,
    ) -> Result<Option<String>, TokenError> {
        let Some(last_key) = last_key.filter(|key| !key.is_empty()) else {
            return Ok(None);
        };

        let wire = TokenWire {
            version: TokenVersion::V1.encode(),
            signature: shape.signature().0,
            last_key: last_key.clone(),
        };
        let bytes =
            serialize::serialize(&wire).map_err(|err| TokenError::Seal(err.to_string()))?;
        let token = self
            .cipher
            .encrypt(&bytes)
            .map_err(|err| TokenError::Seal(err.to_string()))?;

        Ok(Some(token))
    }

    /// Start key for the next page; `None` (first page) when no token is
    /// supplied.
    pub fn untokenize(
        &self,
        shape: &TokenShape<'_>,
        token: Option<&str>,
    ) -> Result<Option<Item>, TokenError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        let bytes = self.cipher.decrypt(token).map_err(TokenError::Decrypt)?;
        let wire: TokenWire = serialize::deserialize(&bytes).map_err(TokenError::Malformed)?;

        if TokenVersion::decode(wire.version).is_none() {
            return Err(TokenError::UnsupportedVersion {
                version: wire.version,
            });
        }

        let expected = shape.signature();
        if wire.signature != expected.0 {
            return Err(TokenError::ShapeMismatch {
                expected: expected.as_hex(),
                found: ShapeSignature(wire.signature).as_hex(),
            });
        }

        Ok(Some(wire.last_key))
    }
}

impl fmt::Debug for ContinuationTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContinuationTokens").finish_non_exhaustive()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cursor::cipher::Aes256GcmCipher, value::AttributeValue};

    fn tokens() -> ContinuationTokens {
        ContinuationTokens::new(Arc::new(Aes256GcmCipher::new(&[3; 32])))
    }

    fn shape(index: &str) -> TokenShape<'_> {
        TokenShape {
            table: "app",
            type_name: "Order",
            index,
        }
    }

    fn last_key() -> Item {
        let mut key = Item::new();
        key.insert("pk".into(), AttributeValue::text("t1"));
        key.insert("sk".into(), AttributeValue::text("order:2024-01-01"));
        key
    }

    #[test]
    fn token_reopens_for_the_same_shape() {
        let tokens = tokens();
        let token = tokens
            .tokenize(&shape(""), Some(&last_key()))
            .expect("tokenize")
            .expect("non-empty key");

        let start = tokens.untokenize(&shape(""), Some(token.as_str())).expect("untokenize");
        assert_eq!(start, Some(last_key()));
    }

    #[test]
    fn empty_last_key_means_no_more_pages() {
        let tokens = tokens();

        assert_eq!(tokens.tokenize(&shape(""), None), Ok(None));
        assert_eq!(tokens.tokenize(&shape(""), Some(&Item::new())), Ok(None));
        assert_eq!(tokens.untokenize(&shape(""), None), Ok(None));
        assert_eq!(tokens.untokenize(&shape(""), Some("")), Ok(None));
    }

    #[test]
    fn replay_against_another_index_is_a_shape_mismatch() {
        let tokens = tokens();
        let token = tokens
            .tokenize(&shape(""), Some(&last_key()))
            .expect("tokenize")
            .expect("token");

        let err = tokens
            .untokenize(&shape("gsi1"), Some(token.as_str()))
            .expect_err("different index");
        assert!(matches!(err, TokenError::ShapeMismatch { .. }));

        let internal = InternalError::from(err);
        assert_eq!(internal.origin, ErrorOrigin::Cursor);
        assert!(matches!(internal.detail, Some(ErrorDetail::Token(_))));
    }

    #[test]
    fn foreign_or_tampered_tokens_fail_to_decrypt() {
        let tokens = tokens();
        let token = tokens
            .tokenize(&shape(""), Some(&last_key()))
            .expect("tokenize")
            .expect("token");

        let other = ContinuationTokens::new(Arc::new(Aes256GcmCipher::new(&[4; 32])));
        assert!(matches!(
            other.untokenize(&shape(""), Some(token.as_str())),
            Err(TokenError::Decrypt(_))
        ));

        let mut tampered = token.into_bytes();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).expect("ascii");
        assert!(matches!(
            tokens.untokenize(&shape(""), Some(tampered.as_str())),
            Err(TokenError::Decrypt(_))
        ));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let cipher = Aes256GcmCipher::new(&[3; 32]);
        let wire = TokenWire {
            version: 9,
            signature: shape("").signature().0,
            last_key: last_key(),
        };
        let token = cipher
            .encrypt(&serialize::serialize(&wire).expect("encode"))
            .expect("encrypt");

        assert_eq!(
            tokens().untokenize(&shape(""), Some(token.as_str())),
            Err(TokenError::UnsupportedVersion { version: 9 })
        );
    }

    #[test]
    fn sealed_garbage_is_malformed() {
        let cipher = Aes256GcmCipher::new(&[3; 32]);
        let token = cipher.encrypt(b"\xff\x00").expect("encrypt");

        assert!(matches!(
            tokens().untokenize(&shape(""), Some(token.as_str())),
            Err(TokenError::Malformed(_))
        ));
    }
}
