use aes_gcm::{
    Aes256Gcm,
    aead::{Aead, KeyInit, generic_array::GenericArray},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use std::fmt;
use thiserror::Error as ThisError;

const NONCE_LEN: usize = 12;

///
/// CipherError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CipherError {
    #[error("token encryption failed: {0}")]
    Encrypt(String),

    #[error("token decryption failed: {0}")]
    Decrypt(String),

    #[error("invalid cipher key: {0}")]
    Key(String),
}

///
/// TokenCipher
///
/// Pluggable encryption for continuation tokens. Implementations produce
/// URL-safe text and must reject tampered input.
///

pub trait TokenCipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError>;

    fn decrypt(&self, token: &str) -> Result<Vec<u8>, CipherError>;
}

///
/// Aes256GcmCipher
///
/// AES-256-GCM with a random 96-bit nonce prepended to the ciphertext,
/// rendered as unpadded URL-safe base64.
///

#[derive(Clone)]
pub struct Aes256GcmCipher {
    cipher: Aes256Gcm,
}

impl Aes256GcmCipher {
    #[must_use]
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(GenericArray::from_slice(key)),
        }
    }

    pub fn from_slice(key: &[u8]) -> Result<Self, CipherError> {
        let key: &[u8; 32] = key
            .try_into()
            .map_err(|_| CipherError::Key(format!("expected 32 bytes, got {}", key.len())))?;

        Ok(Self::new(key))
    }
}

impl fmt::Debug for Aes256GcmCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aes256GcmCipher").finish_non_exhaustive()
    }
}

impl TokenCipher for Aes256GcmCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(GenericArray::from_slice(&nonce), plaintext)
            .map_err(|err| CipherError::Encrypt(err.to_string()))?;

        let mut sealed = nonce.to_vec();
        sealed.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    fn decrypt(&self, token: &str) -> Result<Vec<u8>, CipherError> {
        let sealed = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|err| CipherError::Decrypt(err.to_string()))?;
        if sealed.len() < NONCE_LEN {
            return Err(CipherError::Decrypt("token too short".into()));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(GenericArray::from_slice(nonce), ciphertext)
            .map_err(|err| CipherError::Decrypt(err.to_string()))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_text_opens_with_the_same_key_only() {
        let cipher = Aes256GcmCipher::new(&[7; 32]);
        let token = cipher.encrypt(b"last key").expect("encrypt");

        assert!(!token.contains(['+', '/', '=']));
        assert_eq!(cipher.decrypt(&token).expect("decrypt"), b"last key");

        let other = Aes256GcmCipher::new(&[8; 32]);
        assert!(matches!(other.decrypt(&token), Err(CipherError::Decrypt(_))));
    }

    #[test]
    fn nonces_differ_per_token() {
        let cipher = Aes256GcmCipher::new(&[1; 32]);

        let a = cipher.encrypt(b"same").expect("encrypt");
        let b = cipher.encrypt(b"same").expect("encrypt");
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_text_and_bad_keys_are_rejected() {
        let cipher = Aes256GcmCipher::new(&[1; 32]);

        assert!(cipher.decrypt("not base64 !").is_err());
        assert!(cipher.decrypt("AAAA").is_err());
        assert!(matches!(
            Aes256GcmCipher::from_slice(&[0; 16]),
            Err(CipherError::Key(_))
        ));
    }
}
