//! Continuation tokens: opaque, encrypted, shape-bound page cursors.

mod cipher;
mod token;

pub use cipher::{Aes256GcmCipher, CipherError, TokenCipher};
pub use token::{ContinuationTokens, ShapeSignature, TokenError, TokenShape};
