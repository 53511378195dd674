//! CBOR encoding for opaque payloads (continuation tokens).

mod cbor;

use crate::error::{ErrorClass, ErrorOrigin, InternalError};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error as ThisError;

/// Upper bound on any payload handed to [`deserialize`].
pub const MAX_PAYLOAD_BYTES: usize = 16 * 1024;

///
/// SerializeError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SerializeError {
    #[error("cbor encode failed: {0}")]
    Serialize(String),

    #[error("cbor decode failed: {0}")]
    Deserialize(String),

    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: usize, max: usize },
}

impl From<SerializeError> for InternalError {
    fn from(err: SerializeError) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Serialize, err.to_string())
    }
}

pub fn serialize<T>(value: &T) -> Result<Vec<u8>, SerializeError>
where
    T: Serialize,
{
    cbor::serialize(value)
}

/// Decode a payload produced by [`serialize`]. Oversized input is rejected
/// before decoding.
pub fn deserialize<T>(bytes: &[u8]) -> Result<T, SerializeError>
where
    T: DeserializeOwned,
{
    cbor::deserialize(bytes)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{AttributeValue, Item};

    #[test]
    fn items_survive_a_cbor_pass() {
        let mut item = Item::new();
        item.insert("pk".into(), AttributeValue::text("t1"));
        item.insert("n".into(), AttributeValue::number(3));

        let bytes = serialize(&item).expect("encode");
        let back: Item = deserialize(&bytes).expect("decode");
        assert_eq!(back, item);
    }

    #[test]
    fn garbage_and_oversized_input_are_errors() {
        assert!(matches!(
            deserialize::<Item>(&[0xff, 0x00, 0x13]),
            Err(SerializeError::Deserialize(_))
        ));

        let big = vec![0u8; MAX_PAYLOAD_BYTES + 1];
        assert_eq!(
            deserialize::<Item>(&big),
            Err(SerializeError::TooLarge {
                len: MAX_PAYLOAD_BYTES + 1,
                max: MAX_PAYLOAD_BYTES,
            })
        );
    }
}
