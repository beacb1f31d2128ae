//! Byte-level codecs for transport frames.
//!
//! [`EventCodec`](crate::EventCodec) stops at [`WireValue`](crate::WireValue).
//! Turning a whole frame (wire value plus routing fields) into bytes is a
//! separate, swappable concern, handled by a [`Codec`]. The in-memory
//! loopback transport uses [`JsonCodec`], which keeps frames readable in
//! logs.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes serializable frames to bytes and back.
///
/// `decode` asks for `DeserializeOwned` so the caller can drop the input
/// buffer as soon as it returns.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// Behind the `json` feature (on by default).
///
/// ```rust
/// use scenecast_protocol::{Codec, JsonCodec, WireValue};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&WireValue::Int32(4)).unwrap();
/// let back: WireValue = codec.decode(&bytes).unwrap();
/// assert_eq!(back, WireValue::Int32(4));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
