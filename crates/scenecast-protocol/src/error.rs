//! Error types for the protocol layer.
//!
//! Two enums live here because two different things can go wrong:
//!
//! - [`CodecError`]: the *typed* layer: a tag nobody registered, a byte
//!   buffer of the wrong width, a grid whose dimensions disagree with its
//!   payload, or an envelope whose discriminator we don't understand.
//! - [`ProtocolError`]: the *byte* layer: a [`Codec`](crate::Codec)
//!   failed to turn a frame into bytes or back.

use crate::types::TypeTag;

/// Errors raised while registering, encoding, decoding, or dispatching
/// typed event values.
///
/// Every inbound lookup is fallible and ends up here. An unknown tag or
/// discriminator is never silently dropped or guessed at.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// `register` was called with a tag that is already taken.
    #[error("type tag {0} is already registered")]
    DuplicateType(TypeTag),

    /// A tag was used that has no descriptor (never registered, or
    /// already unregistered).
    #[error("type tag {0} is not registered")]
    UnknownType(TypeTag),

    /// A Rust type was wrapped or encoded before any tag was bound to it.
    #[error("type {0} has no registered tag")]
    UnboundType(&'static str),

    /// A fixed-width value arrived (or was produced) with the wrong
    /// number of bytes.
    #[error("tag {tag} expects {expected} bytes, got {actual}")]
    SizeMismatch {
        tag: TypeTag,
        expected: usize,
        actual: usize,
    },

    /// `width * height` does not match the number of grid elements.
    #[error("grid {width}x{height} needs {expected} elements, got {actual}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// Grid dimensions that can't be carried by the `xy` point (negative,
    /// or wider than `i32`).
    #[error("grid dimensions {width}x{height} are out of range")]
    InvalidDimensions { width: i64, height: i64 },

    /// An envelope key held a value we don't recognize, e.g.
    /// `ArrayType = "Tree"`.
    #[error("unknown {key} discriminator {value:?}")]
    UnknownDiscriminator { key: &'static str, value: String },

    /// A required envelope key is absent.
    #[error("envelope is missing the {0:?} key")]
    MissingKey(&'static str),

    /// A wire value had the wrong outer kind for its position.
    #[error("expected {expected}, found {found}")]
    UnexpectedKind {
        expected: &'static str,
        found: &'static str,
    },

    /// A custom value was handed to a descriptor for a different type.
    #[error("tag {tag} encodes {expected}, but the value is a {found}")]
    ValueMismatch {
        tag: TypeTag,
        expected: &'static str,
        found: &'static str,
    },

    /// A custom sequence contained an element tagged differently from
    /// the sequence itself.
    #[error("sequence of tag {expected} contains an element tagged {found}")]
    MixedElements { expected: TypeTag, found: TypeTag },
}

/// Errors that can occur while turning frames into bytes and back.
///
/// The inner `serde_json::Error` is the original error from serde_json.
/// We wrap it so callers deal with `ProtocolError` uniformly,
/// regardless of which codec produced the error.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed input, missing fields, wrong
    /// data types, or a truncated frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message_names_both_sizes() {
        let err = CodecError::DimensionMismatch {
            width: 3,
            height: 2,
            expected: 6,
            actual: 5,
        };
        assert_eq!(err.to_string(), "grid 3x2 needs 6 elements, got 5");
    }

    #[test]
    fn test_unknown_discriminator_quotes_value() {
        let err = CodecError::UnknownDiscriminator {
            key: "ArrayType",
            value: "Tree".into(),
        };
        assert_eq!(err.to_string(), "unknown ArrayType discriminator \"Tree\"");
    }

    #[test]
    fn test_unknown_type_uses_tag_display() {
        let err = CodecError::UnknownType(TypeTag(9));
        assert_eq!(err.to_string(), "type tag #9 is not registered");
    }
}
